//! Topology reduction.
//!
//! [`reduce_network`] runs four passes until the component count is stable:
//!
//! 1. [`merge_strings`] telescopes series runs of lines or connectors
//! 2. [`remove_hanging_nodes`] drops dead-end spurs
//! 3. [`merge_short_circuits`] folds zero-impedance lines into their nodes
//! 4. [`merge_dups`] combines parallel duplicate lines
//!
//! Lines carry their provenance in `user_data.orig_ids`. Merges union those
//! lists and keep the user data of absorbed components in
//! `user_data.merged_user_data`, keyed by original id.

mod dups;
mod hanging;
mod shorts;
mod strings;

pub use dups::merge_dups;
pub use hanging::remove_hanging_nodes;
pub use shorts::{collapse_element, is_short_circuit, merge_short_circuits};
pub use strings::merge_strings;

use ejson_core::{
    Component, ComponentFilter, ComponentType, EjsonResult, Extra, Network, MERGED_USER_DATA_KEY,
    ORIG_IDS_KEY,
};
use indexmap::IndexSet;
use serde_json::Value;
use tracing::{debug, info};

/// Reduce the network to a fixpoint of the four reduction passes.
///
/// The loop ends when a full round leaves the component count unchanged.
pub fn reduce_network(network: &mut Network) -> EjsonResult<()> {
    record_orig_ids(network);
    info!(stats = %network.stats(), "initial network");

    loop {
        let before = network.len();

        let strings = merge_strings(network)?;
        debug!(merged = strings, stats = %network.stats(), "after merge strings");

        let hanging = remove_hanging_nodes(network);
        debug!(removed = hanging, stats = %network.stats(), "after remove hanging nodes");

        let shorts = merge_short_circuits(network)?;
        debug!(collapsed = shorts, stats = %network.stats(), "after merge short circuits");

        let dups = merge_dups(network);
        debug!(merged = dups, stats = %network.stats(), "after merge dups");

        // Fixpoint on the total component count: each pass removes
        // components whenever it changes anything.
        if network.len() == before {
            break;
        }
    }

    info!(stats = %network.stats(), "final network");
    Ok(())
}

/// Give every Line without provenance an `orig_ids` list holding its own id.
pub fn record_orig_ids(network: &mut Network) {
    for id in network.ids_of(ComponentFilter::of_type(ComponentType::Line)) {
        if let Some(line) = network.component_mut(&id) {
            line.user_data_mut()
                .entry(ORIG_IDS_KEY)
                .or_insert_with(|| Value::Array(vec![Value::String(id.clone())]));
        }
    }
}

/// Provenance of a component: its `orig_ids`, or its own id.
fn orig_ids(component: &Component) -> Vec<String> {
    let recorded = component
        .user_data
        .as_ref()
        .and_then(|ud| ud.get(ORIG_IDS_KEY))
        .and_then(Value::as_array);
    match recorded {
        Some(ids) => ids
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        None => vec![component.id.clone()],
    }
}

/// Fold the provenance and user data of `parts` into `target`.
///
/// `orig_ids` lists are unioned in order. Remaining user data of each part
/// lands in `merged_user_data` under the part's id; a part's own
/// `merged_user_data` is lifted into the same map rather than nested.
fn absorb_user_data(target: &mut Extra, parts: &[&Component]) {
    let mut ids: IndexSet<String> = target
        .get(ORIG_IDS_KEY)
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let mut merged = match target.get(MERGED_USER_DATA_KEY) {
        Some(Value::Object(map)) => map.clone(),
        _ => Extra::new(),
    };

    for part in parts {
        ids.extend(orig_ids(part));
        let Some(user_data) = &part.user_data else {
            continue;
        };
        let mut own = user_data.clone();
        own.remove(ORIG_IDS_KEY);
        if let Some(Value::Object(nested)) = own.remove(MERGED_USER_DATA_KEY) {
            merged.extend(nested);
        }
        if !own.is_empty() {
            merged.insert(part.id.clone(), Value::Object(own));
        }
    }

    target.insert(
        ORIG_IDS_KEY.to_string(),
        Value::Array(ids.into_iter().map(Value::String).collect()),
    );
    if !merged.is_empty() {
        target.insert(MERGED_USER_DATA_KEY.to_string(), Value::Object(merged));
    }
}

/// User data for a component built from `parts` alone.
fn combined_user_data(parts: &[&Component]) -> Extra {
    let mut out = Extra::new();
    absorb_user_data(&mut out, parts);
    out
}
