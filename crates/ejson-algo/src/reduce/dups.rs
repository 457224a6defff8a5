use ejson_core::{Component, ComponentFilter, ComponentType, Network, ORIG_IDS_KEY};
use indexmap::IndexMap;
use num_complex::Complex64;
use serde_json::json;
use tracing::debug;

use super::absorb_user_data;

/// Terminal landing points with their phases, in (node, index) order, plus
/// the liveness of the line.
type DupKey = (Vec<(String, Vec<String>)>, bool);

/// Merge groups of parallel lines with identical terminals into the first
/// line of each group. Returns the number of lines removed.
///
/// Admittances add: `z = 1 / Σ 1/(length·z) / min_length`, likewise for
/// `z0`. Where a line has `z0 == 0` but `z != 0`, `z` stands in for `z0`.
/// The merged line takes the shortest length of the group, which is exact
/// only when all lengths agree. A line with `z == 0` but `z0 != 0` shorts
/// the positive sequence of the group, so the merged `z` is zero. Groups
/// containing a zero-length line, or one with both impedances zero, are
/// left to the short-circuit pass.
pub fn merge_dups(network: &mut Network) -> usize {
    let mut groups: IndexMap<DupKey, Vec<String>> = IndexMap::new();
    for line in network.components_of(ComponentFilter::of_type(ComponentType::Line)) {
        let mut cons = network.connections_from(&line.id);
        cons.sort_by(|a, b| (a.node.as_str(), a.index).cmp(&(b.node.as_str(), b.index)));
        let terminals = cons
            .iter()
            .map(|c| (c.node.clone(), c.attrs.phs.clone()))
            .collect();
        groups
            .entry((terminals, line.is_live()))
            .or_default()
            .push(line.id.clone());
    }

    let mut removed = 0;
    for ids in groups.into_values().filter(|ids| ids.len() > 1) {
        let Some(merged) = combine(network, &ids) else {
            continue;
        };
        let dropped: Vec<Component> = ids[1..]
            .iter()
            .filter_map(|id| network.remove_component(id))
            .collect();
        removed += dropped.len();

        let Some(keep) = network.component_mut(&ids[0]) else {
            continue;
        };
        let keep_id = keep.id.clone();
        let user_data = keep.user_data_mut();
        user_data
            .entry(ORIG_IDS_KEY)
            .or_insert_with(|| json!([keep_id]));
        let dropped_refs: Vec<&Component> = dropped.iter().collect();
        absorb_user_data(user_data, &dropped_refs);

        if let Some(line) = keep.as_line_mut() {
            line.length = merged.length;
            line.z = merged.z;
            line.z0 = merged.z0;
            if merged.b_chg.is_some() {
                line.b_chg = merged.b_chg;
            }
        }
        debug!(kept = %ids[0], dropped = ?&ids[1..], "merged duplicate lines");
    }
    removed
}

struct Combined {
    length: f64,
    z: Complex64,
    z0: Complex64,
    b_chg: Option<Complex64>,
}

fn combine(network: &Network, ids: &[String]) -> Option<Combined> {
    let zero = Complex64::new(0.0, 0.0);
    let lines = ids
        .iter()
        .map(|id| network.component(id).and_then(Component::as_line))
        .collect::<Option<Vec<_>>>()?;
    if lines.iter().any(|l| l.is_zero_impedance()) {
        return None;
    }

    let min_length = lines.iter().map(|l| l.length).fold(f64::INFINITY, f64::min);
    let z = parallel(lines.iter().map(|l| l.z * l.length)) / min_length;
    let z0 = parallel(
        lines
            .iter()
            .map(|l| (if l.z0 == zero { l.z } else { l.z0 }) * l.length),
    ) / min_length;

    let b_chg = lines
        .iter()
        .any(|l| l.b_chg.is_some())
        .then(|| {
            lines
                .iter()
                .map(|l| l.b_chg.unwrap_or_default() * l.length)
                .sum::<Complex64>()
                / min_length
        });

    Some(Combined {
        length: min_length,
        z,
        z0,
        b_chg,
    })
}

/// Parallel combination of absolute impedances; any zero branch shorts the
/// group.
fn parallel(impedances: impl Iterator<Item = Complex64>) -> Complex64 {
    let zero = Complex64::new(0.0, 0.0);
    let mut y = zero;
    for z in impedances {
        if z == zero {
            return zero;
        }
        y += z.inv();
    }
    y.inv()
}
