//! String telescoping.
//!
//! A string is a chain `cap, e1, n1, e2, ..., ek, cap'` where every internal
//! node `n_i` touches exactly the two pass-through elements beside it. Runs of
//! the same element type and terminal phasing are replaced by one equivalent
//! element between the run's end nodes.

use std::collections::{HashMap, HashSet};

use ejson_core::{
    Component, ComponentData, ComponentFilter, ComponentType, ConnectorData, EjsonResult,
    LineData, Network, SwitchState, TerminalAttrs,
};
use indexmap::IndexSet;
use num_complex::Complex64;
use petgraph::unionfind::UnionFind;
use tracing::{debug, trace};

use super::combined_user_data;

/// A replacement element, built before the network is touched.
struct Replacement {
    prefix: &'static str,
    template: Component,
    ends: [String; 2],
    attrs: TerminalAttrs,
}

/// Telescope every string in the network. Returns the number of elements
/// created.
pub fn merge_strings(network: &mut Network) -> EjsonResult<usize> {
    let groups = string_groups(network);

    let mut remove: IndexSet<String> = IndexSet::new();
    let mut new: Vec<Replacement> = Vec::new();
    for group in &groups {
        plan_group(network, group, &mut remove, &mut new);
    }

    for id in &remove {
        network.remove_component(id);
    }

    let created = new.len();
    for replacement in new {
        let Replacement {
            prefix,
            mut template,
            ends,
            attrs,
        } = replacement;
        let id = network.fresh_id(prefix);
        template.id = id.clone();
        network.add_component(template)?;
        network.connect(&id, &ends[0], 0, attrs.clone())?;
        network.connect(&id, &ends[1], 1, attrs)?;
        debug!(id = %id, from = %ends[0], to = %ends[1], "merged string");
    }
    Ok(created)
}

/// Degree-2 node between two distinct two-terminal pass-through elements.
fn is_string_node(network: &Network, id: &str) -> bool {
    let cons = network.connections_from(id);
    if cons.len() != 2 || cons[0].element == cons[1].element {
        return false;
    }
    cons.iter().all(|con| {
        network
            .component(&con.element)
            .is_some_and(|c| c.ctype().is_pass_through())
            && network.degree(&con.element) == 2
            && network.neighbors(&con.element).len() == 2
    })
}

/// Connected groups of string nodes and their elements, each sorted by id,
/// ordered by lowest id.
fn string_groups(network: &Network) -> Vec<Vec<String>> {
    let nodes: Vec<&str> = network
        .components_of(ComponentFilter::nodes())
        .map(|c| c.id.as_str())
        .filter(|id| is_string_node(network, id))
        .collect();

    let mut members: IndexSet<&str> = nodes.iter().copied().collect();
    for node in &nodes {
        members.extend(network.neighbors(node));
    }

    let mut sets = UnionFind::<usize>::new(members.len());
    for (ix, node) in nodes.iter().enumerate() {
        for element in network.neighbors(node) {
            if let Some(other) = members.get_index_of(element) {
                sets.union(ix, other);
            }
        }
    }

    let mut by_root: HashMap<usize, Vec<String>> = HashMap::new();
    for (ix, id) in members.iter().enumerate() {
        by_root
            .entry(sets.find(ix))
            .or_default()
            .push(id.to_string());
    }
    let mut groups: Vec<Vec<String>> = by_root
        .into_values()
        .map(|mut group| {
            group.sort();
            group
        })
        .collect();
    groups.sort();
    groups
}

fn plan_group(
    network: &Network,
    group: &[String],
    remove: &mut IndexSet<String>,
    new: &mut Vec<Replacement>,
) {
    let internal: HashSet<&str> = group
        .iter()
        .map(String::as_str)
        .filter(|id| network.component(id).is_some_and(Component::is_node))
        .collect();
    let elements: HashSet<&str> = group
        .iter()
        .map(String::as_str)
        .filter(|id| !internal.contains(id))
        .collect();

    let mut caps: Vec<&str> = elements
        .iter()
        .flat_map(|e| network.neighbors(e))
        .filter(|n| !internal.contains(n))
        .collect();
    caps.sort();
    caps.dedup();

    if caps.len() <= 1 {
        // Closed ring: open it at its lowest internal node.
        if let Some(first) = group.iter().find(|id| internal.contains(id.as_str())) {
            trace!(node = %first, "breaking circular string");
            for element in network.neighbors(first) {
                remove.insert(element.to_string());
            }
            remove.insert(first.clone());
        }
        return;
    }

    let ordered = walk(network, caps[0], &elements);
    let mut work = vec![(0, ordered.len() - 1)];
    while let Some((start, end)) = work.pop() {
        if let Some(split) = first_mismatch(network, &ordered, start, end) {
            work.push((split, end));
            work.push((start, split));
            continue;
        }
        // Runs of one element leave nothing to merge.
        if end - start < 4 {
            continue;
        }
        if let Some(replacement) = merge_run(network, &ordered[start..=end]) {
            for id in &ordered[start + 1..end] {
                remove.insert(id.clone());
            }
            new.push(replacement);
        }
    }
}

/// Ids from `start` to the far cap: nodes at even positions, elements at odd.
fn walk(network: &Network, start: &str, elements: &HashSet<&str>) -> Vec<String> {
    let mut ordered = vec![start.to_string()];
    let mut seen: HashSet<&str> = HashSet::new();
    let mut node = start;
    loop {
        let next = network
            .neighbors(node)
            .into_iter()
            .find(|e| elements.contains(e) && !seen.contains(e));
        let Some(element) = next else {
            break;
        };
        seen.insert(element);
        let Some(far) = network.neighbors(element).into_iter().find(|n| *n != node) else {
            break;
        };
        ordered.push(element.to_string());
        ordered.push(far.to_string());
        node = far;
    }
    ordered
}

/// Position of the first internal node in `ordered[start..=end]` whose two
/// elements differ in type or phasing.
fn first_mismatch(network: &Network, ordered: &[String], start: usize, end: usize) -> Option<usize> {
    (start + 2..end).step_by(2).find(|&i| {
        let (before, after) = (&ordered[i - 1], &ordered[i + 1]);
        let same_type = match (network.component(before), network.component(after)) {
            (Some(a), Some(b)) => a.ctype() == b.ctype(),
            _ => false,
        };
        let same_phasing = match (phasing(network, before), phasing(network, after)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        !(same_type && same_phasing)
    })
}

/// Common terminal phasing of an element, or `None` when it transposes.
fn phasing<'a>(network: &'a Network, id: &str) -> Option<&'a [String]> {
    let cons = network.connections_from(id);
    match cons[..] {
        [a, b] if a.attrs.phs == b.attrs.phs => Some(a.attrs.phs.as_slice()),
        _ => None,
    }
}

fn merge_run(network: &Network, run: &[String]) -> Option<Replacement> {
    let segments: Vec<&Component> = run
        .iter()
        .skip(1)
        .step_by(2)
        .filter_map(|id| network.component(id))
        .collect();
    let first = segments.first()?;
    let attrs = network
        .connections_between(&run[0], &run[1])
        .first()
        .map(|c| c.attrs.clone())?;

    let (prefix, data) = match first.ctype() {
        ComponentType::Line => ("merged_line_", ComponentData::Line(merge_lines(&segments)?)),
        ComponentType::Connector => (
            "merged_connector_",
            ComponentData::Connector(merge_connectors(&segments)?),
        ),
        _ => return None,
    };

    let in_service = segments
        .iter()
        .any(|s| s.in_service.is_some())
        .then(|| segments.iter().all(|s| s.is_in_service()));

    let template = Component {
        id: first.id.clone(),
        in_service,
        data,
        user_data: Some(combined_user_data(&segments)),
    };
    Some(Replacement {
        prefix,
        template,
        ends: [run[0].clone(), run[run.len() - 1].clone()],
        attrs,
    })
}

/// Series combination: lengths add, per-length quantities are
/// length-weighted means.
fn merge_lines(segments: &[&Component]) -> Option<LineData> {
    let lines: Vec<&LineData> = segments.iter().filter_map(|s| s.as_line()).collect();
    let mut merged = (*lines.first()?).clone();

    let total: f64 = lines.iter().map(|l| l.length).sum();
    let weights: Vec<f64> = lines
        .iter()
        .map(|l| {
            if total > 0.0 {
                l.length / total
            } else {
                1.0 / lines.len() as f64
            }
        })
        .collect();
    let mean = |values: Vec<Complex64>| -> Complex64 {
        values.iter().zip(&weights).map(|(v, w)| *v * *w).sum()
    };

    merged.length = total;
    merged.z = mean(lines.iter().map(|l| l.z).collect());
    merged.z0 = mean(lines.iter().map(|l| l.z0).collect());
    if lines.iter().any(|l| l.b_chg.is_some()) {
        merged.b_chg = Some(mean(lines.iter().map(|l| l.b_chg.unwrap_or_default()).collect()));
    }
    Some(merged)
}

fn merge_connectors(segments: &[&Component]) -> Option<ConnectorData> {
    let states: Vec<Option<SwitchState>> = segments.iter().map(|s| s.switch_state()).collect();
    let mut merged = match &segments.first()?.data {
        ComponentData::Connector(c) => c.clone(),
        _ => return None,
    };
    merged.switch_state = if states.iter().all(Option::is_none) {
        None
    } else if states.contains(&Some(SwitchState::Open)) {
        Some(SwitchState::Open)
    } else if states.iter().all(|s| *s == Some(SwitchState::Closed)) {
        Some(SwitchState::Closed)
    } else {
        Some(SwitchState::NoSwitch)
    };
    Some(merged)
}
