use std::collections::HashMap;

use ejson_core::{
    same_phase_set, Component, ComponentFilter, ComponentType, EjsonResult, GraphError, Network,
};
use tracing::{debug, trace};

/// True for a live, zero-impedance Line with two terminals whose phases
/// match the phases of the nodes they land on.
pub fn is_short_circuit(network: &Network, component: &Component) -> bool {
    let Some(line) = component.as_line() else {
        return false;
    };
    if !component.is_live() || !line.is_zero_impedance() {
        return false;
    }
    let cons = network.connections_from(&component.id);
    cons.len() == 2
        && cons.iter().all(|con| {
            network
                .component(&con.node)
                .and_then(Component::as_node)
                .is_some_and(|node| same_phase_set(&con.attrs.phs, &node.phs))
        })
}

/// Collapse every short-circuit line. Returns the number collapsed.
pub fn merge_short_circuits(network: &mut Network) -> EjsonResult<usize> {
    let shorts = network
        .components_of(ComponentFilter::of_type(ComponentType::Line))
        .filter(|c| is_short_circuit(network, c))
        .map(|c| c.id.clone())
        .collect::<Vec<_>>();

    let mut collapsed = 0;
    for id in shorts {
        let still_short = network
            .component(&id)
            .is_some_and(|c| is_short_circuit(network, c));
        if !still_short {
            continue;
        }
        let folded = collapse_element(network, &id)?;
        debug!(line = %id, folded = ?folded, "collapsed short circuit");
        collapsed += 1;
    }
    Ok(collapsed)
}

/// Remove element `id` and fold the nodes of its second and later
/// terminals into the node of its first. Every element attached to a folded
/// node is rewired onto the surviving node. Returns the folded node ids.
pub fn collapse_element(network: &mut Network, id: &str) -> Result<Vec<String>, GraphError> {
    let nodes: Vec<String> = network
        .connections_from(id)
        .into_iter()
        .map(|c| c.node.clone())
        .collect();
    if network.remove_component(id).is_none() {
        return Err(GraphError::UnknownComponent(id.to_string()));
    }
    let Some((keep, rest)) = nodes.split_first() else {
        return Ok(Vec::new());
    };

    let mut folded: Vec<String> = Vec::new();
    for node in rest {
        if node == keep || folded.contains(node) {
            trace!(node = %node, "skipping self-fold");
            continue;
        }
        let remap = HashMap::from([(node.clone(), keep.clone())]);
        let attached: Vec<String> = network
            .neighbors(node)
            .into_iter()
            .map(str::to_string)
            .collect();
        for element in attached {
            network.reconnect_element(&element, &remap)?;
        }
        network.remove_component(node);
        folded.push(node.clone());
    }
    Ok(folded)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use ejson_core::TerminalAttrs;

    fn shorted() -> Network {
        // ld0 - ndA =ln_s= ndB - ln1 - nd1 - ld1, plus ld_b on ndB
        let mut net = Network::new();
        for id in ["ndA", "ndB", "nd1"] {
            node(&mut net, id, &["A", "B", "C"]);
        }
        load(&mut net, "ld0", "ndA");
        line(&mut net, "ln_s", "ndA", "ndB", 0.0, (1.0, 1.0));
        line(&mut net, "ln1", "ndB", "nd1", 1.0, (1.0, 1.0));
        load(&mut net, "ld_b", "ndB");
        load(&mut net, "ld1", "nd1");
        net
    }

    #[test]
    fn short_is_detected_by_length_or_impedance() {
        let mut net = shorted();
        assert!(is_short_circuit(&net, net.component("ln_s").unwrap()));
        assert!(!is_short_circuit(&net, net.component("ln1").unwrap()));

        let ln1 = net.component_mut("ln1").unwrap().as_line_mut().unwrap();
        ln1.z = Default::default();
        ln1.z0 = Default::default();
        assert!(is_short_circuit(&net, net.component("ln1").unwrap()));

        net.component_mut("ln1").unwrap().in_service = Some(false);
        assert!(!is_short_circuit(&net, net.component("ln1").unwrap()));
    }

    #[test]
    fn partial_phase_short_is_not_collapsed() {
        let mut net = Network::new();
        node(&mut net, "ndA", &["A", "B", "C"]);
        node(&mut net, "ndB", &["A", "B", "C"]);
        let z = Default::default();
        net.add_component(Component::line("ln_s", ejson_core::LineData::new(0.0, z, z)))
            .unwrap();
        net.connect("ln_s", "ndA", 0, TerminalAttrs::with_phases(["A"]))
            .unwrap();
        net.connect("ln_s", "ndB", 1, TerminalAttrs::with_phases(["A"]))
            .unwrap();
        assert!(!is_short_circuit(&net, net.component("ln_s").unwrap()));
        assert_eq!(merge_short_circuits(&mut net).unwrap(), 0);
    }

    #[test]
    fn collapse_moves_connections_to_first_node() {
        let mut net = shorted();
        assert_eq!(merge_short_circuits(&mut net).unwrap(), 1);

        assert!(!net.contains("ln_s"));
        assert!(!net.contains("ndB"));
        assert_eq!(net.neighbors("ndA"), vec!["ld0", "ln1", "ld_b"]);
        let ln1 = net.connections_from("ln1");
        assert_eq!((ln1[0].node.as_str(), ln1[0].index), ("ndA", 0));
        assert_eq!(net.len(), 6);
    }

    #[test]
    fn circular_element_only_removes_itself() {
        let mut net = shorted();
        let remap = HashMap::from([("ndB".to_string(), "ndA".to_string())]);
        net.reconnect_element("ln_s", &remap).unwrap();

        assert_eq!(collapse_element(&mut net, "ln_s").unwrap(), Vec::<String>::new());
        assert!(net.contains("ndA") && net.contains("ndB"));
        assert!(matches!(
            collapse_element(&mut net, "ln_s"),
            Err(GraphError::UnknownComponent(_))
        ));
    }
}
