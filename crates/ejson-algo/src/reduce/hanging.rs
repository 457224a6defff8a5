use ejson_core::{ComponentFilter, Network};
use indexmap::IndexSet;
use tracing::trace;

/// Remove dead-end spurs: a node with one connection whose element is a
/// Line or Connector with at most two terminals goes, together with that
/// element. Returns the number of components removed.
///
/// Only one segment of a spur is removed per call; the fixpoint loop in
/// [`super::reduce_network`] eats longer spurs from the tip inwards.
pub fn remove_hanging_nodes(network: &mut Network) -> usize {
    let mut to_remove: IndexSet<String> = IndexSet::new();
    for node in network.components_of(ComponentFilter::nodes()) {
        let cons = network.connections_from(&node.id);
        let [con] = cons.as_slice() else {
            continue;
        };
        let Some(element) = network.component(&con.element) else {
            continue;
        };
        if element.ctype().is_pass_through() && network.degree(&element.id) <= 2 {
            trace!(node = %node.id, element = %element.id, "hanging");
            to_remove.insert(node.id.clone());
            to_remove.insert(element.id.clone());
        }
    }

    for id in &to_remove {
        network.remove_component(id);
    }
    to_remove.len()
}
