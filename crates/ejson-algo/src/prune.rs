use ejson_core::Network;
use tracing::debug;

/// Remove every component declared out of service, then every node left
/// without connections. Returns the removed ids.
pub fn remove_out_of_service(network: &mut Network) -> Vec<String> {
    let mut removed: Vec<String> = network
        .components()
        .filter(|c| !c.is_in_service())
        .map(|c| c.id.clone())
        .collect();
    for id in &removed {
        network.remove_component(id);
    }
    removed.extend(network.remove_unconnected_nodes());
    debug!(removed = removed.len(), "removed out of service components");
    removed
}
