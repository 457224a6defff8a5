//! Bulk edits of load powers.

use ejson_core::{ComponentFilter, ComponentType, Network};
use num_complex::Complex64;

/// Multiply every per-phase `s_nom` entry of every load by `factor`.
pub fn scale_loads(network: &mut Network, factor: Complex64) {
    for id in network.ids_of(ComponentFilter::of_type(ComponentType::Load)) {
        if let Some(load) = network.component_mut(&id).and_then(|c| c.as_load_mut()) {
            load.s_nom.iter_mut().for_each(|s| *s *= factor);
        }
    }
}

/// Give every load the same total power `total`, split evenly over its
/// phases.
pub fn set_balanced_loads(network: &mut Network, total: Complex64) {
    for id in network.ids_of(ComponentFilter::of_type(ComponentType::Load)) {
        if let Some(load) = network.component_mut(&id).and_then(|c| c.as_load_mut()) {
            let n = load.s_nom.len();
            if n > 0 {
                load.s_nom = vec![total / n as f64; n];
            }
        }
    }
}
