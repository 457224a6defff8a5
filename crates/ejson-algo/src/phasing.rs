//! Conversion to a balanced single-phase equivalent.
//!
//! The output uses one phase, `A`, with:
//! - voltages line to line, recorded as `voltage_type: lg`
//! - currents √3 times the per-phase line current
//! - load power equal to the total three-phase power
//! - line `z0` equal to the rescaled `z`

use ejson_core::{
    is_active_phase, ComponentData, ComponentFilter, ComponentType, EjsonResult, Network,
    TurnsRatio, VoltageType, Wiring,
};
use num_complex::Complex64;
use tracing::debug;

use crate::error::TransformError;

const SQRT_3: f64 = 1.732_050_807_568_877_2;
const SINGLE_PHASE: &str = "A";

/// Winding connection of one transformer side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Winding {
    Delta,
    Wye,
}

impl Winding {
    fn multiplier(self) -> f64 {
        match self {
            Winding::Delta => 1.0,
            Winding::Wye => SQRT_3,
        }
    }
}

/// The two winding letters of a vector group such as `Dyn11` or `yy0`.
fn parse_vector_group(id: &str, vector_group: &str) -> Result<[Winding; 2], TransformError> {
    let windings: Vec<Winding> = vector_group
        .chars()
        .filter_map(|c| match c.to_ascii_lowercase() {
            'd' => Some(Winding::Delta),
            'y' => Some(Winding::Wye),
            _ => None,
        })
        .collect();
    match windings[..] {
        [p, s] => Ok([p, s]),
        _ => Err(TransformError::VectorGroup {
            id: id.to_string(),
            vector_group: vector_group.to_string(),
            found: windings.len(),
        }),
    }
}

/// Convert the network to its single-phase equivalent in place.
///
/// Every line and transformer is checked before anything is changed, so an
/// error leaves the network untouched.
pub fn make_single_phased(network: &mut Network) -> EjsonResult<()> {
    let line_phases = active_line_phases(network)?;
    let mut windings = Vec::new();
    for tx in network.components_of(ComponentFilter::of_type(ComponentType::Transformer)) {
        if let Some(data) = tx.as_transformer() {
            windings.push((tx.id.clone(), parse_vector_group(&tx.id, &data.vector_group)?));
        }
    }

    let v_mult = if network.properties.is_line_to_ground() {
        SQRT_3
    } else {
        1.0
    };
    network.properties.voltage_type = Some(VoltageType::Lg);

    for (id, nph) in &line_phases {
        if let Some(line) = network.component_mut(id).and_then(|c| c.as_line_mut()) {
            line.z = line.z * (3.0 / *nph as f64);
            line.z0 = line.z;
            if let Some(i_max) = line.i_max.as_mut() {
                *i_max *= SQRT_3;
            }
        }
    }

    let ids: Vec<String> = network.components().map(|c| c.id.clone()).collect();
    for id in &ids {
        let Some(component) = network.component_mut(id) else {
            continue;
        };
        match &mut component.data {
            ComponentData::Node(node) => {
                node.phs = vec![SINGLE_PHASE.to_string()];
                node.v_base *= v_mult;
            }
            ComponentData::Infeeder(infeeder) => {
                if let Some(v) = infeeder.v_setpoint.as_mut() {
                    *v *= v_mult;
                }
            }
            ComponentData::Load(load) => {
                load.wiring = Some(Wiring::Wye);
                load.s_nom = vec![load.s_nom.iter().sum::<Complex64>()];
            }
            ComponentData::Transformer(tx) => {
                let Some((_, [p, s])) = windings.iter().find(|(tx_id, _)| tx_id == id) else {
                    continue;
                };
                let mult = [p.multiplier(), s.multiplier()];
                for (v, m) in tx.v_winding_base.iter_mut().zip(mult) {
                    *v *= v_mult * m;
                }
                tx.nom_turns_ratio.scale(mult[0] / mult[1]);
                tx.vector_group = "yy0".to_string();
                tx.n_winding_pairs = Some(1);
                tx.is_grounded_p = Some(true);
                tx.is_grounded_s = Some(true);
                if let Some(taps) = tx.taps.as_mut() {
                    taps.truncate(1);
                }
            }
            ComponentData::Line(_) | ComponentData::Connector(_) => {}
        }
    }
    for con in network.connections_mut() {
        con.attrs.phs = vec![SINGLE_PHASE.to_string()];
    }

    debug!(v_mult, lines = line_phases.len(), "made single phased");
    Ok(())
}

/// Active phase count of every line, read from terminal 0.
fn active_line_phases(network: &Network) -> Result<Vec<(String, usize)>, TransformError> {
    network
        .components_of(ComponentFilter::of_type(ComponentType::Line))
        .map(|line| {
            let cons = network.connections_from(&line.id);
            if cons.len() != 2 {
                return Err(TransformError::TerminalCount {
                    id: line.id.clone(),
                    expected: 2,
                    found: cons.len(),
                });
            }
            let nph = cons[0].attrs.phs.iter().filter(|p| is_active_phase(p)).count();
            if nph == 0 {
                return Err(TransformError::NoActivePhases(line.id.clone()));
            }
            Ok((line.id.clone(), nph))
        })
        .collect()
}
