//! Network-level properties (voltage convention, units, passthrough fields).

use serde::{Deserialize, Serialize};

use crate::component::Extra;

/// Convention used for node base voltages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoltageType {
    /// Line to ground
    Lg,
    /// Line to line
    Ll,
}

/// Unit multipliers, relative to SI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Units {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impedance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Units {
    pub const NAMES: [&'static str; 5] = ["current", "voltage", "impedance", "length", "power"];

    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "current" => self.current,
            "voltage" => self.voltage,
            "impedance" => self.impedance,
            "length" => self.length,
            "power" => self.power,
            _ => None,
        }
    }
}

/// Global attributes of a network document: everything except `components`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage_type: Option<VoltageType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<Units>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl NetworkProperties {
    pub fn is_line_to_ground(&self) -> bool {
        self.voltage_type == Some(VoltageType::Lg)
    }
}
