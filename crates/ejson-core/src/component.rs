//! Component and connection types.
//!
//! Every component has a string id, optional liveness flags and a typed payload
//! ([`ComponentData`]). Nodes never own terminals; every other type (an
//! *element*) attaches to nodes through [`Connection`]s stored on the network
//! graph. Payload fields that are not modelled explicitly are kept verbatim in
//! the `extra` map of each payload so documents survive a round trip.

use std::fmt;
use std::str::FromStr;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Passthrough storage for fields the typed model does not interpret.
pub type Extra = Map<String, Value>;

/// User data key holding the ids of the original lines a line was built from.
pub const ORIG_IDS_KEY: &str = "orig_ids";
/// User data key holding the user data of merged originals, keyed by id.
pub const MERGED_USER_DATA_KEY: &str = "merged_user_data";

/// The closed set of component types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentType {
    Node,
    Line,
    Transformer,
    Load,
    Infeeder,
    Connector,
}

impl ComponentType {
    pub const ALL: [ComponentType; 6] = [
        ComponentType::Node,
        ComponentType::Line,
        ComponentType::Transformer,
        ComponentType::Load,
        ComponentType::Infeeder,
        ComponentType::Connector,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Node => "Node",
            ComponentType::Line => "Line",
            ComponentType::Transformer => "Transformer",
            ComponentType::Load => "Load",
            ComponentType::Infeeder => "Infeeder",
            ComponentType::Connector => "Connector",
        }
    }

    /// Two-terminal series elements that can be telescoped into a string.
    pub fn is_pass_through(&self) -> bool {
        matches!(self, ComponentType::Line | ComponentType::Connector)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown component type '{s}'"))
    }
}

/// Connector switch position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchState {
    NoSwitch,
    Open,
    Closed,
}

/// Load wiring configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Wiring {
    Wye,
    Delta,
}

/// Transformer nominal turns ratio: a scalar, or a list of numbers
/// (a complex `[re, im]` pair or one entry per phase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnsRatio {
    Scalar(f64),
    List(Vec<f64>),
}

impl TurnsRatio {
    pub fn scale(&mut self, factor: f64) {
        match self {
            TurnsRatio::Scalar(v) => *v *= factor,
            TurnsRatio::List(values) => values.iter_mut().for_each(|v| *v *= factor),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub phs: Vec<String>,
    /// Base voltage, in the network's voltage unit and convention
    pub v_base: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat_long: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xy: Option<[f64; 2]>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl NodeData {
    pub fn new<S: Into<String>>(phs: impl IntoIterator<Item = S>, v_base: f64) -> Self {
        Self {
            phs: phs.into_iter().map(Into::into).collect(),
            v_base,
            lat_long: None,
            xy: None,
            extra: Extra::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineData {
    pub length: f64,
    /// Positive-sequence impedance per unit length
    pub z: Complex64,
    /// Zero-sequence impedance per unit length
    pub z0: Complex64,
    /// Charging susceptance per unit length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b_chg: Option<Complex64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i_max: Option<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl LineData {
    pub fn new(length: f64, z: Complex64, z0: Complex64) -> Self {
        Self {
            length,
            z,
            z0,
            b_chg: None,
            i_max: None,
            extra: Extra::new(),
        }
    }

    /// Zero length, or both sequence impedances exactly zero.
    pub fn is_zero_impedance(&self) -> bool {
        let zero = Complex64::new(0.0, 0.0);
        self.length == 0.0 || (self.z == zero && self.z0 == zero)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerData {
    pub vector_group: String,
    pub v_winding_base: Vec<f64>,
    pub nom_turns_ratio: TurnsRatio,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_winding_pairs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_grounded_p: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_grounded_s: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taps: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wiring: Option<Wiring>,
    /// Nominal complex power, one entry per phase
    pub s_nom: Vec<Complex64>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfeederData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v_setpoint: Option<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectorData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch_state: Option<SwitchState>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Type-specific payload of a component.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentData {
    Node(NodeData),
    Line(LineData),
    Transformer(TransformerData),
    Load(LoadData),
    Infeeder(InfeederData),
    Connector(ConnectorData),
}

impl ComponentData {
    pub fn component_type(&self) -> ComponentType {
        match self {
            ComponentData::Node(_) => ComponentType::Node,
            ComponentData::Line(_) => ComponentType::Line,
            ComponentData::Transformer(_) => ComponentType::Transformer,
            ComponentData::Load(_) => ComponentType::Load,
            ComponentData::Infeeder(_) => ComponentType::Infeeder,
            ComponentData::Connector(_) => ComponentType::Connector,
        }
    }

    /// Decode a payload object for the given type.
    pub fn from_fields(ctype: ComponentType, fields: Extra) -> Result<Self, serde_json::Error> {
        let value = Value::Object(fields);
        Ok(match ctype {
            ComponentType::Node => ComponentData::Node(serde_json::from_value(value)?),
            ComponentType::Line => ComponentData::Line(serde_json::from_value(value)?),
            ComponentType::Transformer => {
                ComponentData::Transformer(serde_json::from_value(value)?)
            }
            ComponentType::Load => ComponentData::Load(serde_json::from_value(value)?),
            ComponentType::Infeeder => ComponentData::Infeeder(serde_json::from_value(value)?),
            ComponentType::Connector => ComponentData::Connector(serde_json::from_value(value)?),
        })
    }

    /// Encode the payload as an ordered field map.
    pub fn to_fields(&self) -> Result<Extra, serde_json::Error> {
        let value = match self {
            ComponentData::Node(d) => serde_json::to_value(d)?,
            ComponentData::Line(d) => serde_json::to_value(d)?,
            ComponentData::Transformer(d) => serde_json::to_value(d)?,
            ComponentData::Load(d) => serde_json::to_value(d)?,
            ComponentData::Infeeder(d) => serde_json::to_value(d)?,
            ComponentData::Connector(d) => serde_json::to_value(d)?,
        };
        match value {
            Value::Object(map) => Ok(map),
            _ => Ok(Extra::new()),
        }
    }
}

/// A typed network component.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub id: String,
    /// Declared service status; absent means in service
    pub in_service: Option<bool>,
    pub data: ComponentData,
    pub user_data: Option<Extra>,
}

impl Component {
    pub fn new(id: impl Into<String>, data: ComponentData) -> Self {
        Self {
            id: id.into(),
            in_service: None,
            data,
            user_data: None,
        }
    }

    pub fn node(id: impl Into<String>, data: NodeData) -> Self {
        Self::new(id, ComponentData::Node(data))
    }

    pub fn line(id: impl Into<String>, data: LineData) -> Self {
        Self::new(id, ComponentData::Line(data))
    }

    pub fn with_in_service(mut self, in_service: bool) -> Self {
        self.in_service = Some(in_service);
        self
    }

    pub fn ctype(&self) -> ComponentType {
        self.data.component_type()
    }

    pub fn is_node(&self) -> bool {
        matches!(self.data, ComponentData::Node(_))
    }

    pub fn is_element(&self) -> bool {
        !self.is_node()
    }

    pub fn is_in_service(&self) -> bool {
        self.in_service.unwrap_or(true)
    }

    /// In service and not an open switch.
    pub fn is_live(&self) -> bool {
        self.is_in_service() && self.switch_state() != Some(SwitchState::Open)
    }

    pub fn switch_state(&self) -> Option<SwitchState> {
        match &self.data {
            ComponentData::Connector(c) => c.switch_state,
            _ => None,
        }
    }

    /// Access user data, creating an empty map if absent.
    pub fn user_data_mut(&mut self) -> &mut Extra {
        self.user_data.get_or_insert_with(Extra::new)
    }

    pub fn as_node(&self) -> Option<&NodeData> {
        match &self.data {
            ComponentData::Node(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut NodeData> {
        match &mut self.data {
            ComponentData::Node(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_line(&self) -> Option<&LineData> {
        match &self.data {
            ComponentData::Line(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_line_mut(&mut self) -> Option<&mut LineData> {
        match &mut self.data {
            ComponentData::Line(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_transformer(&self) -> Option<&TransformerData> {
        match &self.data {
            ComponentData::Transformer(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_load_mut(&mut self) -> Option<&mut LoadData> {
        match &mut self.data {
            ComponentData::Load(d) => Some(d),
            _ => None,
        }
    }
}

/// Terminal-local attributes carried by a connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerminalAttrs {
    pub phs: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl TerminalAttrs {
    pub fn with_phases<S: Into<String>>(phs: impl IntoIterator<Item = S>) -> Self {
        Self {
            phs: phs.into_iter().map(Into::into).collect(),
            extra: Extra::new(),
        }
    }
}

/// Edge from terminal `index` of `element` to `node`.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub element: String,
    pub node: String,
    pub index: usize,
    pub attrs: TerminalAttrs,
}

impl Connection {
    /// The endpoint opposite to `id`.
    pub fn other_end(&self, id: &str) -> &str {
        if self.element == id {
            &self.node
        } else {
            &self.element
        }
    }
}

/// Neutral and ground labels do not count as active phases.
pub fn is_active_phase(label: &str) -> bool {
    !matches!(label.to_ascii_lowercase().as_str(), "n" | "g")
}

/// Order-insensitive phase set equality.
pub fn same_phase_set(a: &[String], b: &[String]) -> bool {
    is_phase_subset(a, b) && is_phase_subset(b, a)
}

pub fn is_phase_subset(subset: &[String], superset: &[String]) -> bool {
    subset.iter().all(|p| superset.contains(p))
}
