//! e-JSON document codec.
//!
//! A document is an object of global properties plus a `components` array.
//! Each component entry carries `id`, `type`, `cons` (elements only), its
//! type-specific fields, `in_service` and `user_data`. Decoding is two-pass:
//! every component is added before any terminal is connected, so terminals
//! may reference nodes that appear later in the array.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ejson_core::{
    Component, ComponentData, ComponentType, EjsonError, EjsonResult, Extra, GraphError,
    Network, NetworkProperties, TerminalAttrs,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::pretty::to_string_compact_pretty;

const COMPONENTS_KEY: &str = "components";

/// Read an e-JSON network from a file.
pub fn read_network(path: impl AsRef<Path>) -> Result<Network> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading e-JSON file '{}'", path.display()))?;
    let network = network_from_str(&text)
        .with_context(|| format!("decoding e-JSON network from '{}'", path.display()))?;
    debug!(path = %path.display(), components = network.len(), "read network");
    Ok(network)
}

/// Write a network to a file using the compact pretty layout.
pub fn write_network(network: &Network, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = network_to_string(network)?;
    fs::write(path, text).with_context(|| format!("writing e-JSON file '{}'", path.display()))?;
    Ok(())
}

pub fn network_from_str(text: &str) -> EjsonResult<Network> {
    let value: Value = serde_json::from_str(text)?;
    network_from_value(value)
}

pub fn network_to_string(network: &Network) -> EjsonResult<String> {
    Ok(to_string_compact_pretty(&network_to_value(network)?))
}

/// Build a network from a parsed document.
pub fn network_from_value(value: Value) -> EjsonResult<Network> {
    let Value::Object(doc) = value else {
        return Err(EjsonError::Parse("e-JSON document must be an object".into()));
    };

    let mut entries = None;
    let mut props = Map::new();
    for (key, value) in doc {
        if key == COMPONENTS_KEY {
            entries = Some(value);
        } else {
            props.insert(key, value);
        }
    }

    let properties: NetworkProperties = serde_json::from_value(Value::Object(props))?;
    let mut network = Network::with_properties(properties);

    let entries = match entries {
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(EjsonError::Parse("'components' must be an array".into())),
        None => Vec::new(),
    };

    let mut pending = Vec::new();
    for (position, entry) in entries.into_iter().enumerate() {
        let (component, cons) = decode_component(entry, position)?;
        if component.is_node() && !cons.is_empty() {
            return Err(GraphError::NotAnElement(component.id).into());
        }
        if !cons.is_empty() {
            pending.push((component.id.clone(), cons));
        }
        network.add_component(component)?;
    }

    for (element, cons) in pending {
        for (index, (node, attrs)) in cons.into_iter().enumerate() {
            network.connect(&element, &node, index, attrs)?;
        }
    }

    Ok(network)
}

/// Serialize a network, keys in canonical order.
pub fn network_to_value(network: &Network) -> EjsonResult<Value> {
    let mut doc = match serde_json::to_value(&network.properties)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let components = network
        .components()
        .map(|c| encode_component(network, c))
        .collect::<EjsonResult<Vec<_>>>()?;
    doc.insert(COMPONENTS_KEY.to_string(), Value::Array(components));
    Ok(Value::Object(doc))
}

type PendingCons = Vec<(String, TerminalAttrs)>;

fn decode_component(entry: Value, position: usize) -> EjsonResult<(Component, PendingCons)> {
    let Value::Object(fields) = entry else {
        return Err(EjsonError::Parse(format!(
            "component #{position} is not an object"
        )));
    };

    let mut id = None;
    let mut ctype = None;
    let mut in_service = None;
    let mut user_data = None;
    let mut cons = Vec::new();
    let mut payload = Extra::new();

    for (key, value) in fields {
        match key.as_str() {
            "id" => match value {
                Value::String(s) => id = Some(s),
                _ => return Err(parse_err(position, "'id' must be a string")),
            },
            "type" => match value {
                Value::String(s) => {
                    ctype = Some(
                        s.parse::<ComponentType>()
                            .map_err(|e| parse_err(position, &e))?,
                    )
                }
                _ => return Err(parse_err(position, "'type' must be a string")),
            },
            "in_service" => match value {
                Value::Bool(b) => in_service = Some(b),
                _ => return Err(parse_err(position, "'in_service' must be a boolean")),
            },
            "user_data" => match value {
                Value::Object(map) => user_data = Some(map),
                _ => return Err(parse_err(position, "'user_data' must be an object")),
            },
            "cons" => cons = decode_cons(value, position)?,
            _ => {
                payload.insert(key, value);
            }
        }
    }

    let id = id.ok_or_else(|| parse_err(position, "missing 'id'"))?;
    let ctype = ctype.ok_or_else(|| parse_err(position, "missing 'type'"))?;
    let data = ComponentData::from_fields(ctype, payload)
        .map_err(|e| EjsonError::Parse(format!("{ctype} '{id}': {e}")))?;

    let component = Component {
        id,
        in_service,
        data,
        user_data,
    };
    Ok((component, cons))
}

fn decode_cons(value: Value, position: usize) -> EjsonResult<PendingCons> {
    let Value::Array(items) = value else {
        return Err(parse_err(position, "'cons' must be an array"));
    };
    items
        .into_iter()
        .map(|item| {
            let Value::Object(fields) = item else {
                return Err(parse_err(position, "terminal must be an object"));
            };
            let mut node = None;
            let mut rest = Map::new();
            for (key, value) in fields {
                if key == "node" {
                    if let Value::String(id) = value {
                        node = Some(id);
                    }
                } else {
                    rest.insert(key, value);
                }
            }
            let node = node.ok_or_else(|| parse_err(position, "terminal without a 'node' id"))?;
            let attrs: TerminalAttrs = serde_json::from_value(Value::Object(rest))?;
            Ok((node, attrs))
        })
        .collect()
}

fn encode_component(network: &Network, component: &Component) -> EjsonResult<Value> {
    let mut out = Map::new();
    out.insert("id".into(), Value::String(component.id.clone()));
    out.insert(
        "type".into(),
        Value::String(component.ctype().as_str().to_string()),
    );

    if component.is_element() {
        let mut cons = Vec::new();
        for con in network.connections_from(&component.id) {
            let mut terminal = Map::new();
            terminal.insert("node".into(), Value::String(con.node.clone()));
            if let Value::Object(attrs) = serde_json::to_value(&con.attrs)? {
                terminal.extend(attrs);
            }
            cons.push(Value::Object(terminal));
        }
        out.insert("cons".into(), Value::Array(cons));
    }

    out.extend(component.data.to_fields()?);

    if let Some(in_service) = component.in_service {
        out.insert("in_service".into(), Value::Bool(in_service));
    }
    if let Some(user_data) = &component.user_data {
        out.insert("user_data".into(), Value::Object(user_data.clone()));
    }
    Ok(Value::Object(out))
}

fn parse_err(position: usize, message: &str) -> EjsonError {
    EjsonError::Parse(format!("component #{position}: {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn small_doc() -> Value {
        json!({
            "voltage_type": "ll",
            "components": [
                {"id": "ln1", "type": "Line",
                 "cons": [{"node": "nd1", "phs": ["A", "B"]}, {"node": "nd2", "phs": ["A", "B"], "side": "to"}],
                 "length": 1.5, "z": [0.1, 0.2], "z0": [0.3, 0.4], "colour": "blue",
                 "user_data": {"tag": 7}},
                {"id": "nd1", "type": "Node", "phs": ["A", "B"], "v_base": 11.0},
                {"id": "nd2", "type": "Node", "phs": ["A", "B"], "v_base": 11.0,
                 "lat_long": [-35.3, 149.1], "in_service": false}
            ]
        })
    }

    #[test]
    fn round_trip_preserves_document() {
        let doc = small_doc();
        let network = network_from_value(doc.clone()).unwrap();
        assert_eq!(network.len(), 3);
        assert_eq!(network.degree("nd1"), 1);
        assert_eq!(network_to_value(&network).unwrap(), doc);
    }

    #[test]
    fn canonical_key_order() {
        let network = network_from_value(small_doc()).unwrap();
        let value = network_to_value(&network).unwrap();
        let line = value["components"][0].as_object().unwrap();
        let keys: Vec<&str> = line.keys().map(String::as_str).collect();
        assert_eq!(&keys[..3], &["id", "type", "cons"]);
        assert_eq!(keys.last(), Some(&"user_data"));

        let node = value["components"][1].as_object().unwrap();
        let keys: Vec<&str> = node.keys().map(String::as_str).collect();
        assert_eq!(&keys[..3], &["id", "type", "phs"]);
    }

    #[test]
    fn missing_node_is_reference_error() {
        let doc = json!({"components": [
            {"id": "ld1", "type": "Load", "cons": [{"node": "nd9", "phs": ["A"]}], "s_nom": [[1.0, 0.0]]}
        ]});
        let err = network_from_value(doc).unwrap_err();
        assert!(matches!(err, EjsonError::Reference(_)));
    }

    #[test]
    fn malformed_entries_are_parse_errors() {
        let bad_type = json!({"components": [{"id": "x", "type": "Bus"}]});
        assert!(matches!(
            network_from_value(bad_type),
            Err(EjsonError::Parse(_))
        ));

        let no_id = json!({"components": [{"type": "Node", "phs": ["A"], "v_base": 1.0}]});
        assert!(matches!(network_from_value(no_id), Err(EjsonError::Parse(_))));

        assert!(network_from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn node_with_terminals_is_rejected() {
        let doc = json!({"components": [
            {"id": "nd1", "type": "Node", "phs": ["A"], "v_base": 1.0,
             "cons": [{"node": "nd1", "phs": ["A"]}]}
        ]});
        assert!(matches!(
            network_from_value(doc),
            Err(EjsonError::Validation(_))
        ));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.json");
        let network = network_from_value(small_doc()).unwrap();
        write_network(&network, &path).unwrap();
        let reread = read_network(&path).unwrap();
        assert_eq!(
            network_to_value(&reread).unwrap(),
            network_to_value(&network).unwrap()
        );
    }

    #[test]
    fn read_missing_file_reports_path() {
        let err = read_network("/definitely/not/here.json").unwrap_err();
        assert!(format!("{err:#}").contains("not/here.json"));
    }
}
