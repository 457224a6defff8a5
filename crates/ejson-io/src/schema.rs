//! JSON-Schema validation of raw e-JSON documents.

use ejson_core::{EjsonError, EjsonResult};
use serde_json::Value;

const BUNDLED_SCHEMA: &str = include_str!("../schema/e-json-schema.json");

/// The e-JSON schema shipped with this crate (draft 2020-12).
pub fn bundled_schema() -> EjsonResult<Value> {
    Ok(serde_json::from_str(BUNDLED_SCHEMA)?)
}

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON pointer into the instance
    pub path: String,
    /// JSON pointer into the schema
    pub schema_path: String,
    /// Single-line message
    pub message: String,
}

/// Validate `instance` against `schema`, returning every violation sorted by
/// schema path, then instance path.
pub fn validate(schema: &Value, instance: &Value) -> EjsonResult<Vec<SchemaViolation>> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| EjsonError::Validation(format!("invalid schema: {e}")))?;

    let mut violations: Vec<SchemaViolation> = validator
        .iter_errors(instance)
        .map(|e| SchemaViolation {
            path: e.instance_path.to_string(),
            schema_path: e.schema_path.to_string(),
            message: flatten_message(&e.to_string()),
        })
        .collect();
    violations.sort_by(|a, b| {
        a.schema_path
            .cmp(&b.schema_path)
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(violations)
}

fn flatten_message(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}
