//! Structural audit of e-JSON networks.
//!
//! Every check runs independently and records into its own report category;
//! findings are advisory and never returned as errors. Only a failure to
//! serialize the network or compile the schema aborts the audit.

use ejson_core::{
    is_phase_subset, AuditReport, ComponentFilter, ComponentType, EjsonResult, Network, Problem,
    Units,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::document::network_to_value;
use crate::schema::{bundled_schema, validate};

pub const SCHEMA_ERRORS: &str = "schema_errors";
pub const UNIT_CONSISTENCY: &str = "unit_consistency";
pub const CONNECTIONS: &str = "connections";
pub const CIRCULAR_CONNECTIONS: &str = "circular_connections";
pub const PHASE_CONSISTENCY: &str = "phase_consistency";

const UNIT_TOLERANCE: f64 = 1e-9;

/// Configuration for audit behavior
#[derive(Debug, Clone, Default)]
pub struct AuditConfig {
    /// Skip JSON-Schema validation
    pub skip_schema: bool,
    /// Skip the unit consistency check (for documents without units)
    pub skip_units: bool,
    /// Validate against this schema instead of the bundled one
    pub schema: Option<Value>,
}

/// Audit a network. All categories are present in the report, even when a
/// check is skipped or finds nothing.
pub fn audit(network: &Network, config: &AuditConfig) -> EjsonResult<AuditReport> {
    let mut report = AuditReport::new();
    report.register(SCHEMA_ERRORS, "List of JSON schema errors");
    report.register(UNIT_CONSISTENCY, "Check consistency of units");
    report.register(CONNECTIONS, "Check for wrongly connected components");
    report.register(CIRCULAR_CONNECTIONS, "Check for circular connections");
    report.register(
        PHASE_CONSISTENCY,
        "Check that phases of connection exist in the node",
    );

    // Phase 1: schema
    if !config.skip_schema {
        audit_schema(network, config, &mut report)?;
    }

    // Phase 2: units
    if !config.skip_units {
        audit_units(network, &mut report);
    }

    // Phase 3: terminal counts
    audit_connections(network, &mut report);

    // Phase 4: elements looping back onto one node
    audit_circular_connections(network, &mut report);

    // Phase 5: terminal phases within node phases
    audit_phase_consistency(network, &mut report);

    debug!(summary = %report.summary(), "audit complete");
    Ok(report)
}

fn audit_schema(network: &Network, config: &AuditConfig, report: &mut AuditReport) -> EjsonResult<()> {
    let instance = network_to_value(network)?;
    let schema = match &config.schema {
        Some(schema) => schema.clone(),
        None => bundled_schema()?,
    };
    for violation in validate(&schema, &instance)? {
        report.add(
            SCHEMA_ERRORS,
            Problem::error()
                .with_detail("path", violation.path)
                .with_detail("schema_path", violation.schema_path)
                .with_detail("description", violation.message),
        );
    }
    Ok(())
}

fn audit_units(network: &Network, report: &mut AuditReport) {
    let units = network.properties.units.clone().unwrap_or_default();
    let missing: Vec<&str> = Units::NAMES
        .iter()
        .copied()
        .filter(|name| units.get(name).is_none())
        .collect();
    if !missing.is_empty() {
        report.add(
            UNIT_CONSISTENCY,
            Problem::error().with_detail(
                "description",
                format!("Missing unit or units: {}", missing.join(", ")),
            ),
        );
        return;
    }

    let (Some(i), Some(v), Some(z), Some(l), Some(p)) = (
        units.current,
        units.voltage,
        units.impedance,
        units.length,
        units.power,
    ) else {
        return;
    };

    if !approx_eq(v, i * z * l) {
        report.add(
            UNIT_CONSISTENCY,
            Problem::error().with_detail("description", "Units do not satisfy Ohm's law"),
        );
    }
    if !approx_eq(p, i * v) {
        report.add(
            UNIT_CONSISTENCY,
            Problem::error().with_detail("description", "Units do not satisfy P := IV definition"),
        );
    }
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= UNIT_TOLERANCE * a.abs().max(b.abs())
}

fn audit_connections(network: &Network, report: &mut AuditReport) {
    for component in network.components_of(ComponentFilter::elements()) {
        let expected = match component.ctype() {
            ComponentType::Line | ComponentType::Transformer => 2,
            ComponentType::Load | ComponentType::Infeeder => 1,
            _ => continue,
        };
        let n_cons = network.degree(&component.id);
        if n_cons != expected {
            report.add(
                CONNECTIONS,
                Problem::error()
                    .with_detail("elem_id", component.id.as_str())
                    .with_detail("n_cons", n_cons),
            );
        }
    }
}

fn audit_circular_connections(network: &Network, report: &mut AuditReport) {
    for component in network.components_of(ComponentFilter::elements()) {
        let cons = network.connections_from(&component.id);
        if cons.len() == 2 && cons[0].node == cons[1].node {
            report.add(
                CIRCULAR_CONNECTIONS,
                Problem::error()
                    .with_detail("elem_id", component.id.as_str())
                    .with_detail("node_id", cons[0].node.as_str()),
            );
        }
    }
}

fn audit_phase_consistency(network: &Network, report: &mut AuditReport) {
    for con in network.connections() {
        let Some(node) = network.component(&con.node).and_then(|c| c.as_node()) else {
            continue;
        };
        if !is_phase_subset(&con.attrs.phs, &node.phs) {
            report.add(
                PHASE_CONSISTENCY,
                Problem::error()
                    .with_detail("elem_id", con.element.as_str())
                    .with_detail("node_id", con.node.as_str())
                    .with_detail("con_idx", con.index)
                    .with_detail("con_phs", json!(con.attrs.phs))
                    .with_detail("node_phs", json!(node.phs)),
            );
        }
    }
}
