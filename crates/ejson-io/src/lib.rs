//! # ejson-io: e-JSON Document I/O & Audit
//!
//! Reading, writing and auditing of e-JSON network documents.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ejson_io::{audit, read_network, write_network, AuditConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let network = read_network("feeder.json")?;
//!     let report = audit(&network, &AuditConfig::default())?;
//!     println!("{}", report);
//!
//!     write_network(&network, "feeder_out.json")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`document`] - document codec (`components` array, canonical key order)
//! - [`pretty`] - indented JSON with short arrays on one line
//! - [`schema`] - bundled JSON-Schema and validator adapter
//! - [`audit`] - schema, unit, terminal-count, loop and phase checks
//!
//! ## Error Handling
//!
//! File-level functions return `anyhow::Result` with the offending path in the
//! context chain. In-memory conversions return [`ejson_core::EjsonResult`]; a
//! terminal naming a missing node surfaces as `EjsonError::Reference`.

pub mod audit;
pub mod document;
pub mod pretty;
pub mod schema;

pub use audit::{audit, AuditConfig};
pub use document::{
    network_from_str, network_from_value, network_to_string, network_to_value, read_network,
    write_network,
};
pub use pretty::to_string_compact_pretty;
pub use schema::{bundled_schema, SchemaViolation};
