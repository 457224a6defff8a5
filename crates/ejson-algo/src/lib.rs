//! # ejson-algo: Topology Reduction & Electrical Transforms
//!
//! Algorithms that rewrite an [`ejson_core::Network`] in place.
//!
//! ## Topology Reduction
//!
//! [`reduce_network`] shrinks a feeder to an electrically equivalent core by
//! repeating four passes until nothing changes:
//!
//! | Pass | Effect |
//! |------|--------|
//! | [`merge_strings`] | series runs of lines or connectors become one element |
//! | [`remove_hanging_nodes`] | dead-end spurs are dropped |
//! | [`merge_short_circuits`] | zero-impedance lines fold their nodes together |
//! | [`merge_dups`] | parallel duplicate lines combine by admittance |
//!
//! Merged lines record the ids they replace in `user_data.orig_ids`.
//!
//! ## Radial Conversion
//!
//! [`make_radial`] removes the lines that close loops on a DFS from a root.
//!
//! ## Electrical Transforms
//!
//! - [`make_single_phased`]: balanced single-phase equivalent
//! - [`add_map`], [`add_standard_map`]: `xy` / `lat_long` conversion
//! - [`add_missing_locations`]: position interpolation for unplaced nodes
//! - [`scale_loads`], [`set_balanced_loads`]: bulk load edits
//! - [`remove_out_of_service`]: drop declared-out components
//!
//! ## Example
//!
//! ```rust,no_run
//! use ejson_algo::{make_radial, reduce_network};
//! use ejson_io::{read_network, write_network};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut network = read_network("feeder.json")?;
//!     make_radial(&mut network, "in1")?;
//!     reduce_network(&mut network)?;
//!     write_network(&network, "feeder_reduced.json")?;
//!     Ok(())
//! }
//! ```
//!
//! Operations are not transactional: on error, a reducer may leave the
//! network partly rewritten. Work on a clone when that matters.
//! [`make_single_phased`] is the exception and validates before mutating.

pub mod error;
pub mod geo;
pub mod linalg;
pub mod loads;
pub mod phasing;
pub mod prune;
pub mod radial;
pub mod reduce;

pub use error::{MapError, TransformError};
pub use geo::{
    add_map, add_missing_locations, add_standard_map, AffineMap, CoordKey, MapPoint, MapTargets,
};
pub use loads::{scale_loads, set_balanced_loads};
pub use phasing::make_single_phased;
pub use prune::remove_out_of_service;
pub use radial::make_radial;
pub use reduce::{
    collapse_element, is_short_circuit, merge_dups, merge_short_circuits, merge_strings,
    record_orig_ids, reduce_network, remove_hanging_nodes,
};
