//! Errors from electrical transforms and map fitting.

use ejson_core::EjsonError;
use thiserror::Error;

/// Errors from electrical transforms
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    #[error("Transformer '{id}': vector group '{vector_group}' must name exactly two windings (found {found})")]
    VectorGroup {
        id: String,
        vector_group: String,
        found: usize,
    },

    #[error("'{0}' has no active phases")]
    NoActivePhases(String),

    #[error("'{id}' must have {expected} terminals (found {found})")]
    TerminalCount {
        id: String,
        expected: usize,
        found: usize,
    },
}

impl From<TransformError> for EjsonError {
    fn from(err: TransformError) -> Self {
        EjsonError::Transform(err.to_string())
    }
}

/// Errors from fitting a geographic map
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MapError {
    #[error("Map fitting needs 2 or 3 reference points, got {0}")]
    PointCount(usize),

    #[error("Reference points do not determine a map")]
    Degenerate,
}

impl From<MapError> for EjsonError {
    fn from(err: MapError) -> Self {
        EjsonError::Configuration(err.to_string())
    }
}
