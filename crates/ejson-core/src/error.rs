//! Unified error types for the e-JSON toolkit
//!
//! This module provides a common error type [`EjsonError`] that can represent
//! errors from any part of the system. Domain-specific error types (graph
//! reference errors, transform errors, map fitting errors) convert into
//! `EjsonError` for uniform handling at API boundaries.
//!
//! # Example
//!
//! ```ignore
//! use ejson_core::{EjsonError, EjsonResult};
//!
//! fn process_network(path: &str) -> EjsonResult<()> {
//!     let mut network = read_network(path)?;
//!     make_single_phased(&mut network)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all e-JSON operations.
#[derive(Error, Debug)]
pub enum EjsonError {
    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// A terminal names a node that does not exist
    #[error("Reference error: {0}")]
    Reference(String),

    /// Invalid caller-supplied configuration (e.g. map reference points)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An electrical transform could not be applied
    #[error("Transform error: {0}")]
    Transform(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using EjsonError.
pub type EjsonResult<T> = Result<T, EjsonError>;

/// Errors raised by graph mutation primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A connection names a node id that is not a Node in the network.
    #[error("terminal {index} of '{element}' references non-existent node '{node}'")]
    UnknownNode {
        element: String,
        node: String,
        index: usize,
    },

    #[error("unknown component '{0}'")]
    UnknownComponent(String),

    #[error("duplicate component id '{0}'")]
    DuplicateId(String),

    /// Only elements carry terminals.
    #[error("'{0}' is a Node and cannot own terminals")]
    NotAnElement(String),
}

impl From<GraphError> for EjsonError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::UnknownNode { .. } => EjsonError::Reference(err.to_string()),
            other => EjsonError::Validation(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for EjsonError {
    fn from(err: anyhow::Error) -> Self {
        EjsonError::Other(err.to_string())
    }
}

impl From<String> for EjsonError {
    fn from(s: String) -> Self {
        EjsonError::Other(s)
    }
}

impl From<&str> for EjsonError {
    fn from(s: &str) -> Self {
        EjsonError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for EjsonError {
    fn from(err: serde_json::Error) -> Self {
        EjsonError::Parse(err.to_string())
    }
}
