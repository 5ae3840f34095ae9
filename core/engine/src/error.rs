//! FILENAME: core/engine/src/error.rs
//! PURPOSE: Error types shared by the formula library, the stores and the engine.
//! CONTEXT: `CalcError` is the per-request failure (it is also what a failed
//! result records). `EngineError` is what the public engine API returns.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::CalculationRequest;

/// A failure attached to a single calculation request.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CalcError {
    /// Missing/unknown shape or operation, or a negative/non-finite dimension.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The formula ran but could not produce a usable value.
    #[error("Computation failed: {0}")]
    ComputationFailed(String),
}

impl CalcError {
    pub fn invalid(message: impl Into<String>) -> Self {
        CalcError::InvalidArgument(message.into())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        CalcError::ComputationFailed(message.into())
    }
}

/// Failure reported by a durable-store backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(String),

    #[error("Store data is corrupt: {0}")]
    Corrupt(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Calc(#[from] CalcError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stop-on-error batch hit a failure. `completed` results were recorded
    /// before the batch settled; `undispatched` requests were drained from the
    /// pending store but never submitted, and are handed back to the caller.
    #[error("Batch stopped after {completed} completed request(s): {source}")]
    BatchStopped {
        completed: usize,
        undispatched: Vec<CalculationRequest>,
        #[source]
        source: CalcError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Worker pool error: {0}")]
    Pool(String),
}

impl EngineError {
    /// The per-request failure behind this error, if there is one.
    pub fn calc_error(&self) -> Option<&CalcError> {
        match self {
            EngineError::Calc(e) => Some(e),
            EngineError::BatchStopped { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self.calc_error(), Some(CalcError::InvalidArgument(_)))
    }
}
