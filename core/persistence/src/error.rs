//! FILENAME: core/persistence/src/error.rs

use engine::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),
}

impl From<PersistenceError> for StoreError {
    fn from(e: PersistenceError) -> Self {
        match e {
            PersistenceError::Io(io) => StoreError::Io(io.to_string()),
            PersistenceError::Json(json) => StoreError::Corrupt(json.to_string()),
            PersistenceError::InvalidFormat(msg) => StoreError::Corrupt(msg),
        }
    }
}
