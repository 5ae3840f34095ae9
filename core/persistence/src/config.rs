//! FILENAME: core/persistence/src/config.rs
//! PURPOSE: Where the JSON-backed stores keep their files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::PersistenceError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Directory holding both files; created on first write.
    pub data_dir: PathBuf,
    pub pending_file: String,
    pub results_file: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        PersistenceConfig {
            data_dir: PathBuf::from("shape-data"),
            pending_file: "pending_requests.json".to_string(),
            results_file: "calculation_results.json".to_string(),
        }
    }
}

impl PersistenceConfig {
    /// Default file names under `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        PersistenceConfig {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        let config: PersistenceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, PersistenceError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), PersistenceError> {
        if self.pending_file.trim().is_empty() || self.results_file.trim().is_empty() {
            return Err(PersistenceError::InvalidFormat(
                "pending_file and results_file must be set".to_string(),
            ));
        }
        if self.pending_file == self.results_file {
            return Err(PersistenceError::InvalidFormat(
                "pending_file and results_file must differ".to_string(),
            ));
        }
        Ok(())
    }

    pub fn pending_path(&self) -> PathBuf {
        self.data_dir.join(&self.pending_file)
    }

    pub fn results_path(&self) -> PathBuf {
        self.data_dir.join(&self.results_file)
    }
}
