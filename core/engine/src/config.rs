//! FILENAME: core/engine/src/config.rs
//! PURPOSE: Runtime settings for the calculation engine.
//! CONTEXT: Loaded from a JSON file, from the environment, or built in code.
//! Missing fields fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::EngineError;

/// Environment variable that overrides `worker_threads`.
pub const ENV_WORKER_THREADS: &str = "SHAPECALC_WORKER_THREADS";

const DEFAULT_THREAD_PREFIX: &str = "shape-calc";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Size of the fixed worker pool used by the batch runs.
    pub worker_threads: usize,
    /// Worker threads are named `<prefix>-<index>`.
    pub thread_name_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            thread_name_prefix: DEFAULT_THREAD_PREFIX.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("cannot read {:?}: {}", path, e)))?;
        Self::from_json(&json)
    }

    /// Defaults, with `SHAPECALC_WORKER_THREADS` applied when set.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::default().apply_env_value(std::env::var(ENV_WORKER_THREADS).ok().as_deref())
    }

    fn apply_env_value(mut self, worker_threads: Option<&str>) -> Result<Self, EngineError> {
        if let Some(raw) = worker_threads {
            self.worker_threads = raw.trim().parse().map_err(|_| {
                EngineError::Config(format!("{} must be a positive integer, got '{}'", ENV_WORKER_THREADS, raw))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.worker_threads == 0 {
            return Err(EngineError::Config("worker_threads must be at least 1".to_string()));
        }
        if self.thread_name_prefix.trim().is_empty() {
            return Err(EngineError::Config("thread_name_prefix must not be empty".to_string()));
        }
        Ok(())
    }
}
