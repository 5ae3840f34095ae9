//! FILENAME: core/persistence/src/lib.rs
//! Shape Engine Persistence Module
//!
//! Durable backends for the engine's pending-request and result stores, and
//! the helper that opens an engine on top of them.

mod config;
mod error;
mod json_store;
mod memory_store;

pub use config::PersistenceConfig;
pub use error::PersistenceError;
pub use json_store::JsonFileStore;
pub use memory_store::MemoryStore;

use engine::{log_info, CalculationRequest, CalculationResult, EngineConfig, EngineError, ShapeCalculator};

/// Opens the two JSON files named by `config`.
pub fn open_json_stores(
    config: &PersistenceConfig,
) -> Result<(JsonFileStore<CalculationRequest>, JsonFileStore<CalculationResult>), PersistenceError> {
    config.validate()?;
    let pending = JsonFileStore::open(config.pending_path())?;
    let results = JsonFileStore::open(config.results_path())?;
    Ok((pending, results))
}

/// Starts an engine whose stores are persisted as JSON under `config.data_dir`,
/// recovering whatever a previous run left behind.
pub fn open_calculator(
    engine_config: EngineConfig,
    config: &PersistenceConfig,
) -> Result<ShapeCalculator, EngineError> {
    let (pending, results) =
        open_json_stores(config).map_err(|e| EngineError::Store(e.into()))?;
    log_info!("PERSIST", "using data directory {:?}", config.data_dir);
    ShapeCalculator::with_backends(engine_config, Box::new(pending), Box::new(results))
}
