//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Main library entry point for the shape calculation engine.
//! CONTEXT: Re-exports public types and modules for use by other crates.
//!
//! Requests are queued into a deduplicating pending store, executed in batches
//! on a fixed worker pool, and their outcomes appended to a result store. Both
//! stores are safe to share between threads without any locking by callers.

pub mod calculator;
pub mod config;
pub mod error;
pub mod logging;
pub mod pending;
pub mod pool;
pub mod request;
pub mod results;
pub mod shape;
pub mod store;

// Re-export commonly used types at the crate root
pub use calculator::ShapeCalculator;
pub use config::EngineConfig;
pub use error::{CalcError, EngineError, StoreError};
pub use pending::PendingRequests;
pub use pool::{TaskHandle, TaskPanicked, WorkerPool};
pub use request::{CalculationRequest, CalculationResult, ResultValue};
pub use results::CalculatedResults;
pub use shape::{compute, Operation, ShapeKind};
pub use store::{Backend, DurableStore};
