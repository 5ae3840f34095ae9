//! FILENAME: core/engine/src/results.rs
//! PURPOSE: The store of calculation results.
//! CONTEXT: A multiset: results are appended unconditionally, so running the same
//! request twice leaves two results. Removal takes out a single equal instance.

use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::log_debug;
use crate::request::CalculationResult;
use crate::store::Backend;

pub struct CalculatedResults {
    results: Mutex<Vec<CalculationResult>>,
    backend: Option<Backend<CalculationResult>>,
}

impl CalculatedResults {
    pub fn new() -> Self {
        CalculatedResults {
            results: Mutex::new(Vec::new()),
            backend: None,
        }
    }

    /// Creates a store mirrored to `backend`, seeded with its current contents.
    pub fn with_backend(backend: Backend<CalculationResult>) -> Result<Self, StoreError> {
        let results = backend.load_all()?;
        log_debug!("RESULTS", "recovered {} result(s)", results.len());

        Ok(CalculatedResults {
            results: Mutex::new(results),
            backend: Some(backend),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CalculationResult>> {
        self.results.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends `result`.
    pub fn put(&self, result: CalculationResult) -> Result<(), StoreError> {
        let mut results = self.lock();
        if let Some(backend) = &self.backend {
            backend.insert(&result)?;
        }
        results.push(result);
        Ok(())
    }

    /// Appends a batch of results under a single lock acquisition and a single
    /// backend write. All or nothing: on a backend failure the store is left
    /// unchanged and the error is returned.
    pub fn put_all(&self, batch: Vec<CalculationResult>) -> Result<usize, StoreError> {
        let mut results = self.lock();
        if let Some(backend) = &self.backend {
            backend.insert_all(&batch)?;
        }
        let stored = batch.len();
        results.extend(batch);
        Ok(stored)
    }

    /// Removes one result equal to `result`. Returns true if one was removed.
    pub fn remove(&self, result: &CalculationResult) -> Result<bool, StoreError> {
        let mut results = self.lock();
        let Some(pos) = results.iter().position(|r| r == result) else {
            return Ok(false);
        };
        if let Some(backend) = &self.backend {
            backend.delete(result)?;
        }
        results.swap_remove(pos);
        Ok(true)
    }

    /// Point-in-time copy of every stored result.
    pub fn get_all(&self) -> Vec<CalculationResult> {
        self.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Empties the store. Returns how many results were discarded.
    pub fn clear(&self) -> Result<usize, StoreError> {
        let mut results = self.lock();
        if let Some(backend) = &self.backend {
            backend.delete_all()?;
        }
        let discarded = results.len();
        results.clear();
        Ok(discarded)
    }
}

impl Default for CalculatedResults {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CalculatedResults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalculatedResults")
            .field("count", &self.count())
            .field("backed", &self.backend.is_some())
            .finish()
    }
}
