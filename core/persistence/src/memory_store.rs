//! FILENAME: core/persistence/src/memory_store.rs
//! PURPOSE: Volatile backend that keeps rows in a shared Vec.
//! CONTEXT: Clones share the same rows, which lets a caller keep a handle to
//! inspect what an engine wrote through, or hand the same rows to a second
//! engine to simulate a restart.

use engine::{DurableStore, StoreError};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
pub struct MemoryStore<T> {
    rows: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        MemoryStore {
            rows: Arc::clone(&self.rows),
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        MemoryStore {
            rows: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone> MemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts out holding `rows`.
    pub fn with_rows(rows: Vec<T>) -> Self {
        MemoryStore {
            rows: Arc::new(Mutex::new(rows)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the current rows.
    pub fn rows(&self) -> Vec<T> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<T> DurableStore<T> for MemoryStore<T>
where
    T: Clone + PartialEq + Send,
{
    fn load_all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.rows())
    }

    fn insert(&self, item: &T) -> Result<(), StoreError> {
        self.lock().push(item.clone());
        Ok(())
    }

    fn insert_all(&self, items: &[T]) -> Result<(), StoreError> {
        self.lock().extend_from_slice(items);
        Ok(())
    }

    fn delete(&self, item: &T) -> Result<(), StoreError> {
        let mut rows = self.lock();
        if let Some(pos) = rows.iter().position(|r| r == item) {
            rows.remove(pos);
        }
        Ok(())
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        self.lock().clear();
        Ok(())
    }
}
