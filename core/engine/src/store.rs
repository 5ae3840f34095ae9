//! FILENAME: core/engine/src/store.rs
//! PURPOSE: The durable-store seam behind the pending and result stores.
//! CONTEXT: The in-memory stores are the source of truth while the process runs.
//! A backend, when attached, is written through inside the store's critical
//! section and read once at construction to recover state from a previous run.
//! Concrete backends (JSON file, in-memory) live in the persistence crate.

use crate::error::StoreError;

/// Minimal key-set interface a durable backend has to provide.
pub trait DurableStore<T>: Send + Sync {
    /// Everything currently persisted.
    fn load_all(&self) -> Result<Vec<T>, StoreError>;

    /// Persist one more item.
    fn insert(&self, item: &T) -> Result<(), StoreError>;

    /// Persist a batch. All or nothing: on error none of `items` may remain
    /// persisted. The default inserts one by one and backs out on failure;
    /// backends that can write a batch in one go should override it.
    fn insert_all(&self, items: &[T]) -> Result<(), StoreError> {
        for (written, item) in items.iter().enumerate() {
            if let Err(e) = self.insert(item) {
                for done in &items[..written] {
                    // Best effort; the original error is the one worth reporting
                    let _ = self.delete(done);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Remove one item equal to `item`. Absent items are not an error.
    fn delete(&self, item: &T) -> Result<(), StoreError>;

    /// Remove everything.
    fn delete_all(&self) -> Result<(), StoreError>;
}

/// Boxed backend as held by the stores.
pub type Backend<T> = Box<dyn DurableStore<T>>;
