//! FILENAME: core/engine/src/pending.rs
//! PURPOSE: The deduplicating store of requests waiting to be executed.
//! CONTEXT: Set semantics keyed by request value equality. Every operation takes
//! the same mutex for its whole duration, so check-and-insert is one step, a
//! snapshot never sees a half-applied mutation, and a drain removes exactly the
//! requests it returns.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::log_debug;
use crate::request::CalculationRequest;
use crate::store::Backend;

pub struct PendingRequests {
    requests: Mutex<HashSet<CalculationRequest>>,
    backend: Option<Backend<CalculationRequest>>,
}

impl PendingRequests {
    /// Creates an empty store with no durable backend.
    pub fn new() -> Self {
        PendingRequests {
            requests: Mutex::new(HashSet::new()),
            backend: None,
        }
    }

    /// Creates a store mirrored to `backend`, seeded with whatever the backend
    /// already holds. Duplicate rows in the backend collapse to one entry.
    pub fn with_backend(backend: Backend<CalculationRequest>) -> Result<Self, StoreError> {
        let loaded = backend.load_all()?;
        let loaded_count = loaded.len();
        let requests: HashSet<CalculationRequest> = loaded.into_iter().collect();

        if requests.len() != loaded_count {
            // Rewrite so the backend holds the deduplicated set too
            backend.delete_all()?;
            for request in &requests {
                backend.insert(request)?;
            }
        }
        log_debug!("PENDING", "recovered {} pending request(s)", requests.len());

        Ok(PendingRequests {
            requests: Mutex::new(requests),
            backend: Some(backend),
        })
    }

    /// The set never holds a partially-applied mutation, so a poisoned lock
    /// still guards a consistent value.
    fn lock(&self) -> MutexGuard<'_, HashSet<CalculationRequest>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inserts `request` unless an equal one is already pending.
    /// Returns true if it was inserted.
    pub fn put(&self, request: CalculationRequest) -> Result<bool, StoreError> {
        let mut requests = self.lock();
        if requests.contains(&request) {
            return Ok(false);
        }
        if let Some(backend) = &self.backend {
            backend.insert(&request)?;
        }
        requests.insert(request);
        Ok(true)
    }

    /// Removes `request` if present. Returns true if something was removed.
    pub fn remove(&self, request: &CalculationRequest) -> Result<bool, StoreError> {
        let mut requests = self.lock();
        if !requests.contains(request) {
            return Ok(false);
        }
        if let Some(backend) = &self.backend {
            backend.delete(request)?;
        }
        requests.remove(request);
        Ok(true)
    }

    /// Point-in-time copy of every pending request, in no particular order.
    pub fn get_all(&self) -> Vec<CalculationRequest> {
        self.lock().iter().copied().collect()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, request: &CalculationRequest) -> bool {
        self.lock().contains(request)
    }

    /// Empties the store. Returns how many requests were discarded.
    pub fn clear(&self) -> Result<usize, StoreError> {
        let mut requests = self.lock();
        if let Some(backend) = &self.backend {
            backend.delete_all()?;
        }
        let discarded = requests.len();
        requests.clear();
        Ok(discarded)
    }

    /// Removes and returns every pending request in one step. A request put
    /// after this returns stays pending for the next drain.
    pub fn drain(&self) -> Result<Vec<CalculationRequest>, StoreError> {
        let mut requests = self.lock();
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(backend) = &self.backend {
            backend.delete_all()?;
        }
        Ok(std::mem::take(&mut *requests).into_iter().collect())
    }
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PendingRequests {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequests")
            .field("count", &self.count())
            .field("backed", &self.backend.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Operation, ShapeKind};
    use crate::store::DurableStore;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn req(shape: ShapeKind, op: Operation, d: f64) -> CalculationRequest {
        CalculationRequest::new(shape, op, d).unwrap()
    }

    /// Backend that records into a shared Vec so tests can inspect it.
    #[derive(Clone, Default)]
    struct VecBackend {
        items: Arc<Mutex<Vec<CalculationRequest>>>,
        fail_inserts: bool,
    }

    impl DurableStore<CalculationRequest> for VecBackend {
        fn load_all(&self) -> Result<Vec<CalculationRequest>, StoreError> {
            Ok(self.items.lock().unwrap().clone())
        }

        fn insert(&self, item: &CalculationRequest) -> Result<(), StoreError> {
            if self.fail_inserts {
                return Err(StoreError::Backend("insert refused".to_string()));
            }
            self.items.lock().unwrap().push(*item);
            Ok(())
        }

        fn delete(&self, item: &CalculationRequest) -> Result<(), StoreError> {
            let mut items = self.items.lock().unwrap();
            if let Some(pos) = items.iter().position(|i| i == item) {
                items.remove(pos);
            }
            Ok(())
        }

        fn delete_all(&self) -> Result<(), StoreError> {
            self.items.lock().unwrap().clear();
            Ok(())
        }
    }

    #[test]
    fn test_put_deduplicates() {
        let store = PendingRequests::new();
        let a = req(ShapeKind::Circle, Operation::Area, 0.0);

        assert!(store.put(a).unwrap());
        assert!(!store.put(a).unwrap());
        assert!(!store.put(a).unwrap());
        assert_eq!(store.count(), 1);
        assert_eq!(store.get_all(), vec![a]);
    }

    #[test]
    fn test_remove_is_noop_when_absent() {
        let store = PendingRequests::new();
        let a = req(ShapeKind::Cube, Operation::Volume, 2.0);

        assert!(!store.remove(&a).unwrap());
        store.put(a).unwrap();
        assert!(store.remove(&a).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear_reports_discarded() {
        let store = PendingRequests::new();
        for d in 0..5 {
            store.put(req(ShapeKind::Square, Operation::Area, d as f64)).unwrap();
        }
        assert_eq!(store.clear().unwrap(), 5);
        assert_eq!(store.count(), 0);
        assert_eq!(store.clear().unwrap(), 0);
    }

    #[test]
    fn test_drain_takes_everything_once() {
        let store = PendingRequests::new();
        for d in 0..10 {
            store.put(req(ShapeKind::Sphere, Operation::Area, d as f64)).unwrap();
        }

        let drained = store.drain().unwrap();
        assert_eq!(drained.len(), 10);
        assert!(store.is_empty());
        assert!(store.drain().unwrap().is_empty());

        // A drained request can be queued again
        assert!(store.put(drained[0]).unwrap());
    }

    #[test]
    fn test_backend_mirrors_store() {
        let backend = VecBackend::default();
        let store = PendingRequests::with_backend(Box::new(backend.clone())).unwrap();
        let a = req(ShapeKind::Circle, Operation::Area, 1.0);
        let b = req(ShapeKind::Circle, Operation::Area, 2.0);

        store.put(a).unwrap();
        store.put(a).unwrap();
        store.put(b).unwrap();
        assert_eq!(backend.items.lock().unwrap().len(), 2);

        store.remove(&a).unwrap();
        assert_eq!(*backend.items.lock().unwrap(), vec![b]);

        store.drain().unwrap();
        assert!(backend.items.lock().unwrap().is_empty());
    }

    #[test]
    fn test_backend_recovery_deduplicates() {
        let a = req(ShapeKind::Tetrahedron, Operation::Area, 5.0);
        let b = req(ShapeKind::Tetrahedron, Operation::Volume, 6.0);
        let backend = VecBackend::default();
        backend.items.lock().unwrap().extend([a, a, b]);

        let store = PendingRequests::with_backend(Box::new(backend.clone())).unwrap();
        assert_eq!(store.count(), 2);
        assert_eq!(backend.items.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_failed_backend_insert_leaves_store_unchanged() {
        let backend = VecBackend {
            fail_inserts: true,
            ..Default::default()
        };
        let store = PendingRequests::with_backend(Box::new(backend)).unwrap();

        let result = store.put(req(ShapeKind::Cube, Operation::Area, 1.0));
        assert!(result.is_err());
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_concurrent_equal_puts_admit_one() {
        let store = Arc::new(PendingRequests::new());
        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let a = req(ShapeKind::Sphere, Operation::Volume, 3.0);

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.put(a).unwrap()
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|inserted| *inserted)
            .count();
        assert_eq!(admitted, 1);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_put_racing_clear_is_never_lost() {
        // Every put that returns true must either still be visible or have been
        // counted by a clear that ran after it.
        let store = Arc::new(PendingRequests::new());
        let per_thread = 500;

        let producer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut inserted = 0usize;
                for i in 0..per_thread {
                    if store.put(req(ShapeKind::Square, Operation::Area, i as f64)).unwrap() {
                        inserted += 1;
                    }
                }
                inserted
            })
        };
        let clearer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut cleared = 0usize;
                for _ in 0..50 {
                    cleared += store.clear().unwrap();
                    thread::yield_now();
                }
                cleared
            })
        };

        let inserted = producer.join().unwrap();
        let cleared = clearer.join().unwrap();
        assert_eq!(inserted, per_thread);
        assert_eq!(cleared + store.count(), inserted);
    }
}
