//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for shape engine integration tests.

#![allow(dead_code)]

use engine::{
    CalculationRequest, CalculationResult, DurableStore, EngineConfig, Operation, ShapeCalculator, ShapeKind,
    StoreError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Test harness wrapping a calculator with a small, fixed worker pool.
pub struct TestHarness {
    pub calc: ShapeCalculator,
}

impl TestHarness {
    /// Create a new harness with an empty engine.
    pub fn new() -> Self {
        Self::with_workers(4)
    }

    pub fn with_workers(workers: usize) -> Self {
        let config = EngineConfig::default().with_worker_threads(workers);
        TestHarness {
            calc: ShapeCalculator::new(config).expect("engine should start"),
        }
    }

    /// Engine whose result backend fails the `fail_on`-th insert (1-based).
    pub fn with_flaky_results(workers: usize, fail_on: usize) -> (Self, FlakyBackend<CalculationResult>) {
        let config = EngineConfig::default().with_worker_threads(workers);
        let results = FlakyBackend::failing_on(fail_on);
        let calc = ShapeCalculator::with_backends(
            config,
            Box::new(FlakyBackend::<CalculationRequest>::reliable()),
            Box::new(results.clone()),
        )
        .expect("engine should start");
        (TestHarness { calc }, results)
    }

    /// Queue one request per (shape, operation, dimension) triple.
    pub fn queue_all(&self, requests: &[(ShapeKind, Operation, f64)]) {
        for &(shape, op, d) in requests {
            self.calc.queue(shape, op, d).expect("request should be valid");
        }
    }

    /// Results keyed by request. Panics if a request has more than one result.
    pub fn results_by_request(&self) -> HashMap<CalculationRequest, CalculationResult> {
        let mut map = HashMap::new();
        for result in self.calc.get_all_calculated_results() {
            let previous = map.insert(result.request, result);
            assert!(previous.is_none(), "duplicate result for {:?}", previous);
        }
        map
    }

    /// The numeric result for a request; panics if absent or failed.
    pub fn value_of(&self, shape: ShapeKind, op: Operation, d: f64) -> f64 {
        let request = CalculationRequest::new(shape, op, d).unwrap();
        let results = self.results_by_request();
        let result = results
            .get(&request)
            .unwrap_or_else(|| panic!("no result for {}", request));
        result
            .value
            .as_number()
            .unwrap_or_else(|| panic!("{} failed", request))
    }
}

/// Assert `actual` is within `tolerance` of `expected`.
pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {} (+/- {}), got {}",
        expected,
        tolerance,
        actual
    );
}

/// In-memory backend whose N-th insert fails once. Clones share state.
pub struct FlakyBackend<T> {
    rows: Arc<Mutex<Vec<T>>>,
    inserts: Arc<AtomicUsize>,
    fail_on: Option<usize>,
}

impl<T> Clone for FlakyBackend<T> {
    fn clone(&self) -> Self {
        FlakyBackend {
            rows: Arc::clone(&self.rows),
            inserts: Arc::clone(&self.inserts),
            fail_on: self.fail_on,
        }
    }
}

impl<T: Clone> FlakyBackend<T> {
    pub fn reliable() -> Self {
        FlakyBackend {
            rows: Arc::new(Mutex::new(Vec::new())),
            inserts: Arc::new(AtomicUsize::new(0)),
            fail_on: None,
        }
    }

    pub fn failing_on(insert: usize) -> Self {
        FlakyBackend {
            fail_on: Some(insert),
            ..Self::reliable()
        }
    }

    /// Rows currently persisted.
    pub fn rows(&self) -> Vec<T> {
        self.rows.lock().unwrap().clone()
    }
}

impl<T> DurableStore<T> for FlakyBackend<T>
where
    T: Clone + PartialEq + Send,
{
    fn load_all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.rows.lock().unwrap().clone())
    }

    fn insert(&self, item: &T) -> Result<(), StoreError> {
        let n = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        if Some(n) == self.fail_on {
            return Err(StoreError::Io("disk full".to_string()));
        }
        self.rows.lock().unwrap().push(item.clone());
        Ok(())
    }

    fn delete(&self, item: &T) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(pos) = rows.iter().position(|r| r == item) {
            rows.remove(pos);
        }
        Ok(())
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        self.rows.lock().unwrap().clear();
        Ok(())
    }
}
