//! FILENAME: core/engine/src/calculator.rs
//! PURPOSE: The calculation engine: validates and queues requests, and runs
//! batches of pending requests through the worker pool into the result store.
//! CONTEXT: A batch starts by draining the pending store in one step, so a
//! request queued while a batch is running is never part of that batch and
//! stays pending for the next one. Two failure policies are offered:
//!
//! - stop-on-error: at most `worker_threads` computations are in flight; once a
//!   failure is observed nothing more is submitted, in-flight work settles and
//!   its successes are recorded, then the failure is returned together with the
//!   completed count and the requests that were never dispatched.
//! - no-stop: everything is dispatched and every request ends up with a result,
//!   failed ones carrying a `ResultValue::Error`.

use std::collections::VecDeque;

use crate::config::EngineConfig;
use crate::error::{CalcError, EngineError, StoreError};
use crate::pending::PendingRequests;
use crate::pool::{TaskHandle, WorkerPool};
use crate::request::{CalculationRequest, CalculationResult, ResultValue};
use crate::results::CalculatedResults;
use crate::shape::{Operation, ShapeKind};
use crate::store::Backend;
use crate::{log_debug, log_enter, log_error, log_exit, log_info, log_warn};

type Outcome = TaskHandle<Result<f64, CalcError>>;

#[derive(Debug)]
pub struct ShapeCalculator {
    pending: PendingRequests,
    results: CalculatedResults,
    pool: WorkerPool,
    config: EngineConfig,
}

impl ShapeCalculator {
    /// Creates an engine with purely in-memory stores.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::from_parts(config, PendingRequests::new(), CalculatedResults::new())
    }

    /// Creates an engine whose stores are mirrored to durable backends. Whatever
    /// the backends already hold is loaded first.
    pub fn with_backends(
        config: EngineConfig,
        pending: Backend<CalculationRequest>,
        results: Backend<CalculationResult>,
    ) -> Result<Self, EngineError> {
        let pending = PendingRequests::with_backend(pending)?;
        let results = CalculatedResults::with_backend(results)?;
        Self::from_parts(config, pending, results)
    }

    fn from_parts(
        config: EngineConfig,
        pending: PendingRequests,
        results: CalculatedResults,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let pool = WorkerPool::new(config.worker_threads, &config.thread_name_prefix)?;
        log_info!(
            "CALC",
            "engine started: {} worker(s), {} pending, {} result(s)",
            pool.size(),
            pending.count(),
            results.count()
        );

        Ok(ShapeCalculator {
            pending,
            results,
            pool,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // QUEUEING
    // ========================================================================

    /// Validates and queues a request. Returns false if an equal request was
    /// already pending (the call is then a no-op).
    pub fn queue(&self, shape: ShapeKind, operation: Operation, dimension: f64) -> Result<bool, EngineError> {
        let request = CalculationRequest::new(shape, operation, dimension)?;
        self.queue_request(request)
    }

    /// Queues a request given by name, e.g. `("equilateral-triangle", "area", 5.0)`.
    /// An empty or unknown name is an invalid argument.
    pub fn queue_named(&self, shape: &str, operation: &str, dimension: f64) -> Result<bool, EngineError> {
        let shape: ShapeKind = shape.parse()?;
        let operation: Operation = operation.parse()?;
        self.queue(shape, operation, dimension)
    }

    /// Queues an already-built request, e.g. one returned as undispatched from
    /// a stopped batch.
    pub fn queue_request(&self, request: CalculationRequest) -> Result<bool, EngineError> {
        let inserted = self.pending.put(request)?;
        if inserted {
            log_debug!("CALC", "queued {}", request);
        }
        Ok(inserted)
    }

    // ========================================================================
    // BATCH EXECUTION
    // ========================================================================

    fn dispatch(&self, request: CalculationRequest) -> Outcome {
        self.pool.submit(move || request.evaluate())
    }

    fn settle(handle: Outcome) -> Result<f64, CalcError> {
        handle
            .join()
            .unwrap_or_else(|panicked| Err(CalcError::failed(panicked.to_string())))
    }

    /// Puts requests that were drained but never got a result back into the
    /// pending store.
    fn requeue(&self, requests: impl IntoIterator<Item = CalculationRequest>) -> usize {
        let mut requeued = 0;
        for request in requests {
            match self.pending.put(request) {
                Ok(_) => requeued += 1,
                Err(e) => log_error!("CALC", "could not re-queue {}: {}", request, e),
            }
        }
        requeued
    }

    /// Runs every pending request, stopping at the first failure.
    ///
    /// Returns the number of results recorded. On a computation failure the
    /// error is `EngineError::BatchStopped`; the failing request gets no result
    /// and undispatched requests are handed back in the error, not re-queued.
    /// If a result cannot be stored the error is `EngineError::Store` and every
    /// drained request without a stored result goes back to pending.
    pub fn run_all_stop_on_error(&self) -> Result<usize, EngineError> {
        let batch = self.pending.drain()?;
        if batch.is_empty() {
            return Ok(0);
        }
        log_enter!("CALC", "run_all_stop_on_error", "batch={}", batch.len());

        let window = self.pool.size();
        let mut remaining = batch.into_iter();
        let mut in_flight: VecDeque<(CalculationRequest, Outcome)> = VecDeque::with_capacity(window);
        let mut completed = 0usize;
        let mut failure: Option<(CalculationRequest, CalcError)> = None;
        let mut store_failure: Option<StoreError> = None;
        let mut unrecorded: Vec<CalculationRequest> = Vec::new();

        loop {
            let stopped = failure.is_some() || store_failure.is_some();
            while !stopped && in_flight.len() < window {
                match remaining.next() {
                    Some(request) => in_flight.push_back((request, self.dispatch(request))),
                    None => break,
                }
            }

            let Some((request, handle)) = in_flight.pop_front() else {
                break;
            };

            match Self::settle(handle) {
                Ok(value) => match self.results.put(CalculationResult::number(request, value)) {
                    Ok(()) => completed += 1,
                    Err(e) => {
                        log_warn!("CALC", "could not record result for {}: {}", request, e);
                        unrecorded.push(request);
                        store_failure.get_or_insert(e);
                    }
                },
                Err(e) => {
                    log_warn!("CALC", "{} failed: {}", request, e);
                    if failure.is_none() {
                        failure = Some((request, e));
                    } else {
                        unrecorded.push(request);
                    }
                }
            }
        }

        let undispatched: Vec<CalculationRequest> = remaining.collect();

        if let Some(e) = store_failure {
            // The batch did not fail on its own terms; give back everything
            // that has no stored result
            let failed = failure.map(|(request, _)| request);
            let requeued = self.requeue(unrecorded.into_iter().chain(failed).chain(undispatched));
            log_exit!(
                "CALC",
                "run_all_stop_on_error",
                "store failure after {} result(s), {} re-queued",
                completed,
                requeued
            );
            return Err(EngineError::Store(e));
        }

        if let Some((_, source)) = failure {
            // Only one failure is reported; any later one goes back to pending
            self.requeue(unrecorded);
            log_exit!(
                "CALC",
                "run_all_stop_on_error",
                "stopped: completed={} undispatched={}",
                completed,
                undispatched.len()
            );
            return Err(EngineError::BatchStopped {
                completed,
                undispatched,
                source,
            });
        }

        log_exit!("CALC", "run_all_stop_on_error", "completed={}", completed);
        Ok(completed)
    }

    /// Runs every pending request to completion regardless of failures.
    ///
    /// Every request gets a result (failures are recorded as
    /// `ResultValue::Error`). Returns the number of requests processed. The
    /// results are stored as one batch; if that fails none are recorded, the
    /// whole batch goes back to pending and the store error is returned.
    pub fn run_all_no_stop_on_error(&self) -> Result<usize, EngineError> {
        let batch = self.pending.drain()?;
        if batch.is_empty() {
            return Ok(0);
        }
        log_enter!("CALC", "run_all_no_stop_on_error", "batch={}", batch.len());

        let handles: Vec<Outcome> = batch.iter().map(|request| self.dispatch(*request)).collect();

        let mut failures = 0usize;
        let results: Vec<CalculationResult> = batch
            .iter()
            .zip(handles)
            .map(|(&request, handle)| {
                let value = ResultValue::from(Self::settle(handle));
                if let ResultValue::Error(e) = &value {
                    failures += 1;
                    log_warn!("CALC", "{} failed: {}", request, e);
                }
                CalculationResult::new(request, value)
            })
            .collect();

        let processed = match self.results.put_all(results) {
            Ok(processed) => processed,
            Err(e) => {
                log_warn!("CALC", "could not record batch of {}: {}", batch.len(), e);
                let requeued = self.requeue(batch);
                log_exit!("CALC", "run_all_no_stop_on_error", "store failure, {} re-queued", requeued);
                return Err(EngineError::Store(e));
            }
        };
        log_exit!("CALC", "run_all_no_stop_on_error", "processed={} failed={}", processed, failures);
        Ok(processed)
    }

    // ========================================================================
    // STORE PASS-THROUGHS
    // ========================================================================

    pub fn get_all_pending_requests(&self) -> Vec<CalculationRequest> {
        self.pending.get_all()
    }

    pub fn get_all_calculated_results(&self) -> Vec<CalculationResult> {
        self.results.get_all()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.count()
    }

    pub fn result_count(&self) -> usize {
        self.results.count()
    }

    pub fn remove_pending_request(&self, request: &CalculationRequest) -> Result<bool, EngineError> {
        Ok(self.pending.remove(request)?)
    }

    pub fn remove_result(&self, result: &CalculationResult) -> Result<bool, EngineError> {
        Ok(self.results.remove(result)?)
    }

    /// Returns how many pending requests were discarded.
    pub fn delete_all_pending_requests(&self) -> Result<usize, EngineError> {
        let discarded = self.pending.clear()?;
        log_debug!("CALC", "deleted {} pending request(s)", discarded);
        Ok(discarded)
    }

    /// Returns how many results were discarded.
    pub fn delete_all_results(&self) -> Result<usize, EngineError> {
        let discarded = self.results.clear()?;
        log_debug!("CALC", "deleted {} result(s)", discarded);
        Ok(discarded)
    }
}
