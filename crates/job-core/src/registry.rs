//! Running-job registry
//!
//! Tracks which job ids currently have an active background execution.
//! This registry is the sole source of truth for duplicate-start
//! detection and must be consulted before any transition to `running`.

use crate::JobId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::debug;

/// Slot state for one registered execution
enum Execution {
    /// A `start_job` call has claimed the slot but not yet spawned
    Reserved,

    /// Background task is registered
    Active(JoinHandle<()>),
}

impl Execution {
    /// Whether this slot still blocks a new start
    fn is_live(&self) -> bool {
        match self {
            Execution::Reserved => true,
            Execution::Active(handle) => !handle.is_finished(),
        }
    }
}

/// Concurrency-safe set of running job executions
///
/// All operations are serialized by a single mutex. A finished handle
/// left registered reports as not running and may be replaced.
#[derive(Default)]
pub struct RunningJobRegistry {
    jobs: Mutex<HashMap<JobId, Execution>>,
}

impl RunningJobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically reserve the slot for a job about to start
    ///
    /// Returns false if a live execution is already registered, in which
    /// case the caller must fail with an already-running error. The
    /// check and the reservation happen under one lock, so concurrent
    /// starts admit exactly one caller.
    pub fn try_begin(&self, job_id: &str) -> bool {
        let mut jobs = self.jobs.lock();
        if jobs.get(job_id).is_some_and(Execution::is_live) {
            return false;
        }
        jobs.insert(job_id.to_string(), Execution::Reserved);
        debug!(job_id = %job_id, "Execution slot reserved");
        true
    }

    /// Register the spawned task handle for a job
    pub fn add(&self, job_id: &str, handle: JoinHandle<()>) {
        self.jobs
            .lock()
            .insert(job_id.to_string(), Execution::Active(handle));
    }

    /// Get an abort handle for a registered execution
    pub fn get(&self, job_id: &str) -> Option<AbortHandle> {
        match self.jobs.lock().get(job_id) {
            Some(Execution::Active(handle)) => Some(handle.abort_handle()),
            _ => None,
        }
    }

    /// Check whether a job has a live execution
    pub fn is_running(&self, job_id: &str) -> bool {
        self.jobs.lock().get(job_id).is_some_and(Execution::is_live)
    }

    /// Remove a job from the registry, returning its task handle if any
    pub fn remove(&self, job_id: &str) -> Option<JoinHandle<()>> {
        match self.jobs.lock().remove(job_id) {
            Some(Execution::Active(handle)) => {
                debug!(job_id = %job_id, "Execution removed from registry");
                Some(handle)
            }
            _ => None,
        }
    }

    /// Ids of all jobs with a live execution
    pub fn running_ids(&self) -> Vec<JobId> {
        self.jobs
            .lock()
            .iter()
            .filter(|(_, exec)| exec.is_live())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of live executions
    pub fn running_count(&self) -> usize {
        self.jobs
            .lock()
            .values()
            .filter(|exec| exec.is_live())
            .count()
    }
}

/// Thread-safe handle to the running-job registry
pub type RunningJobRegistryHandle = Arc<RunningJobRegistry>;
