//! In-memory cache of per-job metrics snapshots

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use job_core::{JobId, LossPoint, MetricsSnapshot};

/// Mutex-guarded map of job id to latest metrics snapshot
///
/// The cache is the source of truth while a job is running; the job
/// record only carries a persisted copy of the history once training
/// finishes.
#[derive(Debug, Default)]
pub struct MetricsCache {
    snapshots: Mutex<HashMap<JobId, MetricsSnapshot>>,
}

impl MetricsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot for a job, if one has been cached
    pub fn get(&self, job_id: &str) -> Option<MetricsSnapshot> {
        self.snapshots.lock().get(job_id).cloned()
    }

    /// Replace the cached snapshot for a job
    pub fn set(&self, snapshot: MetricsSnapshot) {
        self.snapshots.lock().insert(snapshot.id.clone(), snapshot);
    }

    /// Drop a job's cached metrics. Returns the evicted snapshot.
    pub fn remove(&self, job_id: &str) -> Option<MetricsSnapshot> {
        self.snapshots.lock().remove(job_id)
    }

    /// Append one loss point to a job's history, creating a fresh
    /// snapshot with default counters when none exists yet. The step
    /// and epoch counters track the appended point.
    pub fn append_point(&self, job_id: &str, point: LossPoint) {
        let mut snapshots = self.snapshots.lock();
        let snapshot = snapshots
            .entry(job_id.to_string())
            .or_insert_with(|| MetricsSnapshot::empty(job_id));

        snapshot.current_step = point.step;
        snapshot.current_epoch = point.epoch;
        snapshot.loss_history.push(point);

        debug!(
            job_id,
            points = snapshot.loss_history.len(),
            step = snapshot.current_step,
            "Appended loss point"
        );
    }

    /// Number of jobs with cached metrics
    pub fn len(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.lock().is_empty()
    }
}
