//! Per-job artifact storage for training logs and checkpoints
//!
//! Each job gets one JSON file per artifact kind, written with the same
//! atomic semantics as the registry itself.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use job_core::{Checkpoint, LogEntry, Result};

use crate::files::{read_records, remove_file_if_exists, write_json_atomic};

/// File-backed storage for per-job logs and checkpoint records
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    logs_dir: PathBuf,
    checkpoints_dir: PathBuf,
}

impl ArtifactStore {
    /// Create an artifact store rooted at `data_dir`. Directories are
    /// created lazily on first write.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            logs_dir: data_dir.join("logs"),
            checkpoints_dir: data_dir.join("checkpoints"),
        }
    }

    fn log_path(&self, job_id: &str) -> PathBuf {
        self.logs_dir.join(format!("{}.json", job_id))
    }

    fn checkpoint_path(&self, job_id: &str) -> PathBuf {
        self.checkpoints_dir.join(format!("{}.json", job_id))
    }

    /// Load all log entries for a job. Missing files read as empty.
    pub async fn load_logs(&self, job_id: &str) -> Vec<LogEntry> {
        read_records(&self.log_path(job_id)).await
    }

    /// Replace the full log history for a job
    pub async fn save_logs(&self, job_id: &str, logs: &[LogEntry]) -> Result<()> {
        write_json_atomic(&self.log_path(job_id), &logs).await
    }

    /// Append a single log entry to a job's history
    pub async fn append_log(&self, job_id: &str, entry: LogEntry) -> Result<()> {
        let mut logs = self.load_logs(job_id).await;
        logs.push(entry);
        self.save_logs(job_id, &logs).await
    }

    /// Load all checkpoint records for a job. Missing files read as empty.
    pub async fn load_checkpoints(&self, job_id: &str) -> Vec<Checkpoint> {
        read_records(&self.checkpoint_path(job_id)).await
    }

    /// Replace the full checkpoint list for a job
    pub async fn save_checkpoints(&self, job_id: &str, checkpoints: &[Checkpoint]) -> Result<()> {
        write_json_atomic(&self.checkpoint_path(job_id), &checkpoints).await
    }

    /// Append a single checkpoint record to a job's list
    pub async fn append_checkpoint(&self, job_id: &str, checkpoint: Checkpoint) -> Result<()> {
        let mut checkpoints = self.load_checkpoints(job_id).await;
        checkpoints.push(checkpoint);
        self.save_checkpoints(job_id, &checkpoints).await
    }

    /// Find a checkpoint record by id across a job's list
    pub async fn find_checkpoint(&self, job_id: &str, checkpoint_id: &str) -> Option<Checkpoint> {
        self.load_checkpoints(job_id)
            .await
            .into_iter()
            .find(|c| c.id == checkpoint_id)
    }

    /// Delete all artifacts belonging to a job. Missing files are fine.
    #[instrument(skip(self))]
    pub async fn delete_artifacts(&self, job_id: &str) -> Result<()> {
        let removed_logs = remove_file_if_exists(&self.log_path(job_id)).await?;
        let removed_checkpoints = remove_file_if_exists(&self.checkpoint_path(job_id)).await?;
        info!(removed_logs, removed_checkpoints, "Deleted job artifacts");
        Ok(())
    }
}
