//! Job orchestration service
//!
//! Drives the job state machine and owns the background execution units.
//! Each started job runs on its own Tokio task; the running-job registry
//! guarantees at most one execution unit per job at any moment.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use job_core::{
    Checkpoint, Error, Job, JobDraft, JobStatus, JobUpdate, LogEntry, LossPoint, MetricsSnapshot,
    PlatformConfig, Result, RunningJobRegistry,
};
use job_store::{ArtifactStore, JobStore};
use metrics_cache::demo;
use metrics_cache::MetricsCache;
use training_engine::{TrainingEngine, TrainingRunConfig};

/// Result of a start/pause/resume/stop request
#[derive(Debug, Serialize)]
pub struct JobControlResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub message: String,
}

/// Latest metrics values derived from the loss history tail
#[derive(Debug, Serialize)]
pub struct CurrentMetrics {
    pub current_loss: f64,
    pub current_step: u64,
    pub current_epoch: u64,
    pub total_steps: u64,
    pub total_epochs: u64,
}

/// Metrics payload for the dashboard
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub job_id: String,
    pub loss_history: Vec<LossPoint>,
    pub current_metrics: CurrentMetrics,
}

/// Resolved checkpoint artifact ready to be served
#[derive(Debug)]
pub struct CheckpointDownload {
    pub path: PathBuf,
    pub file_name: String,
    pub content_type: &'static str,
}

/// Central orchestration service for fine-tuning jobs
pub struct JobOrchestrator {
    config: PlatformConfig,
    store: Arc<JobStore>,
    artifacts: Arc<ArtifactStore>,
    metrics: Arc<MetricsCache>,
    engine: Arc<dyn TrainingEngine>,
    running: Arc<RunningJobRegistry>,
    start_time: Instant,
}

impl JobOrchestrator {
    pub fn new(
        config: PlatformConfig,
        store: Arc<JobStore>,
        artifacts: Arc<ArtifactStore>,
        metrics: Arc<MetricsCache>,
        engine: Arc<dyn TrainingEngine>,
    ) -> Self {
        Self {
            config,
            store,
            artifacts,
            metrics,
            engine,
            running: Arc::new(RunningJobRegistry::new()),
            start_time: Instant::now(),
        }
    }

    /// Seconds since the orchestrator came up
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Registry of currently-running execution units
    pub fn running(&self) -> &RunningJobRegistry {
        &self.running
    }

    /// Create a new job record, filling unset fields with defaults
    ///
    /// Ids are assigned sequentially (`ft-001`, `ft-002`, ..) by the store
    /// unless the caller supplies one.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_job(&self, draft: JobDraft) -> Result<Job> {
        let defaults = &self.config.training;
        let explicit_id = draft.id.clone();

        let job = Job {
            id: explicit_id.clone().unwrap_or_default(),
            name: draft.name,
            model: draft.model.unwrap_or_else(|| defaults.model.clone()),
            dataset: draft.dataset.unwrap_or_else(|| defaults.dataset.clone()),
            status: JobStatus::Pending,
            progress: 0,
            created_at: Utc::now().format("%Y-%m-%d").to_string(),
            started_at: None,
            completed_at: None,
            epochs: draft.epochs.unwrap_or(defaults.epochs),
            batch_size: draft.batch_size.unwrap_or(defaults.batch_size),
            learning_rate: draft.learning_rate.unwrap_or(defaults.learning_rate),
            lora_r: draft.lora_r.unwrap_or(defaults.lora_r),
            lora_alpha: draft.lora_alpha.unwrap_or(defaults.lora_alpha),
            loss_history: None,
            current_step: None,
            total_steps: Some(draft.total_steps.unwrap_or(defaults.total_steps)),
            current_epoch: None,
            total_epochs: Some(draft.total_epochs.unwrap_or(defaults.total_epochs)),
        };

        let job = match explicit_id {
            Some(_) => {
                self.store.add(job.clone()).await?;
                job
            }
            None => self.store.add_assigning_id(job).await?,
        };

        info!(job_id = %job.id, "Job created");
        Ok(job)
    }

    /// All job records
    pub async fn list_jobs(&self) -> Vec<Job> {
        self.store.load().await
    }

    /// Single job record by id
    pub async fn get_job(&self, job_id: &str) -> Result<Job> {
        self.store
            .find_by_id(job_id)
            .await
            .ok_or_else(|| Error::JobNotFound {
                job_id: job_id.to_string(),
            })
    }

    /// Start a job's training run on a background task
    ///
    /// A slot in the running registry is reserved before any state is
    /// persisted, so two concurrent starts for the same job see exactly
    /// one winner.
    #[instrument(skip(self))]
    pub async fn start_job(&self, job_id: &str) -> Result<JobControlResponse> {
        self.get_job(job_id).await?;

        if !self.running.try_begin(job_id) {
            return Err(Error::JobAlreadyRunning {
                job_id: job_id.to_string(),
            });
        }

        // Persist the transition before the execution unit exists so a
        // crash never leaves a running task behind a pending record
        let update = JobUpdate {
            status: Some(JobStatus::Running),
            started_at: Some(Utc::now()),
            ..Default::default()
        };
        if self.store.update_by_id(job_id, &update).await?.is_none() {
            self.running.remove(job_id);
            return Err(Error::JobNotFound {
                job_id: job_id.to_string(),
            });
        }

        let store = self.store.clone();
        let metrics = self.metrics.clone();
        let engine = self.engine.clone();
        let running = self.running.clone();
        let id = job_id.to_string();

        let handle = tokio::spawn(async move {
            run_execution(&store, &metrics, engine.as_ref(), &id).await;
            // Always the final step so restarts see a free slot
            running.remove(&id);
        });
        self.running.add(job_id, handle);

        info!(job_id, "Training started");
        Ok(JobControlResponse {
            job_id: job_id.to_string(),
            status: JobStatus::Running,
            message: "Training started successfully".to_string(),
        })
    }

    /// Acknowledge a pause request
    ///
    /// Execution units cannot be suspended mid-step yet, so this only
    /// echoes the requested state back to the caller.
    pub async fn pause_job(&self, job_id: &str) -> JobControlResponse {
        JobControlResponse {
            job_id: job_id.to_string(),
            status: JobStatus::Paused,
            message: "Job paused successfully".to_string(),
        }
    }

    /// Acknowledge a resume request
    pub async fn resume_job(&self, job_id: &str) -> JobControlResponse {
        JobControlResponse {
            job_id: job_id.to_string(),
            status: JobStatus::Running,
            message: "Job resumed successfully".to_string(),
        }
    }

    /// Acknowledge a stop request
    pub async fn stop_job(&self, job_id: &str) -> JobControlResponse {
        JobControlResponse {
            job_id: job_id.to_string(),
            status: JobStatus::Stopped,
            message: "Job stopped successfully".to_string(),
        }
    }

    /// Delete a job record together with its artifacts and cached metrics
    ///
    /// A still-running execution unit is left to finish; its final status
    /// write targets a record that no longer exists and is dropped.
    #[instrument(skip(self))]
    pub async fn delete_job(&self, job_id: &str) -> Result<()> {
        if !self.store.remove_by_id(job_id).await? {
            return Err(Error::JobNotFound {
                job_id: job_id.to_string(),
            });
        }

        if self.running.is_running(job_id) {
            warn!(job_id, "Deleted a job whose execution unit is still running");
        }

        self.artifacts.delete_artifacts(job_id).await?;
        self.metrics.remove(job_id);

        info!(job_id, "Job deleted");
        Ok(())
    }

    /// Metrics for a job, falling back to synthesized demo data
    ///
    /// Known jobs read from the cache, seeded from the persisted record
    /// on first access. Unknown ids get a demo curve that keeps growing
    /// on each poll until it reaches 100 points, so dashboards always
    /// have something live to draw.
    pub async fn get_metrics(&self, job_id: &str) -> MetricsResponse {
        let job = self.store.find_by_id(job_id).await;
        let use_demo = job.is_none();

        let mut snapshot = match self.metrics.get(job_id) {
            Some(snapshot) => snapshot,
            None => {
                let fresh = match &job {
                    Some(job) => MetricsSnapshot::from_job(job),
                    None => demo::demo_snapshot(job_id),
                };
                self.metrics.set(fresh.clone());
                fresh
            }
        };

        if use_demo && snapshot.loss_history.len() < 100 {
            if let Some(last) = snapshot.latest() {
                self.metrics.append_point(job_id, demo::synthetic_next_point(last));
            }
            if let Some(refreshed) = self.metrics.get(job_id) {
                snapshot = refreshed;
            }
        }

        format_metrics_response(job_id, snapshot)
    }

    /// Training logs for a job, materializing demo logs on first read
    /// when none exist
    pub async fn get_logs(&self, job_id: &str) -> Result<Vec<LogEntry>> {
        let logs = self.artifacts.load_logs(job_id).await;
        if !logs.is_empty() {
            return Ok(logs);
        }

        let logs = demo::demo_logs(job_id);
        self.artifacts.save_logs(job_id, &logs).await?;
        Ok(logs)
    }

    /// Checkpoint records for a job, materializing demo checkpoints on
    /// first read when none exist
    pub async fn get_checkpoints(&self, job_id: &str) -> Result<Vec<Checkpoint>> {
        let checkpoints = self.artifacts.load_checkpoints(job_id).await;
        if !checkpoints.is_empty() {
            return Ok(checkpoints);
        }

        let checkpoints = demo::demo_checkpoints(job_id);
        self.artifacts.save_checkpoints(job_id, &checkpoints).await?;
        Ok(checkpoints)
    }

    /// Resolve a checkpoint to a downloadable file
    ///
    /// When the engine never wrote a real artifact, a metadata stand-in
    /// is written to the temp directory and served instead.
    #[instrument(skip(self))]
    pub async fn download_checkpoint(
        &self,
        job_id: &str,
        checkpoint_id: &str,
    ) -> Result<CheckpointDownload> {
        let checkpoint = self
            .artifacts
            .find_checkpoint(job_id, checkpoint_id)
            .await
            .ok_or_else(|| Error::CheckpointNotFound {
                checkpoint_id: checkpoint_id.to_string(),
            })?;

        let artifact_path = PathBuf::from(&checkpoint.file_path);
        if tokio::fs::metadata(&artifact_path).await.is_ok() {
            let file_name = artifact_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| checkpoint_id.to_string());
            return Ok(CheckpointDownload {
                path: artifact_path,
                file_name,
                content_type: "application/octet-stream",
            });
        }

        let stand_in = serde_json::json!({
            "checkpoint_id": checkpoint_id,
            "job_id": job_id,
            "epoch": checkpoint.epoch,
            "step": checkpoint.step,
            "loss": checkpoint.loss,
            "timestamp": checkpoint.timestamp,
            "note": "Demo checkpoint metadata; a real run would attach the model weights here",
        });
        let temp_path = std::env::temp_dir().join(format!("{}.json", checkpoint_id));
        tokio::fs::write(&temp_path, serde_json::to_vec_pretty(&stand_in)?).await?;

        Ok(CheckpointDownload {
            path: temp_path,
            file_name: format!("{}-checkpoint-{}.json", job_id, checkpoint.step),
            content_type: "application/json",
        })
    }
}

/// Run one training execution to completion and persist the outcome
async fn run_execution(
    store: &JobStore,
    metrics: &MetricsCache,
    engine: &dyn TrainingEngine,
    job_id: &str,
) {
    // Reload so the run picks up any edits made after starting
    let Some(job) = store.find_by_id(job_id).await else {
        error!(job_id, "Job record disappeared before training began");
        return;
    };
    let config = TrainingRunConfig::from_job(&job);

    let outcome = engine.run(job_id, &config).await;

    let update = match outcome {
        Ok(true) => {
            info!(job_id, "Training completed");
            let history = metrics.get(job_id).map(|s| s.loss_history);
            JobUpdate {
                status: Some(JobStatus::Completed),
                progress: Some(100),
                completed_at: Some(Utc::now()),
                loss_history: history,
                ..Default::default()
            }
        }
        Ok(false) => {
            warn!(job_id, "Training reported failure");
            JobUpdate::status(JobStatus::Failed)
        }
        Err(e) => {
            error!(job_id, error = %e, "Training errored");
            JobUpdate::status(JobStatus::Failed)
        }
    };

    match store.update_by_id(job_id, &update).await {
        Ok(Some(_)) => {}
        Ok(None) => warn!(job_id, "Job record deleted while training ran"),
        Err(e) => error!(job_id, error = %e, "Failed to persist final job status"),
    }
}

fn format_metrics_response(job_id: &str, snapshot: MetricsSnapshot) -> MetricsResponse {
    let current_metrics = match snapshot.latest() {
        Some(last) => CurrentMetrics {
            current_loss: last.loss,
            current_step: last.step,
            current_epoch: last.epoch,
            total_steps: snapshot.total_steps,
            total_epochs: snapshot.total_epochs,
        },
        None => CurrentMetrics {
            current_loss: 0.0,
            current_step: 0,
            current_epoch: 0,
            total_steps: snapshot.total_steps,
            total_epochs: snapshot.total_epochs,
        },
    };

    MetricsResponse {
        job_id: job_id.to_string(),
        loss_history: snapshot.loss_history,
        current_metrics,
    }
}
