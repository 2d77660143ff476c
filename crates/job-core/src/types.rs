//! Core type definitions for the fine-tuning job platform

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier types
pub type JobId = String;
pub type CheckpointId = String;

/// Training step and epoch counters
pub type Step = u64;
pub type Epoch = u64;

/// Job status enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job has been created but not started
    Pending,

    /// Job has an active background execution
    Running,

    /// Job finished successfully
    Completed,

    /// Job finished with an error
    Failed,

    /// Pause requested (status echo only)
    Paused,

    /// Stop requested (status echo only)
    Stopped,
}

impl JobStatus {
    /// Returns true if the job has reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Returns true if the job is actively executing
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Running)
    }

    /// Lowercase wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Paused => "paused",
            JobStatus::Stopped => "stopped",
        }
    }
}

/// Persistent record of a fine-tuning job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier (`ft-NNN`)
    pub id: JobId,

    /// Human-readable job name
    pub name: String,

    /// Base model reference
    pub model: String,

    /// Dataset reference
    pub dataset: String,

    /// Current lifecycle status
    pub status: JobStatus,

    /// Completion percentage (0-100)
    pub progress: u8,

    /// Creation date (`YYYY-MM-DD`)
    pub created_at: String,

    /// Timestamp when training was started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Timestamp when training finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Number of training epochs
    pub epochs: u32,

    /// Per-device batch size
    pub batch_size: u32,

    /// Optimizer learning rate
    pub learning_rate: f64,

    /// LoRA rank
    pub lora_r: u32,

    /// LoRA alpha scaling factor
    pub lora_alpha: u32,

    /// Embedded loss history, if training metrics were persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss_history: Option<Vec<LossPoint>>,

    /// Last reported training step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<Step>,

    /// Planned total steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<Step>,

    /// Last reported epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_epoch: Option<Epoch>,

    /// Planned total epochs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_epochs: Option<Epoch>,
}

impl Job {
    /// Merge a partial update into this record
    ///
    /// `None` fields in the update leave the stored value untouched.
    pub fn apply(&mut self, update: &JobUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(model) = &update.model {
            self.model = model.clone();
        }
        if let Some(dataset) = &update.dataset {
            self.dataset = dataset.clone();
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(progress) = update.progress {
            self.progress = progress;
        }
        if let Some(started_at) = update.started_at {
            self.started_at = Some(started_at);
        }
        if let Some(completed_at) = update.completed_at {
            self.completed_at = Some(completed_at);
        }
        if let Some(loss_history) = &update.loss_history {
            self.loss_history = Some(loss_history.clone());
        }
        if let Some(current_step) = update.current_step {
            self.current_step = Some(current_step);
        }
        if let Some(total_steps) = update.total_steps {
            self.total_steps = Some(total_steps);
        }
        if let Some(current_epoch) = update.current_epoch {
            self.current_epoch = Some(current_epoch);
        }
        if let Some(total_epochs) = update.total_epochs {
            self.total_epochs = Some(total_epochs);
        }
    }
}

/// Partial update applied to a stored job record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobUpdate {
    pub name: Option<String>,
    pub model: Option<String>,
    pub dataset: Option<String>,
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub loss_history: Option<Vec<LossPoint>>,
    pub current_step: Option<Step>,
    pub total_steps: Option<Step>,
    pub current_epoch: Option<Epoch>,
    pub total_epochs: Option<Epoch>,
}

impl JobUpdate {
    /// Update that only changes the status
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Fields supplied by the caller when creating a job
///
/// Anything left unset is filled with platform defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobDraft {
    /// Explicit id; assigned sequentially when absent
    #[serde(default)]
    pub id: Option<JobId>,

    pub name: String,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub dataset: Option<String>,

    #[serde(default)]
    pub epochs: Option<u32>,

    #[serde(default)]
    pub batch_size: Option<u32>,

    #[serde(default)]
    pub learning_rate: Option<f64>,

    #[serde(default)]
    pub lora_r: Option<u32>,

    #[serde(default)]
    pub lora_alpha: Option<u32>,

    #[serde(default)]
    pub total_steps: Option<Step>,

    #[serde(default)]
    pub total_epochs: Option<Epoch>,
}

/// Single point of the training loss curve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossPoint {
    /// Global training step
    pub step: Step,

    /// Epoch the step belongs to
    pub epoch: Epoch,

    /// Loss value, rounded to 4 decimal places
    pub loss: f64,

    /// Timestamp of the measurement
    pub timestamp: DateTime<Utc>,

    /// `HH:MM:SS` projection for dashboard axes
    pub time_display: String,
}

impl LossPoint {
    /// Create a point at the given timestamp, rounding the loss
    pub fn new(step: Step, epoch: Epoch, loss: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            step,
            epoch,
            loss: round_loss(loss),
            timestamp,
            time_display: timestamp.format("%H:%M:%S").to_string(),
        }
    }
}

/// Round a loss value to 4 decimal places
pub fn round_loss(loss: f64) -> f64 {
    (loss * 10_000.0).round() / 10_000.0
}

/// In-memory metrics state for one job
///
/// Never persisted; rebuilt from job fields or synthesized on first access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub id: JobId,
    pub loss_history: Vec<LossPoint>,
    pub current_step: Step,
    pub total_steps: Step,
    pub current_epoch: Epoch,
    pub total_epochs: Epoch,
}

impl MetricsSnapshot {
    /// Empty snapshot with the platform's default totals
    pub fn empty(id: impl Into<JobId>) -> Self {
        Self {
            id: id.into(),
            loss_history: Vec::new(),
            current_step: 0,
            total_steps: 1000,
            current_epoch: 1,
            total_epochs: 3,
        }
    }

    /// Snapshot rebuilt from a persisted job record
    pub fn from_job(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            loss_history: job.loss_history.clone().unwrap_or_default(),
            current_step: job.current_step.unwrap_or(0),
            total_steps: job.total_steps.unwrap_or(1000),
            current_epoch: job.current_epoch.unwrap_or(1),
            total_epochs: job.total_epochs.unwrap_or(3),
        }
    }

    /// Most recent loss point, if any
    pub fn latest(&self) -> Option<&LossPoint> {
        self.loss_history.last()
    }
}

/// Log severity for per-job training logs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Single training log line for one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// `HH:MM:SS` wall-clock time
    pub timestamp: String,

    pub level: LogLevel,

    pub message: String,
}

impl LogEntry {
    /// Entry stamped with the current time
    pub fn now(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().format("%H:%M:%S").to_string(),
            level,
            message: message.into(),
        }
    }
}

/// Metadata for one saved checkpoint artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: CheckpointId,
    pub epoch: Epoch,
    pub step: Step,
    pub loss: f64,

    /// `HH:MM:SS` wall-clock time of the save
    pub timestamp: String,

    /// Path to the artifact written by the training engine
    pub file_path: String,

    /// Artifact size in megabytes
    pub file_size_mb: f64,
}
