//! Error types for the fine-tuning job platform

use thiserror::Error;

/// Result type alias using the platform Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the fine-tuning job platform
#[derive(Error, Debug)]
pub enum Error {
    // Job errors
    #[error("Job not found: {job_id}")]
    JobNotFound { job_id: String },

    #[error("Job already exists: {job_id}")]
    JobAlreadyExists { job_id: String },

    #[error("Job is already running: {job_id}")]
    JobAlreadyRunning { job_id: String },

    // Checkpoint errors
    #[error("Checkpoint not found: {checkpoint_id}")]
    CheckpointNotFound { checkpoint_id: String },

    // Training errors
    #[error("Training failed for job {job_id}: {reason}")]
    Training { job_id: String, reason: String },

    // Storage errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    // Configuration errors
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Returns true if this error means a requested resource is absent
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::JobNotFound { .. } | Error::CheckpointNotFound { .. }
        )
    }

    /// Returns true if this error is a conflict with existing state
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::JobAlreadyExists { .. } | Error::JobAlreadyRunning { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
