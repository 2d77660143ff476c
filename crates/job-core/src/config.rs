//! Platform configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main platform configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Job registry and artifact storage
    pub storage: StorageConfig,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Default hyperparameters for new jobs
    pub training: TrainingDefaults,

    /// Simulated engine pacing
    pub simulation: SimulationConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for the job registry and per-job artifacts
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./training_jobs"),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP server
    pub bind_address: String,

    /// Port for the HTTP API
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Default hyperparameters applied to jobs that omit them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingDefaults {
    /// Base model reference
    pub model: String,

    /// Dataset reference
    pub dataset: String,

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

    /// Planned total steps
    pub total_steps: u64,

    /// Planned total epochs
    pub total_epochs: u64,
}

impl Default for TrainingDefaults {
    fn default() -> Self {
        Self {
            model: "TinyLlama/TinyLlama-1.1B-Chat-v1.0".to_string(),
            dataset: "timdettmers/openassistant-guanaco".to_string(),
            epochs: 3,
            batch_size: 4,
            learning_rate: 2e-4,
            lora_r: 8,
            lora_alpha: 16,
            total_steps: 1000,
            total_epochs: 3,
        }
    }
}

/// Pacing of the simulated training engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Steps per simulated epoch
    pub steps_per_epoch: u64,

    /// Emit a loss point and log line every N steps
    pub log_every: u64,

    /// Record a checkpoint every N global steps
    pub save_every: u64,

    /// Simulated wall time per logged step
    #[serde(with = "duration_millis")]
    pub step_interval: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps_per_epoch: 100,
            log_every: 10,
            save_every: 100,
            step_interval: Duration::from_millis(50),
        }
    }
}

/// Duration serialization helper (milliseconds)
mod duration_millis {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
