//! Training engine trait and run configuration

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use job_core::{Job, Result, TrainingDefaults};

/// Hyperparameters handed to an engine for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingRunConfig {
    pub model: String,
    pub dataset: String,
    pub epochs: u32,
    pub batch_size: u32,
    pub learning_rate: f64,
    pub lora_r: u32,
    pub lora_alpha: u32,
}

impl Default for TrainingRunConfig {
    fn default() -> Self {
        let defaults = TrainingDefaults::default();
        Self {
            model: defaults.model,
            dataset: defaults.dataset,
            epochs: defaults.epochs,
            batch_size: defaults.batch_size,
            learning_rate: defaults.learning_rate,
            lora_r: defaults.lora_r,
            lora_alpha: defaults.lora_alpha,
        }
    }
}

impl TrainingRunConfig {
    /// Build a run config from a job record
    pub fn from_job(job: &Job) -> Self {
        Self {
            model: job.model.clone(),
            dataset: job.dataset.clone(),
            epochs: job.epochs,
            batch_size: job.batch_size,
            learning_rate: job.learning_rate,
            lora_r: job.lora_r,
            lora_alpha: job.lora_alpha,
        }
    }
}

/// Executes one training run for a job
///
/// Implementations report success via `Ok(true)`, a handled training
/// failure via `Ok(false)`, and infrastructure problems via `Err`.
#[async_trait]
pub trait TrainingEngine: Send + Sync {
    async fn run(&self, job_id: &str, config: &TrainingRunConfig) -> Result<bool>;
}
