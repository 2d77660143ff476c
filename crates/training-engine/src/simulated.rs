//! Simulated QLoRA training engine
//!
//! Walks the full epoch/step schedule at a configurable pace, feeding
//! the metrics cache and artifact store exactly the way a real engine
//! would. Loss follows an exponential decay with noise so dashboards
//! show a believable curve.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use tracing::{info, instrument};

use job_core::{Checkpoint, LogEntry, LogLevel, LossPoint, Result, SimulationConfig};
use job_store::ArtifactStore;
use metrics_cache::MetricsCache;

use crate::engine::{TrainingEngine, TrainingRunConfig};

/// Engine that simulates a QLoRA fine-tuning run
pub struct SimulatedEngine {
    artifacts: Arc<ArtifactStore>,
    metrics: Arc<MetricsCache>,
    sim: SimulationConfig,
}

impl SimulatedEngine {
    pub fn new(
        artifacts: Arc<ArtifactStore>,
        metrics: Arc<MetricsCache>,
        sim: SimulationConfig,
    ) -> Self {
        Self {
            artifacts,
            metrics,
            sim,
        }
    }

    async fn log(&self, job_id: &str, message: impl Into<String>) -> Result<()> {
        self.artifacts
            .append_log(job_id, LogEntry::now(LogLevel::Info, message))
            .await
    }
}

#[async_trait]
impl TrainingEngine for SimulatedEngine {
    #[instrument(skip(self, config), fields(model = %config.model))]
    async fn run(&self, job_id: &str, config: &TrainingRunConfig) -> Result<bool> {
        let total_steps = u64::from(config.epochs) * self.sim.steps_per_epoch;

        self.log(job_id, "Initializing QLoRA training...").await?;
        self.log(job_id, format!("Loading model {}", config.model)).await?;
        self.log(job_id, "Applying 4-bit quantization...").await?;
        self.log(
            job_id,
            format!("LoRA rank: {}, alpha: {}", config.lora_r, config.lora_alpha),
        )
        .await?;

        let mut loss = 2.5_f64;
        let mut saved_checkpoints = 0u32;

        for epoch in 1..=u64::from(config.epochs) {
            self.log(
                job_id,
                format!("Training started - Epoch {}/{}", epoch, config.epochs),
            )
            .await?;

            let mut step_in_epoch = 0;
            while step_in_epoch < self.sim.steps_per_epoch {
                step_in_epoch += self.sim.log_every;
                let global_step = (epoch - 1) * self.sim.steps_per_epoch + step_in_epoch;

                let noise = rand::thread_rng().gen_range(-0.05..0.05);
                loss = (loss * 0.98 + noise).max(0.1);

                self.metrics
                    .append_point(job_id, LossPoint::new(global_step, epoch, loss, Utc::now()));
                self.log(
                    job_id,
                    format!("Step {}/{} - Loss: {:.4}", global_step, total_steps, loss),
                )
                .await?;

                if global_step % self.sim.save_every == 0 {
                    saved_checkpoints += 1;
                    self.artifacts
                        .append_checkpoint(
                            job_id,
                            Checkpoint {
                                id: format!("ckpt-{}-{}", job_id, saved_checkpoints),
                                epoch,
                                step: global_step,
                                loss: (loss * 10_000.0).round() / 10_000.0,
                                timestamp: Utc::now().format("%H:%M:%S").to_string(),
                                file_path: format!(
                                    "/checkpoints/{}/checkpoint-{}.pt",
                                    job_id, global_step
                                ),
                                file_size_mb: 245.3,
                            },
                        )
                        .await?;
                }

                tokio::time::sleep(self.sim.step_interval).await;
            }
        }

        self.log(job_id, "Training completed successfully").await?;
        info!(job_id, total_steps, "Simulated training run finished");
        Ok(true)
    }
}
