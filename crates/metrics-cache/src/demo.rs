//! Deterministic-shape demo data for jobs without recorded metrics
//!
//! The dashboard needs something plausible to plot before a job has
//! produced real metrics. Loss values carry a little random noise but
//! the shape (point count, step spacing, epoch assignment) is fixed.

use chrono::{Duration, Utc};
use rand::Rng;

use job_core::{Checkpoint, LogEntry, LogLevel, LossPoint, MetricsSnapshot};

/// Synthesize a 50-point loss curve with exponential decay
///
/// Starts at 2.5 and decays by 2% per point with uniform noise in
/// `[-0.05, 0.05]`, floored at 0.1. Steps run 10, 20, .. 500; points are
/// spaced one minute apart ending at the current time.
pub fn demo_loss_history() -> Vec<LossPoint> {
    let mut rng = rand::thread_rng();
    let mut current_loss = 2.5_f64;
    let base_time = Utc::now() - Duration::minutes(50);

    (0..50)
        .map(|i| {
            let noise = rng.gen_range(-0.05..0.05);
            current_loss = (current_loss * 0.98 + noise).max(0.1);
            LossPoint::new(
                (i as u64 + 1) * 10,
                (i as u64 / 10) + 1,
                current_loss,
                base_time + Duration::minutes(i),
            )
        })
        .collect()
}

/// Full demo metrics snapshot for a job mid-training
pub fn demo_snapshot(job_id: &str) -> MetricsSnapshot {
    MetricsSnapshot {
        id: job_id.to_string(),
        loss_history: demo_loss_history(),
        current_step: 500,
        total_steps: 1000,
        current_epoch: 3,
        total_epochs: 5,
    }
}

/// Extend a demo loss curve by one point
///
/// Continues the decay of the last point: step advances by 10, loss
/// decays 2% with noise in `[-0.03, 0.03]` floored at 0.1, and the epoch
/// follows from the new step at 100 steps per epoch.
pub fn synthetic_next_point(last: &LossPoint) -> LossPoint {
    let mut rng = rand::thread_rng();
    let new_step = last.step + 10;
    let new_loss = (last.loss * 0.98 + rng.gen_range(-0.03..0.03)).max(0.1);
    LossPoint::new(new_step, (new_step / 100) + 1, new_loss, Utc::now())
}

/// Demo training log lines for a job with no recorded logs
pub fn demo_logs(job_id: &str) -> Vec<LogEntry> {
    let now = Utc::now();
    let stamp = |secs_ago: i64| (now - Duration::seconds(secs_ago)).format("%H:%M:%S").to_string();
    let entry = |secs_ago: i64, message: String| LogEntry {
        timestamp: stamp(secs_ago),
        level: LogLevel::Info,
        message,
    };

    vec![
        entry(40, "Initializing QLoRA training...".to_string()),
        entry(39, format!("Loading model for job {}", job_id)),
        entry(38, "Applying 4-bit quantization...".to_string()),
        entry(37, "LoRA rank: 8, alpha: 16".to_string()),
        entry(36, "Training started - Epoch 1/3".to_string()),
        entry(26, "Step 10/300 - Loss: 0.6234".to_string()),
        entry(16, "Step 20/300 - Loss: 0.5891".to_string()),
        entry(6, "Step 30/300 - Loss: 0.5567".to_string()),
    ]
}

/// Demo checkpoint records for a job with no recorded checkpoints
pub fn demo_checkpoints(job_id: &str) -> Vec<Checkpoint> {
    let now = Utc::now();
    let stamp = |mins_ago: i64| (now - Duration::minutes(mins_ago)).format("%H:%M:%S").to_string();

    vec![
        Checkpoint {
            id: format!("ckpt-{}-1", job_id),
            epoch: 1,
            step: 100,
            loss: 0.6234,
            timestamp: stamp(20),
            file_path: format!("/checkpoints/{}/checkpoint-100.pt", job_id),
            file_size_mb: 245.3,
        },
        Checkpoint {
            id: format!("ckpt-{}-2", job_id),
            epoch: 1,
            step: 200,
            loss: 0.5567,
            timestamp: stamp(15),
            file_path: format!("/checkpoints/{}/checkpoint-200.pt", job_id),
            file_size_mb: 245.3,
        },
        Checkpoint {
            id: format!("ckpt-{}-3", job_id),
            epoch: 2,
            step: 100,
            loss: 0.4891,
            timestamp: stamp(10),
            file_path: format!("/checkpoints/{}/checkpoint-300.pt", job_id),
            file_size_mb: 245.3,
        },
    ]
}
