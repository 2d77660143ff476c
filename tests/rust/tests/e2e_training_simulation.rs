//! End-to-end training simulation test
//!
//! Runs the simulated engine through the orchestrator exactly the way
//! the binary wires it up: job creation, background execution, metrics
//! collection, log and checkpoint persistence, and final state.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;
use tokio::time::sleep;

use job_core::{JobDraft, JobStatus, PlatformConfig, SimulationConfig};
use job_store::{ArtifactStore, JobStore};
use metrics_cache::MetricsCache;
use orchestrator::JobOrchestrator;
use training_engine::SimulatedEngine;

fn build_platform() -> (TempDir, Arc<JobOrchestrator>, Arc<ArtifactStore>) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JobStore::new(dir.path().join("jobs.json")));
    let artifacts = Arc::new(ArtifactStore::new(dir.path()));
    let metrics = Arc::new(MetricsCache::new());

    let mut config = PlatformConfig::default();
    config.simulation = SimulationConfig {
        steps_per_epoch: 20,
        log_every: 10,
        save_every: 20,
        step_interval: Duration::from_millis(1),
    };

    let engine = Arc::new(SimulatedEngine::new(
        artifacts.clone(),
        metrics.clone(),
        config.simulation.clone(),
    ));
    let service = Arc::new(JobOrchestrator::new(
        config,
        store,
        artifacts.clone(),
        metrics,
        engine,
    ));

    (dir, service, artifacts)
}

async fn wait_for_terminal(service: &JobOrchestrator, job_id: &str) -> JobStatus {
    for _ in 0..500 {
        let job = service.get_job(job_id).await.unwrap();
        if job.status.is_terminal() {
            return job.status;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never finished", job_id);
}

#[tokio::test]
async fn test_simulated_training_end_to_end() -> Result<()> {
    let (_dir, service, artifacts) = build_platform();

    let job = service
        .create_job(JobDraft {
            name: "tinyllama qlora".to_string(),
            epochs: Some(2),
            ..Default::default()
        })
        .await?;
    assert_eq!(job.id, "ft-001");
    assert_eq!(job.status, JobStatus::Pending);

    service.start_job(&job.id).await?;
    let status = wait_for_terminal(&service, &job.id).await;
    assert_eq!(status, JobStatus::Completed);

    let finished = service.get_job(&job.id).await?;
    assert_eq!(finished.progress, 100);
    assert!(finished.started_at.is_some());
    assert!(finished.completed_at.is_some());

    // 2 epochs x 20 steps logged every 10 steps
    let history = finished.loss_history.expect("history persisted on completion");
    assert_eq!(history.len(), 4);
    let steps: Vec<u64> = history.iter().map(|p| p.step).collect();
    assert_eq!(steps, vec![10, 20, 30, 40]);
    assert!(history.iter().all(|p| p.loss >= 0.1 && p.loss <= 2.6));

    // Real logs came from the run, not from demo materialization
    let logs = service.get_logs(&job.id).await?;
    assert!(logs.iter().any(|l| l.message == "Initializing QLoRA training..."));
    assert!(logs.iter().any(|l| l.message.starts_with("Step 40/40")));
    assert!(logs.iter().any(|l| l.message == "Training completed successfully"));

    // One checkpoint per epoch at save_every=20
    let checkpoints = artifacts.load_checkpoints(&job.id).await;
    assert_eq!(checkpoints.len(), 2);
    assert_eq!(checkpoints[0].id, format!("ckpt-{}-1", job.id));
    assert_eq!(checkpoints[1].step, 40);

    // Metrics endpoint serves the real history for a known job
    let metrics = service.get_metrics(&job.id).await;
    assert_eq!(metrics.loss_history.len(), 4);
    assert_eq!(metrics.current_metrics.current_step, 40);
    Ok(())
}

#[tokio::test]
async fn test_two_jobs_train_independently() -> Result<()> {
    let (_dir, service, _artifacts) = build_platform();

    let a = service
        .create_job(JobDraft {
            name: "run a".to_string(),
            epochs: Some(1),
            ..Default::default()
        })
        .await?;
    let b = service
        .create_job(JobDraft {
            name: "run b".to_string(),
            epochs: Some(1),
            ..Default::default()
        })
        .await?;

    service.start_job(&a.id).await?;
    service.start_job(&b.id).await?;

    assert_eq!(wait_for_terminal(&service, &a.id).await, JobStatus::Completed);
    assert_eq!(wait_for_terminal(&service, &b.id).await, JobStatus::Completed);

    let ma = service.get_metrics(&a.id).await;
    let mb = service.get_metrics(&b.id).await;
    assert_eq!(ma.loss_history.len(), 2);
    assert_eq!(mb.loss_history.len(), 2);
    Ok(())
}
