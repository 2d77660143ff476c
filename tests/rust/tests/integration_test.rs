use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Notify;
use tokio::time::sleep;

use job_core::{Error, JobDraft, JobStatus, LossPoint};
use job_store::{ArtifactStore, JobStore};
use metrics_cache::MetricsCache;
use orchestrator::JobOrchestrator;
use training_engine::{TrainingEngine, TrainingRunConfig};

/// Engine that completes instantly after recording one loss point
struct InstantEngine {
    metrics: Arc<MetricsCache>,
}

#[async_trait]
impl TrainingEngine for InstantEngine {
    async fn run(&self, job_id: &str, _config: &TrainingRunConfig) -> job_core::Result<bool> {
        self.metrics
            .append_point(job_id, LossPoint::new(10, 1, 2.45, chrono::Utc::now()));
        Ok(true)
    }
}

/// Engine that reports a handled training failure
struct FailingEngine;

#[async_trait]
impl TrainingEngine for FailingEngine {
    async fn run(&self, _job_id: &str, _config: &TrainingRunConfig) -> job_core::Result<bool> {
        Ok(false)
    }
}

/// Engine that errors out before training starts
struct ErroringEngine;

#[async_trait]
impl TrainingEngine for ErroringEngine {
    async fn run(&self, job_id: &str, _config: &TrainingRunConfig) -> job_core::Result<bool> {
        Err(Error::Training {
            job_id: job_id.to_string(),
            reason: "out of memory".to_string(),
        })
    }
}

/// Engine that blocks until released, for racing starts against each other
struct BlockingEngine {
    release: Arc<Notify>,
}

#[async_trait]
impl TrainingEngine for BlockingEngine {
    async fn run(&self, _job_id: &str, _config: &TrainingRunConfig) -> job_core::Result<bool> {
        self.release.notified().await;
        Ok(true)
    }
}

struct Harness {
    _dir: TempDir,
    service: Arc<JobOrchestrator>,
    store: Arc<JobStore>,
    artifacts: Arc<ArtifactStore>,
    metrics: Arc<MetricsCache>,
}

fn build_harness<F>(make_engine: F) -> Harness
where
    F: FnOnce(Arc<ArtifactStore>, Arc<MetricsCache>) -> Arc<dyn TrainingEngine>,
{
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JobStore::new(dir.path().join("jobs.json")));
    let artifacts = Arc::new(ArtifactStore::new(dir.path()));
    let metrics = Arc::new(MetricsCache::new());
    let engine = make_engine(artifacts.clone(), metrics.clone());

    let service = Arc::new(JobOrchestrator::new(
        job_core::PlatformConfig::default(),
        store.clone(),
        artifacts.clone(),
        metrics.clone(),
        engine,
    ));

    Harness {
        _dir: dir,
        service,
        store,
        artifacts,
        metrics,
    }
}

fn instant_harness() -> Harness {
    build_harness(|_, metrics| Arc::new(InstantEngine { metrics }))
}

async fn wait_for_terminal(service: &JobOrchestrator, job_id: &str) -> JobStatus {
    for _ in 0..200 {
        let job = service.get_job(job_id).await.unwrap();
        if job.status.is_terminal() {
            return job.status;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never reached a terminal state", job_id);
}

#[tokio::test]
async fn test_create_assigns_sequential_ids_and_defaults() -> Result<()> {
    let h = instant_harness();

    let first = h
        .service
        .create_job(JobDraft {
            name: "first run".to_string(),
            ..Default::default()
        })
        .await?;
    let second = h
        .service
        .create_job(JobDraft {
            name: "second run".to_string(),
            epochs: Some(5),
            ..Default::default()
        })
        .await?;

    assert_eq!(first.id, "ft-001");
    assert_eq!(second.id, "ft-002");
    assert_eq!(first.status, JobStatus::Pending);
    assert_eq!(first.progress, 0);
    assert_eq!(first.model, "TinyLlama/TinyLlama-1.1B-Chat-v1.0");
    assert_eq!(first.dataset, "timdettmers/openassistant-guanaco");
    assert_eq!(first.epochs, 3);
    assert_eq!(second.epochs, 5);
    assert_eq!(first.lora_r, 8);
    assert_eq!(first.lora_alpha, 16);

    let jobs = h.service.list_jobs().await;
    assert_eq!(jobs.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_create_with_duplicate_explicit_id_conflicts() -> Result<()> {
    let h = instant_harness();

    h.service
        .create_job(JobDraft {
            id: Some("ft-custom".to_string()),
            name: "one".to_string(),
            ..Default::default()
        })
        .await?;

    let err = h
        .service
        .create_job(JobDraft {
            id: Some("ft-custom".to_string()),
            name: "two".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    Ok(())
}

#[tokio::test]
async fn test_concurrent_creates_assign_unique_ids() -> Result<()> {
    let h = instant_harness();

    let mut handles = Vec::new();
    for i in 0..16 {
        let service = h.service.clone();
        handles.push(tokio::spawn(async move {
            service
                .create_job(JobDraft {
                    name: format!("racer {}", i),
                    ..Default::default()
                })
                .await
        }));
    }

    let mut ids: Vec<String> = Vec::new();
    for handle in handles {
        ids.push(handle.await??.id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16, "every create must receive its own id");
    assert_eq!(h.service.list_jobs().await.len(), 16);
    Ok(())
}

#[tokio::test]
async fn test_get_missing_job_is_not_found() {
    let h = instant_harness();
    let err = h.service.get_job("ft-404").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_start_unknown_job_is_not_found() {
    let h = instant_harness();
    let err = h.service.start_job("ft-404").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_successful_run_completes_job() -> Result<()> {
    let h = instant_harness();
    let job = h
        .service
        .create_job(JobDraft {
            name: "happy path".to_string(),
            ..Default::default()
        })
        .await?;

    let response = h.service.start_job(&job.id).await?;
    assert_eq!(response.status, JobStatus::Running);
    assert_eq!(response.message, "Training started successfully");

    // Persisted transition happens before the execution unit finishes
    let started = h.service.get_job(&job.id).await?;
    assert!(started.started_at.is_some());

    let status = wait_for_terminal(&h.service, &job.id).await;
    assert_eq!(status, JobStatus::Completed);

    let done = h.service.get_job(&job.id).await?;
    assert_eq!(done.progress, 100);
    assert!(done.completed_at.is_some());
    // Final loss history is copied back onto the record
    assert_eq!(done.loss_history.unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_run_marks_job_failed() -> Result<()> {
    let h = build_harness(|_, _| Arc::new(FailingEngine));
    let job = h
        .service
        .create_job(JobDraft {
            name: "doomed".to_string(),
            ..Default::default()
        })
        .await?;

    h.service.start_job(&job.id).await?;
    let status = wait_for_terminal(&h.service, &job.id).await;
    assert_eq!(status, JobStatus::Failed);

    // Registry slot is freed once the execution unit finishes
    sleep(Duration::from_millis(50)).await;
    assert!(!h.service.running().is_running(&job.id));
    Ok(())
}

#[tokio::test]
async fn test_engine_error_marks_job_failed() -> Result<()> {
    let h = build_harness(|_, _| Arc::new(ErroringEngine));
    let job = h
        .service
        .create_job(JobDraft {
            name: "oom".to_string(),
            ..Default::default()
        })
        .await?;

    h.service.start_job(&job.id).await?;
    let status = wait_for_terminal(&h.service, &job.id).await;
    assert_eq!(status, JobStatus::Failed);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_start_is_rejected() -> Result<()> {
    let release = Arc::new(Notify::new());
    let engine_release = release.clone();
    let h = build_harness(move |_, _| {
        Arc::new(BlockingEngine {
            release: engine_release,
        })
    });

    let job = h
        .service
        .create_job(JobDraft {
            name: "long haul".to_string(),
            ..Default::default()
        })
        .await?;

    h.service.start_job(&job.id).await?;
    let err = h.service.start_job(&job.id).await.unwrap_err();
    assert!(err.is_conflict());

    release.notify_one();
    let status = wait_for_terminal(&h.service, &job.id).await;
    assert_eq!(status, JobStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_starts_have_one_winner() -> Result<()> {
    let release = Arc::new(Notify::new());
    let engine_release = release.clone();
    let h = build_harness(move |_, _| {
        Arc::new(BlockingEngine {
            release: engine_release,
        })
    });

    let job = h
        .service
        .create_job(JobDraft {
            name: "raced".to_string(),
            ..Default::default()
        })
        .await?;

    let s1 = h.service.clone();
    let s2 = h.service.clone();
    let id1 = job.id.clone();
    let id2 = job.id.clone();
    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { s1.start_job(&id1).await }),
        tokio::spawn(async move { s2.start_job(&id2).await }),
    );
    let results = [r1?, r2?];

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one start may win");
    let loser = results.iter().find(|r| r.is_err()).unwrap();
    assert!(loser.as_ref().unwrap_err().is_conflict());

    release.notify_one();
    wait_for_terminal(&h.service, &job.id).await;
    Ok(())
}

#[tokio::test]
async fn test_restart_after_completion_is_allowed() -> Result<()> {
    let h = instant_harness();
    let job = h
        .service
        .create_job(JobDraft {
            name: "again".to_string(),
            ..Default::default()
        })
        .await?;

    h.service.start_job(&job.id).await?;
    wait_for_terminal(&h.service, &job.id).await;
    sleep(Duration::from_millis(50)).await;

    // The freed registry slot lets the job run a second time
    h.service.start_job(&job.id).await?;
    let status = wait_for_terminal(&h.service, &job.id).await;
    assert_eq!(status, JobStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn test_delete_job_removes_record_artifacts_and_metrics() -> Result<()> {
    let h = instant_harness();
    let job = h
        .service
        .create_job(JobDraft {
            name: "ephemeral".to_string(),
            ..Default::default()
        })
        .await?;

    // Materialize artifacts and cached metrics
    h.service.get_logs(&job.id).await?;
    h.service.get_checkpoints(&job.id).await?;
    h.service.get_metrics(&job.id).await;
    assert!(!h.artifacts.load_logs(&job.id).await.is_empty());
    assert!(h.metrics.get(&job.id).is_some());

    h.service.delete_job(&job.id).await?;

    assert!(h.service.get_job(&job.id).await.unwrap_err().is_not_found());
    assert!(h.store.find_by_id(&job.id).await.is_none());
    assert!(h.artifacts.load_logs(&job.id).await.is_empty());
    assert!(h.artifacts.load_checkpoints(&job.id).await.is_empty());
    assert!(h.metrics.get(&job.id).is_none());

    let err = h.service.delete_job(&job.id).await.unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn test_delete_while_running_leaves_job_absent() -> Result<()> {
    let release = Arc::new(Notify::new());
    let engine_release = release.clone();
    let h = build_harness(move |_, _| {
        Arc::new(BlockingEngine {
            release: engine_release,
        })
    });

    let job = h
        .service
        .create_job(JobDraft {
            name: "doomed".to_string(),
            ..Default::default()
        })
        .await?;
    h.service.start_job(&job.id).await?;
    assert!(h.service.running().is_running(&job.id));

    h.service.delete_job(&job.id).await?;
    assert!(h.service.get_job(&job.id).await.unwrap_err().is_not_found());

    // The execution unit finishes against the missing record; its final
    // status write is a no-op and the record must not reappear
    release.notify_one();
    for _ in 0..200 {
        if h.service.running().running_count() == 0 {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.service.running().running_count(), 0);
    assert!(h.store.find_by_id(&job.id).await.is_none());
    assert!(h.service.list_jobs().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_metrics_for_unknown_job_returns_growing_demo_curve() {
    let h = instant_harness();

    let first = h.service.get_metrics("ft-ghost").await;
    assert_eq!(first.job_id, "ft-ghost");
    // 50 seeded points plus one live append
    assert_eq!(first.loss_history.len(), 51);
    assert_eq!(first.current_metrics.current_step, 510);
    assert_eq!(first.current_metrics.total_steps, 1000);
    assert_eq!(first.current_metrics.total_epochs, 5);
    assert!(first.loss_history.iter().all(|p| p.loss >= 0.1));

    let second = h.service.get_metrics("ft-ghost").await;
    assert_eq!(second.loss_history.len(), 52);
    assert_eq!(second.current_metrics.current_step, 520);
}

#[tokio::test]
async fn test_metrics_for_known_job_without_history_is_empty() -> Result<()> {
    let h = instant_harness();
    let job = h
        .service
        .create_job(JobDraft {
            name: "quiet".to_string(),
            ..Default::default()
        })
        .await?;

    let metrics = h.service.get_metrics(&job.id).await;
    assert!(metrics.loss_history.is_empty());
    assert_eq!(metrics.current_metrics.current_loss, 0.0);
    assert_eq!(metrics.current_metrics.current_step, 0);
    assert_eq!(metrics.current_metrics.total_steps, 1000);
    assert_eq!(metrics.current_metrics.total_epochs, 3);

    // Known jobs never get synthetic points appended
    let again = h.service.get_metrics(&job.id).await;
    assert!(again.loss_history.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_logs_materialize_once_and_stay_stable() -> Result<()> {
    let h = instant_harness();

    let first = h.service.get_logs("ft-demo").await?;
    assert_eq!(first.len(), 8);
    assert!(first.iter().any(|l| l.message.contains("ft-demo")));

    // Second read returns the persisted copy, not fresh demo data
    let second = h.service.get_logs("ft-demo").await?;
    assert_eq!(second.len(), first.len());
    assert_eq!(second[0].timestamp, first[0].timestamp);
    Ok(())
}

#[tokio::test]
async fn test_checkpoints_materialize_once() -> Result<()> {
    let h = instant_harness();

    let first = h.service.get_checkpoints("ft-demo").await?;
    assert_eq!(first.len(), 3);
    assert_eq!(first[0].id, "ckpt-ft-demo-1");
    assert_eq!(first[1].step, 200);

    let second = h.service.get_checkpoints("ft-demo").await?;
    assert_eq!(second.len(), 3);
    assert_eq!(second[0].timestamp, first[0].timestamp);
    Ok(())
}

#[tokio::test]
async fn test_download_checkpoint_serves_metadata_stand_in() -> Result<()> {
    let h = instant_harness();
    h.service.get_checkpoints("ft-demo").await?;

    let download = h
        .service
        .download_checkpoint("ft-demo", "ckpt-ft-demo-1")
        .await?;
    assert_eq!(download.content_type, "application/json");
    assert_eq!(download.file_name, "ft-demo-checkpoint-100.json");

    let data = tokio::fs::read(&download.path).await?;
    let body: serde_json::Value = serde_json::from_slice(&data)?;
    assert_eq!(body["job_id"], "ft-demo");
    assert_eq!(body["step"], 100);

    let err = h
        .service
        .download_checkpoint("ft-demo", "ckpt-missing")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}
