//! JSON-backed job registry
//!
//! All jobs live in a single `jobs.json` file. Mutations take a
//! read-modify-write lock so concurrent updates never clobber each other,
//! and every write is atomic at the filesystem level.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use job_core::{Error, Job, JobUpdate, Result};

use crate::files::{read_records, write_json_atomic};

/// File-backed registry of fine-tuning jobs
pub struct JobStore {
    /// Path to the registry file
    file_path: PathBuf,

    /// Serializes read-modify-write cycles across tasks
    write_lock: Mutex<()>,
}

impl JobStore {
    /// Create a store backed by `file_path`. The file is created lazily on
    /// first write.
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path to the backing registry file
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Load all jobs. Missing or corrupt registry files read as empty.
    pub async fn load(&self) -> Vec<Job> {
        read_records(&self.file_path).await
    }

    /// Find a single job by id
    pub async fn find_by_id(&self, job_id: &str) -> Option<Job> {
        self.load().await.into_iter().find(|j| j.id == job_id)
    }

    /// Number of jobs currently in the registry
    pub async fn count(&self) -> usize {
        self.load().await.len()
    }

    /// Append a job to the registry. Fails when the id is already taken.
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    pub async fn add(&self, job: Job) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut jobs = read_records::<Job>(&self.file_path).await;
        if jobs.iter().any(|j| j.id == job.id) {
            return Err(Error::JobAlreadyExists { job_id: job.id });
        }
        jobs.push(job);
        write_json_atomic(&self.file_path, &jobs).await?;

        info!(total = jobs.len(), "Job added to registry");
        Ok(())
    }

    /// Append a job, overwriting its id with the next free sequential
    /// `ft-NNN` slot. The probe and the append happen under one lock so
    /// concurrent callers never receive the same id.
    #[instrument(skip(self, job), fields(name = %job.name))]
    pub async fn add_assigning_id(&self, mut job: Job) -> Result<Job> {
        let _guard = self.write_lock.lock().await;

        let mut jobs = read_records::<Job>(&self.file_path).await;

        // Count-based ids can collide after deletions; bump to the next
        // free slot
        let mut n = jobs.len() + 1;
        job.id = loop {
            let candidate = format!("ft-{:03}", n);
            if !jobs.iter().any(|j| j.id == candidate) {
                break candidate;
            }
            n += 1;
        };

        jobs.push(job.clone());
        write_json_atomic(&self.file_path, &jobs).await?;

        info!(job_id = %job.id, total = jobs.len(), "Job added to registry");
        Ok(job)
    }

    /// Remove a job by id. Returns false when no such job exists.
    #[instrument(skip(self))]
    pub async fn remove_by_id(&self, job_id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut jobs = read_records::<Job>(&self.file_path).await;
        let before = jobs.len();
        jobs.retain(|j| j.id != job_id);

        if jobs.len() == before {
            return Ok(false);
        }

        write_json_atomic(&self.file_path, &jobs).await?;
        info!("Job removed from registry");
        Ok(true)
    }

    /// Apply a partial update to a job by id. Fields left unset in the
    /// update are preserved. Returns the updated job, or None when the id
    /// is unknown.
    #[instrument(skip(self, update))]
    pub async fn update_by_id(&self, job_id: &str, update: &JobUpdate) -> Result<Option<Job>> {
        let _guard = self.write_lock.lock().await;

        let mut jobs = read_records::<Job>(&self.file_path).await;
        let Some(job) = jobs.iter_mut().find(|j| j.id == job_id) else {
            debug!("Update targeted unknown job");
            return Ok(None);
        };

        job.apply(update);
        let updated = job.clone();

        write_json_atomic(&self.file_path, &jobs).await?;
        Ok(Some(updated))
    }
}
