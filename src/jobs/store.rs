//! Durable persistence for pending generation jobs.
//!
//! Every mutation is a read-modify-write of the whole collection. There is a
//! single logical writer, so no locking is involved.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::job::{GenerationJob, JobId, JobRequest};
use crate::codegen::writer::atomic_write;
use crate::error::StoreError;

/// Whole-collection persistence for jobs.
pub trait JobStore {
    /// All stored jobs in enqueue order. An absent or empty store holds zero jobs.
    fn read_all(&self) -> Result<Vec<GenerationJob>, StoreError>;

    fn write_all(&mut self, jobs: &[GenerationJob]) -> Result<(), StoreError>;

    fn enqueue(&mut self, request: JobRequest) -> Result<GenerationJob, StoreError> {
        self.enqueue_at(request, Utc::now())
    }

    /// Append a job stamped no earlier than `now`. If the clock has not moved
    /// past the newest stored job the stamp is bumped by one microsecond.
    fn enqueue_at(
        &mut self,
        request: JobRequest,
        now: DateTime<Utc>,
    ) -> Result<GenerationJob, StoreError> {
        let mut jobs = self.read_all()?;
        let enqueued_at = match jobs.iter().map(GenerationJob::enqueued_at).max() {
            Some(latest) if latest >= now => latest + Duration::microseconds(1),
            _ => now,
        };
        let job = GenerationJob::new(request, enqueued_at);
        jobs.push(job.clone());
        self.write_all(&jobs)?;
        tracing::debug!(job = %job.id(), "enqueued generation job");
        Ok(job)
    }

    /// Remove the given jobs; returns how many were present.
    fn remove(&mut self, ids: &[JobId]) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let jobs = self.read_all()?;
        let before = jobs.len();
        let kept: Vec<GenerationJob> = jobs
            .into_iter()
            .filter(|job| !ids.contains(&job.id()))
            .collect();
        let removed = before - kept.len();
        if removed > 0 {
            self.write_all(&kept)?;
        }
        Ok(removed)
    }

    fn has_jobs(&self) -> Result<bool, StoreError> {
        Ok(!self.read_all()?.is_empty())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.write_all(&[])
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct JobFile {
    #[serde(default)]
    jobs: Vec<GenerationJob>,
}

/// Jobs persisted as a JSON document on disk.
///
/// Survives process restarts; writes are atomic.
#[derive(Debug, Clone)]
pub struct FileJobStore {
    path: PathBuf,
}

impl FileJobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl JobStore for FileJobStore {
    fn read_all(&self) -> Result<Vec<GenerationJob>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io(&self.path, err)),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let file: JobFile = serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let mut jobs = file.jobs;
        jobs.sort_by_key(GenerationJob::enqueued_at);
        Ok(jobs)
    }

    fn write_all(&mut self, jobs: &[GenerationJob]) -> Result<(), StoreError> {
        let file = JobFile {
            jobs: jobs.to_vec(),
        };
        let text = serde_json::to_string_pretty(&file)?;
        atomic_write(&self.path, text.as_bytes())
    }
}

/// Session-scoped store; jobs live as long as the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    jobs: Vec<GenerationJob>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryJobStore {
    fn read_all(&self) -> Result<Vec<GenerationJob>, StoreError> {
        Ok(self.jobs.clone())
    }

    fn write_all(&mut self, jobs: &[GenerationJob]) -> Result<(), StoreError> {
        self.jobs = jobs.to_vec();
        Ok(())
    }
}
