//! Cooperative draining of the job store.
//!
//! The host calls [`JobProcessor::tick`] at idle points. A pass only runs when
//! processing was requested, and never while the type environment is being
//! rebuilt; in that case the request is re-armed for the next tick.

use std::time::Duration;

use super::job::{GenerationJob, JobId};
use super::store::JobStore;
use crate::binding::{AssetBinder, AssetStore, BindOutcome, TypeEnvironment};
use crate::error::{BindError, StoreError};
use crate::logging;

/// Whether a drain pass is pending. At most one request is outstanding.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerState {
    armed: bool,
}

impl SchedulerState {
    /// Arm the scheduler; false if it was already armed.
    pub fn arm(&mut self) -> bool {
        !std::mem::replace(&mut self.armed, true)
    }

    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.armed)
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

#[derive(Debug)]
pub struct JobFailure {
    pub job: JobId,
    pub error: BindError,
}

/// Per-job outcomes of one drain pass, in enqueue order.
#[derive(Debug, Default)]
pub struct DrainReport {
    pub bound: Vec<(JobId, BindOutcome)>,
    pub failed: Vec<JobFailure>,
}

impl DrainReport {
    pub fn attempted(&self) -> usize {
        self.bound.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempted() == 0
    }

    fn merge(&mut self, other: DrainReport) {
        self.bound.extend(other.bound);
        self.failed.extend(other.failed);
    }
}

#[derive(Debug)]
pub enum TickOutcome {
    /// Nothing was requested.
    Idle,
    /// The environment was unstable; the request stays armed.
    Deferred,
    Drained(DrainReport),
}

pub struct JobProcessor<S: JobStore> {
    store: S,
    scheduler: SchedulerState,
}

impl<S: JobStore> JobProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            scheduler: SchedulerState::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn scheduler(&self) -> SchedulerState {
        self.scheduler
    }

    /// Ask for a drain pass at the next tick. Returns false if one was
    /// already requested, so repeated triggers never queue extra passes.
    pub fn request_processing(&mut self) -> bool {
        let armed = self.scheduler.arm();
        if !armed {
            tracing::trace!("drain already scheduled");
        }
        armed
    }

    /// Run a scheduled pass if the environment allows it.
    pub fn tick(
        &mut self,
        environment: &dyn TypeEnvironment,
        assets: &mut dyn AssetStore,
    ) -> Result<TickOutcome, StoreError> {
        if !self.scheduler.take() {
            return Ok(TickOutcome::Idle);
        }
        if !environment.is_stable() {
            tracing::debug!("type environment unstable; deferring drain");
            self.scheduler.arm();
            return Ok(TickOutcome::Deferred);
        }

        let report = self.drain(environment, assets)?;
        if self.store.has_jobs()? {
            self.scheduler.arm();
        }
        Ok(TickOutcome::Drained(report))
    }

    /// Attempt every stored job once, in enqueue order, then remove all of
    /// them whatever the outcome.
    pub fn drain(
        &mut self,
        environment: &dyn TypeEnvironment,
        assets: &mut dyn AssetStore,
    ) -> Result<DrainReport, StoreError> {
        let mut jobs = self.store.read_all()?;
        if jobs.is_empty() {
            return Ok(DrainReport::default());
        }
        jobs.sort_by_key(GenerationJob::enqueued_at);
        let _span = logging::drain_span(jobs.len()).entered();
        tracing::info!("draining generation jobs");

        let mut report = DrainReport::default();
        let mut binder = AssetBinder::new(environment, assets);
        for job in &jobs {
            let id = job.id();
            match binder.bind(job) {
                Ok(outcome) => {
                    tracing::info!(
                        job = %id,
                        asset = %outcome.asset_path,
                        created = outcome.created,
                        "bound generated asset"
                    );
                    report.bound.push((id, outcome));
                }
                Err(error) => {
                    tracing::error!(
                        job = %id,
                        sheet = job.sheet_name(),
                        error = %error,
                        "failed to bind generated asset"
                    );
                    report.failed.push(JobFailure { job: id, error });
                }
            }
        }

        let attempted: Vec<JobId> = jobs.iter().map(GenerationJob::id).collect();
        self.store.remove(&attempted)?;
        Ok(report)
    }

    /// Request processing and keep ticking every `poll` until the store is
    /// empty, for hosts without an idle loop of their own. Waits indefinitely
    /// while the environment stays unstable.
    pub async fn run_until_drained(
        &mut self,
        environment: &dyn TypeEnvironment,
        assets: &mut dyn AssetStore,
        poll: Duration,
    ) -> Result<DrainReport, StoreError> {
        let mut total = DrainReport::default();
        if !self.store.has_jobs()? {
            return Ok(total);
        }
        self.request_processing();

        let mut interval = tokio::time::interval(poll);
        loop {
            interval.tick().await;
            match self.tick(environment, &mut *assets)? {
                TickOutcome::Drained(report) => total.merge(report),
                TickOutcome::Deferred => continue,
                TickOutcome::Idle => {}
            }
            if !self.scheduler.is_armed() && !self.store.has_jobs()? {
                return Ok(total);
            }
            if !self.scheduler.is_armed() {
                self.request_processing();
            }
        }
    }
}
