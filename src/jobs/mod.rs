//! The durable generation job queue.
//!
//! A job records the decision to materialize a sheet's payload into a
//! container type that may not be compiled yet. Jobs survive until a drain
//! pass attempts them once; delivery is at-least-once, and rebinding a job
//! updates the same asset, so a repeated attempt after a crash is harmless.

pub mod job;
pub mod processor;
pub mod store;

pub use job::{GenerationJob, JobId, JobRequest};
pub use processor::{DrainReport, JobFailure, JobProcessor, SchedulerState, TickOutcome};
pub use store::{FileJobStore, JobStore, MemoryJobStore};
