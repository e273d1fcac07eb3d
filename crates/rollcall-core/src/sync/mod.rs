//! Background sync machinery: keyed job scheduling and the task coordinator.

mod manager;
mod scheduler;

pub use manager::{TaskManager, SYNC_TASK_KEY};
pub use scheduler::{job_fn, Job, JobId, JobOutcome, JobState, TaskScheduler, MAX_RUN_ATTEMPTS};
