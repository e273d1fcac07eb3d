//! Replace-by-key job scheduler on top of tokio.
//!
//! Stands in for a platform job-scheduling framework: one logical queue per
//! key, where submitting under an in-use key cancels and supersedes the
//! existing job. Each job owns a watch channel publishing its lifecycle
//! state; terminal states are absorbing.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use uuid::Uuid;

/// Maximum number of run attempts for a single job, retries included.
pub const MAX_RUN_ATTEMPTS: u32 = 3;

const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Unique handle for a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduler-level job lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Accepted, not yet running.
    Queued,
    /// Currently executing an attempt.
    Running,
    /// Waiting out the backoff before the next attempt.
    Blocked,
    Succeeded,
    Cancelled,
    Failed,
}

impl JobState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Cancelled | Self::Failed)
    }
}

/// What a single run attempt asks the scheduler to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    /// Re-run, subject to the attempt budget.
    Retry,
    Failure,
}

/// A schedulable unit of work. `run` may be invoked several times when the
/// job asks for retries.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    async fn run(&self) -> JobOutcome;
}

struct FnJob<F>(F);

#[async_trait]
impl<F, Fut> Job for FnJob<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JobOutcome> + Send + 'static,
{
    async fn run(&self) -> JobOutcome {
        (self.0)().await
    }
}

/// Adapt a closure into a [`Job`].
pub fn job_fn<F, Fut>(f: F) -> impl Job
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JobOutcome> + Send + 'static,
{
    FnJob(f)
}

struct JobEntry {
    state: Arc<watch::Sender<JobState>>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    /// Current job per key; superseded jobs drop out of this map but stay
    /// queryable in `jobs`.
    active: HashMap<String, JobId>,
    jobs: HashMap<JobId, JobEntry>,
}

/// Replace-by-key scheduler. Must be used from within a tokio runtime.
pub struct TaskScheduler {
    registry: Mutex<Registry>,
    retry_backoff: Duration,
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Override the pause between retry attempts (tests mostly).
    #[must_use]
    pub const fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Submit a job under `key`, cancelling and superseding any job already
    /// scheduled under the same key.
    pub fn submit(&self, key: impl Into<String>, job: impl Job) -> JobId {
        self.submit_with_budget(key, job, MAX_RUN_ATTEMPTS)
    }

    /// Submit a job that fails terminally on its first non-success outcome.
    pub fn submit_once(&self, key: impl Into<String>, job: impl Job) -> JobId {
        self.submit_with_budget(key, job, 1)
    }

    fn submit_with_budget(&self, key: impl Into<String>, job: impl Job, budget: u32) -> JobId {
        let key = key.into();
        let id = JobId::new();
        let (state_tx, _) = watch::channel(JobState::Queued);
        let state = Arc::new(state_tx);

        let handle = tokio::spawn(run_job(
            Arc::new(job),
            Arc::clone(&state),
            budget,
            self.retry_backoff,
        ));

        let mut registry = self.registry.lock().expect("scheduler registry poisoned");
        if let Some(previous) = registry.active.insert(key.clone(), id) {
            if let Some(entry) = registry.jobs.get(&previous) {
                tracing::debug!("Replacing job {previous} under key {key}");
                cancel_entry(entry);
            }
        }
        registry.jobs.insert(id, JobEntry { state, handle });

        id
    }

    /// Point-in-time state lookup; `None` for unknown jobs.
    pub fn state(&self, id: JobId) -> Option<JobState> {
        let registry = self.registry.lock().expect("scheduler registry poisoned");
        registry.jobs.get(&id).map(|entry| *entry.state.borrow())
    }

    /// State of the job currently installed under `key`.
    pub fn state_for_key(&self, key: &str) -> Option<JobState> {
        let registry = self.registry.lock().expect("scheduler registry poisoned");
        let id = registry.active.get(key)?;
        registry.jobs.get(id).map(|entry| *entry.state.borrow())
    }

    /// Subscribe to a job's lifecycle; `None` for unknown jobs.
    pub fn subscribe(&self, id: JobId) -> Option<watch::Receiver<JobState>> {
        let registry = self.registry.lock().expect("scheduler registry poisoned");
        registry.jobs.get(&id).map(|entry| entry.state.subscribe())
    }

    /// Cancel every job that has not yet reached a terminal state.
    /// Best-effort: an attempt already past its last await may still finish.
    pub fn cancel_all(&self) {
        let registry = self.registry.lock().expect("scheduler registry poisoned");
        for entry in registry.jobs.values() {
            cancel_entry(entry);
        }
    }
}

fn cancel_entry(entry: &JobEntry) {
    // Terminal states are absorbing; a finished job keeps its outcome.
    let cancelled = entry.state.send_if_modified(|state| {
        if state.is_terminal() {
            false
        } else {
            *state = JobState::Cancelled;
            true
        }
    });
    if cancelled {
        entry.handle.abort();
    }
}

/// Advance the published state unless the job was already driven terminal
/// (e.g. cancelled by a replacement).
fn advance(state: &watch::Sender<JobState>, next: JobState) -> bool {
    state.send_if_modified(|current| {
        if current.is_terminal() {
            false
        } else {
            *current = next;
            true
        }
    })
}

async fn run_job(
    job: Arc<dyn Job>,
    state: Arc<watch::Sender<JobState>>,
    budget: u32,
    backoff: Duration,
) {
    if !advance(&state, JobState::Running) {
        return;
    }

    let mut attempts = 0;
    loop {
        attempts += 1;
        match job.run().await {
            JobOutcome::Success => {
                advance(&state, JobState::Succeeded);
                return;
            }
            JobOutcome::Retry if attempts < budget => {
                tracing::debug!("Job attempt {attempts} asked for retry");
                advance(&state, JobState::Blocked);
                sleep(backoff).await;
                if !advance(&state, JobState::Running) {
                    return;
                }
            }
            JobOutcome::Retry | JobOutcome::Failure => {
                tracing::debug!("Job failed terminally after {attempts} attempt(s)");
                advance(&state, JobState::Failed);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    async fn wait_for_state(scheduler: &TaskScheduler, id: JobId, wanted: JobState) {
        let mut rx = scheduler.subscribe(id).unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if *rx.borrow_and_update() == wanted {
                    return;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap_or_else(|_| panic!("job never reached {wanted:?}"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn successful_job_reaches_succeeded() {
        let scheduler = TaskScheduler::new();
        let id = scheduler.submit("k", job_fn(|| async { JobOutcome::Success }));

        wait_for_state(&scheduler, id, JobState::Succeeded).await;
        assert_eq!(scheduler.state(id), Some(JobState::Succeeded));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_job_has_no_state() {
        let scheduler = TaskScheduler::new();
        assert_eq!(scheduler.state(JobId::new()), None);
        assert!(scheduler.subscribe(JobId::new()).is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn retrying_job_runs_exactly_three_attempts() {
        let scheduler = TaskScheduler::new().with_retry_backoff(Duration::from_millis(5));
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&attempts);
        let id = scheduler.submit(
            "k",
            job_fn(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    JobOutcome::Retry
                }
            }),
        );

        wait_for_state(&scheduler, id, JobState::Failed).await;
        assert_eq!(attempts.load(Ordering::SeqCst), MAX_RUN_ATTEMPTS);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn submit_once_fails_on_first_retry_request() {
        let scheduler = TaskScheduler::new();
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&attempts);
        let id = scheduler.submit_once(
            "k",
            job_fn(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    JobOutcome::Retry
                }
            }),
        );

        wait_for_state(&scheduler, id, JobState::Failed).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resubmitting_a_key_cancels_the_previous_job() {
        let scheduler = TaskScheduler::new();

        let first = scheduler.submit(
            "note-9",
            job_fn(|| async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                JobOutcome::Success
            }),
        );
        let second = scheduler.submit("note-9", job_fn(|| async { JobOutcome::Success }));

        wait_for_state(&scheduler, first, JobState::Cancelled).await;
        wait_for_state(&scheduler, second, JobState::Succeeded).await;
        assert_eq!(scheduler.state_for_key("note-9"), Some(JobState::Succeeded));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancel_all_stops_pending_jobs_but_keeps_finished_outcomes() {
        let scheduler = TaskScheduler::new();

        let finished = scheduler.submit("a", job_fn(|| async { JobOutcome::Success }));
        wait_for_state(&scheduler, finished, JobState::Succeeded).await;

        let pending = scheduler.submit(
            "b",
            job_fn(|| async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                JobOutcome::Success
            }),
        );

        scheduler.cancel_all();

        wait_for_state(&scheduler, pending, JobState::Cancelled).await;
        assert_eq!(scheduler.state(finished), Some(JobState::Succeeded));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn distinct_keys_run_independently() {
        let scheduler = TaskScheduler::new();

        let a = scheduler.submit("a", job_fn(|| async { JobOutcome::Success }));
        let b = scheduler.submit("b", job_fn(|| async { JobOutcome::Failure }));

        wait_for_state(&scheduler, a, JobState::Succeeded).await;
        wait_for_state(&scheduler, b, JobState::Failed).await;
    }
}
