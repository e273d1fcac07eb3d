//! Task coordinator bridging local-only state to eventual remote consistency.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, Stream};
use tokio::sync::watch;

use crate::error::Result;
use crate::models::{Note, NoteId, NoteTask, TaskAction, TaskState};
use crate::remote::NoteBackend;
use crate::store::NoteStore;

use super::scheduler::{Job, JobId, JobOutcome, JobState, TaskScheduler};

/// Name of the single bulk-sync job slot.
pub const SYNC_TASK_KEY: &str = "rollcall-sync";

impl From<JobState> for TaskState {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Queued | JobState::Running | JobState::Blocked => Self::Scheduled,
            JobState::Succeeded => Self::Completed,
            JobState::Cancelled => Self::Cancelled,
            JobState::Failed => Self::Failed,
        }
    }
}

/// Schedules reconciliation work and exposes its lifecycle to the UI layer.
#[derive(Clone)]
pub struct TaskManager {
    store: NoteStore,
    backend: Arc<dyn NoteBackend>,
    scheduler: Arc<TaskScheduler>,
}

impl TaskManager {
    pub fn new(store: NoteStore, backend: Arc<dyn NoteBackend>) -> Self {
        Self::with_scheduler(store, backend, Arc::new(TaskScheduler::new()))
    }

    pub fn with_scheduler(
        store: NoteStore,
        backend: Arc<dyn NoteBackend>,
        scheduler: Arc<TaskScheduler>,
    ) -> Self {
        Self {
            store,
            backend,
            scheduler,
        }
    }

    /// Schedule (or replace) the single bulk-sync job: pull the remote list
    /// and merge it into the local store, skipping notes with in-flight
    /// tasks. Fails terminally on first error.
    pub fn sync_notes(&self) -> JobId {
        let job = SyncJob {
            store: self.store.clone(),
            backend: Arc::clone(&self.backend),
            scheduler: Arc::clone(&self.scheduler),
        };
        self.scheduler.submit_once(SYNC_TASK_KEY, job)
    }

    /// Schedule a reconciliation task for one note, replacing any task
    /// already pending under that note's key.
    pub fn schedule_task(&self, task: NoteTask) -> JobId {
        let key = task.note_id.as_str().to_string();
        let job = NoteTaskJob {
            store: self.store.clone(),
            backend: Arc::clone(&self.backend),
            task,
        };
        self.scheduler.submit(key, job)
    }

    /// Point-in-time task state; `None` for unknown jobs.
    pub fn task_state(&self, id: JobId) -> Option<TaskState> {
        self.scheduler.state(id).map(TaskState::from)
    }

    /// State of the task currently pending for a note, if any.
    pub fn task_state_for_note(&self, note_id: &NoteId) -> Option<TaskState> {
        self.scheduler
            .state_for_key(note_id.as_str())
            .map(TaskState::from)
    }

    /// Observe a task's lifecycle. Consecutive duplicates are collapsed and
    /// the stream ends right after the first terminal state: downstream
    /// consumers key their loading indicators off "still emitting".
    pub fn observe_task(&self, id: JobId) -> impl Stream<Item = TaskState> + Send + 'static {
        let rx = self.scheduler.subscribe(id);
        stream::unfold(ObserveState { rx, last: None }, |mut observe| async move {
            loop {
                let state = TaskState::from(*observe.rx.as_mut()?.borrow_and_update());
                if observe.last != Some(state) {
                    observe.last = Some(state);
                    if state.is_terminal() {
                        observe.rx = None;
                    }
                    return Some((state, observe));
                }
                if observe.rx.as_mut()?.changed().await.is_err() {
                    return None;
                }
            }
        })
    }

    /// Cancel every outstanding job. Best-effort: in-flight remote calls may
    /// still reach the server.
    pub fn abort_all_tasks(&self) {
        tracing::info!("Aborting all scheduled tasks");
        self.scheduler.cancel_all();
    }
}

struct ObserveState {
    rx: Option<watch::Receiver<JobState>>,
    last: Option<TaskState>,
}

/// Bulk sync worker: overwrite local notes with the remote list, except
/// those with a non-terminal pending task (their local edit wins until the
/// task resolves).
struct SyncJob {
    store: NoteStore,
    backend: Arc<dyn NoteBackend>,
    scheduler: Arc<TaskScheduler>,
}

impl SyncJob {
    async fn sync(&self) -> Result<()> {
        let notes: Vec<Note> = self
            .backend
            .fetch_notes()
            .await?
            .into_iter()
            .filter(|note| self.should_replace(&note.id))
            .collect();

        tracing::debug!("Merging {} remote notes into the local store", notes.len());
        self.store.upsert_notes(&notes).await
    }

    /// The task key is derived from the note ID; a non-terminal state there
    /// means a local change is still in flight.
    fn should_replace(&self, id: &NoteId) -> bool {
        self.scheduler
            .state_for_key(id.as_str())
            .is_none_or(JobState::is_terminal)
    }
}

#[async_trait]
impl Job for SyncJob {
    async fn run(&self) -> JobOutcome {
        match self.sync().await {
            Ok(()) => JobOutcome::Success,
            Err(error) => {
                tracing::warn!("Note sync failed: {error}");
                JobOutcome::Failure
            }
        }
    }
}

/// Per-note reconciliation worker: one remote create/update/delete per run
/// attempt; non-success asks the scheduler for a retry.
struct NoteTaskJob {
    store: NoteStore,
    backend: Arc<dyn NoteBackend>,
    task: NoteTask,
}

impl NoteTaskJob {
    async fn local_note(&self) -> Option<Note> {
        self.store
            .get_note(&self.task.note_id)
            .await
            .ok()
            .flatten()
    }

    async fn create(&self) -> JobOutcome {
        let Some(note) = self.local_note().await else {
            tracing::warn!("Note {} vanished before create-sync", self.task.note_id);
            return JobOutcome::Failure;
        };

        match self.backend.create_note(&note.title, &note.body).await {
            Ok(server_id) => {
                let server_id = NoteId::from(server_id);
                match self.store.reassign_id(&note.id, &server_id).await {
                    Ok(()) => JobOutcome::Success,
                    Err(error) => {
                        tracing::warn!("Failed to promote {} to {server_id}: {error}", note.id);
                        JobOutcome::Failure
                    }
                }
            }
            Err(error) => {
                tracing::debug!("Remote create failed, will retry: {error}");
                JobOutcome::Retry
            }
        }
    }

    async fn update(&self) -> JobOutcome {
        let Some(note) = self.local_note().await else {
            tracing::warn!("Note {} vanished before update-sync", self.task.note_id);
            return JobOutcome::Failure;
        };

        match self
            .backend
            .update_note(&note.id, &note.title, &note.body)
            .await
        {
            Ok(_) => JobOutcome::Success,
            Err(error) => {
                tracing::debug!("Remote update failed, will retry: {error}");
                JobOutcome::Retry
            }
        }
    }

    async fn delete(&self) -> JobOutcome {
        match self.backend.delete_note(&self.task.note_id).await {
            Ok(_) => JobOutcome::Success,
            Err(error) => {
                tracing::debug!("Remote delete failed, will retry: {error}");
                JobOutcome::Retry
            }
        }
    }
}

#[async_trait]
impl Job for NoteTaskJob {
    async fn run(&self) -> JobOutcome {
        match self.task.action {
            TaskAction::Create => self.create().await,
            TaskAction::Update => self.update().await,
            TaskAction::Delete => self.delete().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::sync::scheduler::MAX_RUN_ATTEMPTS;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Scripted stand-in for the REST backend.
    #[derive(Default)]
    struct FakeBackend {
        calls: Mutex<Vec<String>>,
        create_attempts: AtomicU32,
        remote_notes: Mutex<Vec<Note>>,
        created_id: Mutex<Option<String>>,
        fail_all: bool,
        /// When set, update calls park here until notified (never, in tests
        /// that use it) so the task stays in flight.
        block_updates: Option<Arc<Notify>>,
    }

    impl FakeBackend {
        fn recorded_calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl NoteBackend for FakeBackend {
        async fn fetch_notes(&self) -> Result<Vec<Note>> {
            if self.fail_all {
                return Err(Error::remote("Can't sync latest notes"));
            }
            Ok(self.remote_notes.lock().unwrap().clone())
        }

        async fn create_note(&self, title: &str, _body: &str) -> Result<String> {
            self.create_attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail_all {
                return Err(Error::remote("Something went wrong!"));
            }
            self.record(format!("create:{title}"));
            let id = self
                .created_id
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| "server-id".to_string());
            Ok(id)
        }

        async fn update_note(&self, id: &NoteId, _title: &str, _body: &str) -> Result<String> {
            if let Some(gate) = &self.block_updates {
                gate.notified().await;
            }
            if self.fail_all {
                return Err(Error::remote("Something went wrong!"));
            }
            self.record(format!("update:{id}"));
            Ok(id.to_string())
        }

        async fn delete_note(&self, id: &NoteId) -> Result<String> {
            if self.fail_all {
                return Err(Error::remote("Something went wrong!"));
            }
            self.record(format!("delete:{id}"));
            Ok(id.to_string())
        }
    }

    fn fast_scheduler() -> Arc<TaskScheduler> {
        Arc::new(TaskScheduler::new().with_retry_backoff(Duration::from_millis(5)))
    }

    async fn manager_with(backend: FakeBackend) -> (TaskManager, NoteStore, Arc<FakeBackend>) {
        let store = NoteStore::open_in_memory().await.unwrap();
        let backend = Arc::new(backend);
        let manager = TaskManager::with_scheduler(
            store.clone(),
            Arc::clone(&backend) as Arc<dyn NoteBackend>,
            fast_scheduler(),
        );
        (manager, store, backend)
    }

    async fn observe_to_end(
        manager: &TaskManager,
        id: JobId,
    ) -> Vec<TaskState> {
        tokio::time::timeout(
            Duration::from_secs(5),
            manager.observe_task(id).collect::<Vec<_>>(),
        )
        .await
        .expect("task never reached a terminal state")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_task_promotes_the_temporary_id() {
        let backend = FakeBackend {
            created_id: Mutex::new(Some("5ed1aca3".to_string())),
            ..FakeBackend::default()
        };
        let (manager, store, _backend) = manager_with(backend).await;

        let temp_id = store.add_note("T", "B").await.unwrap();
        assert!(temp_id.is_temporary());

        let job = manager.schedule_task(NoteTask::create(temp_id.clone()));
        let states = observe_to_end(&manager, job).await;
        assert_eq!(states.last(), Some(&TaskState::Completed));

        assert!(store.get_note(&temp_id).await.unwrap().is_none());
        let promoted = store
            .get_note(&NoteId::from("5ed1aca3"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(promoted.title, "T");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn observed_states_are_distinct_and_end_terminally() {
        let (manager, store, _backend) = manager_with(FakeBackend {
            fail_all: true,
            ..FakeBackend::default()
        })
        .await;

        let id = store.add_note("T", "B").await.unwrap();
        let job = manager.schedule_task(NoteTask::create(id));
        let states = observe_to_end(&manager, job).await;

        // Every retry keeps the task in Scheduled, so the observer sees it
        // once, then the single terminal Failed.
        assert!(!states.is_empty() && states.len() <= 2);
        assert_eq!(states.last(), Some(&TaskState::Failed));
        let terminal_count = states.iter().filter(|state| state.is_terminal()).count();
        assert_eq!(terminal_count, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failing_backend_is_tried_exactly_three_times() {
        let (manager, store, backend) = manager_with(FakeBackend {
            fail_all: true,
            ..FakeBackend::default()
        })
        .await;

        let id = store.add_note("T", "B").await.unwrap();
        let job = manager.schedule_task(NoteTask::create(id));
        let states = observe_to_end(&manager, job).await;

        assert_eq!(states.last(), Some(&TaskState::Failed));
        assert_eq!(backend.create_attempts.load(Ordering::SeqCst), MAX_RUN_ATTEMPTS);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_task_for_a_note_replaces_the_first() {
        let gate = Arc::new(Notify::new());
        let (manager, store, backend) = manager_with(FakeBackend {
            block_updates: Some(Arc::clone(&gate)),
            ..FakeBackend::default()
        })
        .await;

        let id = store.add_note("T", "B").await.unwrap();
        let update_job = manager.schedule_task(NoteTask::update(id.clone()));
        let delete_job = manager.schedule_task(NoteTask::delete(id.clone()));

        let states = observe_to_end(&manager, delete_job).await;
        assert_eq!(states.last(), Some(&TaskState::Completed));
        assert_eq!(manager.task_state(update_job), Some(TaskState::Cancelled));

        // Only the superseding task's remote call was made.
        assert_eq!(backend.recorded_calls(), vec![format!("delete:{id}")]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sync_merges_remote_notes_but_skips_pending_ones() {
        let gate = Arc::new(Notify::new());
        let remote = vec![
            Note {
                id: NoteId::from("n1"),
                title: "Server n1".to_string(),
                body: "server".to_string(),
                created_at: 10,
            },
            Note {
                id: NoteId::from("n2"),
                title: "Server n2".to_string(),
                body: "server".to_string(),
                created_at: 20,
            },
        ];
        let (manager, store, _backend) = manager_with(FakeBackend {
            remote_notes: Mutex::new(remote),
            block_updates: Some(Arc::clone(&gate)),
            ..FakeBackend::default()
        })
        .await;

        // Local n1 has an in-flight edit that must not be clobbered.
        store
            .upsert_notes(&[Note {
                id: NoteId::from("n1"),
                title: "Local edit".to_string(),
                body: "local".to_string(),
                created_at: 10,
            }])
            .await
            .unwrap();
        manager.schedule_task(NoteTask::update(NoteId::from("n1")));

        let sync_job = manager.sync_notes();
        let states = observe_to_end(&manager, sync_job).await;
        assert_eq!(states.last(), Some(&TaskState::Completed));

        let n1 = store.get_note(&NoteId::from("n1")).await.unwrap().unwrap();
        assert_eq!(n1.title, "Local edit");
        let n2 = store.get_note(&NoteId::from("n2")).await.unwrap().unwrap();
        assert_eq!(n2.title, "Server n2");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_sync_reports_terminal_failure_without_retry() {
        let (manager, _store, _backend) = manager_with(FakeBackend {
            fail_all: true,
            ..FakeBackend::default()
        })
        .await;

        let job = manager.sync_notes();
        let states = observe_to_end(&manager, job).await;
        assert_eq!(states.last(), Some(&TaskState::Failed));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn logout_aborts_tasks_and_wipes_the_store() {
        let gate = Arc::new(Notify::new());
        let (manager, store, _backend) = manager_with(FakeBackend {
            block_updates: Some(Arc::clone(&gate)),
            ..FakeBackend::default()
        })
        .await;

        let id = store.add_note("T", "B").await.unwrap();
        let pending = manager.schedule_task(NoteTask::update(id));

        manager.abort_all_tasks();
        store.delete_all_notes().await.unwrap();

        let states = observe_to_end(&manager, pending).await;
        assert_eq!(states.last(), Some(&TaskState::Cancelled));
        assert!(store.list_notes().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn job_state_projection_is_lossy_but_total() {
        assert_eq!(TaskState::from(JobState::Queued), TaskState::Scheduled);
        assert_eq!(TaskState::from(JobState::Running), TaskState::Scheduled);
        assert_eq!(TaskState::from(JobState::Blocked), TaskState::Scheduled);
        assert_eq!(TaskState::from(JobState::Succeeded), TaskState::Completed);
        assert_eq!(TaskState::from(JobState::Cancelled), TaskState::Cancelled);
        assert_eq!(TaskState::from(JobState::Failed), TaskState::Failed);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_job_yields_no_state_and_an_empty_stream() {
        let (manager, _store, _backend) = manager_with(FakeBackend::default()).await;

        let bogus = {
            // A finished scheduler elsewhere could have issued this ID; the
            // manager must answer None rather than panic.
            let other = TaskScheduler::new();
            other.submit("x", crate::sync::job_fn(|| async { JobOutcome::Success }))
        };

        assert_eq!(manager.task_state(bogus), None);
        let states = observe_to_end(&manager, bogus).await;
        assert!(states.is_empty());
    }
}
