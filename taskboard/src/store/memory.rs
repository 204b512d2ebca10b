//! In-memory task store for offline mode and testing.
//!
//! [`MemoryStore`] holds the authoritative task list in process. Besides
//! serving the [`TaskStore`] contract it records every call, can be told
//! to fail upcoming calls, and can hold responses behind a gate so tests
//! can observe the board while a request is still in flight.

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;

use taskboard_proto::api::TaskFilter;
use taskboard_proto::task::{Task, TaskId, TaskStatus, UserId};

use super::{StoreError, TaskStore};

/// A request received by a [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreCall {
    /// `fetch_tasks` with the given filter.
    Fetch(TaskFilter),
    /// `update_task_status` with the given id and status.
    UpdateStatus(TaskId, TaskStatus),
    /// `delete_task` with the given id.
    Delete(TaskId),
}

impl StoreCall {
    /// Returns `true` for status updates and deletions.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::Fetch(_))
    }
}

#[derive(Debug, Default)]
struct Inner {
    tasks: Vec<Task>,
    actor: Option<UserId>,
    calls: Vec<StoreCall>,
    failing_fetches: usize,
    failing_mutations: usize,
}

/// Task store backed by a `Vec` behind a mutex.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    /// `true` while responses may complete.
    gate: watch::Sender<bool>,
    /// Number of calls received so far.
    calls_seen: watch::Sender<usize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MemoryStore {
    /// Creates a store holding `tasks` in the given order.
    #[must_use]
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                tasks,
                ..Inner::default()
            }),
            gate: watch::channel(true).0,
            calls_seen: watch::channel(0).0,
        }
    }

    /// Sets the user that `mine_only` fetches are evaluated for.
    #[must_use]
    pub fn with_actor(self, actor: UserId) -> Self {
        self.inner.lock().actor = Some(actor);
        self
    }

    /// Returns a snapshot of the stored tasks.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.inner.lock().tasks.clone()
    }

    /// Replaces the stored tasks, as if another client had edited them.
    pub fn set_tasks(&self, tasks: Vec<Task>) {
        self.inner.lock().tasks = tasks;
    }

    /// Appends a task to the store.
    pub fn insert(&self, task: Task) {
        self.inner.lock().tasks.push(task);
    }

    /// Makes the next `n` fetches fail with [`StoreError::Unavailable`].
    pub fn fail_next_fetches(&self, n: usize) {
        self.inner.lock().failing_fetches = n;
    }

    /// Makes the next `n` mutations fail with [`StoreError::Unavailable`].
    pub fn fail_next_mutations(&self, n: usize) {
        self.inner.lock().failing_mutations = n;
    }

    /// Holds every response until [`resume`](Self::resume) is called.
    ///
    /// Calls are still recorded while paused.
    pub fn pause(&self) {
        self.gate.send_replace(false);
    }

    /// Releases held responses.
    pub fn resume(&self) {
        self.gate.send_replace(true);
    }

    /// Returns every call received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.lock().calls.clone()
    }

    /// Returns the number of status updates and deletions received.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .count()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
        self.calls_seen.send_replace(0);
    }

    /// Waits until at least `n` calls have been received.
    pub async fn wait_for_calls(&self, n: usize) {
        let mut rx = self.calls_seen.subscribe();
        let _ = rx.wait_for(|seen| *seen >= n).await;
    }

    /// Records a call and decides whether it has been told to fail.
    fn record(&self, call: StoreCall) -> Option<StoreError> {
        let mut inner = self.inner.lock();
        inner.calls.push(call);
        let seen = inner.calls.len();
        let budget = if call.is_mutation() {
            &mut inner.failing_mutations
        } else {
            &mut inner.failing_fetches
        };
        let failure = if *budget > 0 {
            *budget -= 1;
            Some(StoreError::Unavailable("injected failure".to_string()))
        } else {
            None
        };
        drop(inner);
        self.calls_seen.send_replace(seen);
        failure
    }

    async fn wait_until_open(&self) {
        let mut rx = self.gate.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

impl TaskStore for MemoryStore {
    async fn fetch_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let failure = self.record(StoreCall::Fetch(*filter));
        self.wait_until_open().await;
        if let Some(err) = failure {
            return Err(err);
        }
        let inner = self.inner.lock();
        Ok(inner
            .tasks
            .iter()
            .filter(|t| filter.matches(t, inner.actor))
            .cloned()
            .collect())
    }

    async fn update_task_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<(), StoreError> {
        let failure = self.record(StoreCall::UpdateStatus(task_id, status));
        self.wait_until_open().await;
        if let Some(err) = failure {
            return Err(err);
        }
        let mut inner = self.inner.lock();
        let task = inner
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or(StoreError::NotFound(task_id))?;
        task.status = status;
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<(), StoreError> {
        let failure = self.record(StoreCall::Delete(task_id));
        self.wait_until_open().await;
        if let Some(err) = failure {
            return Err(err);
        }
        let mut inner = self.inner.lock();
        let pos = inner
            .tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or(StoreError::NotFound(task_id))?;
        inner.tasks.remove(pos);
        Ok(())
    }
}
