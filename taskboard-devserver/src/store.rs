//! In-memory task table behind the dev server's REST routes.
//!
//! The [`TaskTable`] keeps tasks in insertion order, which is the order the
//! list routes return them in. A failure switch lets tests make the next
//! few mutations fail the way a real backend might.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;

use taskboard_proto::api::TaskFilter;
use taskboard_proto::task::{Task, TaskId, TaskStatus, UserId};

/// Errors returned by [`TaskTable`] mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// No task with this id.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// The mutation was refused by the failure switch.
    #[error("{0}")]
    Rejected(String),
}

/// Thread-safe, ordered task collection.
pub struct TaskTable {
    tasks: RwLock<Vec<Task>>,
    reject_mutations: AtomicUsize,
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tasks(Vec::new())
    }

    /// Creates a table holding `tasks`, in order.
    #[must_use]
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: RwLock::new(tasks),
            reject_mutations: AtomicUsize::new(0),
        }
    }

    /// Tasks matching `filter` as seen by `actor`, in table order.
    pub async fn list(&self, filter: &TaskFilter, actor: Option<UserId>) -> Vec<Task> {
        self.tasks
            .read()
            .await
            .iter()
            .filter(|task| filter.matches(task, actor))
            .cloned()
            .collect()
    }

    /// Every task, in table order.
    pub async fn all(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }

    /// Looks up a task.
    pub async fn get(&self, task_id: TaskId) -> Option<Task> {
        self.tasks
            .read()
            .await
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
    }

    /// Appends a task, replacing any task with the same id in place.
    pub async fn insert(&self, task: Task) {
        let mut tasks = self.tasks.write().await;
        match tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task,
            None => tasks.push(task),
        }
    }

    /// Makes the next `n` mutations fail with [`TableError::Rejected`].
    pub fn reject_next_mutations(&self, n: usize) {
        self.reject_mutations.store(n, Ordering::SeqCst);
    }

    /// Sets a task's status and returns the updated task.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Rejected`] if the failure switch is armed, or
    /// [`TableError::NotFound`] for unknown ids.
    pub async fn set_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<Task, TableError> {
        self.check_failure_switch()?;
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or(TableError::NotFound(task_id))?;
        task.status = status;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    /// Removes a task and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Rejected`] if the failure switch is armed, or
    /// [`TableError::NotFound`] for unknown ids.
    pub async fn delete(&self, task_id: TaskId) -> Result<Task, TableError> {
        self.check_failure_switch()?;
        let mut tasks = self.tasks.write().await;
        let pos = tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or(TableError::NotFound(task_id))?;
        Ok(tasks.remove(pos))
    }

    fn check_failure_switch(&self) -> Result<(), TableError> {
        let armed = self
            .reject_mutations
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if armed {
            Err(TableError::Rejected("mutation rejected by failure switch".to_string()))
        } else {
            Ok(())
        }
    }
}
