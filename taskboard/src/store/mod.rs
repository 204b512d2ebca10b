//! Remote task store abstraction for `Taskboard`.
//!
//! Defines the [`TaskStore`] trait the board synchronizer talks to.
//! Concrete implementations:
//! - [`memory::MemoryStore`]: in-process store for offline mode and tests
//! - [`http::HttpStore`]: REST client for the Taskboard backend

pub mod http;
pub mod memory;

use std::future::Future;

use taskboard_proto::api::TaskFilter;
use taskboard_proto::task::{Task, TaskId, TaskStatus};

/// Errors returned by a [`TaskStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The request never reached the server or the connection dropped.
    #[error("network error: {0}")]
    Network(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The session is missing or has invalid credentials.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// The task does not exist on the server.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// The server answered with a non-success status.
    #[error("server rejected request ({status}): {detail}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Reason reported by the server.
        detail: String,
    },

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The store refused to serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Async access to the authoritative task collection.
///
/// The store is the single source of truth shared by every client. The
/// synchronizer never caches beyond one board view and recovers from
/// any error here by fetching again.
pub trait TaskStore: Send + Sync {
    /// Fetch every task matching `filter`, in server order.
    fn fetch_tasks(
        &self,
        filter: &TaskFilter,
    ) -> impl Future<Output = Result<Vec<Task>, StoreError>> + Send;

    /// Move a task to a new status.
    fn update_task_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete a task.
    fn delete_task(&self, task_id: TaskId) -> impl Future<Output = Result<(), StoreError>> + Send;
}
