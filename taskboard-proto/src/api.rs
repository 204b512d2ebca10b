//! Request and response bodies for the task REST routes.
//!
//! | Route | Body |
//! |-------|------|
//! | `GET /tasks/` , `GET /tasks/my` | [`TaskListResponse`] |
//! | `PATCH /tasks/{id}/status` | [`StatusUpdate`] |
//! | `DELETE /tasks/{id}` | none |
//!
//! Non-2xx responses carry an [`ErrorBody`].

use serde::{Deserialize, Serialize};

use crate::task::{RoomId, Task, TaskStatus, UserId};

/// Path segment listing every task visible to the caller.
pub const TASKS_PATH: &str = "tasks/";

/// Path segment listing only tasks assigned to the caller.
pub const MY_TASKS_PATH: &str = "tasks/my";

/// Page size requested when fetching a whole board.
pub const BOARD_PAGE_SIZE: u32 = 100;

/// Scope of a board fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskFilter {
    /// Restrict to one room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    /// Restrict to tasks assigned to the current actor.
    #[serde(default)]
    pub mine_only: bool,
}

impl TaskFilter {
    /// A filter matching every task the caller can see.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            room_id: None,
            mine_only: false,
        }
    }

    /// Restricts the filter to one room.
    #[must_use]
    pub const fn in_room(mut self, room_id: RoomId) -> Self {
        self.room_id = Some(room_id);
        self
    }

    /// Restricts the filter to the current actor's tasks.
    #[must_use]
    pub const fn mine(mut self) -> Self {
        self.mine_only = true;
        self
    }

    /// Route to fetch, relative to the API base URL.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        if self.mine_only {
            MY_TASKS_PATH
        } else {
            TASKS_PATH
        }
    }

    /// Returns `true` if `task` falls inside this scope for the given actor.
    ///
    /// `mine_only` never matches without an actor.
    #[must_use]
    pub fn matches(&self, task: &Task, actor: Option<UserId>) -> bool {
        if self.room_id.is_some() && task.room_id != self.room_id {
            return false;
        }
        if self.mine_only {
            return actor.is_some_and(|user| task.is_assigned_to(user));
        }
        true
    }

    /// Query parameters for the list route.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page_size", BOARD_PAGE_SIZE.to_string())];
        if let Some(room_id) = self.room_id {
            pairs.push(("room_id", room_id.to_string()));
        }
        pairs
    }
}

/// Paginated task list returned by the list routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskListResponse {
    /// Tasks on this page, in server order.
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Total number of matching tasks.
    #[serde(default)]
    pub total: u64,
    /// 1-based page number.
    #[serde(default = "first_page")]
    pub page: u32,
    /// Page size used by the server.
    #[serde(default)]
    pub page_size: u32,
    /// Number of pages.
    #[serde(default)]
    pub total_pages: u32,
}

const fn first_page() -> u32 {
    1
}

impl TaskListResponse {
    /// Wraps a complete task list as a single page.
    #[must_use]
    pub fn single_page(tasks: Vec<Task>) -> Self {
        let total = tasks.len() as u64;
        let page_size = u32::try_from(tasks.len()).unwrap_or(u32::MAX);
        Self {
            tasks,
            total,
            page: 1,
            page_size,
            total_pages: 1,
        }
    }
}

/// Body of `PATCH /tasks/{id}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// The new status.
    pub status: TaskStatus,
}

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable reason.
    pub detail: String,
}

impl ErrorBody {
    /// Builds an error body from any displayable reason.
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
