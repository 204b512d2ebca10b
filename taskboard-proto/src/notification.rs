//! Messages pushed by the backend over the notification WebSocket.
//!
//! The backend tags every frame with a `type` field. Only task-related
//! frames matter to the board; everything else is informational.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::UserId;

/// Category of a stored notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A task was assigned to the recipient.
    TaskAssigned,
    /// A task the recipient follows changed.
    TaskUpdated,
    /// A task the recipient follows was completed.
    TaskCompleted,
    /// An AI task breakdown finished.
    AiAnalysisCompleted,
    /// Operator broadcast.
    SystemAlert,
}

impl NotificationKind {
    /// Returns `true` for kinds that imply task data changed on the server.
    #[must_use]
    pub const fn touches_tasks(self) -> bool {
        matches!(
            self,
            Self::TaskAssigned | Self::TaskUpdated | Self::TaskCompleted
        )
    }
}

/// A notification record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification id.
    pub id: u64,
    /// Recipient.
    pub user_id: UserId,
    /// Category.
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Deep link into the web client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
    /// Whether the recipient has seen it.
    #[serde(default)]
    pub is_read: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A frame received on the notification WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A new notification was stored for the connected user.
    NewNotification {
        /// The stored notification.
        data: Notification,
    },
    /// A task was assigned to the connected user.
    TaskAssigned {
        /// Opaque task summary.
        #[serde(default)]
        data: Option<serde_json::Value>,
    },
    /// Progress of a running AI analysis.
    AiProgress {
        /// Stage name.
        #[serde(default)]
        status: Option<String>,
        /// Progress text.
        #[serde(default)]
        message: Option<String>,
    },
}

impl ServerMessage {
    /// Returns `true` if the frame means the board should reload.
    #[must_use]
    pub const fn requests_board_refresh(&self) -> bool {
        match self {
            Self::NewNotification { data } => data.kind.touches_tasks(),
            Self::TaskAssigned { .. } => true,
            Self::AiProgress { .. } => false,
        }
    }
}
