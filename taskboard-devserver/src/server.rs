//! Dev server core: shared state, REST routes, and the notification socket.
//!
//! Serves the same routes as the Taskboard backend, under `/api`:
//!
//! | Method   | Path                      | Effect                          |
//! |----------|---------------------------|---------------------------------|
//! | `GET`    | `/api/tasks/`             | list tasks (`room_id` filter)   |
//! | `GET`    | `/api/tasks/my`           | list the caller's tasks         |
//! | `PATCH`  | `/api/tasks/{id}/status`  | change a task's status          |
//! | `DELETE` | `/api/tasks/{id}`         | delete a task                   |
//! | `GET`    | `/ws`                     | notification WebSocket          |
//!
//! Every successful mutation is broadcast to connected sockets as a
//! `new_notification` of kind `task_updated`.
//!
//! Callers identify themselves with `Authorization: Bearer user-<id>`.
//! Only `/api/tasks/my` requires it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch};
use axum::{Json, Router};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;

use taskboard_proto::api::{
    BOARD_PAGE_SIZE, ErrorBody, StatusUpdate, TaskFilter, TaskListResponse,
};
use taskboard_proto::codec;
use taskboard_proto::notification::{Notification, NotificationKind, ServerMessage};
use taskboard_proto::task::{RoomId, Task, TaskId, UserId};

use crate::store::{TableError, TaskTable};

/// Buffered notifications per socket before slow sockets start lagging.
const NOTIFICATION_BUFFER: usize = 256;

/// Shared dev server state: the task table and the notification fan-out.
pub struct ServerState {
    /// The task table.
    pub tasks: TaskTable,
    max_page_size: u32,
    notifications: broadcast::Sender<ServerMessage>,
    next_notification_id: AtomicU64,
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new(TaskTable::new())
    }
}

impl ServerState {
    /// Creates server state around a task table.
    #[must_use]
    pub fn new(tasks: TaskTable) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_BUFFER);
        Self {
            tasks,
            max_page_size: BOARD_PAGE_SIZE,
            notifications,
            next_notification_id: AtomicU64::new(1),
        }
    }

    /// Caps the page size of the list routes. Larger requests are cut down
    /// to `max` and zero is treated as one.
    #[must_use]
    pub fn with_max_page_size(mut self, max: u32) -> Self {
        self.max_page_size = max.max(1);
        self
    }

    /// Sends a message to every connected notification socket.
    ///
    /// Returns the number of sockets it was queued for.
    pub fn publish(&self, message: ServerMessage) -> usize {
        self.notifications.send(message).unwrap_or(0)
    }

    /// Number of connected notification sockets.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.notifications.receiver_count()
    }

    fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.notifications.subscribe()
    }

    fn task_updated(&self, actor: Option<UserId>, task: &Task, message: String) {
        let notification = Notification {
            id: self.next_notification_id.fetch_add(1, Ordering::Relaxed),
            user_id: actor.unwrap_or(task.created_by_id),
            kind: NotificationKind::TaskUpdated,
            title: "Task updated".to_string(),
            message,
            link_url: Some(format!("/tasks/{}", task.id)),
            is_read: false,
            created_at: Utc::now(),
        };
        let sockets = self.publish(ServerMessage::NewNotification { data: notification });
        tracing::debug!(task_id = %task.id, sockets, "broadcast task update");
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error responses, rendered as `{"detail": "..."}`.
#[derive(Debug)]
enum ApiError {
    Unauthorized,
    NotFound,
    Rejected(String),
}

impl From<TableError> for ApiError {
    fn from(e: TableError) -> Self {
        match e {
            TableError::NotFound(_) => Self::NotFound,
            TableError::Rejected(reason) => Self::Rejected(reason),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Not authenticated".to_string()),
            Self::NotFound => (StatusCode::NOT_FOUND, "Task not found".to_string()),
            Self::Rejected(reason) => (StatusCode::BAD_REQUEST, reason),
        };
        (status, Json(ErrorBody::new(detail))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// Query string of the list routes.
#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    room_id: Option<u64>,
    page: Option<u32>,
    page_size: Option<u32>,
}

/// Builds the router for `state`.
pub fn router(state: Arc<ServerState>) -> Router {
    let api = Router::new()
        .route("/tasks", get(list_tasks))
        .route("/tasks/", get(list_tasks))
        .route("/tasks/my", get(list_my_tasks))
        .route("/tasks/{id}", delete(delete_task))
        .route("/tasks/{id}/status", patch(update_status));

    Router::new()
        .nest("/api", api)
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Extracts the caller from `Authorization: Bearer user-<id>`.
fn actor(headers: &HeaderMap) -> Option<UserId> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim()
        .strip_prefix("user-")?
        .parse()
        .ok()
        .map(UserId::new)
}

async fn list_tasks(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Json<TaskListResponse> {
    let filter = filter_for(&query, false);
    let tasks = state.tasks.list(&filter, actor(&headers)).await;
    Json(paginate(tasks, &query, state.max_page_size))
}

async fn list_my_tasks(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let actor = actor(&headers).ok_or(ApiError::Unauthorized)?;
    let filter = filter_for(&query, true);
    let tasks = state.tasks.list(&filter, Some(actor)).await;
    Ok(Json(paginate(tasks, &query, state.max_page_size)))
}

async fn update_status(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Task>, ApiError> {
    let task_id = TaskId::new(id);
    let task = state.tasks.set_status(task_id, update.status).await.map_err(|e| {
        tracing::info!(task_id = %task_id, error = %e, "status update refused");
        ApiError::from(e)
    })?;
    tracing::info!(task_id = %task_id, status = %update.status, "task status updated");
    state.task_updated(
        actor(&headers),
        &task,
        format!("Task \"{}\" moved to {}", task.title, update.status.title()),
    );
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let task_id = TaskId::new(id);
    let task = state.tasks.delete(task_id).await.map_err(|e| {
        tracing::info!(task_id = %task_id, error = %e, "delete refused");
        ApiError::from(e)
    })?;
    tracing::info!(task_id = %task_id, "task deleted");
    state.task_updated(
        actor(&headers),
        &task,
        format!("Task \"{}\" was deleted", task.title),
    );
    Ok(StatusCode::NO_CONTENT)
}

fn filter_for(query: &ListQuery, mine_only: bool) -> TaskFilter {
    let filter = query
        .room_id
        .map_or_else(TaskFilter::all, |room| TaskFilter::all().in_room(RoomId::new(room)));
    if mine_only { filter.mine() } else { filter }
}

fn paginate(tasks: Vec<Task>, query: &ListQuery, max_page_size: u32) -> TaskListResponse {
    let page_size = query
        .page_size
        .unwrap_or(BOARD_PAGE_SIZE)
        .clamp(1, max_page_size.max(1));
    let page = query.page.unwrap_or(1).max(1);
    let total = tasks.len();
    let per_page = page_size as usize;
    let total_pages = u32::try_from(total.div_ceil(per_page).max(1)).unwrap_or(u32::MAX);
    let skip = (page as usize - 1).saturating_mul(per_page);
    TaskListResponse {
        tasks: tasks.into_iter().skip(skip).take(per_page).collect(),
        total: total as u64,
        page,
        page_size,
        total_pages,
    }
}

// ---------------------------------------------------------------------------
// Notification socket
// ---------------------------------------------------------------------------

/// axum handler that upgrades an HTTP request to a notification socket.
///
/// The subscription is taken before the upgrade completes, so a client
/// sees every notification published after its handshake returns.
async fn ws_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let notifications = state.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, notifications))
}

/// Forwards notifications to one socket until either side goes away.
async fn handle_socket(socket: WebSocket, mut notifications: broadcast::Receiver<ServerMessage>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    tracing::info!("notification socket connected");

    let mut write_task = tokio::spawn(async move {
        loop {
            let message = match notifications.recv().await {
                Ok(message) => message,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notification socket lagging, skipped messages");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let text = match codec::encode(&message) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode notification");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut read_task = tokio::spawn(async move {
        while let Some(frame) = ws_receiver.next().await {
            match frame {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut write_task => read_task.abort(),
        _ = &mut read_task => write_task.abort(),
    }
    tracing::info!("notification socket disconnected");
}

// ---------------------------------------------------------------------------
// Server entry points
// ---------------------------------------------------------------------------

/// Starts the dev server on the given address with an empty task table.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(ServerState::default())).await
}

/// Starts the dev server with pre-built [`ServerState`] and returns the
/// bound address and a join handle.
///
/// This is the entry point used by both `main.rs` and test code.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<ServerState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "dev server error");
        }
    });

    Ok((bound_addr, handle))
}
