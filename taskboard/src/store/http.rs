//! REST implementation of [`TaskStore`].
//!
//! Talks to the Taskboard backend over HTTP using the routes described in
//! [`taskboard_proto::api`]. Credentials come from the [`Session`].
//!
//! List routes are paged; a fetch walks every page. The backend knows more
//! statuses than the board has columns, and tasks in those are left out.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use taskboard_proto::api::{ErrorBody, StatusUpdate, TaskFilter};
use taskboard_proto::task::{Task, TaskId, TaskStatus};

use super::{StoreError, TaskStore};
use crate::session::Session;

/// Default timeout applied to every request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Task store backed by the Taskboard REST API.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    api_url: Url,
    token: Option<String>,
}

impl HttpStore {
    /// Creates a store for the backend described by `session`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Network`] if the HTTP client cannot be built.
    pub fn new(session: &Session, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: session.api_url().clone(),
            token: session.token().map(str::to_string),
        })
    }

    fn url(&self, path: &str) -> Result<Url, StoreError> {
        self.api_url
            .join(path)
            .map_err(|e| StoreError::Network(format!("invalid request path {path}: {e}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends a request, mapping transport failures to [`StoreError`].
    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        self.authorize(request).send().await.map_err(map_transport_error)
    }

    async fn fetch_page(
        &self,
        url: Url,
        filter: &TaskFilter,
        page: u32,
    ) -> Result<ListPage, StoreError> {
        let request = self
            .client
            .get(url)
            .query(&filter.query_pairs())
            .query(&[("page", page)]);
        let response = check_response(self.send(request).await?, None).await?;
        response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

/// One page of the list envelope. Tasks stay undecoded until their status
/// has been checked.
#[derive(Debug, Deserialize)]
struct ListPage {
    #[serde(default)]
    tasks: Vec<Value>,
    #[serde(default)]
    total_pages: u32,
}

/// Decodes listed tasks, skipping those whose status has no board column.
fn board_tasks(items: Vec<Value>) -> Result<Vec<Task>, StoreError> {
    let mut tasks = Vec::with_capacity(items.len());
    for item in items {
        let off_board = item
            .get("status")
            .is_some_and(|status| serde_json::from_value::<TaskStatus>(status.clone()).is_err());
        if off_board {
            tracing::debug!(
                id = ?item.get("id"),
                status = ?item.get("status"),
                "skipping task outside board columns"
            );
            continue;
        }
        let task = serde_json::from_value(item).map_err(|e| StoreError::Decode(e.to_string()))?;
        tasks.push(task);
    }
    Ok(tasks)
}

/// Maps a non-2xx response to a [`StoreError`].
///
/// `task_id` is reported for 404s on single-task routes.
async fn check_response(
    response: Response,
    task_id: Option<TaskId>,
) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body).map_or(body, |e| e.detail);

    match (status, task_id) {
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => {
            Err(StoreError::Unauthorized(detail))
        }
        (StatusCode::NOT_FOUND, Some(id)) => Err(StoreError::NotFound(id)),
        _ => Err(StoreError::Rejected {
            status: status.as_u16(),
            detail,
        }),
    }
}

fn map_transport_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Network(e.to_string())
    }
}

impl TaskStore for HttpStore {
    async fn fetch_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let url = self.url(filter.path())?;
        let mut tasks = Vec::new();
        let mut page = 1;
        loop {
            let list = self.fetch_page(url.clone(), filter, page).await?;
            let listed = list.tasks.len();
            tasks.extend(board_tasks(list.tasks)?);
            if listed == 0 || page >= list.total_pages {
                break;
            }
            page += 1;
        }
        tracing::debug!(count = tasks.len(), pages = page, "fetched tasks");
        Ok(tasks)
    }

    async fn update_task_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<(), StoreError> {
        let url = self.url(&format!("tasks/{task_id}/status"))?;
        let request = self.client.patch(url).json(&StatusUpdate { status });
        check_response(self.send(request).await?, Some(task_id)).await?;
        tracing::debug!(task_id = %task_id, status = %status, "status update accepted");
        Ok(())
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<(), StoreError> {
        let url = self.url(&format!("tasks/{task_id}"))?;
        let request = self.client.delete(url);
        check_response(self.send(request).await?, Some(task_id)).await?;
        tracing::debug!(task_id = %task_id, "delete accepted");
        Ok(())
    }
}
