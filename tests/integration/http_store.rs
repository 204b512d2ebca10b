//! Integration tests for the REST task store against a live dev server.
//!
//! Each test starts its own dev server on an ephemeral port, seeded with
//! the sample board, and talks to it through `HttpStore`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use taskboard::board::{BoardSynchronizer, DragGesture, DropSlot, MoveOutcome, SyncUpdate};
use taskboard::session::Session;
use taskboard::store::http::HttpStore;
use taskboard::store::{StoreError, TaskStore};
use taskboard_devserver::server::{ServerState, start_server_with_state};
use taskboard_devserver::store::TaskTable;
use taskboard_proto::api::TaskFilter;
use taskboard_proto::sample::{SAMPLE_ROOM, SAMPLE_USER, sample_board};
use taskboard_proto::task::{Task, TaskId, TaskStatus};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Starts a seeded dev server and returns its shared state and API URL.
async fn start_devserver() -> (Arc<ServerState>, String) {
    start_devserver_with(sample_board(Utc::now())).await
}

async fn start_devserver_with(tasks: Vec<Task>) -> (Arc<ServerState>, String) {
    serve(ServerState::new(TaskTable::with_tasks(tasks))).await
}

async fn serve(state: ServerState) -> (Arc<ServerState>, String) {
    let state = Arc::new(state);
    let (addr, _handle) = start_server_with_state("127.0.0.1:0", Arc::clone(&state))
        .await
        .expect("dev server should start");
    (state, format!("http://{addr}/api"))
}

/// Builds a store for `api_url`, signed in as `user-1` when `signed_in`.
fn store_for(api_url: &str, signed_in: bool) -> HttpStore {
    let mut session = Session::new(api_url).unwrap();
    if signed_in {
        session = session.with_token(format!("user-{}", SAMPLE_USER.get()));
    }
    HttpStore::new(&session, Duration::from_secs(5)).unwrap()
}

fn ids(tasks: &[Task]) -> Vec<u64> {
    tasks.iter().map(|t| t.id.get()).collect()
}

/// `n` copies of the first sample task with ids `1..=n`, spread over the
/// columns.
fn many_tasks(n: u64) -> Vec<Task> {
    let template = sample_board(Utc::now()).remove(0);
    (1..=n)
        .zip(TaskStatus::ALL.into_iter().cycle())
        .map(|(id, status)| Task {
            id: TaskId::new(id),
            title: format!("Task {id}"),
            status,
            ..template.clone()
        })
        .collect()
}

// ===========================================================================
// Fetching
// ===========================================================================

#[tokio::test]
async fn fetch_all_returns_server_order() {
    let (_state, api_url) = start_devserver().await;
    let store = store_for(&api_url, false);

    let tasks = store.fetch_tasks(&TaskFilter::all()).await.unwrap();
    assert_eq!(ids(&tasks), vec![1, 2, 3, 4, 5, 6, 7]);
}

#[tokio::test]
async fn fetch_walks_every_page() {
    let (_state, api_url) = start_devserver_with(many_tasks(150)).await;
    let store = store_for(&api_url, false);

    let tasks = store.fetch_tasks(&TaskFilter::all()).await.unwrap();
    assert_eq!(ids(&tasks), (1..=150).collect::<Vec<_>>());
}

#[tokio::test]
async fn fetch_follows_server_page_size() {
    let table = TaskTable::with_tasks(sample_board(Utc::now()));
    let (_state, api_url) = serve(ServerState::new(table).with_max_page_size(2)).await;
    let store = store_for(&api_url, false);

    let tasks = store.fetch_tasks(&TaskFilter::all()).await.unwrap();
    assert_eq!(ids(&tasks), vec![1, 2, 3, 4, 5, 6, 7]);
    let room = store
        .fetch_tasks(&TaskFilter::all().in_room(SAMPLE_ROOM))
        .await
        .unwrap();
    assert_eq!(ids(&room), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn board_loads_tasks_beyond_the_first_page() {
    let (_state, api_url) = start_devserver_with(many_tasks(250)).await;
    let store = Arc::new(store_for(&api_url, false));
    let mut board = BoardSynchronizer::new(store, TaskFilter::all());

    assert_eq!(board.load().await.unwrap(), 250);
    assert_eq!(board.state().counts().total(), 250);
    assert!(board.state().get(TaskId::new(250)).is_some());
}

#[tokio::test]
async fn fetch_by_room_filters_on_server() {
    let (_state, api_url) = start_devserver().await;
    let store = store_for(&api_url, false);

    let tasks = store
        .fetch_tasks(&TaskFilter::all().in_room(SAMPLE_ROOM))
        .await
        .unwrap();
    assert_eq!(ids(&tasks), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn fetch_mine_uses_bearer_token() {
    let (_state, api_url) = start_devserver().await;
    let store = store_for(&api_url, true);

    let tasks = store.fetch_tasks(&TaskFilter::all().mine()).await.unwrap();
    assert!(!tasks.is_empty());
    assert!(tasks.iter().all(|t| t.is_assigned_to(SAMPLE_USER)));
}

#[tokio::test]
async fn fetch_mine_without_token_is_unauthorized() {
    let (_state, api_url) = start_devserver().await;
    let store = store_for(&api_url, false);

    let err = store
        .fetch_tasks(&TaskFilter::all().mine())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Unauthorized(_)));
}

// ===========================================================================
// Mutations
// ===========================================================================

#[tokio::test]
async fn status_update_reaches_server() {
    let (state, api_url) = start_devserver().await;
    let store = store_for(&api_url, true);

    store
        .update_task_status(TaskId::new(5), TaskStatus::InProgress)
        .await
        .unwrap();
    let task = state.tasks.get(TaskId::new(5)).await.unwrap();
    assert_eq!(task.status, TaskStatus::InProgress);
}

#[tokio::test]
async fn delete_reaches_server() {
    let (state, api_url) = start_devserver().await;
    let store = store_for(&api_url, true);

    store.delete_task(TaskId::new(2)).await.unwrap();
    assert!(state.tasks.get(TaskId::new(2)).await.is_none());
    assert_eq!(state.tasks.all().await.len(), 6);
}

#[tokio::test]
async fn unknown_task_is_not_found() {
    let (_state, api_url) = start_devserver().await;
    let store = store_for(&api_url, true);

    assert_eq!(
        store
            .update_task_status(TaskId::new(404), TaskStatus::Done)
            .await,
        Err(StoreError::NotFound(TaskId::new(404)))
    );
    assert_eq!(
        store.delete_task(TaskId::new(404)).await,
        Err(StoreError::NotFound(TaskId::new(404)))
    );
}

#[tokio::test]
async fn refused_mutation_carries_status_and_detail() {
    let (state, api_url) = start_devserver().await;
    let store = store_for(&api_url, true);
    state.tasks.reject_next_mutations(1);

    let err = store
        .update_task_status(TaskId::new(3), TaskStatus::Done)
        .await
        .unwrap_err();
    match err {
        StoreError::Rejected { status, detail } => {
            assert_eq!(status, 400);
            assert!(detail.contains("rejected"), "detail was {detail:?}");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert_eq!(
        state.tasks.get(TaskId::new(3)).await.unwrap().status,
        TaskStatus::InProgress
    );
}

// ===========================================================================
// Board over HTTP
// ===========================================================================

#[tokio::test]
async fn board_move_is_persisted() {
    let (state, api_url) = start_devserver().await;
    let store = Arc::new(store_for(&api_url, true));
    let mut board = BoardSynchronizer::new(store, TaskFilter::all());
    board.load().await.unwrap();

    let id = TaskId::new(7);
    let source = board.state().locate(id).unwrap();
    let outcome = board.move_task(
        DragGesture::to_slot(id, source, DropSlot::new(TaskStatus::Done, 0)),
        &mut |_: &Task| false,
    );
    assert_eq!(outcome, MoveOutcome::Moved);

    let updates = board.settle().await;
    assert_eq!(updates, vec![SyncUpdate::MutationConfirmed { task_id: id }]);
    assert_eq!(
        state.tasks.get(id).await.unwrap().status,
        TaskStatus::Done
    );
}

#[tokio::test]
async fn board_reloads_after_server_refuses_move() {
    let (state, api_url) = start_devserver().await;
    let store = Arc::new(store_for(&api_url, true));
    let mut board = BoardSynchronizer::new(store, TaskFilter::all());
    board.load().await.unwrap();
    state.tasks.reject_next_mutations(1);

    let id = TaskId::new(5);
    let source = board.state().locate(id).unwrap();
    board.move_task(
        DragGesture::to_slot(id, source, DropSlot::new(TaskStatus::Done, 0)),
        &mut |_: &Task| false,
    );
    assert_eq!(board.state().get(id).unwrap().status, TaskStatus::Done);

    let updates = board.settle().await;
    assert!(matches!(
        &updates[0],
        SyncUpdate::MutationFailed {
            error: StoreError::Rejected { status: 400, .. },
            ..
        }
    ));
    assert_eq!(updates[1], SyncUpdate::Loaded { tasks: 7 });
    assert_eq!(board.state().get(id).unwrap().status, TaskStatus::Todo);
}

#[tokio::test]
async fn board_drag_out_deletes_on_server() {
    let (state, api_url) = start_devserver().await;
    let store = Arc::new(store_for(&api_url, true));
    let mut board = BoardSynchronizer::new(store, TaskFilter::all());
    board.load().await.unwrap();

    let id = TaskId::new(6);
    let source = board.state().locate(id).unwrap();
    let outcome = board.move_task(DragGesture::off_board(id, source), &mut |_: &Task| true);
    assert_eq!(outcome, MoveOutcome::Deleting);
    board.settle().await;

    assert!(state.tasks.get(id).await.is_none());
    assert!(board.state().get(id).is_none());
}
