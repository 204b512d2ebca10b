//! Integration tests for the notification listener.
//!
//! Connects a listener to a live dev server's `/ws` socket and checks that
//! task notifications turn into board reloads, and that the listener goes
//! away with its board.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use taskboard::board::{BoardSynchronizer, SyncUpdate};
use taskboard::notify::{ListenerConfig, spawn_listener};
use taskboard::session::Session;
use taskboard::store::TaskStore;
use taskboard::store::http::HttpStore;
use taskboard_devserver::server::{ServerState, start_server_with_state};
use taskboard_devserver::store::TaskTable;
use taskboard_proto::api::TaskFilter;
use taskboard_proto::notification::ServerMessage;
use taskboard_proto::sample::sample_board;
use taskboard_proto::task::{TaskId, TaskStatus};
use url::Url;

const WAIT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Starts a seeded dev server and returns its state and a signed-in session.
async fn start_devserver() -> (Arc<ServerState>, Session) {
    let state = Arc::new(ServerState::new(TaskTable::with_tasks(sample_board(
        Utc::now(),
    ))));
    let (addr, _handle) = start_server_with_state("127.0.0.1:0", Arc::clone(&state))
        .await
        .expect("dev server should start");
    let session = Session::new(&format!("http://{addr}/api"))
        .unwrap()
        .with_token("user-1");
    (state, session)
}

fn fast_reconnect() -> ListenerConfig {
    ListenerConfig {
        reconnect_delay: Duration::from_millis(20),
        max_attempts: Some(3),
    }
}

/// Waits until the dev server has `n` notification sockets.
async fn wait_for_subscribers(state: &ServerState, n: usize) {
    tokio::time::timeout(WAIT, async {
        while state.subscriber_count() < n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("listener should connect");
}

async fn loaded_board(session: &Session) -> BoardSynchronizer<HttpStore> {
    let store = Arc::new(HttpStore::new(session, Duration::from_secs(5)).unwrap());
    let mut board = BoardSynchronizer::new(store, TaskFilter::all());
    board.load().await.unwrap();
    board
}

// ===========================================================================
// Refresh on notification
// ===========================================================================

#[tokio::test]
async fn change_by_another_client_reloads_board() {
    let (state, session) = start_devserver().await;
    let mut board = loaded_board(&session).await;
    let _listener = spawn_listener(
        session.notifications_url(),
        board.refresh_handle(),
        fast_reconnect(),
    );
    wait_for_subscribers(&state, 1).await;

    // A second client moves a task; the board did not issue this change.
    let other = HttpStore::new(&session, Duration::from_secs(5)).unwrap();
    other
        .update_task_status(TaskId::new(6), TaskStatus::Done)
        .await
        .unwrap();

    let update = tokio::time::timeout(WAIT, board.next_update())
        .await
        .expect("refresh should arrive");
    assert_eq!(update, Some(SyncUpdate::RefreshRequested));

    let updates = board.settle().await;
    assert_eq!(updates, vec![SyncUpdate::Loaded { tasks: 7 }]);
    assert_eq!(
        board.state().get(TaskId::new(6)).unwrap().status,
        TaskStatus::Done
    );
}

#[tokio::test]
async fn task_assigned_message_reloads_board() {
    let (state, session) = start_devserver().await;
    let mut board = loaded_board(&session).await;
    let _listener = spawn_listener(
        session.notifications_url(),
        board.refresh_handle(),
        fast_reconnect(),
    );
    wait_for_subscribers(&state, 1).await;

    state.tasks.delete(TaskId::new(1)).await.unwrap();
    assert_eq!(state.publish(ServerMessage::TaskAssigned { data: None }), 1);

    let update = tokio::time::timeout(WAIT, board.next_update())
        .await
        .expect("refresh should arrive");
    assert_eq!(update, Some(SyncUpdate::RefreshRequested));
    board.settle().await;
    assert!(board.state().get(TaskId::new(1)).is_none());
}

// ===========================================================================
// Lifecycle
// ===========================================================================

#[tokio::test]
async fn listener_exits_after_unmount() {
    let (state, session) = start_devserver().await;
    let board = loaded_board(&session).await;
    let handle = board.refresh_handle();
    let listener = spawn_listener(session.notifications_url(), handle.clone(), fast_reconnect());
    wait_for_subscribers(&state, 1).await;

    board.unmount();
    assert!(!handle.is_mounted());
    assert!(!handle.refresh());

    tokio::time::timeout(WAIT, listener)
        .await
        .expect("listener should exit")
        .unwrap();
}

#[tokio::test]
async fn listener_gives_up_on_unreachable_server() {
    let (_state, session) = start_devserver().await;
    let board = loaded_board(&session).await;

    // Port 9 (discard) is not expected to accept WebSocket connections.
    let url = Url::parse("ws://127.0.0.1:9/ws").unwrap();
    let listener = spawn_listener(url, board.refresh_handle(), fast_reconnect());

    tokio::time::timeout(WAIT, listener)
        .await
        .expect("listener should stop retrying")
        .unwrap();
    drop(board);
}
