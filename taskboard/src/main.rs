//! `Taskboard`: kanban board client with optimistic synchronization.
//!
//! Loads a board from the Taskboard REST API and applies moves and
//! deletions the way the web board does: locally first, then remotely,
//! reloading if the server disagrees. Configuration via CLI flags,
//! environment variables, or config file (`~/.config/taskboard/config.toml`).
//!
//! ```bash
//! # Offline demo board
//! cargo run --bin taskboard
//!
//! # Against a backend
//! cargo run --bin taskboard -- --api-url http://127.0.0.1:8000/api show --room 1
//! cargo run --bin taskboard -- --api-url http://127.0.0.1:8000/api move 3 done --index 0
//! cargo run --bin taskboard -- --api-url http://127.0.0.1:8000/api watch
//! ```

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use taskboard::board::{
    BoardSynchronizer, ConfirmDelete, DragGesture, DropSlot, MoveOutcome, SyncUpdate,
};
use taskboard::config::{CliArgs, ClientConfig, Command};
use taskboard::notify;
use taskboard::render;
use taskboard::session::Session;
use taskboard::store::TaskStore;
use taskboard::store::http::HttpStore;
use taskboard::store::memory::MemoryStore;
use taskboard_proto::sample::{SAMPLE_USER, sample_board};
use taskboard_proto::task::{Task, TaskId, TaskStatus};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Logs go to a file; stdout carries the rendered board.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!("taskboard starting");

    let command = cli.command.clone().unwrap_or(Command::Show);
    let result = match config.to_session() {
        Ok(Some(session)) => match HttpStore::new(&session, config.request_timeout) {
            Ok(store) => run(Arc::new(store), &config, command, Some(&session)).await,
            Err(e) => Err(e.into()),
        },
        Ok(None) => {
            eprintln!("No API URL configured; showing the offline demo board.");
            let actor = config.actor().map_or(SAMPLE_USER, |a| a.id);
            let store = MemoryStore::new(sample_board(Utc::now())).with_actor(actor);
            run(Arc::new(store), &config, command, None).await
        }
        Err(e) => Err(e.into()),
    };

    tracing::info!("taskboard exiting");
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskboard.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

async fn run<S: TaskStore + 'static>(
    store: Arc<S>,
    config: &ClientConfig,
    command: Command,
    session: Option<&Session>,
) -> Result<(), BoxError> {
    let mut board =
        BoardSynchronizer::with_capacity(store, config.filter(), config.channel_capacity);
    if let Err(e) = board.load().await {
        print!("{}", render::render_synchronizer(&board));
        return Err(e.into());
    }

    match command {
        Command::Show => print!("{}", render::render_synchronizer(&board)),
        Command::Move { id, status, index } => {
            let gesture = move_gesture(&board, id, status, index)?;
            let outcome = board.move_task(gesture, &mut |_: &Task| false);
            finish(&mut board, id, outcome).await;
        }
        Command::Delete { id, yes } => {
            let source = board
                .state()
                .locate(id)
                .ok_or_else(|| format!("task {id} is not on this board"))?;
            let gesture = DragGesture::off_board(id, source);
            let outcome = if yes {
                board.move_task(gesture, &mut |_: &Task| true)
            } else {
                board.move_task(gesture, &mut StdinConfirm)
            };
            finish(&mut board, id, outcome).await;
        }
        Command::Watch => watch(board, config, session).await,
    }
    Ok(())
}

/// Builds the gesture for `move <id> <status> [--index N]`, defaulting to
/// the bottom of the destination column. Without `--index`, a task that is
/// already last in `status` stays put and nothing is sent.
fn move_gesture<S: TaskStore + 'static>(
    board: &BoardSynchronizer<S>,
    id: TaskId,
    status: TaskStatus,
    index: Option<usize>,
) -> Result<DragGesture, BoxError> {
    let state = board.state();
    let not_here = || format!("task {id} is not on this board");
    let source = state.locate(id).ok_or_else(not_here)?;
    let destination = match index {
        Some(index) => DropSlot::new(status, index),
        None => state.bottom_slot(id, status).ok_or_else(not_here)?,
    };
    Ok(DragGesture::to_slot(id, source, destination))
}

/// Reports the outcome of a gesture, waits for the server, and prints the
/// resulting board.
async fn finish<S: TaskStore + 'static>(
    board: &mut BoardSynchronizer<S>,
    id: TaskId,
    outcome: MoveOutcome,
) {
    match outcome {
        MoveOutcome::UnknownTask => eprintln!("Task {id} is not on this board."),
        MoveOutcome::NoOp => eprintln!("Task {id} is already there."),
        MoveOutcome::DeleteDeclined => eprintln!("Deletion cancelled."),
        MoveOutcome::Deleting | MoveOutcome::Moved => {}
    }
    for update in board.settle().await {
        match update {
            SyncUpdate::MutationFailed { task_id, error } => {
                eprintln!("Server rejected the change to task {task_id}: {error}. Board reloaded.");
            }
            SyncUpdate::LoadFailed(e) => eprintln!("Reload failed: {e}"),
            _ => {}
        }
    }
    print!("{}", render::render_synchronizer(board));
}

/// Prints the board and reprints it after every reload until Ctrl-C.
async fn watch<S: TaskStore + 'static>(
    mut board: BoardSynchronizer<S>,
    config: &ClientConfig,
    session: Option<&Session>,
) {
    let listener = session.map(|s| {
        notify::spawn_listener(
            s.notifications_url(),
            board.refresh_handle(),
            config.listener_config(),
        )
    });
    print!("{}", render::render_synchronizer(&board));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            update = board.next_update() => match update {
                Some(SyncUpdate::Loaded { .. }) => {
                    println!();
                    print!("{}", render::render_synchronizer(&board));
                }
                Some(SyncUpdate::LoadFailed(e)) => eprintln!("Reload failed: {e}"),
                Some(_) => {}
                None => break,
            },
        }
    }

    board.unmount();
    if let Some(listener) = listener {
        listener.abort();
    }
}

/// Asks on stdin before deleting.
struct StdinConfirm;

impl ConfirmDelete for StdinConfirm {
    fn confirm_delete(&mut self, task: &Task) -> bool {
        print!("Delete task #{} \"{}\"? [y/N] ", task.id, task.title);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}
