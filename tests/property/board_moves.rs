//! Property-based tests for board moves.
//!
//! Uses proptest to verify:
//! 1. `BoardState::place` agrees with a simple per-column list model.
//! 2. Moves never duplicate or lose tasks.
//! 3. After a run of accepted moves, the store and the board both hold
//!    each task in the status of its last move, and drops in place issue
//!    no calls.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::cast_possible_truncation
)]

use std::sync::Arc;

use chrono::Utc;
use proptest::prelude::*;
use taskboard::board::{BoardState, BoardSynchronizer, DragGesture, DropSlot, MoveOutcome};
use taskboard::store::memory::MemoryStore;
use taskboard_proto::api::TaskFilter;
use taskboard_proto::task::{Priority, Task, TaskId, TaskStatus, UserId};

// --- Strategies and helpers ---

fn make_task(id: u64, status: TaskStatus) -> Task {
    let now = Utc::now();
    Task {
        id: TaskId::new(id),
        title: format!("Task {id}"),
        description: None,
        status,
        priority: Priority::Medium,
        room_id: None,
        created_by_id: UserId::new(1),
        created_at: now,
        updated_at: now,
        estimated_hours: None,
        complexity_score: None,
        due_date: None,
        assignments: Vec::new(),
    }
}

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(TaskStatus::ALL.to_vec())
}

/// A board of 1..12 tasks with ids `1..=n` in random columns.
fn arb_board() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec(arb_status(), 1..12).prop_map(|statuses| {
        statuses
            .into_iter()
            .zip(1u64..)
            .map(|(status, id)| make_task(id, status))
            .collect()
    })
}

/// Moves as (task pick, destination status, destination index). The task
/// pick is reduced modulo the board size.
fn arb_moves() -> impl Strategy<Value = Vec<(usize, TaskStatus, usize)>> {
    prop::collection::vec((any::<usize>(), arb_status(), 0usize..16), 0..24)
}

fn column_index(status: TaskStatus) -> usize {
    match status {
        TaskStatus::Todo => 0,
        TaskStatus::InProgress => 1,
        TaskStatus::Done => 2,
    }
}

/// Reference model: one id list per column.
fn model_of(tasks: &[Task]) -> [Vec<TaskId>; 3] {
    let mut columns: [Vec<TaskId>; 3] = Default::default();
    for task in tasks {
        columns[column_index(task.status)].push(task.id);
    }
    columns
}

fn model_place(columns: &mut [Vec<TaskId>; 3], id: TaskId, slot: DropSlot) {
    for column in columns.iter_mut() {
        column.retain(|&other| other != id);
    }
    let column = &mut columns[column_index(slot.status)];
    let at = slot.index.min(column.len());
    column.insert(at, id);
}

// --- Property tests ---

proptest! {
    /// `place` splices into the destination column exactly like the model.
    #[test]
    fn place_matches_column_model(tasks in arb_board(), moves in arb_moves()) {
        let mut columns = model_of(&tasks);
        let mut state = BoardState::from_tasks(tasks.clone());

        for (pick, status, index) in moves {
            let id = tasks[pick % tasks.len()].id;
            let slot = DropSlot::new(status, index);
            prop_assert!(state.place(id, slot));
            model_place(&mut columns, id, slot);

            for status in TaskStatus::ALL {
                prop_assert_eq!(&state.column_ids(status), &columns[column_index(status)]);
            }
            let landed = state.locate(id).expect("moved task stays on the board");
            prop_assert_eq!(landed.status, status);
            prop_assert!(landed.index <= index);
        }
    }

    /// Moves keep every id exactly once.
    #[test]
    fn moves_never_duplicate_or_lose_tasks(tasks in arb_board(), moves in arb_moves()) {
        let mut state = BoardState::from_tasks(tasks.clone());
        for (pick, status, index) in moves {
            state.place(tasks[pick % tasks.len()].id, DropSlot::new(status, index));
        }

        let mut ids: Vec<u64> = state.tasks().iter().map(|t| t.id.get()).collect();
        ids.sort_unstable();
        let expected: Vec<u64> = (1..=tasks.len() as u64).collect();
        prop_assert_eq!(ids, expected);
        prop_assert_eq!(state.counts().total(), tasks.len());
    }

    /// `from_tasks` keeps the first of any repeated id.
    #[test]
    fn replace_keeps_first_occurrence(tasks in arb_board(), repeat in any::<usize>()) {
        let mut listed = tasks.clone();
        let mut copy = tasks[repeat % tasks.len()].clone();
        copy.title = "duplicate".to_string();
        listed.push(copy);

        let mut state = BoardState::default();
        prop_assert_eq!(state.replace(listed), 1);
        prop_assert_eq!(state.len(), tasks.len());
        prop_assert!(state.tasks().iter().all(|t| t.title != "duplicate"));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Accepted moves leave board and store agreeing on each task's last
    /// status, with one call per move that went somewhere.
    #[test]
    fn accepted_moves_converge(tasks in arb_board(), moves in arb_moves()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let store = Arc::new(MemoryStore::new(tasks.clone()));
            let mut board = BoardSynchronizer::new(Arc::clone(&store), TaskFilter::all());
            board.load().await.unwrap();
            store.clear_calls();

            let mut expected_calls = 0;
            let mut last_status: Vec<TaskStatus> = tasks.iter().map(|t| t.status).collect();
            for (pick, status, index) in moves {
                let pick = pick % tasks.len();
                let id = tasks[pick].id;
                let source = board.state().locate(id).unwrap();
                let destination = DropSlot::new(status, index);
                let outcome = board.move_task(
                    DragGesture::to_slot(id, source, destination),
                    &mut |_: &Task| false,
                );
                if source == destination {
                    prop_assert_eq!(outcome, MoveOutcome::NoOp);
                } else {
                    prop_assert_eq!(outcome, MoveOutcome::Moved);
                    expected_calls += 1;
                    last_status[pick] = status;
                }
            }
            board.settle().await;

            prop_assert_eq!(store.mutation_count(), expected_calls);
            let stored = store.tasks();
            for (task, status) in tasks.iter().zip(&last_status) {
                prop_assert_eq!(board.state().get(task.id).map(|t| t.status), Some(*status));
                let remote = stored.iter().find(|t| t.id == task.id).map(|t| t.status);
                prop_assert_eq!(remote, Some(*status));
            }
            Ok(())
        })?;
    }
}
