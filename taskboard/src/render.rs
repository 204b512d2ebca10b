//! Plain-text rendering of a board for the terminal.

use std::fmt::Write as _;

use taskboard_proto::task::{Priority, Task};

use crate::board::{BoardError, BoardPhase, BoardState, BoardSynchronizer};
use crate::store::TaskStore;

/// Renders whatever a synchronizer currently shows.
#[must_use]
pub fn render_synchronizer<S: TaskStore + 'static>(sync: &BoardSynchronizer<S>) -> String {
    render_board(sync.state(), sync.phase(), sync.last_error())
}

/// Renders a board as one block per column.
///
/// While loading, or when no load has ever succeeded, a single status
/// line is shown instead. A failed reload is reported under the board,
/// which keeps showing the last good state.
#[must_use]
pub fn render_board(state: &BoardState, phase: BoardPhase, error: Option<&BoardError>) -> String {
    let mut out = String::new();
    match phase {
        BoardPhase::Loading => {
            out.push_str("Loading tasks...\n");
            return out;
        }
        BoardPhase::Failed => {
            let reason = error.map_or_else(|| "unknown error".to_string(), ToString::to_string);
            let _ = writeln!(out, "Error: {reason}");
            return out;
        }
        BoardPhase::Ready => {}
    }

    for (status, tasks) in state.columns() {
        let _ = writeln!(out, "== {} ({}) ==", status.title(), tasks.len());
        if tasks.is_empty() {
            out.push_str("   (empty)\n");
        }
        for task in tasks {
            let _ = writeln!(out, "   {}", render_task(task));
        }
    }

    if let Some(err) = error {
        let _ = writeln!(out, "Warning: {err}; showing last loaded board");
    }
    out
}

/// One-line summary of a task card.
#[must_use]
pub fn render_task(task: &Task) -> String {
    let mut line = format!("#{:<4} {}", task.id.get(), task.title);
    if task.priority != Priority::Medium {
        let _ = write!(line, " [{}]", task.priority);
    }
    if let Some(hours) = task.estimated_hours {
        let _ = write!(line, " {hours:.1}h");
    }
    if let Some(score) = task.complexity_score {
        let _ = write!(line, " c{score}");
    }
    if let Some(due) = task.due_date {
        let _ = write!(line, " due {}", due.format("%Y-%m-%d"));
    }
    if !task.assignments.is_empty() {
        let names: Vec<String> = task
            .assignments
            .iter()
            .map(|a| {
                a.username
                    .as_ref()
                    .map_or_else(|| format!("@{}", a.user_id), |name| format!("@{name}"))
            })
            .collect();
        let _ = write!(line, " {}", names.join(", "));
    }
    line
}
