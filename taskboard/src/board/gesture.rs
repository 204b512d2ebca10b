//! Drag gestures and their outcomes.

use taskboard_proto::task::{Task, TaskId};

use super::state::DropSlot;

/// A completed drag of one card.
///
/// `source` is where the UI believed the card was when the drag began. It
/// is only used to recognise drops back onto the same slot; the board's
/// own state decides the task's real position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragGesture {
    /// The dragged task.
    pub task_id: TaskId,
    /// Slot the drag started from.
    pub source: DropSlot,
    /// Slot the card was released on; `None` if released outside every
    /// column, which requests deletion.
    pub destination: Option<DropSlot>,
}

impl DragGesture {
    /// A drag from `source` onto `destination`.
    #[must_use]
    pub const fn to_slot(task_id: TaskId, source: DropSlot, destination: DropSlot) -> Self {
        Self {
            task_id,
            source,
            destination: Some(destination),
        }
    }

    /// A drag from `source` released outside the board.
    #[must_use]
    pub const fn off_board(task_id: TaskId, source: DropSlot) -> Self {
        Self {
            task_id,
            source,
            destination: None,
        }
    }

    /// Returns `true` if the card was dropped back where it started.
    #[must_use]
    pub fn is_drop_in_place(&self) -> bool {
        self.destination == Some(self.source)
    }
}

/// Asks the user whether a task dragged off the board should be deleted.
pub trait ConfirmDelete {
    /// Returns `true` to delete `task`.
    fn confirm_delete(&mut self, task: &Task) -> bool;
}

impl<F> ConfirmDelete for F
where
    F: FnMut(&Task) -> bool,
{
    fn confirm_delete(&mut self, task: &Task) -> bool {
        self(task)
    }
}

/// What a [`DragGesture`] did to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The task was not on the board; nothing happened.
    UnknownTask,
    /// The card was dropped where it started; nothing happened.
    NoOp,
    /// The user declined the deletion; nothing happened.
    DeleteDeclined,
    /// The task was removed locally and a delete was sent.
    Deleting,
    /// The task was moved locally and a status update was sent.
    Moved,
}

impl MoveOutcome {
    /// Returns `true` if a remote call was issued.
    #[must_use]
    pub const fn issued_remote_call(self) -> bool {
        matches!(self, Self::Deleting | Self::Moved)
    }
}
