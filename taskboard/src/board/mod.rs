//! The kanban board: local state, drag gestures, and the synchronizer
//! that keeps both consistent with the task store.

pub mod gesture;
pub mod state;
pub mod sync;

pub use gesture::{ConfirmDelete, DragGesture, MoveOutcome};
pub use state::{BoardState, ColumnCounts, DropSlot};
pub use sync::{BoardPhase, BoardSynchronizer, RefreshHandle, SyncUpdate};

use crate::store::StoreError;

/// Errors surfaced by the board.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// The task list could not be fetched.
    #[error("failed to load tasks: {0}")]
    Fetch(#[source] StoreError),
}
