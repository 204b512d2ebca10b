//! Local board state: a flat task list viewed as status columns.
//!
//! Column order is never stored on its own. A column is the tasks with
//! that status, in the order they appear in the flat list.

use taskboard_proto::task::{Task, TaskId, TaskStatus};

/// A position in a board column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DropSlot {
    /// Column.
    pub status: TaskStatus,
    /// Zero-based index within the column.
    pub index: usize,
}

impl DropSlot {
    /// Creates a slot.
    #[must_use]
    pub const fn new(status: TaskStatus, index: usize) -> Self {
        Self { status, index }
    }
}

/// Number of tasks per column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnCounts {
    /// Tasks in `todo`.
    pub todo: usize,
    /// Tasks in `in_progress`.
    pub in_progress: usize,
    /// Tasks in `done`.
    pub done: usize,
}

impl ColumnCounts {
    /// Count for one column.
    #[must_use]
    pub const fn get(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Todo => self.todo,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Done => self.done,
        }
    }

    /// Tasks on the whole board.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.todo + self.in_progress + self.done
    }
}

/// Flat, duplicate-free task collection partitioned by status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardState {
    tasks: Vec<Task>,
}

impl BoardState {
    /// Builds a board from a server list. See [`replace`](Self::replace).
    #[must_use]
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut state = Self::default();
        state.replace(tasks);
        state
    }

    /// Replaces the whole board with a server list.
    ///
    /// If the list repeats an id, the first occurrence is kept. Returns the
    /// number of duplicates dropped.
    pub fn replace(&mut self, tasks: Vec<Task>) -> usize {
        let incoming = tasks.len();
        let mut seen = std::collections::HashSet::with_capacity(incoming);
        self.tasks = tasks.into_iter().filter(|t| seen.insert(t.id)).collect();
        let dropped = incoming - self.tasks.len();
        if dropped > 0 {
            tracing::warn!(dropped, "server list repeated task ids, kept first occurrences");
        }
        dropped
    }

    /// All tasks in flat order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Number of tasks on the board.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if the board holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn get(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Tasks in one column, top to bottom.
    pub fn column(&self, status: TaskStatus) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.status == status)
    }

    /// Every column in board order.
    #[must_use]
    pub fn columns(&self) -> [(TaskStatus, Vec<&Task>); 3] {
        TaskStatus::ALL.map(|status| (status, self.column(status).collect()))
    }

    /// Ids of one column, top to bottom.
    #[must_use]
    pub fn column_ids(&self, status: TaskStatus) -> Vec<TaskId> {
        self.column(status).map(|t| t.id).collect()
    }

    /// Per-column task counts.
    #[must_use]
    pub fn counts(&self) -> ColumnCounts {
        self.tasks
            .iter()
            .fold(ColumnCounts::default(), |mut counts, task| {
                match task.status {
                    TaskStatus::Todo => counts.todo += 1,
                    TaskStatus::InProgress => counts.in_progress += 1,
                    TaskStatus::Done => counts.done += 1,
                }
                counts
            })
    }

    /// Where a task currently sits.
    #[must_use]
    pub fn locate(&self, task_id: TaskId) -> Option<DropSlot> {
        let task = self.get(task_id)?;
        let index = self.column(task.status).position(|t| t.id == task_id)?;
        Some(DropSlot::new(task.status, index))
    }

    /// Slot that puts a task at the bottom of `status`. A task already in
    /// that column counts toward its length, so for the last card this is
    /// where it already sits.
    #[must_use]
    pub fn bottom_slot(&self, task_id: TaskId, status: TaskStatus) -> Option<DropSlot> {
        let task = self.get(task_id)?;
        let len = self.column(status).count();
        let index = if task.status == status { len - 1 } else { len };
        Some(DropSlot::new(status, index))
    }

    /// Removes a task, returning it.
    pub fn remove(&mut self, task_id: TaskId) -> Option<Task> {
        let pos = self.position(task_id)?;
        Some(self.tasks.remove(pos))
    }

    /// Moves a task into `slot`: sets its status and splices it into the
    /// destination column at `slot.index` (clamped to the column end).
    ///
    /// Returns `false` if the task is not on the board.
    pub fn place(&mut self, task_id: TaskId, slot: DropSlot) -> bool {
        let Some(pos) = self.position(task_id) else {
            return false;
        };
        let mut task = self.tasks.remove(pos);
        task.status = slot.status;
        let at = self.flat_index_for(slot);
        self.tasks.insert(at, task);
        true
    }

    fn position(&self, task_id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == task_id)
    }

    /// Flat index at which a task must be inserted to land at `slot`.
    fn flat_index_for(&self, slot: DropSlot) -> usize {
        let column: Vec<usize> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.status == slot.status)
            .map(|(flat, _)| flat)
            .collect();
        column
            .get(slot.index)
            .copied()
            .or_else(|| column.last().map(|flat| flat + 1))
            .unwrap_or(self.tasks.len())
    }
}
