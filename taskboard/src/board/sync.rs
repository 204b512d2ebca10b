//! Board synchronizer: optimistic local moves, reload on failure.
//!
//! # Architecture
//!
//! ```text
//! caller ── move_task ──> BoardSynchronizer ── Mutation ──> mutation worker ──> TaskStore
//!        ── request_reload ──────────┴──────── spawn ─────────────────────────> TaskStore
//!        <── SyncUpdate ── next_update() <────────── SyncEvent ─────────────────────┘
//! ```
//!
//! Every gesture is applied to [`BoardState`] before its remote call is
//! queued, so the board reflects the user's intent immediately. Status
//! updates and deletions go through a single worker task that awaits each
//! call before starting the next, so the store sees them in gesture order.
//! Fetches run as their own tokio tasks. Both report back over an mpsc
//! channel; results are applied one at a time by
//! [`BoardSynchronizer::next_update`].
//! A failed mutation is never undone in place: the board reloads from the
//! store and whatever the store holds wins.
//!
//! A reload that completes after a later optimistic move replaces that
//! move too, until the move's own result arrives. No versioning guards
//! against this.

use std::sync::{Arc, Weak};

use tokio::sync::{Notify, mpsc};

use taskboard_proto::api::TaskFilter;
use taskboard_proto::task::{Task, TaskId, TaskStatus};

use super::BoardError;
use super::gesture::{ConfirmDelete, DragGesture, MoveOutcome};
use super::state::BoardState;
use crate::store::{StoreError, TaskStore};

/// Default capacity of the completion channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Whether the board has something to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardPhase {
    /// No load has completed yet.
    Loading,
    /// At least one load succeeded; the board is showing tasks.
    Ready,
    /// Every load so far has failed; show the error instead of the board.
    Failed,
}

/// Completion of a remote call.
#[derive(Debug)]
enum SyncEvent {
    Fetched(Result<Vec<Task>, StoreError>),
    StatusUpdated {
        task_id: TaskId,
        status: TaskStatus,
        result: Result<(), StoreError>,
    },
    Deleted {
        task_id: TaskId,
        result: Result<(), StoreError>,
    },
}

/// A status update or deletion waiting for the mutation worker.
#[derive(Debug, Clone, Copy)]
enum Mutation {
    UpdateStatus { task_id: TaskId, status: TaskStatus },
    Delete { task_id: TaskId },
}

/// What [`BoardSynchronizer::next_update`] applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncUpdate {
    /// A fetch replaced the board.
    Loaded {
        /// Tasks now on the board.
        tasks: usize,
    },
    /// A fetch failed; the board was left as it was.
    LoadFailed(BoardError),
    /// The store accepted a status update or deletion.
    MutationConfirmed {
        /// The task concerned.
        task_id: TaskId,
    },
    /// The store rejected a status update or deletion; a reload is on its way.
    MutationFailed {
        /// The task concerned.
        task_id: TaskId,
        /// Why the store rejected it.
        error: StoreError,
    },
    /// A refresh signal arrived; a reload is on its way.
    RefreshRequested,
}

/// Cloneable handle that asks a board to reload.
///
/// Signals coalesce: several refreshes before the board gets to them
/// cause a single reload.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    signal: Weak<Notify>,
}

impl RefreshHandle {
    /// Asks the board to reload.
    ///
    /// Returns `false` if the board has been unmounted.
    pub fn refresh(&self) -> bool {
        self.signal.upgrade().is_some_and(|signal| {
            signal.notify_one();
            true
        })
    }

    /// Returns `true` while the board still exists.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.signal.strong_count() > 0
    }
}

/// Keeps a [`BoardState`] consistent with a remote [`TaskStore`].
///
/// One synchronizer backs one board view. All state changes go through
/// `&mut self`, so handlers never interleave. Must be used from within a
/// tokio runtime.
pub struct BoardSynchronizer<S> {
    store: Arc<S>,
    filter: TaskFilter,
    state: BoardState,
    phase: BoardPhase,
    last_error: Option<BoardError>,
    /// Remote calls whose completion has not been applied yet.
    in_flight: usize,
    events_tx: mpsc::Sender<SyncEvent>,
    events_rx: mpsc::Receiver<SyncEvent>,
    mutations: mpsc::UnboundedSender<Mutation>,
    refresh: Arc<Notify>,
}

impl<S: TaskStore + 'static> BoardSynchronizer<S> {
    /// Creates an empty board for `filter`. Nothing is fetched until
    /// [`load`](Self::load) or [`request_reload`](Self::request_reload).
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, since the mutation worker
    /// is spawned here.
    #[must_use]
    pub fn new(store: Arc<S>, filter: TaskFilter) -> Self {
        Self::with_capacity(store, filter, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Like [`new`](Self::new) with an explicit completion channel capacity.
    #[must_use]
    pub fn with_capacity(store: Arc<S>, filter: TaskFilter, capacity: usize) -> Self {
        let (events_tx, events_rx) = mpsc::channel(capacity.max(1));
        let (mutations, mutation_rx) = mpsc::unbounded_channel();
        tokio::spawn(mutation_worker(
            Arc::clone(&store),
            mutation_rx,
            events_tx.clone(),
        ));
        Self {
            store,
            filter,
            state: BoardState::default(),
            phase: BoardPhase::Loading,
            last_error: None,
            in_flight: 0,
            events_tx,
            events_rx,
            mutations,
            refresh: Arc::new(Notify::new()),
        }
    }

    /// Current board contents.
    #[must_use]
    pub const fn state(&self) -> &BoardState {
        &self.state
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> BoardPhase {
        self.phase
    }

    /// Error from the most recent failed fetch, cleared by the next
    /// successful one.
    #[must_use]
    pub const fn last_error(&self) -> Option<&BoardError> {
        self.last_error.as_ref()
    }

    /// Scope of the board.
    #[must_use]
    pub const fn filter(&self) -> TaskFilter {
        self.filter
    }

    /// Number of remote calls whose results have not been applied yet.
    #[must_use]
    pub const fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Returns a handle that other tasks can use to trigger a reload.
    #[must_use]
    pub fn refresh_handle(&self) -> RefreshHandle {
        RefreshHandle {
            signal: Arc::downgrade(&self.refresh),
        }
    }

    /// Fetches the board and replaces local state with the result.
    ///
    /// On failure the board is left untouched and the error is kept in
    /// [`last_error`](Self::last_error).
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Fetch`] if the store could not be read.
    pub async fn load(&mut self) -> Result<usize, BoardError> {
        let result = self.store.fetch_tasks(&self.filter).await;
        self.apply_fetch(result)
    }

    /// Starts a background fetch; its result is applied by
    /// [`next_update`](Self::next_update).
    pub fn request_reload(&mut self) {
        tracing::debug!(filter = ?self.filter, "reload requested");
        let store = Arc::clone(&self.store);
        let filter = self.filter;
        self.spawn(async move { SyncEvent::Fetched(store.fetch_tasks(&filter).await) });
    }

    /// Changes the scope of the board and reloads.
    pub fn set_filter(&mut self, filter: TaskFilter) {
        if filter != self.filter {
            self.filter = filter;
            self.request_reload();
        }
    }

    /// Applies a completed drag gesture.
    ///
    /// The local change, if any, is visible as soon as this returns. At
    /// most one remote call is queued, behind any earlier ones.
    pub fn move_task(
        &mut self,
        gesture: DragGesture,
        confirm: &mut impl ConfirmDelete,
    ) -> MoveOutcome {
        let task_id = gesture.task_id;

        let Some(destination) = gesture.destination else {
            let Some(task) = self.state.get(task_id) else {
                tracing::debug!(task_id = %task_id, "drag-out of unknown task ignored");
                return MoveOutcome::UnknownTask;
            };
            if !confirm.confirm_delete(task) {
                return MoveOutcome::DeleteDeclined;
            }
            self.state.remove(task_id);
            tracing::info!(task_id = %task_id, "task deleted locally, sending delete");
            self.enqueue(Mutation::Delete { task_id });
            return MoveOutcome::Deleting;
        };

        if self.state.get(task_id).is_none() {
            tracing::debug!(task_id = %task_id, "move of unknown task ignored");
            return MoveOutcome::UnknownTask;
        }
        if gesture.is_drop_in_place() {
            return MoveOutcome::NoOp;
        }
        self.state.place(task_id, destination);

        let status = destination.status;
        tracing::info!(
            task_id = %task_id,
            status = %status,
            index = destination.index,
            "task moved locally, sending status update"
        );
        self.enqueue(Mutation::UpdateStatus { task_id, status });
        MoveOutcome::Moved
    }

    /// Waits for the next remote result or refresh signal and applies it.
    ///
    /// Returns `None` only if the completion channel has closed, which
    /// cannot happen while `self` is alive.
    pub async fn next_update(&mut self) -> Option<SyncUpdate> {
        tokio::select! {
            event = self.events_rx.recv() => {
                let event = event?;
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(self.apply(event))
            }
            () = self.refresh.notified() => {
                self.request_reload();
                Some(SyncUpdate::RefreshRequested)
            }
        }
    }

    /// Applies results until no remote call is in flight, including the
    /// reloads triggered along the way.
    ///
    /// Returns the updates in the order they were applied.
    pub async fn settle(&mut self) -> Vec<SyncUpdate> {
        let mut updates = Vec::new();
        while self.in_flight > 0 {
            match self.next_update().await {
                Some(update) => updates.push(update),
                None => break,
            }
        }
        updates
    }

    /// Tears the board down. Calls still in flight run to completion but
    /// their results are discarded.
    pub fn unmount(self) {
        tracing::debug!(in_flight = self.in_flight, "board unmounted");
    }

    fn enqueue(&mut self, mutation: Mutation) {
        if self.mutations.send(mutation).is_err() {
            tracing::warn!(?mutation, "mutation worker gone, reloading board");
            self.request_reload();
            return;
        }
        self.in_flight += 1;
    }

    fn spawn<F>(&mut self, call: F)
    where
        F: Future<Output = SyncEvent> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = call.await;
            if tx.send(event).await.is_err() {
                tracing::debug!("board unmounted before remote call finished, result dropped");
            }
        });
    }

    fn apply(&mut self, event: SyncEvent) -> SyncUpdate {
        match event {
            SyncEvent::Fetched(result) => match self.apply_fetch(result) {
                Ok(tasks) => SyncUpdate::Loaded { tasks },
                Err(err) => SyncUpdate::LoadFailed(err),
            },
            SyncEvent::StatusUpdated {
                task_id,
                status,
                result,
            } => match result {
                Ok(()) => {
                    tracing::debug!(
                        task_id = %task_id,
                        status = %status,
                        "status update confirmed"
                    );
                    SyncUpdate::MutationConfirmed { task_id }
                }
                Err(error) => {
                    tracing::warn!(
                        task_id = %task_id,
                        status = %status,
                        error = %error,
                        "status update rejected, reloading board"
                    );
                    self.reconcile(task_id, error)
                }
            },
            SyncEvent::Deleted { task_id, result } => match result {
                Ok(()) => {
                    tracing::debug!(task_id = %task_id, "delete confirmed");
                    SyncUpdate::MutationConfirmed { task_id }
                }
                Err(error) => {
                    tracing::warn!(
                        task_id = %task_id,
                        error = %error,
                        "delete rejected, reloading board"
                    );
                    self.reconcile(task_id, error)
                }
            },
        }
    }

    fn reconcile(&mut self, task_id: TaskId, error: StoreError) -> SyncUpdate {
        self.request_reload();
        SyncUpdate::MutationFailed { task_id, error }
    }

    fn apply_fetch(
        &mut self,
        result: Result<Vec<Task>, StoreError>,
    ) -> Result<usize, BoardError> {
        match result {
            Ok(tasks) => {
                self.state.replace(tasks);
                self.phase = BoardPhase::Ready;
                self.last_error = None;
                tracing::debug!(tasks = self.state.len(), "board loaded");
                Ok(self.state.len())
            }
            Err(error) => {
                tracing::warn!(error = %error, "failed to load board");
                if self.phase == BoardPhase::Loading {
                    self.phase = BoardPhase::Failed;
                }
                let err = BoardError::Fetch(error);
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }
}

/// Runs queued mutations one at a time until the board is dropped and the
/// queue is drained.
async fn mutation_worker<S: TaskStore + 'static>(
    store: Arc<S>,
    mut queue: mpsc::UnboundedReceiver<Mutation>,
    events: mpsc::Sender<SyncEvent>,
) {
    while let Some(mutation) = queue.recv().await {
        let event = match mutation {
            Mutation::UpdateStatus { task_id, status } => SyncEvent::StatusUpdated {
                task_id,
                status,
                result: store.update_task_status(task_id, status).await,
            },
            Mutation::Delete { task_id } => SyncEvent::Deleted {
                task_id,
                result: store.delete_task(task_id).await,
            },
        };
        if events.send(event).await.is_err() {
            tracing::debug!(?mutation, "board unmounted before mutation finished, result dropped");
        }
    }
    tracing::debug!("mutation worker exiting");
}
