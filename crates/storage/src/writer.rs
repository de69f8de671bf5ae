use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use tutor_core::AppState;

use crate::repository::{SnapshotRepository, StorageError};
use crate::snapshot;

/// Quiet window before a queued state is written out.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Debounced write-behind consumer for state snapshots.
///
/// The store publishes every new state on a `watch` channel; that channel
/// is the write queue, bounded at one slot by construction, so a burst of
/// updates coalesces into whichever state is latest when the quiet window
/// ends. Writes are fire-and-forget: failures are logged and dropped, and
/// nothing here ever blocks a dispatching caller.
pub struct SnapshotWriter {
    task: JoinHandle<()>,
}

impl SnapshotWriter {
    /// Attach a writer to a state channel. Must be called from within a
    /// tokio runtime.
    #[must_use]
    pub fn attach(
        repo: Arc<dyn SnapshotRepository>,
        states: watch::Receiver<AppState>,
        window: Duration,
    ) -> Self {
        let task = tokio::spawn(run(repo, states, window));
        Self { task }
    }

    /// Wait for the writer to drain. The writer stops once the state
    /// channel's sender side is dropped; any state published before that
    /// still gets written.
    pub async fn drained(self) {
        if let Err(err) = self.task.await {
            warn!(error = %err, "snapshot writer task failed");
        }
    }
}

async fn run(
    repo: Arc<dyn SnapshotRepository>,
    mut states: watch::Receiver<AppState>,
    window: Duration,
) {
    // changed() keeps yielding queued values after the sender drops, so a
    // final pending state is written before the loop exits.
    while states.changed().await.is_ok() {
        tokio::time::sleep(window).await;
        let state = states.borrow_and_update().clone();
        if state.is_loading {
            // The transient initial value must never clobber a good
            // persisted snapshot.
            debug!("skipping persist while state is still loading");
            continue;
        }
        if let Err(err) = persist(repo.as_ref(), &state).await {
            warn!(error = %err, "dropping failed snapshot write");
        }
    }
}

/// Encode and write a state immediately, bypassing the debounce window.
///
/// # Errors
///
/// Returns `StorageError` if encoding or the underlying write fails.
pub async fn persist(
    repo: &dyn SnapshotRepository,
    state: &AppState,
) -> Result<(), StorageError> {
    let raw = snapshot::encode_state(state)
        .map_err(|err| StorageError::Serialization(err.to_string()))?;
    repo.save(&raw).await
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
