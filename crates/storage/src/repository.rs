use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// The fixed key the whole application state is persisted under.
pub const SNAPSHOT_KEY: &str = "math-tutor-state";

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the single persisted snapshot blob.
///
/// The store persists one JSON string under `SNAPSHOT_KEY`; adapters only
/// need get/put/delete semantics for that one record. Persistence is
/// best-effort: callers log and drop save failures rather than surfacing
/// them to the learner.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Read the persisted snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read. Callers
    /// treat any failure as "no saved state".
    async fn load(&self) -> Result<Option<String>, StorageError>;

    /// Replace the persisted snapshot with `raw`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn save(&self, raw: &str) -> Result<(), StorageError>;

    /// Remove the persisted snapshot. Used by the reset flow.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    async fn clear(&self) -> Result<(), StorageError>;
}

/// Simple in-memory snapshot store for testing and prototyping.
///
/// Tracks how many writes actually reached the store so debounce behavior
/// is observable from tests.
#[derive(Clone, Default)]
pub struct InMemorySnapshots {
    blob: Arc<Mutex<Option<String>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemorySnapshots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with a raw blob, as if a previous run had saved it.
    #[must_use]
    pub fn seeded(raw: impl Into<String>) -> Self {
        Self {
            blob: Arc::new(Mutex::new(Some(raw.into()))),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `save` calls that reached the store.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Peek at the currently stored blob.
    #[must_use]
    pub fn stored(&self) -> Option<String> {
        self.blob.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl SnapshotRepository for InMemorySnapshots {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        let guard = self
            .blob
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save(&self, raw: &str) -> Result<(), StorageError> {
        let mut guard = self
            .blob
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(raw.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut guard = self
            .blob
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_round_trip() {
        let repo = InMemorySnapshots::new();
        assert_eq!(repo.load().await.unwrap(), None);

        repo.save("{\"progress\":{}}").await.unwrap();
        assert_eq!(repo.load().await.unwrap().as_deref(), Some("{\"progress\":{}}"));
        assert_eq!(repo.writes(), 1);

        repo.clear().await.unwrap();
        assert_eq!(repo.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn seeded_store_reads_back_without_counting_writes() {
        let repo = InMemorySnapshots::seeded("not json");
        assert_eq!(repo.load().await.unwrap().as_deref(), Some("not json"));
        assert_eq!(repo.writes(), 0);
    }

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InMemorySnapshots>();
    }
}
