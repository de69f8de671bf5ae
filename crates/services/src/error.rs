//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressStore` operations that must not be silent.
///
/// Routine persistence is best-effort and never errors; only explicit
/// flush/reset calls surface storage failures to the caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressStoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping the store against `SQLite`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreInitError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
