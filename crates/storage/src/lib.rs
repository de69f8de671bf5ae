#![forbid(unsafe_code)]

pub mod repository;
pub mod snapshot;
pub mod sqlite;
pub mod writer;

pub use repository::{InMemorySnapshots, SNAPSHOT_KEY, SnapshotRepository, StorageError};
pub use snapshot::{AppSnapshot, CodecError, decode_str, encode_state};
pub use sqlite::{SqliteInitError, SqliteRepository};
pub use writer::{DEFAULT_DEBOUNCE, SnapshotWriter, persist};
