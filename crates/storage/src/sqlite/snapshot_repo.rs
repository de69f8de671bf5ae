use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use crate::repository::{SNAPSHOT_KEY, SnapshotRepository, StorageError};

use super::SqliteRepository;

#[async_trait]
impl SnapshotRepository for SqliteRepository {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT value
            FROM snapshots
            WHERE key = ?1
            ",
        )
        .bind(SNAPSHOT_KEY)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        row.try_get::<String, _>("value")
            .map(Some)
            .map_err(|err| StorageError::Serialization(err.to_string()))
    }

    async fn save(&self, raw: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO snapshots (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
        )
        .bind(SNAPSHOT_KEY)
        .bind(raw)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        sqlx::query(
            r"
            DELETE FROM snapshots
            WHERE key = ?1
            ",
        )
        .bind(SNAPSHOT_KEY)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}
