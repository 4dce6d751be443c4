use chrono::{DateTime, Utc};
use exam_core::model::Candidate;
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{CandidateRepository, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[async_trait::async_trait]
impl CandidateRepository for SqliteRepository {
    async fn upsert_candidate(
        &self,
        candidate: &Candidate,
        saved_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO candidates (id, email, saved_at)
                VALUES (1, ?1, ?2)
                ON CONFLICT(id) DO UPDATE SET
                    email = excluded.email,
                    saved_at = excluded.saved_at
            ",
        )
        .bind(candidate.email())
        .bind(saved_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_candidate(&self) -> Result<Candidate, StorageError> {
        let row = sqlx::query("SELECT email FROM candidates WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        let email: String = row.try_get("email").map_err(ser)?;
        Candidate::new(&email).map_err(ser)
    }

    async fn clear_candidate(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM candidates WHERE id = 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
