use exam_core::model::QuestionId;
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{AnswerCacheRepository, CacheScope, CachedAnswerRecord, StorageError};

fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn index_i64(field: &'static str, v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn index_from_i64(field: &'static str, v: i64) -> Result<usize, StorageError> {
    usize::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn map_cached_row(row: &sqlx::sqlite::SqliteRow) -> Result<CachedAnswerRecord, StorageError> {
    let question_id = row.try_get::<i64, _>("question_id").map_err(ser)?;
    let question_id = u64::try_from(question_id)
        .map(QuestionId::new)
        .map_err(|_| StorageError::Serialization(format!("invalid question_id: {question_id}")))?;
    let prompt = index_from_i64("prompt", row.try_get::<i64, _>("prompt").map_err(ser)?)?;
    let option = index_from_i64("selected", row.try_get::<i64, _>("selected").map_err(ser)?)?;

    Ok(CachedAnswerRecord {
        question_id,
        prompt,
        option,
    })
}

#[async_trait::async_trait]
impl AnswerCacheRepository for SqliteRepository {
    async fn save_answer(
        &self,
        scope: &CacheScope,
        question_id: QuestionId,
        prompt: usize,
        option: usize,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO answer_cache (attempt_id, section, question_id, prompt, selected)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(attempt_id, section, question_id, prompt)
                    DO UPDATE SET selected = excluded.selected
            ",
        )
        .bind(scope.attempt_id.value())
        .bind(scope.section.as_str())
        .bind(id_i64("question_id", question_id.value())?)
        .bind(index_i64("prompt", prompt)?)
        .bind(index_i64("selected", option)?)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn load_answers(
        &self,
        scope: &CacheScope,
    ) -> Result<Vec<CachedAnswerRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT question_id, prompt, selected
                FROM answer_cache
                WHERE attempt_id = ?1 AND section = ?2
                ORDER BY question_id ASC, prompt ASC
            ",
        )
        .bind(scope.attempt_id.value())
        .bind(scope.section.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_cached_row(&row)?);
        }

        Ok(out)
    }

    async fn clear_answers(&self, scope: &CacheScope) -> Result<(), StorageError> {
        sqlx::query(
            r"
                DELETE FROM answer_cache
                WHERE attempt_id = ?1 AND section = ?2
            ",
        )
        .bind(scope.attempt_id.value())
        .bind(scope.section.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
