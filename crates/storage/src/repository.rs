use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{AttemptId, Candidate, IdentityError, QuestionId, SectionKey};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Storage scope for cached answers: one local attempt, one section.
///
/// Scoping by attempt keeps concurrent attempts from reading each other's
/// drafts; the scope is minted by the orchestrator, never shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheScope {
    pub attempt_id: AttemptId,
    pub section: SectionKey,
}

impl CacheScope {
    #[must_use]
    pub fn new(attempt_id: AttemptId, section: SectionKey) -> Self {
        Self {
            attempt_id,
            section,
        }
    }
}

/// Persisted shape for one cached selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedAnswerRecord {
    pub question_id: QuestionId,
    pub prompt: usize,
    pub option: usize,
}

/// Persisted shape for the signed-in candidate.
///
/// This mirrors the domain `Candidate` so repositories can serialize without
/// leaking storage concerns into the domain layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    pub email: String,
    pub saved_at: DateTime<Utc>,
}

impl CandidateRecord {
    #[must_use]
    pub fn from_candidate(candidate: &Candidate, saved_at: DateTime<Utc>) -> Self {
        Self {
            email: candidate.email().to_owned(),
            saved_at,
        }
    }

    /// Convert the record back into a domain `Candidate`.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if the stored email no longer validates.
    pub fn into_candidate(self) -> Result<Candidate, IdentityError> {
        Candidate::new(&self.email)
    }
}

/// Repository contract for the attempt-scoped partial-answer cache.
///
/// Bulk sections write through on every recorded selection so a crashed host
/// can restore the draft sheet for the same attempt.
#[async_trait]
pub trait AnswerCacheRepository: Send + Sync {
    /// Persist one selection for the scoped attempt and section, replacing a
    /// previous choice for the same prompt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the selection cannot be stored.
    async fn save_answer(
        &self,
        scope: &CacheScope,
        question_id: QuestionId,
        prompt: usize,
        option: usize,
    ) -> Result<(), StorageError>;

    /// Fetch every cached selection for the scope, ordered by question and
    /// prompt. An unknown scope yields an empty list, not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn load_answers(&self, scope: &CacheScope) -> Result<Vec<CachedAnswerRecord>, StorageError>;

    /// Drop the scope's cache. Called after a confirmed submission.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn clear_answers(&self, scope: &CacheScope) -> Result<(), StorageError>;
}

/// Repository contract for the signed-in candidate record.
#[async_trait]
pub trait CandidateRepository: Send + Sync {
    /// Persist the signed-in candidate, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_candidate(
        &self,
        candidate: &Candidate,
        saved_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Fetch the signed-in candidate.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when nobody is signed in.
    async fn get_candidate(&self) -> Result<Candidate, StorageError>;

    /// Remove the candidate record on sign-out.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn clear_candidate(&self) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

type ScopedAnswers = BTreeMap<(QuestionId, usize), usize>;

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    answers: Arc<Mutex<HashMap<(AttemptId, SectionKey), ScopedAnswers>>>,
    candidate: Arc<Mutex<Option<CandidateRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnswerCacheRepository for InMemoryRepository {
    async fn save_answer(
        &self,
        scope: &CacheScope,
        question_id: QuestionId,
        prompt: usize,
        option: usize,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .answers
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .entry((scope.attempt_id, scope.section.clone()))
            .or_default()
            .insert((question_id, prompt), option);
        Ok(())
    }

    async fn load_answers(
        &self,
        scope: &CacheScope,
    ) -> Result<Vec<CachedAnswerRecord>, StorageError> {
        let guard = self
            .answers
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let Some(scoped) = guard.get(&(scope.attempt_id, scope.section.clone())) else {
            return Ok(Vec::new());
        };
        Ok(scoped
            .iter()
            .map(|(&(question_id, prompt), &option)| CachedAnswerRecord {
                question_id,
                prompt,
                option,
            })
            .collect())
    }

    async fn clear_answers(&self, scope: &CacheScope) -> Result<(), StorageError> {
        let mut guard = self
            .answers
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&(scope.attempt_id, scope.section.clone()));
        Ok(())
    }
}

#[async_trait]
impl CandidateRepository for InMemoryRepository {
    async fn upsert_candidate(
        &self,
        candidate: &Candidate,
        saved_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .candidate
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(CandidateRecord::from_candidate(candidate, saved_at));
        Ok(())
    }

    async fn get_candidate(&self) -> Result<Candidate, StorageError> {
        let guard = self
            .candidate
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .clone()
            .ok_or(StorageError::NotFound)?
            .into_candidate()
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn clear_candidate(&self) -> Result<(), StorageError> {
        let mut guard = self
            .candidate
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// Aggregates the client-side repositories behind trait objects for easy
/// backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub answers: Arc<dyn AnswerCacheRepository>,
    pub candidates: Arc<dyn CandidateRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let answers: Arc<dyn AnswerCacheRepository> = Arc::new(repo.clone());
        let candidates: Arc<dyn CandidateRepository> = Arc::new(repo);
        Self {
            answers,
            candidates,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
