use std::fmt;
use std::sync::Arc;

use exam_core::Clock;
use exam_core::model::{AttemptId, Candidate, ExamPlan, SectionPlan, SessionId};
use storage::repository::{CacheScope, Storage, StorageError};

use crate::api::{ExamApi, ExamContext};
use crate::error::SessionError;

use super::controller::SectionController;
use super::state::{SectionOutcome, SectionRun};

/// Where the exam stands after consuming a section outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamProgress {
    /// The next section is ready to mount.
    NextSection { index: usize },
    /// Every section is finished.
    Complete,
}

/// Walks one exam attempt through its fixed section sequence.
///
/// The orchestrator mints a local attempt id for cache scoping, mounts one
/// section controller at a time, and consumes each terminal
/// [`SectionOutcome`] to move forward. The session id issued by the first
/// adaptive section is adopted and carried into every later start call, so
/// the service sees one attempt across sections; the client never mints one.
#[derive(Clone)]
pub struct ExamOrchestrator {
    api: Arc<dyn ExamApi>,
    storage: Storage,
    clock: Clock,
    plan: ExamPlan,
    candidate: Candidate,
    attempt_id: AttemptId,
    session_id: Option<SessionId>,
    current: usize,
}

impl ExamOrchestrator {
    #[must_use]
    pub fn new(
        api: Arc<dyn ExamApi>,
        storage: Storage,
        clock: Clock,
        plan: ExamPlan,
        candidate: Candidate,
    ) -> Self {
        Self {
            api,
            storage,
            clock,
            plan,
            candidate,
            attempt_id: AttemptId::random(),
            session_id: None,
            current: 0,
        }
    }

    /// Record the candidate as signed in, then build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when the candidate cannot be saved.
    pub async fn sign_in(
        api: Arc<dyn ExamApi>,
        storage: Storage,
        clock: Clock,
        plan: ExamPlan,
        candidate: Candidate,
    ) -> Result<Self, SessionError> {
        storage
            .candidates
            .upsert_candidate(&candidate, clock.now())
            .await?;
        Ok(Self::new(api, storage, clock, plan, candidate))
    }

    /// Build an orchestrator for whoever is signed in.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::MissingIdentity` when nobody is signed in; an
    /// attempt cannot start without a candidate.
    pub async fn for_signed_in(
        api: Arc<dyn ExamApi>,
        storage: Storage,
        clock: Clock,
        plan: ExamPlan,
    ) -> Result<Self, SessionError> {
        let candidate = storage.candidates.get_candidate().await.map_err(|err| {
            if matches!(err, StorageError::NotFound) {
                SessionError::MissingIdentity
            } else {
                SessionError::Storage(err)
            }
        })?;
        Ok(Self::new(api, storage, clock, plan, candidate))
    }

    /// Continue an attempt whose session id the caller already holds. Every
    /// start call for this attempt then carries it as a resume id.
    #[must_use]
    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Carry an earlier run's attempt id, so its cached bulk answers stay in
    /// scope after a reload.
    #[must_use]
    pub fn with_attempt_id(mut self, attempt_id: AttemptId) -> Self {
        self.attempt_id = attempt_id;
        self
    }

    #[must_use]
    pub fn plan(&self) -> &ExamPlan {
        &self.plan
    }

    #[must_use]
    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    /// The server-issued session id adopted from the first adaptive section.
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    #[must_use]
    pub fn current_section_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_section(&self) -> Option<&SectionPlan> {
        self.plan.section(self.current)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.current >= self.plan.section_count()
    }

    /// Build the controller for the current section.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ExamComplete` when every section is done.
    pub fn mount_section(&self) -> Result<SectionController, SessionError> {
        let Some(section) = self.current_section() else {
            return Err(SessionError::ExamComplete);
        };
        let run = SectionRun::new(section.clone(), self.plan.prestart_seconds());
        let scope = CacheScope::new(self.attempt_id, section.key().clone());
        let context = ExamContext::new(&self.candidate, &self.plan);
        let mut controller = SectionController::new(
            Arc::clone(&self.api),
            self.storage.clone(),
            self.clock,
            run,
            context,
            scope,
        );
        if let Some(session_id) = &self.session_id {
            controller = controller.with_resume(session_id.clone());
        }
        Ok(controller)
    }

    /// Consume a finished section's outcome and move to the next section.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ExamComplete` when there is nothing left to
    /// advance past, and `SessionError::WrongSection` when the outcome does
    /// not belong to the section currently on deck.
    pub fn advance(&mut self, outcome: &SectionOutcome) -> Result<ExamProgress, SessionError> {
        let Some(section) = self.current_section() else {
            return Err(SessionError::ExamComplete);
        };
        if outcome.section() != section.key() {
            return Err(SessionError::WrongSection {
                expected: section.key().as_str().to_owned(),
                got: outcome.section().as_str().to_owned(),
            });
        }

        if let Some(session_id) = outcome.session_id() {
            self.session_id = Some(session_id.clone());
        }
        self.current += 1;

        tracing::debug!(
            section = %outcome.section(),
            forced = outcome.forced(),
            next = self.current,
            of = self.plan.section_count(),
            "section consumed"
        );

        if self.is_complete() {
            Ok(ExamProgress::Complete)
        } else {
            Ok(ExamProgress::NextSection {
                index: self.current,
            })
        }
    }
}

impl fmt::Debug for ExamOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamOrchestrator")
            .field("plan", &self.plan)
            .field("candidate", &self.candidate)
            .field("attempt_id", &self.attempt_id)
            .field("session_id", &self.session_id)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
