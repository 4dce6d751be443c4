use std::fmt;

use chrono::{DateTime, Utc};

use exam_core::model::{
    AnswerSheet, Question, QuestionId, SectionKey, SectionPlan, Selection, SessionId,
    SubmittedAnswer,
};

use crate::error::SessionError;

//
// ─── PHASES AND NOTICES ────────────────────────────────────────────────────────
//

/// Lifecycle phase of a section run.
///
/// Phases move forward only, with two sanctioned exceptions: a failed start
/// call drops `Starting` back to `Instructions`, and a failed manual
/// submission drops `Submitting` back to `Active` so the candidate can retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionPhase {
    /// Instructions on display, pre-start countdown not yet armed.
    Instructions,
    /// Pre-start countdown is running; begins automatically at zero.
    Countdown,
    /// Start request in flight; questions not yet here.
    Starting,
    /// The section clock runs and answers are accepted.
    Active,
    /// A submission round trip is in flight.
    Submitting,
    /// Terminal. The run only leaves this phase by being dropped.
    Finished,
}

impl fmt::Display for SectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Instructions => "instructions",
            Self::Countdown => "countdown",
            Self::Starting => "starting",
            Self::Active => "active",
            Self::Submitting => "submitting",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeSeverity {
    Warning,
    Error,
}

/// A dismissable user-facing message raised by the section flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: NoticeSeverity,
    pub message: String,
}

impl Notice {
    pub(crate) fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: NoticeSeverity::Warning,
            message: message.into(),
        }
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self {
            severity: NoticeSeverity::Error,
            message: message.into(),
        }
    }
}

//
// ─── SECTION OUTCOME ───────────────────────────────────────────────────────────
//

/// Terminal result of one section run, fed to the exam orchestrator.
///
/// Only a run that reached `Finished` can produce one, so section ordering is
/// enforced by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionOutcome {
    section: SectionKey,
    session_id: Option<SessionId>,
    forced: bool,
    submission_failed: bool,
    answered: usize,
    finished_at: DateTime<Utc>,
}

impl SectionOutcome {
    #[must_use]
    pub fn section(&self) -> &SectionKey {
        &self.section
    }

    /// Session id issued by the service, if this was an adaptive section.
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// True when the section was closed by the clock rather than the candidate.
    #[must_use]
    pub fn forced(&self) -> bool {
        self.forced
    }

    /// True when the closing submission never reached the service.
    #[must_use]
    pub fn submission_failed(&self) -> bool {
        self.submission_failed
    }

    #[must_use]
    pub fn answered(&self) -> usize {
        self.answered
    }

    #[must_use]
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }
}

//
// ─── SECTION RUN ───────────────────────────────────────────────────────────────
//

/// State machine for one timed section.
///
/// The run is purely synchronous: network and timer effects live in
/// `SectionController`, which drives the transitions below and stamps times
/// from the services layer clock. Two guards keep the flow honest under
/// overlapping triggers: a start guard so the pre-start countdown and a manual
/// begin cannot start the section twice, and a terminal-submission latch so a
/// manual submit racing the expiring clock sends at most one closing call.
pub struct SectionRun {
    plan: SectionPlan,
    phase: SectionPhase,
    prestart_remaining: u32,
    time_remaining: u32,
    session_id: Option<SessionId>,
    questions: Vec<Question>,
    current: usize,
    answers: AnswerSheet,
    started_once: bool,
    submitted_once: bool,
    timer_expired: bool,
    notices: Vec<Notice>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl SectionRun {
    #[must_use]
    pub fn new(plan: SectionPlan, prestart_seconds: u32) -> Self {
        let time_remaining = plan.duration_seconds();
        Self {
            plan,
            phase: SectionPhase::Instructions,
            prestart_remaining: prestart_seconds,
            time_remaining,
            session_id: None,
            questions: Vec::new(),
            current: 0,
            answers: AnswerSheet::new(),
            started_once: false,
            submitted_once: false,
            timer_expired: false,
            notices: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    #[must_use]
    pub fn plan(&self) -> &SectionPlan {
        &self.plan
    }

    #[must_use]
    pub fn phase(&self) -> SectionPhase {
        self.phase
    }

    #[must_use]
    pub fn prestart_remaining(&self) -> u32 {
        self.prestart_remaining
    }

    #[must_use]
    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// True when the question on display is the last one loaded.
    ///
    /// For adaptive sections this is always true; the next question is not
    /// known until the service sends it.
    #[must_use]
    pub fn is_last_question(&self) -> bool {
        !self.questions.is_empty() && self.current + 1 == self.questions.len()
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.answered_count()
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == SectionPhase::Finished
    }

    #[must_use]
    pub fn has_submitted(&self) -> bool {
        self.submitted_once
    }

    /// True once the section clock hit zero, whatever the phase was then.
    #[must_use]
    pub fn timer_expired(&self) -> bool {
        self.timer_expired
    }

    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Drain pending notices for display.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// The recorded selection for the question on display, in wire shape.
    #[must_use]
    pub fn current_selection(&self) -> Option<Selection> {
        self.current_question()
            .and_then(|question| self.answers.selection_for(question))
    }

    /// Wire payload of every answered question, in section order.
    #[must_use]
    pub fn submission_payload(&self) -> Vec<SubmittedAnswer> {
        self.answers.to_submission_payload(&self.questions)
    }

    // ─── Pre-start countdown ───

    /// Switch the instruction screen's countdown on.
    pub fn arm_prestart(&mut self) {
        if self.phase == SectionPhase::Instructions {
            self.phase = SectionPhase::Countdown;
        }
    }

    pub fn prestart_tick(&mut self, remaining: u32) {
        if self.phase == SectionPhase::Countdown {
            self.prestart_remaining = remaining;
        }
    }

    /// Request the section start.
    ///
    /// Returns `false` when the request is swallowed: the run already started
    /// once (the pre-start countdown firing together with a manual begin must
    /// not start the section twice) or the run is past its instruction phase.
    pub fn begin(&mut self) -> bool {
        let waiting = matches!(
            self.phase,
            SectionPhase::Instructions | SectionPhase::Countdown
        );
        if !waiting || self.started_once {
            return false;
        }
        self.started_once = true;
        self.phase = SectionPhase::Starting;
        true
    }

    /// Roll a failed start back so the candidate can retry from instructions.
    pub(crate) fn start_failed(&mut self, message: impl Into<String>) {
        if self.phase != SectionPhase::Starting {
            return;
        }
        self.started_once = false;
        self.phase = SectionPhase::Instructions;
        self.notices.push(Notice::error(message));
    }

    // ─── Activation ───

    /// Bring an adaptive section live with its first question.
    pub(crate) fn activate_adaptive(
        &mut self,
        session_id: SessionId,
        question: Question,
        at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.require_phase(SectionPhase::Starting)?;
        self.session_id = Some(session_id);
        self.questions = vec![question];
        self.current = 0;
        self.activate(at);
        Ok(())
    }

    /// Bring a bulk section live with its full question set.
    pub(crate) fn activate_bulk(
        &mut self,
        questions: Vec<Question>,
        at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.require_phase(SectionPhase::Starting)?;
        if questions.is_empty() {
            return Err(SessionError::NoQuestion);
        }
        self.questions = questions;
        self.current = 0;
        self.activate(at);
        Ok(())
    }

    fn activate(&mut self, at: DateTime<Utc>) {
        self.time_remaining = self.plan.duration_seconds();
        self.started_at = Some(at);
        self.phase = SectionPhase::Active;
    }

    // ─── Answering ───

    /// Record a selection for the question on display.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside the active phase,
    /// `SessionError::NoQuestion` without a question on display, and
    /// `SessionError::InvalidSelection` when the selection does not fit the
    /// question's shape.
    pub fn answer(&mut self, prompt: usize, option: usize) -> Result<QuestionId, SessionError> {
        self.require_phase(SectionPhase::Active)?;
        let Some(question) = self.questions.get(self.current) else {
            return Err(SessionError::NoQuestion);
        };
        if !question.accepts(prompt, option) {
            return Err(SessionError::InvalidSelection { prompt, option });
        }
        let question_id = question.id();
        self.answers.record(question_id, prompt, option);
        Ok(question_id)
    }

    /// Re-apply a cached selection after a reload. Entries that no longer fit
    /// the loaded questions are dropped.
    pub(crate) fn restore_answer(
        &mut self,
        question_id: QuestionId,
        prompt: usize,
        option: usize,
    ) -> bool {
        if self.phase != SectionPhase::Active {
            return false;
        }
        let fits = self
            .questions
            .iter()
            .find(|question| question.id() == question_id)
            .is_some_and(|question| question.accepts(prompt, option));
        if fits {
            self.answers.record(question_id, prompt, option);
        }
        fits
    }

    /// Move to the next loaded question (bulk sections).
    ///
    /// Returns `Ok(false)` when already on the last question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::IncompleteAnswer` when the question on display
    /// still has unanswered prompts.
    pub fn advance(&mut self) -> Result<bool, SessionError> {
        self.require_phase(SectionPhase::Active)?;
        if self.current_question().is_none() {
            return Err(SessionError::NoQuestion);
        }
        self.require_complete()?;
        if self.is_last_question() {
            return Ok(false);
        }
        self.current += 1;
        Ok(true)
    }

    // ─── Submission ───

    /// Open an intermediate submission round trip (adaptive answers).
    ///
    /// # Errors
    ///
    /// Returns a phase error outside `Active`, or
    /// `SessionError::IncompleteAnswer` when the displayed question is not
    /// fully answered.
    pub(crate) fn begin_submission(&mut self) -> Result<(), SessionError> {
        self.require_phase(SectionPhase::Active)?;
        if self.current_question().is_none() {
            return Err(SessionError::NoQuestion);
        }
        self.require_complete()?;
        self.phase = SectionPhase::Submitting;
        Ok(())
    }

    /// Open the terminal submission round trip and set the latch.
    ///
    /// The latch is set synchronously, before any network call, so a manual
    /// submit racing the expiring clock sends at most one closing call. A
    /// forced submission skips the completeness and last-question checks and
    /// sends whatever was answered.
    pub(crate) fn begin_terminal_submission(&mut self, forced: bool) -> Result<(), SessionError> {
        self.require_phase(SectionPhase::Active)?;
        if self.submitted_once {
            return Err(SessionError::AlreadySubmitted);
        }
        if !forced {
            if !self.is_last_question() {
                return Err(SessionError::NotLastQuestion);
            }
            self.require_complete()?;
        }
        self.submitted_once = true;
        self.phase = SectionPhase::Submitting;
        Ok(())
    }

    /// Set the latch from within an open round trip.
    ///
    /// Used when the service ends an adaptive section: the run is already
    /// `Submitting` and the closing finish call must still be latched.
    pub(crate) fn latch_terminal(&mut self) -> Result<(), SessionError> {
        self.require_phase(SectionPhase::Submitting)?;
        if self.submitted_once {
            return Err(SessionError::AlreadySubmitted);
        }
        self.submitted_once = true;
        Ok(())
    }

    /// Roll a failed submission back to `Active`.
    ///
    /// `release_latch` reopens the terminal latch so a manual retry can
    /// submit again; forced submissions keep it closed.
    pub(crate) fn submission_failed(&mut self, message: impl Into<String>, release_latch: bool) {
        if self.phase != SectionPhase::Submitting {
            return;
        }
        if release_latch {
            self.submitted_once = false;
        }
        self.phase = SectionPhase::Active;
        self.notices.push(Notice::error(message));
    }

    /// Replace the display with the next adaptive question.
    pub(crate) fn advance_to(&mut self, question: Question) -> Result<(), SessionError> {
        self.require_phase(SectionPhase::Submitting)?;
        self.questions.push(question);
        self.current = self.questions.len() - 1;
        self.phase = SectionPhase::Active;
        Ok(())
    }

    // ─── Clock ───

    pub fn set_time_remaining(&mut self, seconds: u32) {
        if matches!(self.phase, SectionPhase::Active | SectionPhase::Submitting) {
            self.time_remaining = seconds;
        }
    }

    /// Record that the section clock hit zero. Sticky; the controller acts on
    /// it as soon as the run is back in a stable phase.
    pub fn note_expiry(&mut self) {
        if self.phase != SectionPhase::Finished {
            self.timer_expired = true;
            self.time_remaining = 0;
        }
    }

    // ─── Finishing ───

    /// Close the run after a successful candidate-driven submission.
    pub(crate) fn finish(&mut self, at: DateTime<Utc>) -> Result<SectionOutcome, SessionError> {
        self.close(at, false, false)
    }

    /// Close the run after the clock forced it shut.
    ///
    /// `submission_failed` records that the closing call never reached the
    /// service; the run still finishes locally and a warning notice is kept
    /// for the candidate.
    pub(crate) fn finish_forced(
        &mut self,
        at: DateTime<Utc>,
        submission_failed: bool,
    ) -> Result<SectionOutcome, SessionError> {
        if submission_failed {
            self.notices.push(Notice::warning(
                "Time expired, but your answers could not reach the exam service. \
                 The section is closed locally.",
            ));
        }
        self.close(at, true, submission_failed)
    }

    fn close(
        &mut self,
        at: DateTime<Utc>,
        forced: bool,
        submission_failed: bool,
    ) -> Result<SectionOutcome, SessionError> {
        self.require_phase(SectionPhase::Submitting)?;
        self.phase = SectionPhase::Finished;
        self.finished_at = Some(at);
        Ok(SectionOutcome {
            section: self.plan.key().clone(),
            session_id: self.session_id.clone(),
            forced,
            submission_failed,
            answered: self.answers.answered_count(),
            finished_at: at,
        })
    }

    // ─── Internals ───

    pub(crate) fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    fn require_phase(&self, expected: SectionPhase) -> Result<(), SessionError> {
        if self.phase == expected {
            return Ok(());
        }
        Err(match self.phase {
            SectionPhase::Finished => SessionError::Finished,
            SectionPhase::Submitting => SessionError::SubmissionInFlight,
            _ if expected == SectionPhase::Active => SessionError::NotActive,
            _ => SessionError::NotStarting,
        })
    }

    fn require_complete(&self) -> Result<(), SessionError> {
        let Some(question) = self.current_question() else {
            return Err(SessionError::NoQuestion);
        };
        if self.answers.is_complete_for(question) {
            return Ok(());
        }
        let required = question.prompt_count();
        let answered = self
            .answers
            .get(question.id())
            .map_or(0, |record| {
                (0..required)
                    .filter(|prompt| record.selection(*prompt).is_some())
                    .count()
            });
        Err(SessionError::IncompleteAnswer {
            required,
            missing: required.saturating_sub(answered),
        })
    }
}

impl fmt::Debug for SectionRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionRun")
            .field("section", &self.plan.key())
            .field("phase", &self.phase)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("answered", &self.answers.answered_count())
            .field("time_remaining", &self.time_remaining)
            .field("submitted_once", &self.submitted_once)
            .field("timer_expired", &self.timer_expired)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
