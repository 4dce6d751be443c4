use std::sync::Arc;

use exam_core::Clock;
use exam_core::model::{DeliveryProtocol, Question, SectionKey, SessionId};
use storage::repository::{CacheScope, Storage};

use crate::api::{AdaptiveStep, ExamApi, ExamContext};
use crate::error::SessionError;
use crate::guard::{GuardDecision, NavigationGuard, NavigationIntent};
use crate::timer::{CountdownTimer, TimerEvent};

use super::state::{Notice, SectionOutcome, SectionPhase, SectionRun};

const START_FAILED_MESSAGE: &str =
    "Could not start the section. Check your connection and try again.";
const SUBMIT_FAILED_MESSAGE: &str =
    "Could not submit your answers. Your selections are kept; try again.";

/// What a timer event did to the run, reported back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionEvent {
    /// The instruction countdown moved.
    PrestartTick { remaining_seconds: u32 },
    /// The instruction countdown hit zero and the section went active.
    Started,
    /// The instruction countdown hit zero but the start call failed; the run
    /// is back on instructions waiting for a manual begin.
    StartFailed,
    /// The section clock moved.
    Tick { remaining_seconds: u32 },
    /// The section clock hit zero. The run is force-submitted, either here or
    /// as soon as an in-flight submission settles.
    Expired,
}

//
// ─── SECTION CONTROLLER ────────────────────────────────────────────────────────
//

/// Drives one `SectionRun` against the exam service.
///
/// The controller owns the run, its two countdowns and the navigation guard,
/// and performs every side effect the pure machine cannot: network calls,
/// answer-cache write-through, and timestamps from the services layer clock.
/// Methods take `&mut self`, so transitions are serialized; every await
/// re-checks the machine's phase before mutating, which keeps stale responses
/// from acting on a run that moved on.
///
/// Timer events are pulled through [`next_timer_event`]; hosts await it in
/// their display loop and interleave candidate actions between calls.
///
/// [`next_timer_event`]: SectionController::next_timer_event
pub struct SectionController {
    api: Arc<dyn ExamApi>,
    storage: Storage,
    clock: Clock,
    context: ExamContext,
    scope: CacheScope,
    resume: Option<SessionId>,
    run: SectionRun,
    guard: NavigationGuard,
    prestart_timer: Option<CountdownTimer>,
    section_timer: Option<CountdownTimer>,
    outcome: Option<SectionOutcome>,
}

impl SectionController {
    #[must_use]
    pub fn new(
        api: Arc<dyn ExamApi>,
        storage: Storage,
        clock: Clock,
        run: SectionRun,
        context: ExamContext,
        scope: CacheScope,
    ) -> Self {
        Self {
            api,
            storage,
            clock,
            context,
            scope,
            resume: None,
            run,
            guard: NavigationGuard::new(),
            prestart_timer: None,
            section_timer: None,
            outcome: None,
        }
    }

    /// Carry a session id from an earlier section, so the start call resumes
    /// the attempt instead of opening a new one.
    #[must_use]
    pub fn with_resume(mut self, session_id: SessionId) -> Self {
        self.resume = Some(session_id);
        self
    }

    #[must_use]
    pub fn run(&self) -> &SectionRun {
        &self.run
    }

    #[must_use]
    pub fn phase(&self) -> SectionPhase {
        self.run.phase()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.run.is_finished()
    }

    /// Drain pending notices for display.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.run.take_notices()
    }

    /// The terminal outcome, once the run finished.
    pub fn take_outcome(&mut self) -> Option<SectionOutcome> {
        self.outcome.take()
    }

    /// Route a host navigation intent through the guard.
    pub fn decide_navigation(&mut self, intent: NavigationIntent) -> GuardDecision {
        self.guard.decide(intent)
    }

    /// Put the section on screen: arm the guard and the instruction countdown.
    ///
    /// Must be called within a tokio runtime; the countdown runs as a task.
    pub fn mount(&mut self) {
        self.guard.install();
        self.run.arm_prestart();
        if self.run.phase() == SectionPhase::Countdown && self.prestart_timer.is_none() {
            self.prestart_timer = Some(CountdownTimer::start(self.run.prestart_remaining()));
        }
    }

    /// Await the next countdown event and apply it to the run.
    ///
    /// During the instruction phase this drives the pre-start countdown and
    /// auto-begins the section at zero; once active it drives the section
    /// clock and forces submission at zero. Returns `None` when no countdown
    /// is live.
    ///
    /// # Errors
    ///
    /// Propagates machine invariant violations from the applied transition.
    /// Network failures do not surface here; they become notices on the run.
    pub async fn next_timer_event(&mut self) -> Result<Option<SectionEvent>, SessionError> {
        if matches!(
            self.run.phase(),
            SectionPhase::Instructions | SectionPhase::Countdown
        ) {
            let Some(timer) = self.prestart_timer.as_mut() else {
                return Ok(None);
            };
            return match timer.next_event().await {
                Some(TimerEvent::Tick { remaining_seconds }) => {
                    self.run.prestart_tick(remaining_seconds);
                    Ok(Some(SectionEvent::PrestartTick { remaining_seconds }))
                }
                Some(TimerEvent::Expired) => {
                    self.run.prestart_tick(0);
                    self.begin().await?;
                    Ok(Some(if self.run.phase() == SectionPhase::Active {
                        SectionEvent::Started
                    } else {
                        SectionEvent::StartFailed
                    }))
                }
                None => Ok(None),
            };
        }

        let Some(timer) = self.section_timer.as_mut() else {
            return Ok(None);
        };
        match timer.next_event().await {
            Some(TimerEvent::Tick { remaining_seconds }) => {
                self.run.set_time_remaining(remaining_seconds);
                Ok(Some(SectionEvent::Tick { remaining_seconds }))
            }
            Some(TimerEvent::Expired) => {
                self.run.note_expiry();
                self.force_submit().await?;
                Ok(Some(SectionEvent::Expired))
            }
            None => Ok(None),
        }
    }

    /// Start the section now, skipping what is left of the instruction
    /// countdown.
    ///
    /// A begin that races the countdown's own expiry is swallowed by the
    /// run's start guard, so the section starts at most once. A failed start
    /// call rolls back to instructions with an error notice; the candidate
    /// retries manually.
    ///
    /// # Errors
    ///
    /// Propagates machine invariant violations. Network failures become
    /// notices, not errors.
    pub async fn begin(&mut self) -> Result<(), SessionError> {
        if !self.run.begin() {
            return Ok(());
        }
        if let Some(timer) = self.prestart_timer.as_mut() {
            timer.stop();
        }
        self.prestart_timer = None;

        let section = self.run.plan().key().clone();
        tracing::debug!(section = %section, "starting section");

        match self.run.plan().delivery().clone() {
            DeliveryProtocol::Adaptive => {
                let started = self
                    .api
                    .start_section(&self.context, &section, self.resume.as_ref())
                    .await;
                match started {
                    Ok((session_id, question)) => {
                        self.run
                            .activate_adaptive(session_id, question, self.clock.now())?;
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, section = %section, "section start failed");
                        self.run.start_failed(START_FAILED_MESSAGE);
                        return Ok(());
                    }
                }
            }
            DeliveryProtocol::Bulk { path } => {
                match self.api.fetch_bulk_questions(&self.context, &path).await {
                    Ok(questions) if questions.is_empty() => {
                        self.run
                            .start_failed("The exam service has no questions for this section.");
                        return Ok(());
                    }
                    Ok(questions) => {
                        self.run.activate_bulk(questions, self.clock.now())?;
                        self.restore_cached_answers().await;
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, section = %section, "section start failed");
                        self.run.start_failed(START_FAILED_MESSAGE);
                        return Ok(());
                    }
                }
            }
        }

        self.section_timer = Some(CountdownTimer::start(self.run.plan().duration_seconds()));
        tracing::debug!(section = %section, "section active");
        Ok(())
    }

    /// Record a selection for the question on display.
    ///
    /// Bulk selections are written through to the answer cache; a cache
    /// failure is logged and never blocks the answer.
    ///
    /// # Errors
    ///
    /// Propagates the run's validation of phase and selection shape.
    pub async fn answer(&mut self, prompt: usize, option: usize) -> Result<(), SessionError> {
        let question_id = self.run.answer(prompt, option)?;
        if self.run.plan().is_bulk() {
            let saved = self
                .storage
                .answers
                .save_answer(&self.scope, question_id, prompt, option)
                .await;
            if let Err(err) = saved {
                tracing::warn!(error = %err, "failed to cache an answer");
            }
        }
        Ok(())
    }

    /// Move a bulk section to its next question.
    ///
    /// Returns `Ok(false)` when already on the last question.
    ///
    /// # Errors
    ///
    /// The displayed question must be completely answered before moving on.
    pub fn advance(&mut self) -> Result<bool, SessionError> {
        self.run.advance()
    }

    /// Submit the current answer (adaptive) or the whole section (bulk).
    ///
    /// Adaptive sections send one answer per call; the service either returns
    /// the next question or ends the section, in which case the closing
    /// finish call is made when the plan asks for one. Bulk sections accept
    /// the submission only from the last question and send every recorded
    /// answer in one payload.
    ///
    /// # Errors
    ///
    /// Propagates the run's validation (completeness, phase, last-question
    /// rule). Network failures roll the run back to active with an error
    /// notice and are not returned as errors; the latch is released so the
    /// candidate can retry.
    pub async fn submit(&mut self) -> Result<(), SessionError> {
        let section = self.run.plan().key().clone();
        match self.run.plan().delivery().clone() {
            DeliveryProtocol::Adaptive => self.submit_adaptive(&section).await,
            DeliveryProtocol::Bulk { path } => self.submit_bulk(&section, &path).await,
        }
    }

    async fn submit_adaptive(&mut self, section: &SectionKey) -> Result<(), SessionError> {
        let Some(session_id) = self.run.session_id().cloned() else {
            return Err(SessionError::NotActive);
        };
        self.run.begin_submission()?;
        // The open round trip guarantees a complete current question; an
        // empty read here is a bug, so roll the phase back before erroring.
        let (question_id, selected) = match (
            self.run.current_question().map(Question::id),
            self.run.current_selection(),
        ) {
            (Some(question_id), Some(selected)) => (question_id, selected),
            _ => {
                self.run
                    .submission_failed("No selection recorded for this question.", false);
                return Err(SessionError::NoQuestion);
            }
        };

        let step = self
            .api
            .submit_answer(&session_id, section, question_id, &selected)
            .await;
        match step {
            Ok(AdaptiveStep::Next(question)) => {
                self.run.advance_to(question)?;
                if self.run.timer_expired() {
                    // The clock ran out while this answer was in flight.
                    self.force_submit().await?;
                }
                Ok(())
            }
            Ok(AdaptiveStep::Finished) => {
                let latched = self.run.latch_terminal().is_ok();
                if latched && self.run.plan().finish_on_complete() {
                    let finished = self.api.finish_section(&session_id, section, false).await;
                    if let Err(err) = finished {
                        tracing::warn!(error = %err, section = %section, "finish call failed after the last answer");
                        self.run.push_notice(Notice::warning(
                            "The section ended, but the closing call did not reach the exam service.",
                        ));
                    }
                }
                let outcome = self.run.finish(self.clock.now())?;
                self.finish_run(outcome);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, section = %section, "answer submission failed");
                self.run.submission_failed(SUBMIT_FAILED_MESSAGE, false);
                Ok(())
            }
        }
    }

    async fn submit_bulk(&mut self, section: &SectionKey, path: &str) -> Result<(), SessionError> {
        self.run.begin_terminal_submission(false)?;
        let payload = self.run.submission_payload();

        match self
            .api
            .submit_bulk_answers(&self.context, path, &payload)
            .await
        {
            Ok(()) => {
                self.clear_cache().await;
                let outcome = self.run.finish(self.clock.now())?;
                self.finish_run(outcome);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, section = %section, "section submission failed");
                self.run.submission_failed(SUBMIT_FAILED_MESSAGE, true);
                Ok(())
            }
        }
    }

    /// Close the section because its clock ran out.
    ///
    /// Bypasses completeness validation and submits whatever was answered.
    /// If the closing call cannot reach the service, the run still finishes
    /// locally with a warning, so the candidate is never trapped in an
    /// expired section.
    async fn force_submit(&mut self) -> Result<(), SessionError> {
        match self.run.begin_terminal_submission(true) {
            Ok(()) => {}
            Err(
                SessionError::Finished
                | SessionError::SubmissionInFlight
                | SessionError::AlreadySubmitted
                | SessionError::NotActive,
            ) => return Ok(()),
            Err(other) => return Err(other),
        }

        let section = self.run.plan().key().clone();
        tracing::warn!(section = %section, "section clock expired, forcing submission");

        let sent = match self.run.plan().delivery().clone() {
            DeliveryProtocol::Adaptive => match self.run.session_id().cloned() {
                Some(session_id) => match self.api.auto_submit(&session_id, &section).await {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::warn!(error = %err, section = %section, "forced submission failed");
                        false
                    }
                },
                None => false,
            },
            DeliveryProtocol::Bulk { path } => {
                let payload = self.run.submission_payload();
                match self
                    .api
                    .submit_bulk_answers(&self.context, &path, &payload)
                    .await
                {
                    Ok(()) => {
                        self.clear_cache().await;
                        true
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, section = %section, "forced submission failed");
                        false
                    }
                }
            }
        };

        let outcome = self.run.finish_forced(self.clock.now(), !sent)?;
        self.finish_run(outcome);
        Ok(())
    }

    async fn restore_cached_answers(&mut self) {
        let cached = match self.storage.answers.load_answers(&self.scope).await {
            Ok(cached) => cached,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load the answer cache");
                return;
            }
        };
        if cached.is_empty() {
            return;
        }
        let mut restored = 0usize;
        for record in cached {
            if self
                .run
                .restore_answer(record.question_id, record.prompt, record.option)
            {
                restored += 1;
            }
        }
        tracing::debug!(restored, "restored cached answers");
    }

    async fn clear_cache(&mut self) {
        if let Err(err) = self.storage.answers.clear_answers(&self.scope).await {
            tracing::warn!(error = %err, "failed to clear the answer cache");
        }
    }

    fn finish_run(&mut self, outcome: SectionOutcome) {
        if let Some(timer) = self.section_timer.as_mut() {
            timer.stop();
        }
        self.section_timer = None;
        self.prestart_timer = None;
        self.guard.uninstall();
        tracing::debug!(
            section = %outcome.section(),
            forced = outcome.forced(),
            answered = outcome.answered(),
            "section finished"
        );
        self.outcome = Some(outcome);
    }
}
