#![forbid(unsafe_code)]

pub mod api;
pub mod error;
pub mod guard;
pub mod results;
pub mod session;
pub mod timer;

pub use exam_core::Clock;

pub use api::{AdaptiveStep, ExamApi, ExamApiConfig, ExamContext, HttpExamApi};
pub use error::{ApiError, ResultsError, SessionError};
pub use guard::{GuardDecision, NavigationGuard, NavigationIntent};
pub use results::ResultsService;
pub use timer::{CountdownTimer, TimerEvent};

pub use session::{
    ExamOrchestrator, ExamProgress, Notice, NoticeSeverity, SectionController, SectionEvent,
    SectionOutcome, SectionPhase, SectionRun,
};
