mod controller;
mod orchestrator;
mod state;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{SectionController, SectionEvent};
pub use orchestrator::{ExamOrchestrator, ExamProgress};
pub use state::{Notice, NoticeSeverity, SectionOutcome, SectionPhase, SectionRun};
