//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{IdentityError, PlanError, QuestionError};
use storage::repository::StorageError;

/// Errors emitted by the exam service client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("exam service request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("exam service rejected the request: {message}")]
    Rejected { message: String },
    #[error("exam service response violated the contract: {0}")]
    Contract(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no signed-in candidate for this attempt")]
    MissingIdentity,
    #[error("section is not active")]
    NotActive,
    #[error("section already finished")]
    Finished,
    #[error("section is not waiting for a question")]
    NotStarting,
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error("section submission was already sent")]
    AlreadySubmitted,
    #[error("answer is incomplete: {missing} of {required} prompts unanswered")]
    IncompleteAnswer { required: usize, missing: usize },
    #[error("selection out of range: prompt {prompt}, option {option}")]
    InvalidSelection { prompt: usize, option: usize },
    #[error("no question on display")]
    NoQuestion,
    #[error("submit is only available on the last question")]
    NotLastQuestion,
    #[error("exam has no further sections")]
    ExamComplete,
    #[error("outcome for section {got} while {expected} was active")]
    WrongSection { expected: String, got: String },
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ResultsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResultsError {
    #[error(transparent)]
    Api(#[from] ApiError),
}
