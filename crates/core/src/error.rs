use thiserror::Error;

use crate::model::{IdentityError, PlanError, QuestionError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}
