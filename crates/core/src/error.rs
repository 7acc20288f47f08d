use thiserror::Error;

use crate::grading::GradingError;
use crate::model::{AttemptError, CourseError, QuestionError, TestDefinitionError, UnitValidationError};

/// Umbrella error for domain validation and grading failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    UnitValidation(#[from] UnitValidationError),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    TestDefinition(#[from] TestDefinitionError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Grading(#[from] GradingError),
}
