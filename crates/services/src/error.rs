//! Shared error types for the services crate.

use thiserror::Error;

use academy_core::grading::GradingError;
use academy_core::model::{AttemptError, CourseError, UnitId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `AttemptScorer`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScorerError {
    #[error("attempt not found")]
    AttemptNotFound,

    #[error("test not found")]
    UnknownTest,

    #[error("test has no questions to attempt")]
    EmptyTest,

    #[error("attempt was already submitted")]
    AlreadySubmitted,

    #[error("attempt has not been submitted yet")]
    NotSubmitted,

    #[error("invalid answer payload: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<GradingError> for ScorerError {
    fn from(err: GradingError) -> Self {
        ScorerError::Validation(err.to_string())
    }
}

impl From<AttemptError> for ScorerError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::AlreadySubmitted => ScorerError::AlreadySubmitted,
            AttemptError::NotSubmitted => ScorerError::NotSubmitted,
            AttemptError::NoQuestions => ScorerError::EmptyTest,
            _ => ScorerError::Validation(err.to_string()),
        }
    }
}

/// Errors emitted by `SyncGateway` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error("unit {0} cannot accept progress updates")]
    NotPlayable(UnitId),

    #[error("request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Scorer(#[from] ScorerError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CourseService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseServiceError {
    #[error(transparent)]
    Course(#[from] CourseError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
