use std::sync::Arc;

use academy_core::Clock;
use academy_core::grading::{GradeOutcome, grade_submission};
use academy_core::model::{
    AttemptId, AttemptStatus, StudentId, SubmittedAnswer, TestAttempt, TestId,
};
use storage::repository::{AttemptRepository, StorageError, TestRepository};

use crate::error::ScorerError;

/// Creates, validates and auto-grades test attempts.
///
/// Objective question sets are scored server-side at submit time;
/// subjective ones are parked as `Submitted` until the external grading
/// workflow supplies a score through [`AttemptScorer::apply_manual_score`].
#[derive(Clone)]
pub struct AttemptScorer {
    clock: Clock,
    tests: Arc<dyn TestRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl AttemptScorer {
    #[must_use]
    pub fn new(clock: Clock, tests: Arc<dyn TestRepository>, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self {
            clock,
            tests,
            attempts,
        }
    }

    /// Returns the student's open attempt for the test, creating one with a
    /// frozen question snapshot when none exists. Calling this twice never
    /// yields two open attempts.
    ///
    /// # Errors
    ///
    /// Returns `ScorerError::UnknownTest` when the test does not exist and
    /// `ScorerError::EmptyTest` when it has no questions.
    pub async fn create_attempt(
        &self,
        test_id: TestId,
        student_id: StudentId,
    ) -> Result<TestAttempt, ScorerError> {
        if let Some(open) = self.attempts.find_open_attempt(test_id, student_id).await? {
            return Ok(open);
        }

        let test = self.tests.get_test(test_id).await.map_err(|err| match err {
            StorageError::NotFound => ScorerError::UnknownTest,
            other => ScorerError::Storage(other),
        })?;

        let attempt = TestAttempt::start(
            AttemptId::generate(),
            test_id,
            student_id,
            test.freeze_questions(),
            self.clock.now(),
        )?;

        match self.attempts.insert_attempt(&attempt).await {
            Ok(()) => Ok(attempt),
            // Two rapid opens raced; the winner's attempt is the one to use.
            Err(StorageError::Conflict) => self
                .attempts
                .find_open_attempt(test_id, student_id)
                .await?
                .ok_or(ScorerError::Storage(StorageError::Conflict)),
            Err(other) => Err(other.into()),
        }
    }

    /// Grades and stores a submission for an open attempt.
    ///
    /// Validation failures (unknown question id, duplicate answers) leave
    /// the attempt in progress so the student can retry. Re-submission is
    /// always rejected with `AlreadySubmitted`, whatever the payload; a
    /// race between two submissions is resolved by the storage guard.
    ///
    /// # Errors
    ///
    /// Returns `ScorerError::AttemptNotFound`, `ScorerError::Validation` or
    /// `ScorerError::AlreadySubmitted` accordingly.
    pub async fn submit(
        &self,
        attempt_id: AttemptId,
        student_id: StudentId,
        answers: Vec<SubmittedAnswer>,
    ) -> Result<TestAttempt, ScorerError> {
        let mut attempt = self.attempts.get_attempt(attempt_id).await.map_err(|err| {
            match err {
                StorageError::NotFound => ScorerError::AttemptNotFound,
                other => ScorerError::Storage(other),
            }
        })?;

        // Attempts are only addressable by their owner.
        if attempt.student_id() != student_id {
            return Err(ScorerError::AttemptNotFound);
        }
        if !attempt.is_open() {
            return Err(ScorerError::AlreadySubmitted);
        }

        let outcome = grade_submission(attempt.questions(), &answers)?;
        attempt.record_submission(
            answers,
            outcome.score,
            outcome.requires_manual_grading,
            self.clock.now(),
        )?;

        match self
            .attempts
            .update_attempt(&attempt, AttemptStatus::InProgress)
            .await
        {
            Ok(()) => Ok(attempt),
            Err(StorageError::Conflict) => Err(ScorerError::AlreadySubmitted),
            Err(StorageError::NotFound) => Err(ScorerError::AttemptNotFound),
            Err(other) => Err(other.into()),
        }
    }

    /// Hand-off from the external grading workflow: applies a manually
    /// assigned score to a submitted attempt.
    ///
    /// # Errors
    ///
    /// Returns `ScorerError::NotSubmitted` for attempts still in progress
    /// and `ScorerError::AlreadySubmitted` for already graded ones.
    pub async fn apply_manual_score(
        &self,
        attempt_id: AttemptId,
        score: f64,
    ) -> Result<TestAttempt, ScorerError> {
        let mut attempt = self.attempts.get_attempt(attempt_id).await.map_err(|err| {
            match err {
                StorageError::NotFound => ScorerError::AttemptNotFound,
                other => ScorerError::Storage(other),
            }
        })?;

        attempt.apply_manual_score(score)?;

        match self
            .attempts
            .update_attempt(&attempt, AttemptStatus::Submitted)
            .await
        {
            Ok(()) => Ok(attempt),
            Err(StorageError::Conflict) => Err(ScorerError::AlreadySubmitted),
            Err(StorageError::NotFound) => Err(ScorerError::AttemptNotFound),
            Err(other) => Err(other.into()),
        }
    }

    /// Deterministically rescores a stored attempt from its frozen
    /// snapshot, without mutating anything.
    ///
    /// # Errors
    ///
    /// Returns `ScorerError::AttemptNotFound` for unknown attempts.
    pub async fn rescore(&self, attempt_id: AttemptId) -> Result<GradeOutcome, ScorerError> {
        let attempt = self.attempts.get_attempt(attempt_id).await.map_err(|err| {
            match err {
                StorageError::NotFound => ScorerError::AttemptNotFound,
                other => ScorerError::Storage(other),
            }
        })?;
        Ok(grade_submission(attempt.questions(), attempt.answers())?)
    }
}
