use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use academy_core::model::{
    AttemptId, AttemptStatus, StudentId, StudentQuestion, SubmittedAnswer, TestId, UnitId,
    UnitStatus,
};

use crate::error::SyncError;

/// Progress report for one unit, as sent to the sync layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdateRequest {
    pub unit_id: UnitId,
    pub watched_seconds: u32,
    pub total_seconds: u32,
}

/// Authoritative response to a progress update. Whatever the client
/// estimated locally, this overwrites it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub watched_seconds: u32,
    pub total_seconds: u32,
    pub progress_percentage: f64,
    pub is_completed: bool,
    pub last_watched_at: Option<DateTime<Utc>>,
}

impl From<&UnitStatus> for ProgressUpdate {
    fn from(status: &UnitStatus) -> Self {
        Self {
            watched_seconds: status.watched_seconds(),
            total_seconds: status.total_seconds(),
            progress_percentage: status.progress_percentage(),
            is_completed: status.is_completed(),
            last_watched_at: status.last_observed_at(),
        }
    }
}

/// One row of the caller's stored progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgress {
    pub unit_id: UnitId,
    pub watched_seconds: u32,
    pub total_seconds: u32,
    pub progress_percentage: f64,
    pub is_completed: bool,
    pub last_watched_at: Option<DateTime<Utc>>,
}

/// An attempt as exposed to the student: question payload only, no answer
/// keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptView {
    pub attempt_id: AttemptId,
    pub test_id: TestId,
    pub status: AttemptStatus,
    pub questions: Vec<StudentQuestion>,
    pub score: Option<f64>,
    pub requires_manual_grading: bool,
}

/// Outcome of submitting an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub score: Option<f64>,
    pub requires_manual_grading: bool,
}

/// The arbitration boundary to the backing store.
///
/// The server response is always authoritative over local optimistic
/// state; a failed call mutates nothing client-side, so the periodic
/// sampling cadence itself re-drives delivery.
#[async_trait]
pub trait SyncGateway: Send + Sync {
    /// Reports watched time for a unit and returns the authoritative
    /// status. The server applies the completion rule
    /// `watched / total >= 0.95`.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` when the unit cannot accept progress updates or
    /// the store/transport fails.
    async fn update_progress(
        &self,
        student_id: StudentId,
        request: ProgressUpdateRequest,
    ) -> Result<ProgressUpdate, SyncError>;

    /// All stored progress rows for the calling student.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` on store/transport failures.
    async fn my_progress(&self, student_id: StudentId)
    -> Result<Vec<StudentProgress>, SyncError>;

    /// Fetches the student's open attempt for a test, creating one (with a
    /// frozen question snapshot) if none exists. Answer keys never cross
    /// this boundary.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` when the test is unknown or the store fails.
    async fn prepare_attempt(
        &self,
        student_id: StudentId,
        test_id: TestId,
    ) -> Result<AttemptView, SyncError>;

    /// Submits answers for an attempt. Duplicate rapid submissions are
    /// resolved here, not by the UI disabling a button.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Scorer` for already-submitted, unknown-attempt
    /// and malformed-answer rejections.
    async fn submit_attempt(
        &self,
        student_id: StudentId,
        attempt_id: AttemptId,
        answers: Vec<SubmittedAnswer>,
    ) -> Result<SubmissionResult, SyncError>;
}
