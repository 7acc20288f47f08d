use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use academy_core::Clock;
use academy_core::model::{
    AttemptId, StudentId, SubmittedAnswer, TestAttempt, TestId, UnitKind, UnitStatus,
};
use storage::repository::{CourseRepository, ProgressRepository, UnitStatusRecord};

use super::gateway::{
    AttemptView, ProgressUpdate, ProgressUpdateRequest, StudentProgress, SubmissionResult,
    SyncGateway,
};
use crate::attempt_scorer::AttemptScorer;
use crate::error::SyncError;

/// Gateway implementation that talks straight to the backing store.
///
/// This is the authoritative side of the boundary: it applies the 95%
/// completion rule, keeps watched time monotonic, and arbitrates attempt
/// submissions.
#[derive(Clone)]
pub struct StoreSyncGateway {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    progress: Arc<dyn ProgressRepository>,
    scorer: AttemptScorer,
}

impl StoreSyncGateway {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        progress: Arc<dyn ProgressRepository>,
        scorer: AttemptScorer,
    ) -> Self {
        Self {
            clock,
            courses,
            progress,
            scorer,
        }
    }
}

fn attempt_view(attempt: &TestAttempt) -> AttemptView {
    AttemptView {
        attempt_id: attempt.id(),
        test_id: attempt.test_id(),
        status: attempt.status(),
        questions: attempt.student_questions(),
        score: attempt.score(),
        requires_manual_grading: attempt.requires_manual_grading(),
    }
}

#[async_trait]
impl SyncGateway for StoreSyncGateway {
    async fn update_progress(
        &self,
        student_id: StudentId,
        request: ProgressUpdateRequest,
    ) -> Result<ProgressUpdate, SyncError> {
        let unit = self.courses.find_unit(request.unit_id).await?;
        if !matches!(unit.kind(), UnitKind::Video { .. }) {
            return Err(SyncError::NotPlayable(request.unit_id));
        }

        let previous = self
            .progress
            .get_status(student_id, request.unit_id)
            .await?
            .map_or_else(UnitStatus::not_started, |record| record.status);

        let was_completed = previous.is_completed();
        let next = previous.apply_update(
            request.watched_seconds,
            request.total_seconds,
            self.clock.now(),
        );

        self.progress
            .upsert_status(&UnitStatusRecord {
                student_id,
                unit_id: request.unit_id,
                status: next.clone(),
            })
            .await?;

        if next.is_completed() && !was_completed {
            info!(
                student = %student_id,
                unit = %request.unit_id,
                "unit reached the completion threshold"
            );
        } else {
            debug!(
                student = %student_id,
                unit = %request.unit_id,
                watched = next.watched_seconds(),
                "stored progress update"
            );
        }

        Ok(ProgressUpdate::from(&next))
    }

    async fn my_progress(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<StudentProgress>, SyncError> {
        let records = self.progress.list_statuses(student_id).await?;
        Ok(records
            .into_iter()
            .map(|record| StudentProgress {
                unit_id: record.unit_id,
                watched_seconds: record.status.watched_seconds(),
                total_seconds: record.status.total_seconds(),
                progress_percentage: record.status.progress_percentage(),
                is_completed: record.status.is_completed(),
                last_watched_at: record.status.last_observed_at(),
            })
            .collect())
    }

    async fn prepare_attempt(
        &self,
        student_id: StudentId,
        test_id: TestId,
    ) -> Result<AttemptView, SyncError> {
        let attempt = self.scorer.create_attempt(test_id, student_id).await?;
        Ok(attempt_view(&attempt))
    }

    async fn submit_attempt(
        &self,
        student_id: StudentId,
        attempt_id: AttemptId,
        answers: Vec<SubmittedAnswer>,
    ) -> Result<SubmissionResult, SyncError> {
        let attempt = self.scorer.submit(attempt_id, student_id, answers).await?;
        Ok(SubmissionResult {
            score: attempt.score(),
            requires_manual_grading: attempt.requires_manual_grading(),
        })
    }
}
