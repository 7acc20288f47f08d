use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use academy_core::Clock;
use academy_core::model::{
    AttemptId, AttemptStatus, ContentUnit, CourseId, StudentId, UnitId, UnitKind, UnitStatus,
};
use academy_core::progress::{CourseProgress, course_progress, unit_access};
use storage::repository::{AttemptRepository, CourseRepository, ProgressRepository};

use crate::error::CourseServiceError;

/// Submission facts attached to a test unit in the student view.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionSummary {
    pub attempt_id: AttemptId,
    pub status: AttemptStatus,
    pub score: Option<f64>,
    pub requires_manual_grading: bool,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// One unit with the calling student's status attached.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitView {
    pub unit: ContentUnit,
    pub status: UnitStatus,
    pub is_locked: bool,
    pub submission: Option<SubmissionSummary>,
}

/// A course as a student sees it: ordered units, per-unit status, course
/// percentage and the next required unit.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseView {
    pub course_id: CourseId,
    pub title: String,
    pub units: Vec<UnitView>,
    pub progress: CourseProgress,
}

/// Assembles the ordered unit registry with statuses and derived progress.
///
/// Everything here is recomputed on every call. Graders and other sessions
/// mutate statuses concurrently, so caching a view across navigations
/// would serve stale lock and percentage decisions.
#[derive(Clone)]
pub struct CourseService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    progress: Arc<dyn ProgressRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl CourseService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        progress: Arc<dyn ProgressRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            progress,
            attempts,
        }
    }

    /// Builds the student's view of one course.
    ///
    /// Video statuses come from progress records, test statuses from the
    /// student's submitted attempts, and reference units read as complete
    /// display-only rows.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError` when the course is missing or storage
    /// fails.
    pub async fn course_view(
        &self,
        course_id: CourseId,
        student_id: StudentId,
    ) -> Result<CourseView, CourseServiceError> {
        let course = self.courses.get_course(course_id).await?;
        let now = self.clock.now();

        let mut statuses: HashMap<UnitId, UnitStatus> = self
            .progress
            .list_statuses(student_id)
            .await?
            .into_iter()
            .map(|record| (record.unit_id, record.status))
            .collect();

        let mut submissions: HashMap<UnitId, SubmissionSummary> = HashMap::new();
        for unit in course.units() {
            match unit.kind() {
                UnitKind::Test { test_id } => {
                    if let Some(attempt) = self
                        .attempts
                        .find_submitted_attempt(*test_id, student_id)
                        .await?
                    {
                        let completed_at = attempt.submitted_at().unwrap_or(now);
                        statuses.insert(unit.id(), UnitStatus::completed_at(completed_at));
                        submissions.insert(
                            unit.id(),
                            SubmissionSummary {
                                attempt_id: attempt.id(),
                                status: attempt.status(),
                                score: attempt.score(),
                                requires_manual_grading: attempt.requires_manual_grading(),
                                submitted_at: attempt.submitted_at(),
                            },
                        );
                    }
                }
                UnitKind::Reference { .. } => {
                    statuses.insert(unit.id(), UnitStatus::completed_at(now));
                }
                UnitKind::Video { .. } => {}
            }
        }

        let progress = course_progress(course.units(), &statuses);
        let access = unit_access(course.units(), &statuses);

        let units = course
            .units()
            .iter()
            .zip(access)
            .map(|(unit, access)| UnitView {
                status: statuses
                    .get(&unit.id())
                    .cloned()
                    .unwrap_or_else(UnitStatus::not_started),
                is_locked: access.is_locked,
                submission: submissions.remove(&unit.id()),
                unit: unit.clone(),
            })
            .collect();

        Ok(CourseView {
            course_id: course.id(),
            title: course.title().to_owned(),
            units,
            progress,
        })
    }

    /// Advisory lock check for entering one unit, recomputed on demand.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError` when the course is missing or storage
    /// fails.
    pub async fn is_unit_accessible(
        &self,
        course_id: CourseId,
        student_id: StudentId,
        unit_id: UnitId,
    ) -> Result<bool, CourseServiceError> {
        let view = self.course_view(course_id, student_id).await?;
        Ok(view
            .units
            .iter()
            .find(|unit_view| unit_view.unit.id() == unit_id)
            .is_some_and(|unit_view| !unit_view.is_locked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_core::model::{
        AnswerKey, AnswerValue, Course, MediaRef, QuestionId, QuestionKind, QuestionSnapshot,
        SubmittedAnswer, TestAttempt, TestDefinition, TestId,
    };
    use academy_core::time::{fixed_clock, fixed_now};
    use storage::repository::{InMemoryRepository, TestRepository, UnitStatusRecord};

    fn course(course_id: u64) -> Course {
        let cid = CourseId::new(course_id);
        let units = vec![
            ContentUnit::new(
                UnitId::new(1),
                cid,
                "Video A",
                0,
                true,
                UnitKind::Video {
                    media: MediaRef::from_id("vid-a").unwrap(),
                    duration_seconds: 600,
                },
                fixed_now(),
            )
            .unwrap(),
            ContentUnit::new(
                UnitId::new(2),
                cid,
                "Reading B",
                1,
                false,
                UnitKind::Reference {
                    resource: "notes.md".into(),
                },
                fixed_now(),
            )
            .unwrap(),
            ContentUnit::new(
                UnitId::new(3),
                cid,
                "Test C",
                2,
                true,
                UnitKind::Test {
                    test_id: TestId::new(1),
                },
                fixed_now(),
            )
            .unwrap(),
        ];
        Course::new(cid, "Course", units, fixed_now()).unwrap()
    }

    async fn service_with_course() -> (CourseService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        repo.upsert_course(&course(1)).await.unwrap();
        let test = TestDefinition::new(
            TestId::new(1),
            "Quiz",
            vec![
                QuestionSnapshot::new(
                    QuestionId::new(1),
                    QuestionKind::TrueFalse,
                    "Q1",
                    Vec::new(),
                    AnswerKey::Boolean(true),
                    0,
                )
                .unwrap(),
            ],
        )
        .unwrap();
        repo.upsert_test(&test).await.unwrap();
        let service = CourseService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        (service, repo)
    }

    async fn complete_video(repo: &InMemoryRepository, student: StudentId, unit: UnitId) {
        repo.upsert_status(&UnitStatusRecord {
            student_id: student,
            unit_id: unit,
            status: UnitStatus::not_started().apply_update(600, 600, fixed_now()),
        })
        .await
        .unwrap();
    }

    async fn submit_test(repo: &InMemoryRepository, student: StudentId) -> TestAttempt {
        let mut attempt = TestAttempt::start(
            AttemptId::generate(),
            TestId::new(1),
            student,
            vec![
                QuestionSnapshot::new(
                    QuestionId::new(1),
                    QuestionKind::TrueFalse,
                    "Q1",
                    Vec::new(),
                    AnswerKey::Boolean(true),
                    0,
                )
                .unwrap(),
            ],
            fixed_now(),
        )
        .unwrap();
        repo.insert_attempt(&attempt).await.unwrap();
        attempt
            .record_submission(
                vec![SubmittedAnswer {
                    question_id: QuestionId::new(1),
                    value: AnswerValue::Boolean(true),
                }],
                Some(100.0),
                false,
                fixed_now(),
            )
            .unwrap();
        repo.update_attempt(&attempt, AttemptStatus::InProgress)
            .await
            .unwrap();
        attempt
    }

    #[tokio::test]
    async fn fresh_course_has_zero_percent_and_locks_the_tail() {
        let (service, _repo) = service_with_course().await;
        let view = service
            .course_view(CourseId::new(1), StudentId::new(1))
            .await
            .unwrap();

        assert_eq!(view.progress.percentage, 0.0);
        assert_eq!(view.progress.next_required_unit, Some(UnitId::new(1)));
        assert!(!view.units[0].is_locked);
        assert!(!view.units[1].is_locked);
        assert!(view.units[2].is_locked);
    }

    #[tokio::test]
    async fn completing_the_video_unlocks_the_test() {
        let (service, repo) = service_with_course().await;
        let student = StudentId::new(1);
        complete_video(&repo, student, UnitId::new(1)).await;

        let view = service.course_view(CourseId::new(1), student).await.unwrap();
        assert_eq!(view.progress.percentage, 50.0);
        assert_eq!(view.progress.next_required_unit, Some(UnitId::new(3)));
        assert!(!view.units[2].is_locked);
        assert!(
            service
                .is_unit_accessible(CourseId::new(1), student, UnitId::new(3))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn submitted_test_counts_as_completed_with_summary() {
        let (service, repo) = service_with_course().await;
        let student = StudentId::new(1);
        complete_video(&repo, student, UnitId::new(1)).await;
        let attempt = submit_test(&repo, student).await;

        let view = service.course_view(CourseId::new(1), student).await.unwrap();
        assert_eq!(view.progress.percentage, 100.0);
        assert_eq!(view.progress.next_required_unit, None);

        let summary = view.units[2].submission.as_ref().expect("submission");
        assert_eq!(summary.attempt_id, attempt.id());
        assert_eq!(summary.score, Some(100.0));
    }

    #[tokio::test]
    async fn view_is_recomputed_on_every_access() {
        let (service, repo) = service_with_course().await;
        let student = StudentId::new(1);

        let before = service.course_view(CourseId::new(1), student).await.unwrap();
        assert_eq!(before.progress.percentage, 0.0);

        // A grader finishing the test between two renders must show up
        // immediately.
        complete_video(&repo, student, UnitId::new(1)).await;
        submit_test(&repo, student).await;

        let after = service.course_view(CourseId::new(1), student).await.unwrap();
        assert_eq!(after.progress.percentage, 100.0);
    }
}
