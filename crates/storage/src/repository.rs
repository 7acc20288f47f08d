use academy_core::model::{
    AttemptId, AttemptStatus, ContentUnit, Course, CourseId, StudentId, TestAttempt,
    TestDefinition, TestId, UnitId, UnitStatus,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape for a per-(student, unit) status row.
///
/// The domain `UnitStatus` carries no ownership information; the record
/// adds the key so repositories can store and query it.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitStatusRecord {
    pub student_id: StudentId,
    pub unit_id: UnitId,
    pub status: UnitStatus,
}

/// Repository contract for courses and their unit sequences.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist or update a course together with its units.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Fetch a course with its units ordered by `order_index`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_course(&self, id: CourseId) -> Result<Course, StorageError>;

    /// Look up a single unit by id, independent of its course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn find_unit(&self, id: UnitId) -> Result<ContentUnit, StorageError>;
}

/// Repository contract for per-student viewing status.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch one status row; `None` means the student never touched the unit.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_status(
        &self,
        student_id: StudentId,
        unit_id: UnitId,
    ) -> Result<Option<UnitStatusRecord>, StorageError>;

    /// All status rows recorded for a student.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_statuses(&self, student_id: StudentId)
    -> Result<Vec<UnitStatusRecord>, StorageError>;

    /// Persist or update one status row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn upsert_status(&self, record: &UnitStatusRecord) -> Result<(), StorageError>;
}

/// Repository contract for editable test definitions.
#[async_trait]
pub trait TestRepository: Send + Sync {
    /// Persist or update a test definition.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the definition cannot be stored.
    async fn upsert_test(&self, test: &TestDefinition) -> Result<(), StorageError>;

    /// Fetch a test definition by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_test(&self, id: TestId) -> Result<TestDefinition, StorageError>;
}

/// Repository contract for test attempts.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Store a brand-new attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if an attempt with this id exists.
    async fn insert_attempt(&self, attempt: &TestAttempt) -> Result<(), StorageError>;

    /// Fetch an attempt by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_attempt(&self, id: AttemptId) -> Result<TestAttempt, StorageError>;

    /// The student's still-open attempt for a test, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn find_open_attempt(
        &self,
        test_id: TestId,
        student_id: StudentId,
    ) -> Result<Option<TestAttempt>, StorageError>;

    /// The student's most recent submitted or graded attempt for a test.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn find_submitted_attempt(
        &self,
        test_id: TestId,
        student_id: StudentId,
    ) -> Result<Option<TestAttempt>, StorageError>;

    /// Persist a new state for an attempt, guarded on the status currently
    /// stored. Two racing submissions resolve here: the loser sees the row
    /// already moved past `expected` and gets `StorageError::Conflict`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the stored status is not
    /// `expected`, `StorageError::NotFound` for an unknown id.
    async fn update_attempt(
        &self,
        attempt: &TestAttempt,
        expected: AttemptStatus,
    ) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    statuses: Arc<Mutex<HashMap<(StudentId, UnitId), UnitStatusRecord>>>,
    tests: Arc<Mutex<HashMap<TestId, TestDefinition>>>,
    attempts: Arc<Mutex<HashMap<AttemptId, TestAttempt>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(course.id(), course.clone());
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Course, StorageError> {
        let guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn find_unit(&self, id: UnitId) -> Result<ContentUnit, StorageError> {
        let guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .values()
            .find_map(|course| course.unit(id).cloned())
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_status(
        &self,
        student_id: StudentId,
        unit_id: UnitId,
    ) -> Result<Option<UnitStatusRecord>, StorageError> {
        let guard = self
            .statuses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(student_id, unit_id)).cloned())
    }

    async fn list_statuses(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<UnitStatusRecord>, StorageError> {
        let guard = self
            .statuses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<UnitStatusRecord> = guard
            .values()
            .filter(|record| record.student_id == student_id)
            .cloned()
            .collect();
        rows.sort_by_key(|record| record.unit_id);
        Ok(rows)
    }

    async fn upsert_status(&self, record: &UnitStatusRecord) -> Result<(), StorageError> {
        let mut guard = self
            .statuses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert((record.student_id, record.unit_id), record.clone());
        Ok(())
    }
}

#[async_trait]
impl TestRepository for InMemoryRepository {
    async fn upsert_test(&self, test: &TestDefinition) -> Result<(), StorageError> {
        let mut guard = self
            .tests
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(test.id(), test.clone());
        Ok(())
    }

    async fn get_test(&self, id: TestId) -> Result<TestDefinition, StorageError> {
        let guard = self
            .tests
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn insert_attempt(&self, attempt: &TestAttempt) -> Result<(), StorageError> {
        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.contains_key(&attempt.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(attempt.id(), attempt.clone());
        Ok(())
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<TestAttempt, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn find_open_attempt(
        &self,
        test_id: TestId,
        student_id: StudentId,
    ) -> Result<Option<TestAttempt>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .find(|attempt| {
                attempt.test_id() == test_id
                    && attempt.student_id() == student_id
                    && attempt.is_open()
            })
            .cloned())
    }

    async fn find_submitted_attempt(
        &self,
        test_id: TestId,
        student_id: StudentId,
    ) -> Result<Option<TestAttempt>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut submitted: Vec<&TestAttempt> = guard
            .values()
            .filter(|attempt| {
                attempt.test_id() == test_id
                    && attempt.student_id() == student_id
                    && !attempt.is_open()
            })
            .collect();
        submitted.sort_by_key(|attempt| attempt.submitted_at());
        Ok(submitted.last().map(|attempt| (*attempt).clone()))
    }

    async fn update_attempt(
        &self,
        attempt: &TestAttempt,
        expected: AttemptStatus,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let stored = guard.get_mut(&attempt.id()).ok_or(StorageError::NotFound)?;
        if stored.status() != expected {
            return Err(StorageError::Conflict);
        }
        *stored = attempt.clone();
        Ok(())
    }
}

/// Aggregates the engine's repositories behind trait objects so backends
/// can be swapped wholesale.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub tests: Arc<dyn TestRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let tests: Arc<dyn TestRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self {
            courses,
            progress,
            tests,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_core::model::{
        AnswerKey, ContentUnit, MediaRef, QuestionId, QuestionKind, QuestionSnapshot, UnitKind,
    };
    use academy_core::time::fixed_now;

    fn build_course(id: u64) -> Course {
        let unit = ContentUnit::new(
            UnitId::new(1),
            CourseId::new(id),
            "Intro",
            0,
            true,
            UnitKind::Video {
                media: MediaRef::from_id("vid-1").unwrap(),
                duration_seconds: 600,
            },
            fixed_now(),
        )
        .unwrap();
        Course::new(CourseId::new(id), format!("Course {id}"), vec![unit], fixed_now()).unwrap()
    }

    fn build_attempt() -> TestAttempt {
        let question = QuestionSnapshot::new(
            QuestionId::new(1),
            QuestionKind::TrueFalse,
            "Q1",
            Vec::new(),
            AnswerKey::Boolean(true),
            0,
        )
        .unwrap();
        TestAttempt::start(
            AttemptId::generate(),
            TestId::new(1),
            StudentId::new(1),
            vec![question],
            fixed_now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn round_trips_course() {
        let repo = InMemoryRepository::new();
        let course = build_course(1);
        repo.upsert_course(&course).await.unwrap();

        let fetched = repo.get_course(course.id()).await.unwrap();
        assert_eq!(fetched, course);
    }

    #[tokio::test]
    async fn missing_status_is_none() {
        let repo = InMemoryRepository::new();
        let status = repo
            .get_status(StudentId::new(1), UnitId::new(1))
            .await
            .unwrap();
        assert!(status.is_none());
    }

    #[tokio::test]
    async fn update_attempt_is_guarded_by_expected_status() {
        let repo = InMemoryRepository::new();
        let mut attempt = build_attempt();
        repo.insert_attempt(&attempt).await.unwrap();

        attempt
            .record_submission(Vec::new(), Some(0.0), false, fixed_now())
            .unwrap();
        repo.update_attempt(&attempt, AttemptStatus::InProgress)
            .await
            .unwrap();

        // A second writer racing on the same open attempt loses.
        let err = repo
            .update_attempt(&attempt, AttemptStatus::InProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn find_open_attempt_ignores_submitted_ones() {
        let repo = InMemoryRepository::new();
        let mut attempt = build_attempt();
        repo.insert_attempt(&attempt).await.unwrap();

        let open = repo
            .find_open_attempt(attempt.test_id(), attempt.student_id())
            .await
            .unwrap();
        assert_eq!(open.as_ref().map(TestAttempt::id), Some(attempt.id()));

        attempt
            .record_submission(Vec::new(), Some(0.0), false, fixed_now())
            .unwrap();
        repo.update_attempt(&attempt, AttemptStatus::InProgress)
            .await
            .unwrap();

        let open = repo
            .find_open_attempt(attempt.test_id(), attempt.student_id())
            .await
            .unwrap();
        assert!(open.is_none());
    }
}
