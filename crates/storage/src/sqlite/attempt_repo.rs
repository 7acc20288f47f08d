use academy_core::model::{AttemptId, AttemptStatus, StudentId, TestAttempt, TestId};

use super::SqliteRepository;
use super::mapping::{map_attempt_row, ser, u64_to_i64};
use crate::repository::{AttemptRepository, StorageError};

fn attempt_json(attempt: &TestAttempt) -> Result<(String, String), StorageError> {
    let questions = serde_json::to_string(attempt.questions()).map_err(ser)?;
    let answers = serde_json::to_string(attempt.answers()).map_err(ser)?;
    Ok((questions, answers))
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn insert_attempt(&self, attempt: &TestAttempt) -> Result<(), StorageError> {
        let (questions, answers) = attempt_json(attempt)?;

        let result = sqlx::query(
            r"
            INSERT OR IGNORE INTO test_attempts (
                id, test_id, student_id, status, questions, answers,
                score, requires_manual_grading, started_at, submitted_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(attempt.id().to_string())
        .bind(u64_to_i64("test_id", attempt.test_id().value())?)
        .bind(u64_to_i64("student_id", attempt.student_id().value())?)
        .bind(attempt.status().as_str())
        .bind(questions)
        .bind(answers)
        .bind(attempt.score())
        .bind(attempt.requires_manual_grading())
        .bind(attempt.started_at())
        .bind(attempt.submitted_at())
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }
        Ok(())
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<TestAttempt, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                id, test_id, student_id, status, questions, answers,
                score, requires_manual_grading, started_at, submitted_at
            FROM test_attempts
            WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_attempt_row(&row)
    }

    async fn find_open_attempt(
        &self,
        test_id: TestId,
        student_id: StudentId,
    ) -> Result<Option<TestAttempt>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                id, test_id, student_id, status, questions, answers,
                score, requires_manual_grading, started_at, submitted_at
            FROM test_attempts
            WHERE test_id = ?1 AND student_id = ?2 AND status = 'in_progress'
            ORDER BY started_at ASC
            LIMIT 1
            ",
        )
        .bind(u64_to_i64("test_id", test_id.value())?)
        .bind(u64_to_i64("student_id", student_id.value())?)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_attempt_row).transpose()
    }

    async fn find_submitted_attempt(
        &self,
        test_id: TestId,
        student_id: StudentId,
    ) -> Result<Option<TestAttempt>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                id, test_id, student_id, status, questions, answers,
                score, requires_manual_grading, started_at, submitted_at
            FROM test_attempts
            WHERE test_id = ?1 AND student_id = ?2 AND status IN ('submitted', 'graded')
            ORDER BY submitted_at DESC
            LIMIT 1
            ",
        )
        .bind(u64_to_i64("test_id", test_id.value())?)
        .bind(u64_to_i64("student_id", student_id.value())?)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_attempt_row).transpose()
    }

    async fn update_attempt(
        &self,
        attempt: &TestAttempt,
        expected: AttemptStatus,
    ) -> Result<(), StorageError> {
        let (questions, answers) = attempt_json(attempt)?;

        let result = sqlx::query(
            r"
            UPDATE test_attempts SET
                status = ?2,
                questions = ?3,
                answers = ?4,
                score = ?5,
                requires_manual_grading = ?6,
                submitted_at = ?7
            WHERE id = ?1 AND status = ?8
            ",
        )
        .bind(attempt.id().to_string())
        .bind(attempt.status().as_str())
        .bind(questions)
        .bind(answers)
        .bind(attempt.score())
        .bind(attempt.requires_manual_grading())
        .bind(attempt.submitted_at())
        .bind(expected.as_str())
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if result.rows_affected() == 0 {
            // Either the id is unknown or another writer got here first.
            let exists = sqlx::query("SELECT 1 FROM test_attempts WHERE id = ?1")
                .bind(attempt.id().to_string())
                .fetch_optional(self.pool())
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            return Err(if exists.is_some() {
                StorageError::Conflict
            } else {
                StorageError::NotFound
            });
        }
        Ok(())
    }
}
