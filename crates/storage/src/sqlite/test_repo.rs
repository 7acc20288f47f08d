use academy_core::model::{TestDefinition, TestId};

use super::SqliteRepository;
use super::mapping::{map_test_row, ser, u64_to_i64};
use crate::repository::{StorageError, TestRepository};

#[async_trait::async_trait]
impl TestRepository for SqliteRepository {
    async fn upsert_test(&self, test: &TestDefinition) -> Result<(), StorageError> {
        let questions = serde_json::to_string(test.questions()).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO tests (id, title, questions)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                questions = excluded.questions
            ",
        )
        .bind(u64_to_i64("test_id", test.id().value())?)
        .bind(test.title().to_owned())
        .bind(questions)
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_test(&self, id: TestId) -> Result<TestDefinition, StorageError> {
        let row = sqlx::query("SELECT id, title, questions FROM tests WHERE id = ?1")
            .bind(u64_to_i64("test_id", id.value())?)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        map_test_row(&row)
    }
}
