use academy_core::model::{StudentId, UnitId};

use super::SqliteRepository;
use super::mapping::{map_status_row, u64_to_i64};
use crate::repository::{ProgressRepository, StorageError, UnitStatusRecord};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_status(
        &self,
        student_id: StudentId,
        unit_id: UnitId,
    ) -> Result<Option<UnitStatusRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                student_id, unit_id, watched_seconds, total_seconds,
                progress_percentage, is_completed, last_observed_at
            FROM unit_status
            WHERE student_id = ?1 AND unit_id = ?2
            ",
        )
        .bind(u64_to_i64("student_id", student_id.value())?)
        .bind(u64_to_i64("unit_id", unit_id.value())?)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_status_row).transpose()
    }

    async fn list_statuses(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<UnitStatusRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT
                student_id, unit_id, watched_seconds, total_seconds,
                progress_percentage, is_completed, last_observed_at
            FROM unit_status
            WHERE student_id = ?1
            ORDER BY unit_id ASC
            ",
        )
        .bind(u64_to_i64("student_id", student_id.value())?)
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(map_status_row(row)?);
        }
        Ok(records)
    }

    async fn upsert_status(&self, record: &UnitStatusRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO unit_status (
                student_id, unit_id, watched_seconds, total_seconds,
                progress_percentage, is_completed, last_observed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(student_id, unit_id) DO UPDATE SET
                watched_seconds = excluded.watched_seconds,
                total_seconds = excluded.total_seconds,
                progress_percentage = excluded.progress_percentage,
                is_completed = excluded.is_completed,
                last_observed_at = excluded.last_observed_at
            ",
        )
        .bind(u64_to_i64("student_id", record.student_id.value())?)
        .bind(u64_to_i64("unit_id", record.unit_id.value())?)
        .bind(i64::from(record.status.watched_seconds()))
        .bind(i64::from(record.status.total_seconds()))
        .bind(record.status.progress_percentage())
        .bind(record.status.is_completed())
        .bind(record.status.last_observed_at())
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
