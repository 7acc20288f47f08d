use academy_core::model::{ContentUnit, Course, CourseId, UnitId, UnitKind};

use super::SqliteRepository;
use super::mapping::{map_unit_row, ser, u64_to_i64};
use crate::repository::{CourseRepository, StorageError};

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO courses (id, title, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title
            ",
        )
        .bind(u64_to_i64("course_id", course.id().value())?)
        .bind(course.title().to_owned())
        .bind(course.created_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        // Replace the unit sequence wholesale so removed units disappear.
        sqlx::query("DELETE FROM content_units WHERE course_id = ?1")
            .bind(u64_to_i64("course_id", course.id().value())?)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for unit in course.units() {
            let (media_ref, duration_seconds, test_id, resource) = match unit.kind() {
                UnitKind::Video {
                    media,
                    duration_seconds,
                } => (
                    Some(media.as_str().to_owned()),
                    Some(i64::from(*duration_seconds)),
                    None,
                    None,
                ),
                UnitKind::Test { test_id } => (
                    None,
                    None,
                    Some(u64_to_i64("test_id", test_id.value())?),
                    None,
                ),
                UnitKind::Reference { resource } => (None, None, None, Some(resource.clone())),
            };

            sqlx::query(
                r"
                INSERT INTO content_units (
                    id, course_id, title, order_index, is_required, kind,
                    media_ref, duration_seconds, test_id, resource, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ",
            )
            .bind(u64_to_i64("unit_id", unit.id().value())?)
            .bind(u64_to_i64("course_id", unit.course_id().value())?)
            .bind(unit.title().to_owned())
            .bind(i64::from(unit.order_index()))
            .bind(unit.is_required())
            .bind(unit.kind().as_str())
            .bind(media_ref)
            .bind(duration_seconds)
            .bind(test_id)
            .bind(resource)
            .bind(unit.created_at())
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Course, StorageError> {
        let course_row = sqlx::query("SELECT id, title, created_at FROM courses WHERE id = ?1")
            .bind(u64_to_i64("course_id", id.value())?)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        let title: String = sqlx::Row::try_get(&course_row, "title").map_err(ser)?;
        let created_at: chrono::DateTime<chrono::Utc> =
            sqlx::Row::try_get(&course_row, "created_at").map_err(ser)?;

        let unit_rows = sqlx::query(
            r"
            SELECT
                id, course_id, title, order_index, is_required, kind,
                media_ref, duration_seconds, test_id, resource, created_at
            FROM content_units
            WHERE course_id = ?1
            ORDER BY order_index ASC
            ",
        )
        .bind(u64_to_i64("course_id", id.value())?)
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut units = Vec::with_capacity(unit_rows.len());
        for row in &unit_rows {
            units.push(map_unit_row(row)?);
        }

        Course::new(id, title, units, created_at).map_err(ser)
    }

    async fn find_unit(&self, id: UnitId) -> Result<ContentUnit, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                id, course_id, title, order_index, is_required, kind,
                media_ref, duration_seconds, test_id, resource, created_at
            FROM content_units
            WHERE id = ?1
            ",
        )
        .bind(u64_to_i64("unit_id", id.value())?)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_unit_row(&row)
    }
}
