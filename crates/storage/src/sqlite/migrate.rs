use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema (courses, content units, per-student unit status,
/// test definitions, attempts, and indexes).
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS courses (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS content_units (
                    id INTEGER PRIMARY KEY,
                    course_id INTEGER NOT NULL,
                    title TEXT NOT NULL,
                    order_index INTEGER NOT NULL CHECK (order_index >= 0),
                    is_required INTEGER NOT NULL,
                    kind TEXT NOT NULL,
                    media_ref TEXT,
                    duration_seconds INTEGER,
                    test_id INTEGER,
                    resource TEXT,
                    created_at TEXT NOT NULL,
                    UNIQUE (course_id, order_index),
                    FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS unit_status (
                    student_id INTEGER NOT NULL,
                    unit_id INTEGER NOT NULL,
                    watched_seconds INTEGER NOT NULL CHECK (watched_seconds >= 0),
                    total_seconds INTEGER NOT NULL CHECK (total_seconds >= 0),
                    progress_percentage REAL NOT NULL,
                    is_completed INTEGER NOT NULL,
                    last_observed_at TEXT,
                    PRIMARY KEY (student_id, unit_id),
                    FOREIGN KEY (unit_id) REFERENCES content_units(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS tests (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    questions TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS test_attempts (
                    id TEXT PRIMARY KEY,
                    test_id INTEGER NOT NULL,
                    student_id INTEGER NOT NULL,
                    status TEXT NOT NULL,
                    questions TEXT NOT NULL,
                    answers TEXT NOT NULL,
                    score REAL,
                    requires_manual_grading INTEGER NOT NULL,
                    started_at TEXT NOT NULL,
                    submitted_at TEXT,
                    FOREIGN KEY (test_id) REFERENCES tests(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_units_course_order
                ON content_units(course_id, order_index);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_attempts_test_student
                ON test_attempts(test_id, student_id, status);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
            .bind(1_i64)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
    }

    Ok(())
}
