use academy_core::model::{
    AttemptId, AttemptStatus, ContentUnit, CourseId, MediaRef, QuestionSnapshot, StudentId,
    SubmittedAnswer, TestAttempt, TestDefinition, TestId, UnitId, UnitKind, UnitStatus,
};
use sqlx::Row;

use crate::repository::{StorageError, UnitStatusRecord};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn unit_id_from_i64(v: i64) -> Result<UnitId, StorageError> {
    Ok(UnitId::new(i64_to_u64("unit_id", v)?))
}

pub(crate) fn student_id_from_i64(v: i64) -> Result<StudentId, StorageError> {
    Ok(StudentId::new(i64_to_u64("student_id", v)?))
}

pub(crate) fn test_id_from_i64(v: i64) -> Result<TestId, StorageError> {
    Ok(TestId::new(i64_to_u64("test_id", v)?))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn parse_attempt_status(s: &str) -> Result<AttemptStatus, StorageError> {
    match s {
        "in_progress" => Ok(AttemptStatus::InProgress),
        "submitted" => Ok(AttemptStatus::Submitted),
        "graded" => Ok(AttemptStatus::Graded),
        _ => Err(StorageError::Serialization(format!("invalid status: {s}"))),
    }
}

pub(crate) fn parse_attempt_uuid(s: &str) -> Result<AttemptId, StorageError> {
    s.parse::<AttemptId>()
        .map_err(|_| StorageError::Serialization(format!("invalid attempt id: {s}")))
}

pub(crate) fn map_unit_row(row: &sqlx::sqlite::SqliteRow) -> Result<ContentUnit, StorageError> {
    let id = unit_id_from_i64(row.try_get("id").map_err(ser)?)?;
    let course_id = course_id_from_i64(row.try_get("course_id").map_err(ser)?)?;
    let title: String = row.try_get("title").map_err(ser)?;
    let order_index = u32_from_i64("order_index", row.try_get("order_index").map_err(ser)?)?;
    let is_required: bool = row.try_get("is_required").map_err(ser)?;
    let created_at: chrono::DateTime<chrono::Utc> = row.try_get("created_at").map_err(ser)?;

    let kind_str: String = row.try_get("kind").map_err(ser)?;
    let kind = match kind_str.as_str() {
        "video" => {
            let media_ref: Option<String> = row.try_get("media_ref").map_err(ser)?;
            let media = MediaRef::from_id(
                media_ref.ok_or_else(|| StorageError::Serialization("missing media_ref".into()))?,
            )
            .map_err(ser)?;
            let duration: Option<i64> = row.try_get("duration_seconds").map_err(ser)?;
            let duration_seconds = u32_from_i64(
                "duration_seconds",
                duration
                    .ok_or_else(|| StorageError::Serialization("missing duration_seconds".into()))?,
            )?;
            UnitKind::Video {
                media,
                duration_seconds,
            }
        }
        "test" => {
            let test_id: Option<i64> = row.try_get("test_id").map_err(ser)?;
            UnitKind::Test {
                test_id: test_id_from_i64(
                    test_id.ok_or_else(|| StorageError::Serialization("missing test_id".into()))?,
                )?,
            }
        }
        "reference" => {
            let resource: Option<String> = row.try_get("resource").map_err(ser)?;
            UnitKind::Reference {
                resource: resource
                    .ok_or_else(|| StorageError::Serialization("missing resource".into()))?,
            }
        }
        other => {
            return Err(StorageError::Serialization(format!(
                "invalid unit kind: {other}"
            )));
        }
    };

    ContentUnit::new(id, course_id, title, order_index, is_required, kind, created_at)
        .map_err(ser)
}

pub(crate) fn map_status_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<UnitStatusRecord, StorageError> {
    let student_id = student_id_from_i64(row.try_get("student_id").map_err(ser)?)?;
    let unit_id = unit_id_from_i64(row.try_get("unit_id").map_err(ser)?)?;
    let watched = u32_from_i64("watched_seconds", row.try_get("watched_seconds").map_err(ser)?)?;
    let total = u32_from_i64("total_seconds", row.try_get("total_seconds").map_err(ser)?)?;
    let progress_percentage: f64 = row.try_get("progress_percentage").map_err(ser)?;
    let is_completed: bool = row.try_get("is_completed").map_err(ser)?;
    let last_observed_at: Option<chrono::DateTime<chrono::Utc>> =
        row.try_get("last_observed_at").map_err(ser)?;

    Ok(UnitStatusRecord {
        student_id,
        unit_id,
        status: UnitStatus::from_persisted(
            watched,
            total,
            progress_percentage,
            is_completed,
            last_observed_at,
        ),
    })
}

pub(crate) fn map_test_row(row: &sqlx::sqlite::SqliteRow) -> Result<TestDefinition, StorageError> {
    let id = test_id_from_i64(row.try_get("id").map_err(ser)?)?;
    let title: String = row.try_get("title").map_err(ser)?;
    let questions_json: String = row.try_get("questions").map_err(ser)?;
    let questions: Vec<QuestionSnapshot> =
        serde_json::from_str(&questions_json).map_err(ser)?;

    TestDefinition::new(id, title, questions).map_err(ser)
}

pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<TestAttempt, StorageError> {
    let id_str: String = row.try_get("id").map_err(ser)?;
    let id = parse_attempt_uuid(&id_str)?;
    let test_id = test_id_from_i64(row.try_get("test_id").map_err(ser)?)?;
    let student_id = student_id_from_i64(row.try_get("student_id").map_err(ser)?)?;

    let status_str: String = row.try_get("status").map_err(ser)?;
    let status = parse_attempt_status(status_str.as_str())?;

    let questions_json: String = row.try_get("questions").map_err(ser)?;
    let questions: Vec<QuestionSnapshot> =
        serde_json::from_str(&questions_json).map_err(ser)?;

    let answers_json: String = row.try_get("answers").map_err(ser)?;
    let answers: Vec<SubmittedAnswer> = serde_json::from_str(&answers_json).map_err(ser)?;

    let score: Option<f64> = row.try_get("score").map_err(ser)?;
    let requires_manual_grading: bool = row.try_get("requires_manual_grading").map_err(ser)?;
    let started_at: chrono::DateTime<chrono::Utc> = row.try_get("started_at").map_err(ser)?;
    let submitted_at: Option<chrono::DateTime<chrono::Utc>> =
        row.try_get("submitted_at").map_err(ser)?;

    Ok(TestAttempt::from_persisted(
        id,
        test_id,
        student_id,
        status,
        questions,
        answers,
        score,
        requires_manual_grading,
        started_at,
        submitted_at,
    ))
}
