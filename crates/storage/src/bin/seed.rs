use std::fmt;

use academy_core::model::{
    AnswerKey, ContentUnit, Course, CourseId, MediaRef, QuestionId, QuestionKind, QuestionSnapshot,
    TestDefinition, TestId, UnitId, UnitKind,
};
use chrono::{DateTime, Utc};
use storage::repository::{CourseRepository, Storage, TestRepository};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    course_id: CourseId,
    course_title: String,
    media_ref: String,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCourseId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCourseId { raw } => write!(f, "invalid --course-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("ACADEMY_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut course_id = std::env::var("ACADEMY_COURSE_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| CourseId::new(1), CourseId::new);
        let mut course_title =
            std::env::var("ACADEMY_COURSE_TITLE").unwrap_or_else(|_| "Algebra Basics".into());
        let mut media_ref =
            std::env::var("ACADEMY_MEDIA_REF").unwrap_or_else(|_| "demo-video-1".into());
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--course-id" => {
                    let value = require_value(&mut args, "--course-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCourseId { raw: value.clone() })?;
                    course_id = CourseId::new(parsed);
                }
                "--course-title" => {
                    let value = require_value(&mut args, "--course-title")?;
                    course_title = value;
                }
                "--media-ref" => {
                    let value = require_value(&mut args, "--media-ref")?;
                    media_ref = value;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            course_id,
            course_title,
            media_ref,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --course-id <id>          Course id to upsert (default: 1)");
    eprintln!("  --course-title <title>    Course title (default: Algebra Basics)");
    eprintln!("  --media-ref <id>          Embed media id for the demo video");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  ACADEMY_DB_URL, ACADEMY_COURSE_ID, ACADEMY_COURSE_TITLE, ACADEMY_MEDIA_REF");
}

fn demo_test(test_id: TestId) -> Result<TestDefinition, Box<dyn std::error::Error>> {
    let questions = vec![
        QuestionSnapshot::new(
            QuestionId::new(1),
            QuestionKind::TrueFalse,
            "Is 2 + 2 equal to 4?",
            Vec::new(),
            AnswerKey::Boolean(true),
            0,
        )?,
        QuestionSnapshot::new(
            QuestionId::new(2),
            QuestionKind::SingleChoice,
            "Which of these is a prime number?",
            vec!["4".into(), "6".into(), "7".into(), "9".into()],
            AnswerKey::Choice(2),
            1,
        )?,
        QuestionSnapshot::new(
            QuestionId::new(3),
            QuestionKind::ShortAnswer,
            "What is the square root of 81?",
            Vec::new(),
            AnswerKey::Text {
                accepted: vec!["9".into(), "nine".into()],
            },
            2,
        )?,
    ];
    Ok(TestDefinition::new(test_id, "Checkpoint Quiz", questions)?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let base = args.course_id.value() * 100;
    let test_id = TestId::new(base + 1);
    let test = demo_test(test_id)?;
    storage.tests.upsert_test(&test).await?;

    let units = vec![
        ContentUnit::new(
            UnitId::new(base + 1),
            args.course_id,
            "Lesson 1: Introduction",
            0,
            true,
            UnitKind::Video {
                media: MediaRef::from_id(&args.media_ref)?,
                duration_seconds: 600,
            },
            now,
        )?,
        ContentUnit::new(
            UnitId::new(base + 2),
            args.course_id,
            "Lesson notes",
            1,
            false,
            UnitKind::Reference {
                resource: "notes/lesson-1.md".into(),
            },
            now,
        )?,
        ContentUnit::new(
            UnitId::new(base + 3),
            args.course_id,
            "Checkpoint Quiz",
            2,
            true,
            UnitKind::Test { test_id },
            now,
        )?,
    ];

    let course = Course::new(args.course_id, args.course_title.clone(), units, now)?;
    storage.courses.upsert_course(&course).await?;

    println!(
        "Seeded course {} ({}) with {} units and test {} into {}",
        course.id().value(),
        course.title(),
        course.units().len(),
        test_id.value(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
