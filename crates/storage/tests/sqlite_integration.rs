use academy_core::model::{
    AnswerKey, AnswerValue, AttemptId, AttemptStatus, ContentUnit, Course, CourseId, MediaRef,
    QuestionId, QuestionKind, QuestionSnapshot, StudentId, SubmittedAnswer, TestAttempt,
    TestDefinition, TestId, UnitId, UnitKind, UnitStatus,
};
use academy_core::time::fixed_now;
use storage::repository::{
    AttemptRepository, CourseRepository, ProgressRepository, StorageError, TestRepository,
    UnitStatusRecord,
};
use storage::sqlite::SqliteRepository;

fn build_course(id: u64) -> Course {
    let course_id = CourseId::new(id);
    let units = vec![
        ContentUnit::new(
            UnitId::new(id * 10 + 1),
            course_id,
            "Lesson video",
            0,
            true,
            UnitKind::Video {
                media: MediaRef::from_id("vid-1").unwrap(),
                duration_seconds: 600,
            },
            fixed_now(),
        )
        .unwrap(),
        ContentUnit::new(
            UnitId::new(id * 10 + 2),
            course_id,
            "Reading",
            1,
            false,
            UnitKind::Reference {
                resource: "notes.md".into(),
            },
            fixed_now(),
        )
        .unwrap(),
        ContentUnit::new(
            UnitId::new(id * 10 + 3),
            course_id,
            "Quiz",
            2,
            true,
            UnitKind::Test {
                test_id: TestId::new(id),
            },
            fixed_now(),
        )
        .unwrap(),
    ];
    Course::new(course_id, format!("Course {id}"), units, fixed_now()).unwrap()
}

fn build_test(id: u64) -> TestDefinition {
    let questions = vec![
        QuestionSnapshot::new(
            QuestionId::new(1),
            QuestionKind::TrueFalse,
            "Q1",
            Vec::new(),
            AnswerKey::Boolean(true),
            0,
        )
        .unwrap(),
        QuestionSnapshot::new(
            QuestionId::new(2),
            QuestionKind::SingleChoice,
            "Q2",
            vec!["a".into(), "b".into()],
            AnswerKey::Choice(1),
            1,
        )
        .unwrap(),
    ];
    TestDefinition::new(TestId::new(id), "Quiz", questions).unwrap()
}

#[tokio::test]
async fn sqlite_roundtrips_course_with_ordered_units() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_course?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    // Tests referenced by units must exist for later attempt flows; the
    // course itself has no foreign key on them.
    let course = build_course(1);
    repo.upsert_course(&course).await.unwrap();

    let fetched = repo.get_course(course.id()).await.expect("fetch");
    assert_eq!(fetched.units().len(), 3);
    let order: Vec<u32> = fetched.units().iter().map(ContentUnit::order_index).collect();
    assert_eq!(order, vec![0, 1, 2]);
    assert_eq!(fetched, course);

    let missing = repo.get_course(CourseId::new(99)).await;
    assert!(matches!(missing, Err(StorageError::NotFound)));
}

#[tokio::test]
async fn sqlite_unit_status_upsert_and_list() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_status?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let course = build_course(2);
    repo.upsert_course(&course).await.unwrap();

    let student = StudentId::new(7);
    let unit = course.units()[0].id();
    let status = UnitStatus::not_started().apply_update(120, 600, fixed_now());
    let record = UnitStatusRecord {
        student_id: student,
        unit_id: unit,
        status: status.clone(),
    };
    repo.upsert_status(&record).await.unwrap();

    let fetched = repo.get_status(student, unit).await.unwrap().expect("row");
    assert_eq!(fetched.status, status);

    // Second write overwrites in place.
    let advanced = status.apply_update(300, 600, fixed_now());
    repo.upsert_status(&UnitStatusRecord {
        student_id: student,
        unit_id: unit,
        status: advanced.clone(),
    })
    .await
    .unwrap();

    let listed = repo.list_statuses(student).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status.watched_seconds(), 300);

    let other = repo.list_statuses(StudentId::new(8)).await.unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn sqlite_attempt_lifecycle_and_conflict_guard() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_attempt?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let test = build_test(3);
    repo.upsert_test(&test).await.unwrap();
    let fetched_test = repo.get_test(test.id()).await.unwrap();
    assert_eq!(fetched_test, test);

    let student = StudentId::new(5);
    let mut attempt = TestAttempt::start(
        AttemptId::generate(),
        test.id(),
        student,
        test.freeze_questions(),
        fixed_now(),
    )
    .unwrap();
    repo.insert_attempt(&attempt).await.unwrap();

    let open = repo.find_open_attempt(test.id(), student).await.unwrap();
    assert_eq!(open.map(|a| a.id()), Some(attempt.id()));

    attempt
        .record_submission(
            vec![
                SubmittedAnswer {
                    question_id: QuestionId::new(1),
                    value: AnswerValue::Boolean(true),
                },
                SubmittedAnswer {
                    question_id: QuestionId::new(2),
                    value: AnswerValue::Choice(0),
                },
            ],
            Some(50.0),
            false,
            fixed_now(),
        )
        .unwrap();
    repo.update_attempt(&attempt, AttemptStatus::InProgress)
        .await
        .unwrap();

    // The open slot is gone and the stored attempt carries the score.
    let open = repo.find_open_attempt(test.id(), student).await.unwrap();
    assert!(open.is_none());
    let stored = repo.get_attempt(attempt.id()).await.unwrap();
    assert_eq!(stored.status(), AttemptStatus::Submitted);
    assert_eq!(stored.score(), Some(50.0));
    assert_eq!(stored.answers().len(), 2);

    // A racing second submission loses on the status guard.
    let err = repo
        .update_attempt(&attempt, AttemptStatus::InProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_attempt_snapshot_survives_test_edits() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_snapshot?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let test = build_test(4);
    repo.upsert_test(&test).await.unwrap();

    let attempt = TestAttempt::start(
        AttemptId::generate(),
        test.id(),
        StudentId::new(1),
        test.freeze_questions(),
        fixed_now(),
    )
    .unwrap();
    repo.insert_attempt(&attempt).await.unwrap();

    // The teacher rewrites the test afterwards.
    let edited = TestDefinition::new(
        test.id(),
        "Quiz v2",
        vec![
            QuestionSnapshot::new(
                QuestionId::new(9),
                QuestionKind::TrueFalse,
                "New question",
                Vec::new(),
                AnswerKey::Boolean(false),
                0,
            )
            .unwrap(),
        ],
    )
    .unwrap();
    repo.upsert_test(&edited).await.unwrap();

    let stored = repo.get_attempt(attempt.id()).await.unwrap();
    assert_eq!(stored.questions().len(), 2);
    assert_eq!(stored.questions()[0].id(), QuestionId::new(1));
}
