mod course;
mod ids;
mod status;
mod unit;

pub use course::{Course, CourseError};
pub use ids::{AttemptId, CourseId, ParseIdError, QuestionId, StudentId, TestId, UnitId};
pub use status::{COMPLETION_THRESHOLD_PERCENT, UnitStatus, round2};
pub use test::{
    AnswerKey, AnswerValue, AttemptError, AttemptStatus, QuestionError, QuestionKind,
    QuestionSnapshot, StudentQuestion, SubmittedAnswer, TestAttempt, TestDefinition,
    TestDefinitionError,
};
pub use unit::{ContentUnit, MediaRef, UnitKind, UnitValidationError};
