//! Pure grading math over frozen question snapshots.
//!
//! Grading never touches the editable test definition; it only ever sees
//! the snapshot taken when the attempt was created, so a stored attempt can
//! be rescored deterministically at any time.

use std::collections::HashMap;

use thiserror::Error;

use crate::model::{AnswerKey, AnswerValue, QuestionId, QuestionSnapshot, SubmittedAnswer, round2};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GradingError {
    #[error("answer references unknown question {0}")]
    UnknownQuestion(QuestionId),

    #[error("more than one answer for question {0}")]
    DuplicateAnswer(QuestionId),
}

/// Outcome for a single question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionGrade {
    pub question_id: QuestionId,
    /// `None` for questions that wait on manual grading.
    pub is_correct: Option<bool>,
    pub requires_manual_grading: bool,
}

/// Outcome for a full submission.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
    pub results: Vec<QuestionGrade>,
    /// `None` whenever any question needs manual grading.
    pub score: Option<f64>,
    pub requires_manual_grading: bool,
}

/// Grades one answer against its frozen question.
///
/// A missing or type-mismatched answer is simply wrong; only subjective
/// questions escape the objective check.
#[must_use]
pub fn grade_question(question: &QuestionSnapshot, answer: Option<&AnswerValue>) -> QuestionGrade {
    let is_correct = match question.key() {
        AnswerKey::Manual => {
            return QuestionGrade {
                question_id: question.id(),
                is_correct: None,
                requires_manual_grading: true,
            };
        }
        AnswerKey::Boolean(expected) => {
            matches!(answer, Some(AnswerValue::Boolean(given)) if given == expected)
        }
        AnswerKey::Choice(expected) => {
            matches!(answer, Some(AnswerValue::Choice(given)) if given == expected)
        }
        AnswerKey::Text { accepted } => match answer {
            Some(AnswerValue::Text(given)) if !given.trim().is_empty() => {
                let given = given.trim().to_lowercase();
                accepted
                    .iter()
                    .any(|candidate| candidate.trim().to_lowercase() == given)
            }
            _ => false,
        },
    };

    QuestionGrade {
        question_id: question.id(),
        is_correct: Some(is_correct),
        requires_manual_grading: false,
    }
}

/// Grades a submission against the frozen snapshot.
///
/// For purely objective question sets the score is
/// `round(correct / question_count * 100, 2)`. If any question is
/// subjective the score stays `None` and the whole submission is flagged
/// for manual grading.
///
/// # Errors
///
/// Returns `GradingError` when the answer set references an unknown
/// question or answers the same question twice; the snapshot itself is
/// never at fault here.
pub fn grade_submission(
    questions: &[QuestionSnapshot],
    answers: &[SubmittedAnswer],
) -> Result<GradeOutcome, GradingError> {
    let mut by_question: HashMap<QuestionId, &AnswerValue> = HashMap::with_capacity(answers.len());
    for answer in answers {
        if !questions.iter().any(|q| q.id() == answer.question_id) {
            return Err(GradingError::UnknownQuestion(answer.question_id));
        }
        if by_question
            .insert(answer.question_id, &answer.value)
            .is_some()
        {
            return Err(GradingError::DuplicateAnswer(answer.question_id));
        }
    }

    let results: Vec<QuestionGrade> = questions
        .iter()
        .map(|question| grade_question(question, by_question.get(&question.id()).copied()))
        .collect();

    let requires_manual_grading = results.iter().any(|grade| grade.requires_manual_grading);
    let score = if requires_manual_grading || questions.is_empty() {
        None
    } else {
        let correct = results
            .iter()
            .filter(|grade| grade.is_correct == Some(true))
            .count();
        #[allow(clippy::cast_precision_loss)]
        let score = round2(correct as f64 / questions.len() as f64 * 100.0);
        Some(score)
    };

    Ok(GradeOutcome {
        results,
        score,
        requires_manual_grading,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionKind;

    fn boolean(id: u64, key: bool) -> QuestionSnapshot {
        QuestionSnapshot::new(
            QuestionId::new(id),
            QuestionKind::TrueFalse,
            format!("Q{id}"),
            Vec::new(),
            AnswerKey::Boolean(key),
            u32::try_from(id).unwrap_or(0),
        )
        .unwrap()
    }

    fn answer(id: u64, value: AnswerValue) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id: QuestionId::new(id),
            value,
        }
    }

    #[test]
    fn three_of_five_scores_sixty() {
        let questions: Vec<_> = (1..=5).map(|id| boolean(id, true)).collect();
        let answers = vec![
            answer(1, AnswerValue::Boolean(true)),
            answer(2, AnswerValue::Boolean(true)),
            answer(3, AnswerValue::Boolean(true)),
            answer(4, AnswerValue::Boolean(false)),
            answer(5, AnswerValue::Boolean(false)),
        ];

        let outcome = grade_submission(&questions, &answers).unwrap();
        assert_eq!(outcome.score, Some(60.0));
        assert!(!outcome.requires_manual_grading);
    }

    #[test]
    fn one_of_three_rounds_to_two_decimals() {
        let questions: Vec<_> = (1..=3).map(|id| boolean(id, true)).collect();
        let answers = vec![answer(1, AnswerValue::Boolean(true))];

        let outcome = grade_submission(&questions, &answers).unwrap();
        assert_eq!(outcome.score, Some(33.33));
    }

    #[test]
    fn missing_answers_count_as_wrong() {
        let questions: Vec<_> = (1..=2).map(|id| boolean(id, true)).collect();
        let outcome = grade_submission(&questions, &[]).unwrap();
        assert_eq!(outcome.score, Some(0.0));
    }

    #[test]
    fn subjective_question_defers_the_score() {
        let essay = QuestionSnapshot::new(
            QuestionId::new(3),
            QuestionKind::Essay,
            "Discuss",
            Vec::new(),
            AnswerKey::Manual,
            2,
        )
        .unwrap();
        let questions = vec![boolean(1, true), boolean(2, false), essay];
        let answers = vec![
            answer(1, AnswerValue::Boolean(true)),
            answer(2, AnswerValue::Boolean(false)),
            answer(3, AnswerValue::Text("long form".into())),
        ];

        let outcome = grade_submission(&questions, &answers).unwrap();
        assert_eq!(outcome.score, None);
        assert!(outcome.requires_manual_grading);
        assert_eq!(outcome.results[2].is_correct, None);
    }

    #[test]
    fn short_answer_matches_case_insensitively() {
        let question = QuestionSnapshot::new(
            QuestionId::new(1),
            QuestionKind::ShortAnswer,
            "Capital of France?",
            Vec::new(),
            AnswerKey::Text {
                accepted: vec!["Paris".into()],
            },
            0,
        )
        .unwrap();

        let grade = grade_question(&question, Some(&AnswerValue::Text("  paris ".into())));
        assert_eq!(grade.is_correct, Some(true));

        let grade = grade_question(&question, Some(&AnswerValue::Text(String::new())));
        assert_eq!(grade.is_correct, Some(false));
    }

    #[test]
    fn type_mismatch_is_wrong_not_an_error() {
        let question = boolean(1, true);
        let grade = grade_question(&question, Some(&AnswerValue::Text("true".into())));
        assert_eq!(grade.is_correct, Some(false));
    }

    #[test]
    fn unknown_question_is_rejected() {
        let questions = vec![boolean(1, true)];
        let answers = vec![answer(9, AnswerValue::Boolean(true))];
        let err = grade_submission(&questions, &answers).unwrap_err();
        assert_eq!(err, GradingError::UnknownQuestion(QuestionId::new(9)));
    }

    #[test]
    fn duplicate_answer_is_rejected() {
        let questions = vec![boolean(1, true)];
        let answers = vec![
            answer(1, AnswerValue::Boolean(true)),
            answer(1, AnswerValue::Boolean(false)),
        ];
        let err = grade_submission(&questions, &answers).unwrap_err();
        assert_eq!(err, GradingError::DuplicateAnswer(QuestionId::new(1)));
    }

    #[test]
    fn rescoring_the_same_submission_is_deterministic() {
        let questions: Vec<_> = (1..=4).map(|id| boolean(id, id % 2 == 0)).collect();
        let answers = vec![
            answer(1, AnswerValue::Boolean(false)),
            answer(2, AnswerValue::Boolean(true)),
            answer(3, AnswerValue::Boolean(true)),
            answer(4, AnswerValue::Boolean(true)),
        ];

        let first = grade_submission(&questions, &answers).unwrap();
        let second = grade_submission(&questions, &answers).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.score, Some(75.0));
    }
}
