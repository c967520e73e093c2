use std::collections::BTreeSet;

use crate::db::types::QuestionType;
use crate::services::grading::payload::AnswerPayload;

/// What the scorer needs to know about one question.
#[derive(Debug, Clone)]
pub(crate) struct AnswerKey {
    pub(crate) question_id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) points: i32,
    pub(crate) correct_answer: Option<String>,
    pub(crate) correct_choice_ids: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScoreOutcome {
    /// `None` until a teacher grades the answer.
    pub(crate) awarded: Option<f64>,
    pub(crate) needs_manual_review: bool,
}

impl ScoreOutcome {
    fn full(points: i32) -> Self {
        Self { awarded: Some(clamp_score(f64::from(points), points)), needs_manual_review: false }
    }

    fn zero() -> Self {
        Self { awarded: Some(0.0), needs_manual_review: false }
    }

    fn pending() -> Self {
        Self { awarded: None, needs_manual_review: true }
    }

    fn from_match(matched: bool, points: i32) -> Self {
        if matched {
            Self::full(points)
        } else {
            Self::zero()
        }
    }
}

/// Total over any input: malformed payloads score zero.
pub(crate) fn score(key: &AnswerKey, payload: &AnswerPayload) -> ScoreOutcome {
    match (key.question_type, payload) {
        (QuestionType::ShortAnswer, _) => ScoreOutcome::pending(),
        (_, AnswerPayload::Malformed) => ScoreOutcome::zero(),
        (QuestionType::SingleChoice, AnswerPayload::Choice(choice)) => {
            ScoreOutcome::from_match(key.correct_choice_ids.contains(choice), key.points)
        }
        (QuestionType::MultipleChoice, AnswerPayload::Choices(choices)) => {
            ScoreOutcome::from_match(*choices == key.correct_choice_ids, key.points)
        }
        (QuestionType::TrueFalse | QuestionType::FillBlank, AnswerPayload::Literal(text)) => {
            let matched = key.correct_answer.as_deref() == Some(text.as_str());
            ScoreOutcome::from_match(matched, key.points)
        }
        _ => ScoreOutcome::zero(),
    }
}

pub(crate) fn score_text(key: &AnswerKey, raw: &str) -> ScoreOutcome {
    score(key, &AnswerPayload::parse(key.question_type, raw))
}

/// Clamps into `[0, points]`. Non-finite input stores zero.
pub(crate) fn clamp_score(value: f64, points: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(0.0, f64::from(points.max(0)))
}
