use std::collections::BTreeSet;

use serde_json::Value;

use crate::db::types::QuestionType;

/// A learner's answer text, decoded once according to the question type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AnswerPayload {
    Choice(String),
    Choices(BTreeSet<String>),
    Literal(String),
    FreeText(String),
    /// Text that cannot be read as the expected shape. Scores zero.
    Malformed,
}

impl AnswerPayload {
    pub(crate) fn parse(question_type: QuestionType, raw: &str) -> Self {
        match question_type {
            QuestionType::SingleChoice => {
                if raw.is_empty() {
                    Self::Malformed
                } else {
                    Self::Choice(raw.to_string())
                }
            }
            QuestionType::MultipleChoice => parse_choice_set(raw).map_or(Self::Malformed, Self::Choices),
            QuestionType::TrueFalse | QuestionType::FillBlank => Self::Literal(raw.to_string()),
            QuestionType::ShortAnswer => Self::FreeText(raw.to_string()),
        }
    }
}

// Accepts a JSON array of string or integer ids. Duplicates collapse.
fn parse_choice_set(raw: &str) -> Option<BTreeSet<String>> {
    let Value::Array(items) = serde_json::from_str::<Value>(raw).ok()? else {
        return None;
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(id) => Some(id),
            Value::Number(number) if number.is_i64() || number.is_u64() => Some(number.to_string()),
            _ => None,
        })
        .collect()
}
