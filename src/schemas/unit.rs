use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::types::{QuestionType, UnitKind};
use crate::schemas::datetime::deserialize_option_datetime_flexible;
use crate::services::authoring::{
    ChoiceDraft, QuestionDetail, QuestionDraft, UnitDetail, UnitDraft, UnitPatch,
};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ChoicePayload {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[validate(length(min = 1, max = 255, message = "choice text must be 1-255 characters"))]
    pub(crate) text: String,
    #[serde(default, alias = "isCorrect")]
    pub(crate) is_correct: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionPayload {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(alias = "type", alias = "questionType")]
    pub(crate) question_type: QuestionType,
    #[validate(length(min = 1, message = "question text must not be empty"))]
    pub(crate) text: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "points must be non-negative"))]
    pub(crate) points: i32,
    #[serde(default, alias = "correctAnswer")]
    pub(crate) correct_answer: Option<String>,
    #[serde(default, alias = "orderIndex")]
    #[validate(range(min = 0, message = "order_index must be non-negative"))]
    pub(crate) order_index: Option<i32>,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) choices: Vec<ChoicePayload>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UnitCreate {
    pub(crate) kind: UnitKind,
    #[validate(length(min = 1, max = 100, message = "title must be 1-100 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, alias = "dueDate", deserialize_with = "deserialize_option_datetime_flexible")]
    pub(crate) due_date: Option<PrimitiveDateTime>,
    #[serde(default, alias = "startTime", deserialize_with = "deserialize_option_datetime_flexible")]
    pub(crate) start_time: Option<PrimitiveDateTime>,
    #[serde(default, alias = "endTime", deserialize_with = "deserialize_option_datetime_flexible")]
    pub(crate) end_time: Option<PrimitiveDateTime>,
    #[serde(default, alias = "timeLimitMinutes")]
    pub(crate) time_limit_minutes: Option<i32>,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) questions: Vec<QuestionPayload>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct UnitUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "title must be 1-100 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, alias = "dueDate", deserialize_with = "deserialize_option_datetime_flexible")]
    pub(crate) due_date: Option<PrimitiveDateTime>,
    #[serde(default, alias = "startTime", deserialize_with = "deserialize_option_datetime_flexible")]
    pub(crate) start_time: Option<PrimitiveDateTime>,
    #[serde(default, alias = "endTime", deserialize_with = "deserialize_option_datetime_flexible")]
    pub(crate) end_time: Option<PrimitiveDateTime>,
    #[serde(default, alias = "timeLimitMinutes")]
    pub(crate) time_limit_minutes: Option<i32>,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) questions: Vec<QuestionPayload>,
}

impl From<ChoicePayload> for ChoiceDraft {
    fn from(payload: ChoicePayload) -> Self {
        Self { id: payload.id, text: payload.text, is_correct: payload.is_correct }
    }
}

impl From<QuestionPayload> for QuestionDraft {
    fn from(payload: QuestionPayload) -> Self {
        Self {
            id: payload.id,
            question_type: payload.question_type,
            text: payload.text,
            points: payload.points,
            correct_answer: payload.correct_answer,
            order_index: payload.order_index,
            choices: payload.choices.into_iter().map(ChoiceDraft::from).collect(),
        }
    }
}

impl From<UnitCreate> for UnitDraft {
    fn from(payload: UnitCreate) -> Self {
        Self {
            kind: payload.kind,
            title: payload.title,
            description: payload.description,
            due_date: payload.due_date,
            start_time: payload.start_time,
            end_time: payload.end_time,
            time_limit_minutes: payload.time_limit_minutes,
            questions: payload.questions.into_iter().map(QuestionDraft::from).collect(),
        }
    }
}

impl From<UnitUpdate> for UnitPatch {
    fn from(payload: UnitUpdate) -> Self {
        Self {
            title: payload.title,
            description: payload.description,
            due_date: payload.due_date,
            start_time: payload.start_time,
            end_time: payload.end_time,
            time_limit_minutes: payload.time_limit_minutes,
            questions: payload.questions.into_iter().map(QuestionDraft::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChoiceResponse {
    pub(crate) id: String,
    pub(crate) text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) is_correct: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) text: String,
    pub(crate) points: i32,
    pub(crate) order_index: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) correct_answer: Option<String>,
    pub(crate) choices: Vec<ChoiceResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UnitResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) kind: UnitKind,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) due_date: Option<String>,
    pub(crate) start_time: Option<String>,
    pub(crate) end_time: Option<String>,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) is_available: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) questions: Vec<QuestionResponse>,
}

impl QuestionResponse {
    fn from_detail(detail: QuestionDetail, reveal_answers: bool) -> Self {
        let QuestionDetail { question, choices } = detail;
        Self {
            id: question.id,
            question_type: question.question_type,
            text: question.text,
            points: question.points,
            order_index: question.order_index,
            correct_answer: question.correct_answer.filter(|_| reveal_answers),
            choices: choices
                .into_iter()
                .map(|choice| ChoiceResponse {
                    id: choice.id,
                    text: choice.text,
                    is_correct: reveal_answers.then_some(choice.is_correct),
                })
                .collect(),
        }
    }
}

impl From<UnitDetail> for UnitResponse {
    fn from(detail: UnitDetail) -> Self {
        let UnitDetail { unit, questions, reveal_answers, is_available } = detail;
        Self {
            id: unit.id,
            course_id: unit.course_id,
            kind: unit.kind,
            title: unit.title,
            description: unit.description,
            due_date: unit.due_date.map(format_primitive),
            start_time: unit.start_time.map(format_primitive),
            end_time: unit.end_time.map(format_primitive),
            time_limit_minutes: unit.time_limit_minutes,
            is_available,
            created_by: unit.created_by,
            created_at: format_primitive(unit.created_at),
            updated_at: format_primitive(unit.updated_at),
            questions: questions
                .into_iter()
                .map(|question| QuestionResponse::from_detail(question, reveal_answers))
                .collect(),
        }
    }
}
