use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{QuestionType, SubmissionStatus, UnitKind};

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Unit {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) kind: UnitKind,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) due_date: Option<PrimitiveDateTime>,
    pub(crate) start_time: Option<PrimitiveDateTime>,
    pub(crate) end_time: Option<PrimitiveDateTime>,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) unit_id: String,
    pub(crate) text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) points: i32,
    pub(crate) correct_answer: Option<String>,
    pub(crate) order_index: i32,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Choice {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) text: String,
    pub(crate) is_correct: bool,
    pub(crate) order_index: i32,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: String,
    pub(crate) unit_id: String,
    pub(crate) course_id: String,
    pub(crate) student_id: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) started_at: Option<PrimitiveDateTime>,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) grade: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub(crate) struct Answer {
    pub(crate) id: String,
    pub(crate) submission_id: String,
    pub(crate) question_id: String,
    pub(crate) text: String,
    pub(crate) score: Option<f64>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
