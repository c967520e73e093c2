use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Answer, Submission};
use crate::db::types::SubmissionStatus;
use crate::services::grading::{AnswerInput, ScoreInput, SubmissionView};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AnswerSubmit {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    /// Multiple-choice answers may arrive as a JSON array; they are stored
    /// as their JSON text.
    #[serde(deserialize_with = "deserialize_answer_text")]
    pub(crate) text: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitRequest {
    #[serde(default)]
    #[validate(nested)]
    pub(crate) answers: Vec<AnswerSubmit>,
}

impl SubmitRequest {
    pub(crate) fn into_inputs(self) -> Vec<AnswerInput> {
        self.answers
            .into_iter()
            .map(|answer| AnswerInput { question_id: answer.question_id, text: answer.text })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerScore {
    #[serde(alias = "answerId")]
    pub(crate) answer_id: String,
    pub(crate) score: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeRequest {
    #[serde(default)]
    pub(crate) scores: Vec<AnswerScore>,
    #[serde(default)]
    #[validate(length(max = 10000, message = "feedback must be at most 10000 characters"))]
    pub(crate) feedback: Option<String>,
}

impl GradeRequest {
    pub(crate) fn into_parts(self) -> (Vec<ScoreInput>, Option<String>) {
        let scores = self
            .scores
            .into_iter()
            .map(|item| ScoreInput { answer_id: item.answer_id, score: item.score })
            .collect();
        (scores, self.feedback)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerResponse {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) text: String,
    pub(crate) score: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) unit_id: String,
    pub(crate) course_id: String,
    pub(crate) student_id: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) started_at: Option<String>,
    pub(crate) submitted_at: Option<String>,
    pub(crate) grade: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) answers: Option<Vec<AnswerResponse>>,
}

impl From<Answer> for AnswerResponse {
    fn from(answer: Answer) -> Self {
        Self {
            id: answer.id,
            question_id: answer.question_id,
            text: answer.text,
            score: answer.score,
        }
    }
}

impl From<Submission> for SubmissionResponse {
    fn from(submission: Submission) -> Self {
        Self {
            id: submission.id,
            unit_id: submission.unit_id,
            course_id: submission.course_id,
            student_id: submission.student_id,
            status: submission.status,
            started_at: submission.started_at.map(format_primitive),
            submitted_at: submission.submitted_at.map(format_primitive),
            grade: submission.grade,
            feedback: submission.feedback,
            created_at: format_primitive(submission.created_at),
            updated_at: format_primitive(submission.updated_at),
            answers: None,
        }
    }
}

impl From<SubmissionView> for SubmissionResponse {
    fn from(view: SubmissionView) -> Self {
        let mut response = Self::from(view.submission);
        response.answers = Some(view.answers.into_iter().map(AnswerResponse::from).collect());
        response
    }
}

fn deserialize_answer_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Null => Err(D::Error::custom("answer text must not be null")),
        other => Ok(other.to_string()),
    }
}
