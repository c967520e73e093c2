use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "courserole", rename_all = "lowercase")]
pub(crate) enum CourseRole {
    Teacher,
    Student,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "unitkind", rename_all = "lowercase")]
pub(crate) enum UnitKind {
    Assignment,
    Exam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "questiontype", rename_all = "snake_case")]
pub(crate) enum QuestionType {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    #[serde(alias = "fill_in_the_blank")]
    FillBlank,
    ShortAnswer,
}

impl QuestionType {
    pub(crate) fn uses_literal(self) -> bool {
        matches!(self, Self::TrueFalse | Self::FillBlank)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "submissionstatus", rename_all = "lowercase")]
pub(crate) enum SubmissionStatus {
    Taking,
    Submitted,
    Graded,
}

impl SubmissionStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Taking => "taking",
            Self::Submitted => "submitted",
            Self::Graded => "graded",
        }
    }
}
