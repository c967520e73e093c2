use async_trait::async_trait;

use crate::db::models::{Answer, Submission, Unit};
use crate::db::types::CourseRole;
use crate::services::grading::error::StoreError;
use crate::services::grading::scoring::AnswerKey;

#[async_trait]
pub(crate) trait UnitDirectory: Send + Sync {
    async fn find_unit(&self, unit_id: &str) -> Result<Option<Unit>, StoreError>;
}

#[async_trait]
pub(crate) trait QuestionCatalog: Send + Sync {
    async fn answer_keys(&self, unit_id: &str) -> Result<Vec<AnswerKey>, StoreError>;
}

#[async_trait]
pub(crate) trait Roster: Send + Sync {
    async fn has_role(
        &self,
        course_id: &str,
        user_id: &str,
        role: CourseRole,
    ) -> Result<bool, StoreError>;

    async fn enrolled_students(&self, course_id: &str) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
pub(crate) trait SubmissionStore: Send + Sync {
    /// Opens a unit of work holding the (unit, student) lock until it is
    /// committed or dropped. Dropping without commit discards every write.
    async fn begin(
        &self,
        unit_id: &str,
        student_id: &str,
    ) -> Result<Box<dyn SubmissionTx>, StoreError>;

    async fn find_submission(&self, submission_id: &str)
        -> Result<Option<Submission>, StoreError>;

    async fn list_for_unit(&self, unit_id: &str) -> Result<Vec<Submission>, StoreError>;

    async fn answers_for(&self, submission_id: &str) -> Result<Vec<Answer>, StoreError>;
}

#[async_trait]
pub(crate) trait SubmissionTx: Send {
    /// The locked submission row for this unit of work's (unit, student).
    async fn current(&mut self) -> Result<Option<Submission>, StoreError>;

    async fn answers(&mut self, submission_id: &str) -> Result<Vec<Answer>, StoreError>;

    /// Returns `false` when a row for the pair already exists.
    async fn insert_submission(&mut self, submission: &Submission) -> Result<bool, StoreError>;

    async fn save_submission(&mut self, submission: &Submission) -> Result<(), StoreError>;

    /// Deletes the submission's answers and stores `answers` in their place.
    async fn replace_answers(
        &mut self,
        submission_id: &str,
        answers: &[Answer],
    ) -> Result<(), StoreError>;

    async fn update_answer_scores(&mut self, answers: &[Answer]) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

pub(crate) trait GradingBackend: UnitDirectory + QuestionCatalog + Roster + SubmissionStore {}

impl<T> GradingBackend for T where T: UnitDirectory + QuestionCatalog + Roster + SubmissionStore {}
