use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::db::models::{Answer, Submission, Unit};
use crate::db::types::CourseRole;
use crate::repositories::{answers, memberships, questions, submissions, units};
use crate::services::grading::{
    AnswerKey, QuestionCatalog, Roster, StoreError, SubmissionStore, SubmissionTx, UnitDirectory,
};

/// Postgres implementation of the grading engine's storage ports.
#[derive(Clone)]
pub(crate) struct PgGradingBackend {
    pool: PgPool,
}

impl PgGradingBackend {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) async fn load_answer_keys(
    pool: &PgPool,
    unit_id: &str,
) -> Result<Vec<AnswerKey>, sqlx::Error> {
    let questions = questions::list_by_unit(pool, unit_id).await?;
    let mut correct: HashMap<String, BTreeSet<String>> = HashMap::new();
    for choice in questions::list_choices_by_unit(pool, unit_id).await? {
        if choice.is_correct {
            correct.entry(choice.question_id).or_default().insert(choice.id);
        }
    }

    Ok(questions
        .into_iter()
        .map(|question| AnswerKey {
            correct_choice_ids: correct.remove(&question.id).unwrap_or_default(),
            question_id: question.id,
            question_type: question.question_type,
            points: question.points,
            correct_answer: question.correct_answer,
        })
        .collect())
}

#[async_trait]
impl UnitDirectory for PgGradingBackend {
    async fn find_unit(&self, unit_id: &str) -> Result<Option<Unit>, StoreError> {
        Ok(units::find_by_id(&self.pool, unit_id).await?)
    }
}

#[async_trait]
impl QuestionCatalog for PgGradingBackend {
    async fn answer_keys(&self, unit_id: &str) -> Result<Vec<AnswerKey>, StoreError> {
        Ok(load_answer_keys(&self.pool, unit_id).await?)
    }
}

#[async_trait]
impl Roster for PgGradingBackend {
    async fn has_role(
        &self,
        course_id: &str,
        user_id: &str,
        role: CourseRole,
    ) -> Result<bool, StoreError> {
        Ok(memberships::has_role(&self.pool, course_id, user_id, role).await?)
    }

    async fn enrolled_students(&self, course_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(memberships::list_students(&self.pool, course_id).await?)
    }
}

#[async_trait]
impl SubmissionStore for PgGradingBackend {
    async fn begin(
        &self,
        unit_id: &str,
        student_id: &str,
    ) -> Result<Box<dyn SubmissionTx>, StoreError> {
        let mut tx = self.pool.begin().await?;
        submissions::lock_attempt(&mut *tx, unit_id, student_id).await?;
        Ok(Box::new(PgSubmissionTx {
            tx,
            unit_id: unit_id.to_string(),
            student_id: student_id.to_string(),
        }))
    }

    async fn find_submission(
        &self,
        submission_id: &str,
    ) -> Result<Option<Submission>, StoreError> {
        Ok(submissions::find_by_id(&self.pool, submission_id).await?)
    }

    async fn list_for_unit(&self, unit_id: &str) -> Result<Vec<Submission>, StoreError> {
        Ok(submissions::list_by_unit(&self.pool, unit_id).await?)
    }

    async fn answers_for(&self, submission_id: &str) -> Result<Vec<Answer>, StoreError> {
        Ok(answers::list_by_submission(&self.pool, submission_id).await?)
    }
}

struct PgSubmissionTx {
    tx: Transaction<'static, Postgres>,
    unit_id: String,
    student_id: String,
}

#[async_trait]
impl SubmissionTx for PgSubmissionTx {
    async fn current(&mut self) -> Result<Option<Submission>, StoreError> {
        Ok(submissions::find_for_update(&mut *self.tx, &self.unit_id, &self.student_id).await?)
    }

    async fn answers(&mut self, submission_id: &str) -> Result<Vec<Answer>, StoreError> {
        Ok(answers::list_by_submission(&mut *self.tx, submission_id).await?)
    }

    async fn insert_submission(&mut self, submission: &Submission) -> Result<bool, StoreError> {
        Ok(submissions::insert_if_absent(&mut *self.tx, submission).await?)
    }

    async fn save_submission(&mut self, submission: &Submission) -> Result<(), StoreError> {
        submissions::save(&mut *self.tx, submission).await?;
        Ok(())
    }

    async fn replace_answers(
        &mut self,
        submission_id: &str,
        rows: &[Answer],
    ) -> Result<(), StoreError> {
        answers::delete_by_submission(&mut *self.tx, submission_id).await?;
        answers::insert_many(&mut *self.tx, rows).await?;
        Ok(())
    }

    async fn update_answer_scores(&mut self, rows: &[Answer]) -> Result<(), StoreError> {
        for answer in rows {
            answers::update_score(&mut *self.tx, answer).await?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
