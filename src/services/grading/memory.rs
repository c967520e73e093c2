//! In-process backend used by the engine and HTTP tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::db::models::{Answer, Submission, Unit};
use crate::db::types::CourseRole;
use crate::services::grading::error::StoreError;
use crate::services::grading::ports::{
    QuestionCatalog, Roster, SubmissionStore, SubmissionTx, UnitDirectory,
};
use crate::services::grading::scoring::AnswerKey;

#[derive(Default)]
struct Tables {
    units: HashMap<String, Unit>,
    keys: HashMap<String, Vec<AnswerKey>>,
    memberships: HashSet<(String, String, CourseRole)>,
    roster_order: Vec<(String, String)>,
    submissions: HashMap<String, Submission>,
    answers: HashMap<String, Vec<Answer>>,
}

#[derive(Default)]
pub(crate) struct MemoryBackend {
    tables: Arc<Mutex<Tables>>,
    locks: Mutex<HashMap<(String, String), Arc<AsyncMutex<()>>>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_unit(&self, unit: Unit, keys: Vec<AnswerKey>) {
        let mut tables = self.tables();
        tables.keys.insert(unit.id.clone(), keys);
        tables.units.insert(unit.id.clone(), unit);
    }

    pub(crate) fn enroll(&self, course_id: &str, user_id: &str, role: CourseRole) {
        let mut tables = self.tables();
        let inserted =
            tables.memberships.insert((course_id.to_string(), user_id.to_string(), role));
        if inserted && role == CourseRole::Student {
            tables.roster_order.push((course_id.to_string(), user_id.to_string()));
        }
    }

    /// Makes the next commit fail after its writes were staged.
    pub(crate) fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    pub(crate) fn submission_count(&self) -> usize {
        self.tables().submissions.len()
    }

    pub(crate) fn stored_answers(&self, submission_id: &str) -> Vec<Answer> {
        self.tables().answers.get(submission_id).cloned().unwrap_or_default()
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn pair_lock(&self, unit_id: &str, student_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry((unit_id.to_string(), student_id.to_string()))
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

#[async_trait]
impl UnitDirectory for MemoryBackend {
    async fn find_unit(&self, unit_id: &str) -> Result<Option<Unit>, StoreError> {
        Ok(self.tables().units.get(unit_id).cloned())
    }
}

#[async_trait]
impl QuestionCatalog for MemoryBackend {
    async fn answer_keys(&self, unit_id: &str) -> Result<Vec<AnswerKey>, StoreError> {
        Ok(self.tables().keys.get(unit_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl Roster for MemoryBackend {
    async fn has_role(
        &self,
        course_id: &str,
        user_id: &str,
        role: CourseRole,
    ) -> Result<bool, StoreError> {
        Ok(self.tables().memberships.contains(&(
            course_id.to_string(),
            user_id.to_string(),
            role,
        )))
    }

    async fn enrolled_students(&self, course_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .tables()
            .roster_order
            .iter()
            .filter(|(course, _)| course == course_id)
            .map(|(_, student)| student.clone())
            .collect())
    }
}

#[async_trait]
impl SubmissionStore for MemoryBackend {
    async fn begin(
        &self,
        unit_id: &str,
        student_id: &str,
    ) -> Result<Box<dyn SubmissionTx>, StoreError> {
        let guard = self.pair_lock(unit_id, student_id).lock_owned().await;
        Ok(Box::new(MemoryTx {
            tables: self.tables.clone(),
            fail_commit: self.fail_next_commit.clone(),
            unit_id: unit_id.to_string(),
            student_id: student_id.to_string(),
            staged: Vec::new(),
            _guard: guard,
        }))
    }

    async fn find_submission(
        &self,
        submission_id: &str,
    ) -> Result<Option<Submission>, StoreError> {
        Ok(self.tables().submissions.get(submission_id).cloned())
    }

    async fn list_for_unit(&self, unit_id: &str) -> Result<Vec<Submission>, StoreError> {
        let mut rows: Vec<Submission> = self
            .tables()
            .submissions
            .values()
            .filter(|submission| submission.unit_id == unit_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn answers_for(&self, submission_id: &str) -> Result<Vec<Answer>, StoreError> {
        Ok(self.tables().answers.get(submission_id).cloned().unwrap_or_default())
    }
}

enum Write {
    Submission(Submission),
    Answers(String, Vec<Answer>),
    Scores(Vec<Answer>),
}

struct MemoryTx {
    tables: Arc<Mutex<Tables>>,
    fail_commit: Arc<AtomicBool>,
    unit_id: String,
    student_id: String,
    staged: Vec<Write>,
    _guard: OwnedMutexGuard<()>,
}

impl MemoryTx {
    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn staged_submission(&self) -> Option<Submission> {
        self.staged.iter().rev().find_map(|write| match write {
            Write::Submission(submission) => Some(submission.clone()),
            _ => None,
        })
    }
}

#[async_trait]
impl SubmissionTx for MemoryTx {
    async fn current(&mut self) -> Result<Option<Submission>, StoreError> {
        if let Some(staged) = self.staged_submission() {
            return Ok(Some(staged));
        }
        Ok(self
            .tables()
            .submissions
            .values()
            .find(|row| row.unit_id == self.unit_id && row.student_id == self.student_id)
            .cloned())
    }

    async fn answers(&mut self, submission_id: &str) -> Result<Vec<Answer>, StoreError> {
        Ok(self.tables().answers.get(submission_id).cloned().unwrap_or_default())
    }

    async fn insert_submission(&mut self, submission: &Submission) -> Result<bool, StoreError> {
        if self.current().await?.is_some() {
            return Ok(false);
        }
        self.staged.push(Write::Submission(submission.clone()));
        Ok(true)
    }

    async fn save_submission(&mut self, submission: &Submission) -> Result<(), StoreError> {
        self.staged.push(Write::Submission(submission.clone()));
        Ok(())
    }

    async fn replace_answers(
        &mut self,
        submission_id: &str,
        answers: &[Answer],
    ) -> Result<(), StoreError> {
        self.staged.push(Write::Answers(submission_id.to_string(), answers.to_vec()));
        Ok(())
    }

    async fn update_answer_scores(&mut self, answers: &[Answer]) -> Result<(), StoreError> {
        self.staged.push(Write::Scores(answers.to_vec()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if self.fail_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Conflict("injected commit failure"));
        }

        let mut tables = self.tables();
        for write in &self.staged {
            match write {
                Write::Submission(submission) => {
                    tables.submissions.insert(submission.id.clone(), submission.clone());
                }
                Write::Answers(submission_id, answers) => {
                    tables.answers.insert(submission_id.clone(), answers.clone());
                }
                Write::Scores(updated) => {
                    for answer in updated {
                        let stored = tables
                            .answers
                            .get_mut(&answer.submission_id)
                            .and_then(|rows| rows.iter_mut().find(|row| row.id == answer.id));
                        if let Some(row) = stored {
                            row.score = answer.score;
                            row.updated_at = answer.updated_at;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
