use std::collections::HashMap;
use std::sync::Arc;

use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::config::GradingSettings;
use crate::core::time::Clock;
use crate::db::models::{Answer, Submission, Unit};
use crate::db::types::{CourseRole, SubmissionStatus};
use crate::services::grading::error::{GradingError, StoreError};
use crate::services::grading::lifecycle::{
    apply_override, auto_grade, check_submit, decide_start, AnswerInput, ScoreInput,
    StartDecision,
};
use crate::services::grading::ports::GradingBackend;
use crate::services::grading::report::{build_report, AggregateReport};
use crate::services::grading::window::WindowPolicy;

#[derive(Debug, Clone, Copy)]
pub(crate) struct GradingRules {
    pub(crate) enforce_exam_end_time: bool,
    pub(crate) max_answers_per_submission: usize,
}

impl GradingRules {
    pub(crate) fn from_settings(settings: &GradingSettings) -> Self {
        Self {
            enforce_exam_end_time: settings.enforce_exam_end_time,
            max_answers_per_submission: settings.max_answers_per_submission,
        }
    }
}

/// How a submit call names the attempt it targets.
#[derive(Debug, Clone)]
pub(crate) enum AttemptRef {
    Unit(String),
    Submission(String),
}

#[derive(Debug, Clone)]
pub(crate) struct SubmissionView {
    pub(crate) submission: Submission,
    pub(crate) answers: Vec<Answer>,
}

/// Entry point for every grading operation. Mutations for one
/// (unit, student) pair run inside a single `SubmissionTx`.
#[derive(Clone)]
pub(crate) struct GradingService {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn GradingBackend>,
    clock: Arc<dyn Clock>,
    rules: GradingRules,
}

impl GradingService {
    pub(crate) fn new(
        backend: Arc<dyn GradingBackend>,
        clock: Arc<dyn Clock>,
        rules: GradingRules,
    ) -> Self {
        Self { inner: Arc::new(Inner { backend, clock, rules }) }
    }

    pub(crate) fn now(&self) -> PrimitiveDateTime {
        self.inner.clock.now()
    }

    pub(crate) async fn start_attempt(
        &self,
        unit_id: &str,
        student_id: &str,
    ) -> Result<Submission, GradingError> {
        self.start_locked(unit_id, student_id)
            .await
            .inspect_err(|err| record_rejection("start", err, unit_id, student_id))
    }

    pub(crate) async fn submit(
        &self,
        attempt: AttemptRef,
        student_id: &str,
        answers: Vec<AnswerInput>,
    ) -> Result<SubmissionView, GradingError> {
        let target = match &attempt {
            AttemptRef::Unit(id) | AttemptRef::Submission(id) => id.clone(),
        };
        self.submit_locked(attempt, student_id, answers)
            .await
            .inspect_err(|err| record_rejection("submit", err, &target, student_id))
    }

    pub(crate) async fn override_grade(
        &self,
        submission_id: &str,
        teacher_id: &str,
        scores: Vec<ScoreInput>,
        feedback: Option<String>,
    ) -> Result<SubmissionView, GradingError> {
        self.override_locked(submission_id, teacher_id, scores, feedback)
            .await
            .inspect_err(|err| record_rejection("override", err, submission_id, teacher_id))
    }

    /// Per-student status for the unit's roster. Read-only.
    pub(crate) async fn aggregate_status(
        &self,
        unit_id: &str,
        teacher_id: &str,
    ) -> Result<AggregateReport, GradingError> {
        let unit = self.load_unit(unit_id).await?;
        self.require_teacher(&unit.course_id, teacher_id).await?;
        let policy = WindowPolicy::for_unit(&unit)?;

        let backend = &self.inner.backend;
        let roster = backend.enrolled_students(&unit.course_id).await?;
        let submissions = backend.list_for_unit(unit_id).await?;

        Ok(build_report(unit_id, &policy, &roster, &submissions, self.now()))
    }

    pub(crate) async fn get_submission(
        &self,
        submission_id: &str,
        viewer_id: &str,
    ) -> Result<SubmissionView, GradingError> {
        let backend = &self.inner.backend;
        let submission = backend
            .find_submission(submission_id)
            .await?
            .ok_or(GradingError::NotFound("submission"))?;

        if submission.student_id != viewer_id {
            self.require_teacher(&submission.course_id, viewer_id).await?;
        }

        let answers = backend.answers_for(&submission.id).await?;
        Ok(SubmissionView { submission, answers })
    }

    pub(crate) async fn list_unit_submissions(
        &self,
        unit_id: &str,
        teacher_id: &str,
    ) -> Result<Vec<Submission>, GradingError> {
        let unit = self.load_unit(unit_id).await?;
        self.require_teacher(&unit.course_id, teacher_id).await?;
        Ok(self.inner.backend.list_for_unit(unit_id).await?)
    }

    pub(crate) async fn require_teacher(
        &self,
        course_id: &str,
        user_id: &str,
    ) -> Result<(), GradingError> {
        self.require_role(course_id, user_id, CourseRole::Teacher, "Course teacher access required")
            .await
    }

    async fn start_locked(
        &self,
        unit_id: &str,
        student_id: &str,
    ) -> Result<Submission, GradingError> {
        let unit = self.load_unit(unit_id).await?;
        self.require_role(&unit.course_id, student_id, CourseRole::Student, "Not enrolled")
            .await?;
        let policy = WindowPolicy::for_unit(&unit)?;

        let mut tx = self.inner.backend.begin(unit_id, student_id).await?;
        match decide_start(&policy, tx.current().await?)? {
            StartDecision::Resume(submission) => {
                tracing::debug!(
                    unit_id,
                    student_id,
                    submission_id = %submission.id,
                    "exam attempt resumed"
                );
                Ok(submission)
            }
            StartDecision::Create => {
                let now = self.now();
                let submission = Submission {
                    id: Uuid::new_v4().to_string(),
                    unit_id: unit.id.clone(),
                    course_id: unit.course_id.clone(),
                    student_id: student_id.to_string(),
                    status: SubmissionStatus::Taking,
                    started_at: Some(now),
                    submitted_at: None,
                    grade: None,
                    feedback: None,
                    created_at: now,
                    updated_at: now,
                };
                if !tx.insert_submission(&submission).await? {
                    return Err(StoreError::Conflict("submission row appeared under lock").into());
                }
                tx.commit().await?;

                metrics::counter!("grading_attempts_started_total").increment(1);
                tracing::info!(
                    unit_id,
                    student_id,
                    submission_id = %submission.id,
                    "exam attempt started"
                );
                Ok(submission)
            }
        }
    }

    async fn submit_locked(
        &self,
        attempt: AttemptRef,
        student_id: &str,
        inputs: Vec<AnswerInput>,
    ) -> Result<SubmissionView, GradingError> {
        let backend = &self.inner.backend;
        let (unit_id, expected_submission) = match attempt {
            AttemptRef::Unit(unit_id) => (unit_id, None),
            AttemptRef::Submission(submission_id) => {
                let submission = backend
                    .find_submission(&submission_id)
                    .await?
                    .ok_or(GradingError::NotFound("submission"))?;
                if submission.student_id != student_id {
                    return Err(GradingError::Forbidden("Not your submission"));
                }
                (submission.unit_id, Some(submission_id))
            }
        };

        let unit = self.load_unit(&unit_id).await?;
        self.require_role(&unit.course_id, student_id, CourseRole::Student, "Not enrolled")
            .await?;
        let policy = WindowPolicy::for_unit(&unit)?;
        let keys = backend.answer_keys(&unit_id).await?;

        let mut tx = backend.begin(&unit_id, student_id).await?;
        let existing = tx.current().await?;
        if let Some(expected) = &expected_submission {
            if existing.as_ref().map(|submission| &submission.id) != Some(expected) {
                return Err(GradingError::NotFound("submission"));
            }
        }

        let now = self.now();
        check_submit(&policy, existing.as_ref(), now, self.inner.rules.enforce_exam_end_time)?;
        let pass = auto_grade(&keys, inputs, self.inner.rules.max_answers_per_submission)?;

        let mut submission = match existing {
            Some(submission) => submission,
            None => {
                let fresh = Submission {
                    id: Uuid::new_v4().to_string(),
                    unit_id: unit.id.clone(),
                    course_id: unit.course_id.clone(),
                    student_id: student_id.to_string(),
                    status: pass.status,
                    started_at: None,
                    submitted_at: Some(now),
                    grade: Some(pass.grade),
                    feedback: None,
                    created_at: now,
                    updated_at: now,
                };
                if !tx.insert_submission(&fresh).await? {
                    return Err(GradingError::AlreadyFinalized);
                }
                fresh
            }
        };

        submission.status = pass.status;
        submission.grade = Some(pass.grade);
        submission.submitted_at = Some(now);
        submission.updated_at = now;

        let answers: Vec<Answer> = pass
            .answers
            .into_iter()
            .map(|graded| Answer {
                id: Uuid::new_v4().to_string(),
                submission_id: submission.id.clone(),
                question_id: graded.question_id,
                text: graded.text,
                score: graded.score,
                created_at: now,
                updated_at: now,
            })
            .collect();

        tx.replace_answers(&submission.id, &answers).await?;
        tx.save_submission(&submission).await?;
        tx.commit().await?;

        metrics::counter!("grading_submissions_total", "status" => submission.status.as_str())
            .increment(1);
        tracing::info!(
            unit_id = %submission.unit_id,
            student_id,
            submission_id = %submission.id,
            status = submission.status.as_str(),
            grade = pass.grade,
            answers = answers.len(),
            "submission graded"
        );

        Ok(SubmissionView { submission, answers })
    }

    async fn override_locked(
        &self,
        submission_id: &str,
        teacher_id: &str,
        scores: Vec<ScoreInput>,
        feedback: Option<String>,
    ) -> Result<SubmissionView, GradingError> {
        let backend = &self.inner.backend;
        let located = backend
            .find_submission(submission_id)
            .await?
            .ok_or(GradingError::NotFound("submission"))?;
        let unit = self.load_unit(&located.unit_id).await?;
        self.require_role(
            &unit.course_id,
            teacher_id,
            CourseRole::Teacher,
            "Only the course teacher can grade submissions",
        )
        .await?;

        let points_by_question: HashMap<String, i32> = backend
            .answer_keys(&unit.id)
            .await?
            .into_iter()
            .map(|key| (key.question_id, key.points))
            .collect();

        let mut tx = backend.begin(&located.unit_id, &located.student_id).await?;
        let mut submission = tx
            .current()
            .await?
            .filter(|current| current.id == submission_id)
            .ok_or(GradingError::NotFound("submission"))?;
        let mut answers = tx.answers(&submission.id).await?;

        let now = self.now();
        let changed = apply_override(
            &mut submission,
            &mut answers,
            &points_by_question,
            &scores,
            feedback,
            now,
        )?;

        tx.update_answer_scores(&changed).await?;
        tx.save_submission(&submission).await?;
        tx.commit().await?;

        metrics::counter!("grading_overrides_total").increment(1);
        tracing::info!(
            submission_id,
            teacher_id,
            scored = changed.len(),
            skipped = scores.len().saturating_sub(changed.len()),
            grade = submission.grade.unwrap_or_default(),
            "grade override applied"
        );

        Ok(SubmissionView { submission, answers })
    }

    async fn load_unit(&self, unit_id: &str) -> Result<Unit, GradingError> {
        self.inner.backend.find_unit(unit_id).await?.ok_or(GradingError::NotFound("unit"))
    }

    async fn require_role(
        &self,
        course_id: &str,
        user_id: &str,
        role: CourseRole,
        message: &'static str,
    ) -> Result<(), GradingError> {
        if self.inner.backend.has_role(course_id, user_id, role).await? {
            Ok(())
        } else {
            Err(GradingError::Forbidden(message))
        }
    }
}

fn record_rejection(operation: &'static str, err: &GradingError, target: &str, actor: &str) {
    if let GradingError::Store(store) = err {
        tracing::error!(operation, target, actor, error = %store, "grading store failure");
    } else {
        tracing::warn!(operation, target, actor, reason = err.reason(), "grading operation rejected");
    }
    metrics::counter!(
        "grading_rejections_total",
        "operation" => operation,
        "reason" => err.reason()
    )
    .increment(1);
}
