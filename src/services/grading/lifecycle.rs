//! Pure transitions of one learner's attempt. Callers own persistence and
//! must run each decision and its writes under the per-attempt lock.

use std::collections::{HashMap, HashSet};

use time::PrimitiveDateTime;

use crate::db::models::{Answer, Submission};
use crate::db::types::SubmissionStatus;
use crate::services::grading::error::GradingError;
use crate::services::grading::scoring::{clamp_score, score_text, AnswerKey};
use crate::services::grading::window::WindowPolicy;

#[derive(Debug, Clone)]
pub(crate) struct AnswerInput {
    pub(crate) question_id: String,
    pub(crate) text: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ScoreInput {
    pub(crate) answer_id: String,
    pub(crate) score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GradedAnswer {
    pub(crate) question_id: String,
    pub(crate) text: String,
    pub(crate) score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GradingPass {
    pub(crate) answers: Vec<GradedAnswer>,
    pub(crate) grade: f64,
    pub(crate) status: SubmissionStatus,
}

#[derive(Debug)]
pub(crate) enum StartDecision {
    Create,
    Resume(Submission),
}

pub(crate) fn decide_start(
    policy: &WindowPolicy,
    existing: Option<Submission>,
) -> Result<StartDecision, GradingError> {
    if !policy.has_attempt_state() {
        return Err(GradingError::NotApplicable);
    }

    match existing {
        None => Ok(StartDecision::Create),
        Some(submission) if submission.status == SubmissionStatus::Taking => {
            Ok(StartDecision::Resume(submission))
        }
        Some(_) => Err(GradingError::AlreadyFinalized),
    }
}

/// Preconditions for a submit, evaluated before anything is written.
pub(crate) fn check_submit(
    policy: &WindowPolicy,
    existing: Option<&Submission>,
    now: PrimitiveDateTime,
    enforce_end_time: bool,
) -> Result<(), GradingError> {
    if !policy.has_attempt_state() {
        if existing.is_some() {
            return Err(GradingError::AlreadyFinalized);
        }
        if !policy.is_open(now) {
            return Err(GradingError::WindowClosed);
        }
        return Ok(());
    }

    let submission = existing.ok_or(GradingError::NotFound("submission"))?;
    if submission.status != SubmissionStatus::Taking {
        return Err(GradingError::AlreadyFinalized);
    }
    if policy.has_expired(submission.started_at, now, enforce_end_time) {
        return Err(GradingError::WindowClosed);
    }
    Ok(())
}

/// Scores every answer against the unit's keys. Questions the learner left
/// out get no answer row and contribute nothing.
pub(crate) fn auto_grade(
    keys: &[AnswerKey],
    inputs: Vec<AnswerInput>,
    max_answers: usize,
) -> Result<GradingPass, GradingError> {
    if inputs.len() > max_answers {
        return Err(GradingError::InvalidAnswers(format!(
            "at most {max_answers} answers are accepted per submission"
        )));
    }

    let keys_by_id: HashMap<&str, &AnswerKey> =
        keys.iter().map(|key| (key.question_id.as_str(), key)).collect();
    let mut seen = HashSet::with_capacity(inputs.len());
    let mut answers = Vec::with_capacity(inputs.len());
    let mut grade = 0.0;
    let mut pending = false;

    for input in inputs {
        let key = keys_by_id.get(input.question_id.as_str()).ok_or_else(|| {
            GradingError::InvalidAnswers(format!(
                "question {} does not belong to this unit",
                input.question_id
            ))
        })?;
        if !seen.insert(input.question_id.clone()) {
            return Err(GradingError::InvalidAnswers(format!(
                "question {} answered more than once",
                input.question_id
            )));
        }

        let outcome = score_text(key, &input.text);
        pending |= outcome.needs_manual_review;
        grade += outcome.awarded.unwrap_or(0.0);
        answers.push(GradedAnswer {
            question_id: input.question_id,
            text: input.text,
            score: outcome.awarded,
        });
    }

    let status = if pending { SubmissionStatus::Submitted } else { SubmissionStatus::Graded };
    Ok(GradingPass { answers, grade, status })
}

/// Applies teacher scores on top of the stored ones. Returns the answers
/// whose score changed; unknown answer ids are skipped.
pub(crate) fn apply_override(
    submission: &mut Submission,
    answers: &mut [Answer],
    points_by_question: &HashMap<String, i32>,
    scores: &[ScoreInput],
    feedback: Option<String>,
    now: PrimitiveDateTime,
) -> Result<Vec<Answer>, GradingError> {
    if submission.status == SubmissionStatus::Taking {
        return Err(GradingError::NotSubmitted);
    }

    let mut touched: Vec<usize> = Vec::new();
    for input in scores {
        let Some(index) = answers.iter().position(|answer| answer.id == input.answer_id) else {
            continue;
        };
        let Some(points) = points_by_question.get(&answers[index].question_id) else {
            continue;
        };

        let answer = &mut answers[index];
        answer.score = Some(clamp_score(input.score, *points));
        answer.updated_at = now;
        if !touched.contains(&index) {
            touched.push(index);
        }
    }

    submission.grade = Some(answers.iter().filter_map(|answer| answer.score).sum::<f64>());
    submission.status = SubmissionStatus::Graded;
    if feedback.is_some() {
        submission.feedback = feedback;
    }
    submission.updated_at = now;

    Ok(touched.into_iter().map(|index| answers[index].clone()).collect())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use time::macros::datetime;
    use time::Duration;

    use super::*;
    use crate::db::types::QuestionType;

    const NOW: PrimitiveDateTime = datetime!(2025-03-01 10:00);

    fn submission(status: SubmissionStatus) -> Submission {
        Submission {
            id: "s1".to_string(),
            unit_id: "u1".to_string(),
            course_id: "c1".to_string(),
            student_id: "student".to_string(),
            status,
            started_at: Some(NOW),
            submitted_at: None,
            grade: None,
            feedback: None,
            created_at: NOW,
            updated_at: NOW,
        }
    }

    fn answer(id: &str, question_id: &str, score: Option<f64>) -> Answer {
        Answer {
            id: id.to_string(),
            submission_id: "s1".to_string(),
            question_id: question_id.to_string(),
            text: String::new(),
            score,
            created_at: NOW,
            updated_at: NOW,
        }
    }

    fn keys() -> Vec<AnswerKey> {
        vec![
            AnswerKey {
                question_id: "q1".to_string(),
                question_type: QuestionType::SingleChoice,
                points: 2,
                correct_answer: None,
                correct_choice_ids: BTreeSet::from(["7".to_string()]),
            },
            AnswerKey {
                question_id: "q2".to_string(),
                question_type: QuestionType::ShortAnswer,
                points: 3,
                correct_answer: None,
                correct_choice_ids: BTreeSet::new(),
            },
            AnswerKey {
                question_id: "q3".to_string(),
                question_type: QuestionType::TrueFalse,
                points: 1,
                correct_answer: Some("true".to_string()),
                correct_choice_ids: BTreeSet::new(),
            },
        ]
    }

    fn input(question_id: &str, text: &str) -> AnswerInput {
        AnswerInput { question_id: question_id.to_string(), text: text.to_string() }
    }

    fn exam() -> WindowPolicy {
        WindowPolicy::Timed { start: None, end: None, limit: Duration::minutes(30) }
    }

    #[test]
    fn start_is_rejected_for_assignments() {
        let policy = WindowPolicy::Deadline { due: None };
        assert!(matches!(decide_start(&policy, None), Err(GradingError::NotApplicable)));
    }

    #[test]
    fn start_resumes_taking_and_rejects_finished() {
        assert!(matches!(decide_start(&exam(), None), Ok(StartDecision::Create)));
        assert!(matches!(
            decide_start(&exam(), Some(submission(SubmissionStatus::Taking))),
            Ok(StartDecision::Resume(_))
        ));
        assert!(matches!(
            decide_start(&exam(), Some(submission(SubmissionStatus::Graded))),
            Err(GradingError::AlreadyFinalized)
        ));
    }

    #[test]
    fn assignment_submit_happens_once() {
        let policy = WindowPolicy::Deadline { due: Some(NOW) };
        assert!(check_submit(&policy, None, NOW, false).is_ok());
        let existing = submission(SubmissionStatus::Graded);
        assert!(matches!(
            check_submit(&policy, Some(&existing), NOW, false),
            Err(GradingError::AlreadyFinalized)
        ));
        assert!(matches!(
            check_submit(&policy, None, NOW + Duration::seconds(1), false),
            Err(GradingError::WindowClosed)
        ));
    }

    #[test]
    fn exam_submit_requires_taking_attempt() {
        assert!(matches!(
            check_submit(&exam(), None, NOW, false),
            Err(GradingError::NotFound("submission"))
        ));
        let done = submission(SubmissionStatus::Submitted);
        assert!(matches!(
            check_submit(&exam(), Some(&done), NOW, false),
            Err(GradingError::AlreadyFinalized)
        ));
        let taking = submission(SubmissionStatus::Taking);
        assert!(check_submit(&exam(), Some(&taking), NOW + Duration::minutes(30), false).is_ok());
        assert!(matches!(
            check_submit(&exam(), Some(&taking), NOW + Duration::minutes(31), false),
            Err(GradingError::WindowClosed)
        ));
    }

    #[test]
    fn auto_grade_sums_objective_scores_and_flags_pending() {
        let pass =
            auto_grade(&keys(), vec![input("q1", "7"), input("q2", "essay"), input("q3", "false")], 10)
                .expect("pass");
        assert_eq!(pass.grade, 2.0);
        assert_eq!(pass.status, SubmissionStatus::Submitted);
        assert_eq!(pass.answers[1].score, None);
        assert_eq!(pass.answers[2].score, Some(0.0));
    }

    #[test]
    fn auto_grade_without_short_answers_is_graded() {
        let pass = auto_grade(&keys(), vec![input("q1", "7"), input("q3", "true")], 10)
            .expect("pass");
        assert_eq!(pass.grade, 3.0);
        assert_eq!(pass.status, SubmissionStatus::Graded);
    }

    #[test]
    fn auto_grade_rejects_bad_answer_sets() {
        assert!(matches!(
            auto_grade(&keys(), vec![input("q1", "7"), input("q1", "8")], 10),
            Err(GradingError::InvalidAnswers(_))
        ));
        assert!(matches!(
            auto_grade(&keys(), vec![input("other", "7")], 10),
            Err(GradingError::InvalidAnswers(_))
        ));
        assert!(matches!(
            auto_grade(&keys(), vec![input("q1", "7"), input("q3", "true")], 1),
            Err(GradingError::InvalidAnswers(_))
        ));
    }

    #[test]
    fn override_preserves_untouched_scores_and_clamps() {
        let mut sub = submission(SubmissionStatus::Submitted);
        sub.feedback = Some("earlier".to_string());
        let mut answers = vec![answer("a1", "q1", Some(2.0)), answer("a2", "q2", None)];
        let points = HashMap::from([("q1".to_string(), 2), ("q2".to_string(), 3)]);
        let later = NOW + Duration::minutes(5);

        let changed = apply_override(
            &mut sub,
            &mut answers,
            &points,
            &[
                ScoreInput { answer_id: "a2".to_string(), score: 99.0 },
                ScoreInput { answer_id: "foreign".to_string(), score: 1.0 },
            ],
            None,
            later,
        )
        .expect("override");

        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].score, Some(3.0));
        assert_eq!(answers[0].score, Some(2.0));
        assert_eq!(sub.grade, Some(5.0));
        assert_eq!(sub.status, SubmissionStatus::Graded);
        assert_eq!(sub.feedback.as_deref(), Some("earlier"));
        assert_eq!(sub.updated_at, later);
    }

    #[test]
    fn override_rejects_attempt_in_progress() {
        let mut sub = submission(SubmissionStatus::Taking);
        let result = apply_override(&mut sub, &mut [], &HashMap::new(), &[], None, NOW);
        assert!(matches!(result, Err(GradingError::NotSubmitted)));
    }
}
