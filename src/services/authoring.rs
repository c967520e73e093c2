//! Teacher-side unit authoring. Edits upsert questions and choices by id and
//! never delete them; `remove_question` is the only destructive path.

use std::collections::HashMap;

use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::{Choice, Question, Unit};
use crate::db::types::{CourseRole, QuestionType, SubmissionStatus, UnitKind};
use crate::repositories::{answers, memberships, questions, submissions, units};
use crate::services::grading::{validate_window, GradingError, WindowPolicy};

#[derive(Debug, Clone)]
pub(crate) struct ChoiceDraft {
    pub(crate) id: Option<String>,
    pub(crate) text: String,
    pub(crate) is_correct: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct QuestionDraft {
    pub(crate) id: Option<String>,
    pub(crate) question_type: QuestionType,
    pub(crate) text: String,
    pub(crate) points: i32,
    pub(crate) correct_answer: Option<String>,
    pub(crate) order_index: Option<i32>,
    pub(crate) choices: Vec<ChoiceDraft>,
}

#[derive(Debug, Clone)]
pub(crate) struct UnitDraft {
    pub(crate) kind: UnitKind,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) due_date: Option<PrimitiveDateTime>,
    pub(crate) start_time: Option<PrimitiveDateTime>,
    pub(crate) end_time: Option<PrimitiveDateTime>,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) questions: Vec<QuestionDraft>,
}

/// Fields left `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub(crate) struct UnitPatch {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) due_date: Option<PrimitiveDateTime>,
    pub(crate) start_time: Option<PrimitiveDateTime>,
    pub(crate) end_time: Option<PrimitiveDateTime>,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) questions: Vec<QuestionDraft>,
}

#[derive(Debug, Clone)]
pub(crate) struct QuestionDetail {
    pub(crate) question: Question,
    pub(crate) choices: Vec<Choice>,
}

#[derive(Debug, Clone)]
pub(crate) struct UnitDetail {
    pub(crate) unit: Unit,
    pub(crate) questions: Vec<QuestionDetail>,
    pub(crate) reveal_answers: bool,
    pub(crate) is_available: bool,
}

/// A question after merging a draft over what is stored, ready to write.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlannedQuestion {
    pub(crate) id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) text: String,
    pub(crate) points: i32,
    pub(crate) correct_answer: Option<String>,
    pub(crate) order_index: i32,
    pub(crate) choices: Vec<PlannedChoice>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlannedChoice {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) is_correct: bool,
    pub(crate) order_index: i32,
    /// Already stored and not mentioned by the draft.
    pub(crate) untouched: bool,
}

/// Merges `draft` over `existing`. Ids that are absent or not owned by the
/// target get a fresh id, so an edit can never reach into another unit.
pub(crate) fn plan_question(
    draft: &QuestionDraft,
    existing: Option<&QuestionDetail>,
    default_order: i32,
) -> PlannedQuestion {
    let id = existing.map(|detail| detail.question.id.clone()).unwrap_or_else(new_id);
    let stored_choices: &[Choice] = existing.map(|detail| detail.choices.as_slice()).unwrap_or(&[]);

    let mut choices: Vec<PlannedChoice> = stored_choices
        .iter()
        .map(|choice| PlannedChoice {
            id: choice.id.clone(),
            text: choice.text.clone(),
            is_correct: choice.is_correct,
            order_index: choice.order_index,
            untouched: true,
        })
        .collect();

    let mut next_order = choices.iter().map(|choice| choice.order_index + 1).max().unwrap_or(0);
    for choice in &draft.choices {
        let slot = choice
            .id
            .as_deref()
            .and_then(|id| choices.iter_mut().find(|planned| planned.id == id));
        match slot {
            Some(planned) => {
                planned.text = choice.text.clone();
                planned.is_correct = choice.is_correct;
                planned.untouched = false;
            }
            None => {
                choices.push(PlannedChoice {
                    id: new_id(),
                    text: choice.text.clone(),
                    is_correct: choice.is_correct,
                    order_index: next_order,
                    untouched: false,
                });
                next_order += 1;
            }
        }
    }

    PlannedQuestion {
        id,
        question_type: draft.question_type,
        text: draft.text.clone(),
        points: draft.points,
        correct_answer: draft.correct_answer.clone(),
        order_index: draft
            .order_index
            .or_else(|| existing.map(|detail| detail.question.order_index))
            .unwrap_or(default_order),
        choices,
    }
}

pub(crate) fn validate_question(question: &PlannedQuestion) -> Result<(), GradingError> {
    let invalid = |message: &str| Err(GradingError::Validation(message.to_string()));

    if question.text.trim().is_empty() {
        return invalid("question text must not be empty");
    }
    if question.points < 0 {
        return invalid("question points must not be negative");
    }

    let correct = question.choices.iter().filter(|choice| choice.is_correct).count();
    match question.question_type {
        QuestionType::SingleChoice | QuestionType::MultipleChoice => {
            if question.choices.is_empty() {
                return invalid("choice questions need at least one choice");
            }
            if question.correct_answer.is_some() {
                return invalid("choice questions are keyed by their correct choices");
            }
            if question.question_type == QuestionType::SingleChoice && correct != 1 {
                return invalid("single_choice questions need exactly one correct choice");
            }
            if question.question_type == QuestionType::MultipleChoice && correct == 0 {
                return invalid("multiple_choice questions need at least one correct choice");
            }
        }
        QuestionType::TrueFalse | QuestionType::FillBlank | QuestionType::ShortAnswer => {
            if !question.choices.is_empty() {
                return invalid("only choice questions may have choices");
            }
            let has_literal =
                question.correct_answer.as_deref().is_some_and(|answer| !answer.is_empty());
            if question.question_type.uses_literal() && !has_literal {
                return invalid("true_false and fill_blank questions need a correct_answer");
            }
        }
    }
    Ok(())
}

pub(crate) async fn create_unit(
    pool: &PgPool,
    course_id: &str,
    teacher_id: &str,
    draft: UnitDraft,
    now: PrimitiveDateTime,
) -> Result<UnitDetail, GradingError> {
    require_teacher(pool, course_id, teacher_id).await?;
    validate_window(
        draft.kind,
        draft.due_date,
        draft.start_time,
        draft.end_time,
        draft.time_limit_minutes,
    )?;

    let planned = draft
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let planned = plan_question(question, None, index as i32);
            validate_question(&planned).map(|_| planned)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let unit_id = new_id();
    let mut tx = pool.begin().await?;
    let unit = units::create(
        &mut *tx,
        units::CreateUnit {
            id: &unit_id,
            course_id,
            kind: draft.kind,
            title: &draft.title,
            description: draft.description.as_deref(),
            due_date: draft.due_date,
            start_time: draft.start_time,
            end_time: draft.end_time,
            time_limit_minutes: draft.time_limit_minutes,
            created_by: teacher_id,
            now,
        },
    )
    .await?;
    for question in &planned {
        write_question(&mut tx, &unit.id, question, now).await?;
    }
    tx.commit().await?;

    tracing::info!(
        unit_id = %unit.id,
        course_id,
        teacher_id,
        kind = ?unit.kind,
        questions = planned.len(),
        "unit created"
    );

    load_detail(pool, unit, true, now).await
}

pub(crate) async fn update_unit(
    pool: &PgPool,
    unit_id: &str,
    teacher_id: &str,
    patch: UnitPatch,
    now: PrimitiveDateTime,
) -> Result<UnitDetail, GradingError> {
    let stored = units::find_by_id(pool, unit_id).await?.ok_or(GradingError::NotFound("unit"))?;
    require_teacher(pool, &stored.course_id, teacher_id).await?;

    let mut tx = pool.begin().await?;
    let mut unit =
        units::find_for_update(&mut *tx, unit_id).await?.ok_or(GradingError::NotFound("unit"))?;
    apply_patch(&mut unit, &patch, now);
    validate_window(unit.kind, unit.due_date, unit.start_time, unit.end_time, unit.time_limit_minutes)?;

    let existing = load_questions(&mut tx, unit_id).await?;
    let by_id: HashMap<&str, &QuestionDetail> =
        existing.iter().map(|detail| (detail.question.id.as_str(), detail)).collect();
    let mut next_order = existing
        .iter()
        .map(|detail| detail.question.order_index + 1)
        .max()
        .unwrap_or(0);

    let mut planned = Vec::with_capacity(patch.questions.len());
    for draft in &patch.questions {
        let current = draft.id.as_deref().and_then(|id| by_id.get(id).copied());
        let question = plan_question(draft, current, next_order);
        if current.is_none() {
            next_order += 1;
        }
        validate_question(&question)?;
        planned.push(question);
    }

    let unit = units::update(&mut *tx, &unit).await?;
    for question in &planned {
        write_question(&mut tx, &unit.id, question, now).await?;
    }
    tx.commit().await?;

    tracing::info!(unit_id, teacher_id, questions = planned.len(), "unit updated");

    load_detail(pool, unit, true, now).await
}

pub(crate) async fn remove_question(
    pool: &PgPool,
    unit_id: &str,
    question_id: &str,
    teacher_id: &str,
) -> Result<(), GradingError> {
    let unit = units::find_by_id(pool, unit_id).await?.ok_or(GradingError::NotFound("unit"))?;
    require_teacher(pool, &unit.course_id, teacher_id).await?;

    questions::find_in_unit(pool, unit_id, question_id)
        .await?
        .ok_or(GradingError::NotFound("question"))?;
    if answers::exists_for_question(pool, question_id).await? {
        return Err(answered_question_error());
    }

    match questions::delete(pool, unit_id, question_id).await {
        Ok(_) => {}
        Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
            return Err(answered_question_error());
        }
        Err(err) => return Err(err.into()),
    }

    tracing::info!(unit_id, question_id, teacher_id, "question removed");
    Ok(())
}

/// Teachers always see the answer key; students only after their own
/// submission is graded.
pub(crate) async fn get_unit(
    pool: &PgPool,
    unit_id: &str,
    viewer_id: &str,
    now: PrimitiveDateTime,
) -> Result<UnitDetail, GradingError> {
    let unit = units::find_by_id(pool, unit_id).await?.ok_or(GradingError::NotFound("unit"))?;

    let reveal_answers =
        if memberships::has_role(pool, &unit.course_id, viewer_id, CourseRole::Teacher).await? {
            true
        } else if memberships::has_role(pool, &unit.course_id, viewer_id, CourseRole::Student)
            .await?
        {
            submissions::find_for_student(pool, unit_id, viewer_id)
                .await?
                .is_some_and(|submission| submission.status == SubmissionStatus::Graded)
        } else {
            return Err(GradingError::Forbidden("Not a member of this course"));
        };

    load_detail(pool, unit, reveal_answers, now).await
}

fn apply_patch(unit: &mut Unit, patch: &UnitPatch, now: PrimitiveDateTime) {
    if let Some(title) = &patch.title {
        unit.title = title.clone();
    }
    if let Some(description) = &patch.description {
        unit.description = Some(description.clone());
    }
    if patch.due_date.is_some() {
        unit.due_date = patch.due_date;
    }
    if patch.start_time.is_some() {
        unit.start_time = patch.start_time;
    }
    if patch.end_time.is_some() {
        unit.end_time = patch.end_time;
    }
    if patch.time_limit_minutes.is_some() {
        unit.time_limit_minutes = patch.time_limit_minutes;
    }
    unit.updated_at = now;
}

async fn write_question(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    unit_id: &str,
    question: &PlannedQuestion,
    now: PrimitiveDateTime,
) -> Result<(), GradingError> {
    questions::upsert(
        &mut **tx,
        questions::UpsertQuestion {
            id: &question.id,
            unit_id,
            text: &question.text,
            question_type: question.question_type,
            points: question.points,
            correct_answer: question.correct_answer.as_deref(),
            order_index: question.order_index,
            now,
        },
    )
    .await?
    .ok_or(GradingError::NotFound("question"))?;

    for choice in question.choices.iter().filter(|choice| !choice.untouched) {
        questions::upsert_choice(
            &mut **tx,
            questions::UpsertChoice {
                id: &choice.id,
                question_id: &question.id,
                text: &choice.text,
                is_correct: choice.is_correct,
                order_index: choice.order_index,
            },
        )
        .await?
        .ok_or(GradingError::NotFound("choice"))?;
    }
    Ok(())
}

async fn load_questions(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    unit_id: &str,
) -> Result<Vec<QuestionDetail>, GradingError> {
    let stored = questions::list_by_unit(&mut **tx, unit_id).await?;
    let mut details = Vec::with_capacity(stored.len());
    for question in stored {
        let choices = questions::list_choices_by_question(&mut **tx, &question.id).await?;
        details.push(QuestionDetail { question, choices });
    }
    Ok(details)
}

async fn load_detail(
    pool: &PgPool,
    unit: Unit,
    reveal_answers: bool,
    now: PrimitiveDateTime,
) -> Result<UnitDetail, GradingError> {
    let stored = questions::list_by_unit(pool, &unit.id).await?;
    let mut choices_by_question: HashMap<String, Vec<Choice>> = HashMap::new();
    for choice in questions::list_choices_by_unit(pool, &unit.id).await? {
        choices_by_question.entry(choice.question_id.clone()).or_default().push(choice);
    }

    let questions = stored
        .into_iter()
        .map(|question| QuestionDetail {
            choices: choices_by_question.remove(&question.id).unwrap_or_default(),
            question,
        })
        .collect();
    let is_available = WindowPolicy::for_unit(&unit)?.is_available(now);

    Ok(UnitDetail { unit, questions, reveal_answers, is_available })
}

async fn require_teacher(
    pool: &PgPool,
    course_id: &str,
    user_id: &str,
) -> Result<(), GradingError> {
    if memberships::has_role(pool, course_id, user_id, CourseRole::Teacher).await? {
        Ok(())
    } else {
        Err(GradingError::Forbidden("Only the course teacher can edit units"))
    }
}

fn answered_question_error() -> GradingError {
    GradingError::Validation("question already has answers and cannot be removed".to_string())
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    const NOW: PrimitiveDateTime = datetime!(2025-03-01 10:00);

    fn choice(id: Option<&str>, text: &str, is_correct: bool) -> ChoiceDraft {
        ChoiceDraft { id: id.map(str::to_string), text: text.to_string(), is_correct }
    }

    fn draft(question_type: QuestionType, choices: Vec<ChoiceDraft>) -> QuestionDraft {
        QuestionDraft {
            id: None,
            question_type,
            text: "What?".to_string(),
            points: 2,
            correct_answer: None,
            order_index: None,
            choices,
        }
    }

    fn stored_detail() -> QuestionDetail {
        QuestionDetail {
            question: Question {
                id: "q1".to_string(),
                unit_id: "u1".to_string(),
                text: "Old".to_string(),
                question_type: QuestionType::SingleChoice,
                points: 1,
                correct_answer: None,
                order_index: 4,
                created_at: NOW,
                updated_at: NOW,
            },
            choices: vec![
                Choice {
                    id: "c1".to_string(),
                    question_id: "q1".to_string(),
                    text: "A".to_string(),
                    is_correct: true,
                    order_index: 0,
                },
                Choice {
                    id: "c2".to_string(),
                    question_id: "q1".to_string(),
                    text: "B".to_string(),
                    is_correct: false,
                    order_index: 1,
                },
            ],
        }
    }

    #[test]
    fn plan_keeps_unmentioned_choices() {
        let existing = stored_detail();
        let mut patch = draft(QuestionType::SingleChoice, vec![choice(Some("c2"), "B!", false)]);
        patch.id = Some("q1".to_string());

        let planned = plan_question(&patch, Some(&existing), 0);
        assert_eq!(planned.id, "q1");
        assert_eq!(planned.order_index, 4);
        assert_eq!(planned.choices.len(), 2);
        assert!(planned.choices[0].untouched);
        assert_eq!(planned.choices[1].text, "B!");
        assert!(!planned.choices[1].untouched);
        assert!(validate_question(&planned).is_ok());
    }

    #[test]
    fn plan_assigns_fresh_ids_to_unknown_choices() {
        let existing = stored_detail();
        let patch = draft(QuestionType::SingleChoice, vec![choice(Some("foreign"), "C", false)]);

        let planned = plan_question(&patch, Some(&existing), 0);
        assert_eq!(planned.choices.len(), 3);
        assert_ne!(planned.choices[2].id, "foreign");
        assert_eq!(planned.choices[2].order_index, 2);
    }

    #[test]
    fn merged_state_is_validated() {
        let existing = stored_detail();
        let patch = draft(QuestionType::SingleChoice, vec![choice(None, "C", true)]);
        let planned = plan_question(&patch, Some(&existing), 0);
        assert!(matches!(validate_question(&planned), Err(GradingError::Validation(_))));
    }

    #[test]
    fn choice_rules() {
        let none_correct = plan_question(
            &draft(QuestionType::MultipleChoice, vec![choice(None, "A", false)]),
            None,
            0,
        );
        assert!(validate_question(&none_correct).is_err());

        let two_correct = plan_question(
            &draft(
                QuestionType::MultipleChoice,
                vec![choice(None, "A", true), choice(None, "B", true)],
            ),
            None,
            0,
        );
        assert!(validate_question(&two_correct).is_ok());

        let single_two_correct = PlannedQuestion {
            question_type: QuestionType::SingleChoice,
            ..two_correct.clone()
        };
        assert!(validate_question(&single_two_correct).is_err());

        let no_choices = plan_question(&draft(QuestionType::SingleChoice, vec![]), None, 0);
        assert!(validate_question(&no_choices).is_err());
    }

    #[test]
    fn literal_rules() {
        let mut fill = draft(QuestionType::FillBlank, vec![]);
        assert!(validate_question(&plan_question(&fill, None, 0)).is_err());
        fill.correct_answer = Some("Paris".to_string());
        assert!(validate_question(&plan_question(&fill, None, 0)).is_ok());

        let with_choices = draft(QuestionType::TrueFalse, vec![choice(None, "true", true)]);
        assert!(validate_question(&plan_question(&with_choices, None, 0)).is_err());

        let short = draft(QuestionType::ShortAnswer, vec![]);
        assert!(validate_question(&plan_question(&short, None, 0)).is_ok());
    }

    #[test]
    fn patch_only_overwrites_present_fields() {
        let mut unit = Unit {
            id: "u1".to_string(),
            course_id: "c1".to_string(),
            kind: UnitKind::Exam,
            title: "Midterm".to_string(),
            description: Some("Chapters 1-3".to_string()),
            due_date: None,
            start_time: Some(datetime!(2025-03-02 09:00)),
            end_time: Some(datetime!(2025-03-02 12:00)),
            time_limit_minutes: Some(60),
            created_by: "t1".to_string(),
            created_at: NOW,
            updated_at: NOW,
        };
        let later = datetime!(2025-03-01 11:00);
        let patch = UnitPatch { time_limit_minutes: Some(90), ..UnitPatch::default() };

        apply_patch(&mut unit, &patch, later);
        assert_eq!(unit.title, "Midterm");
        assert_eq!(unit.time_limit_minutes, Some(90));
        assert_eq!(unit.end_time, Some(datetime!(2025-03-02 12:00)));
        assert_eq!(unit.updated_at, later);
    }
}
