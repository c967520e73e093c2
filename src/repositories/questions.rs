use time::PrimitiveDateTime;

use crate::db::models::{Choice, Question};
use crate::db::types::QuestionType;

const QUESTION_COLUMNS: &str = "\
    id, unit_id, text, question_type, points, correct_answer, order_index, created_at, updated_at";

const CHOICE_COLUMNS: &str = "id, question_id, text, is_correct, order_index";

pub(crate) struct UpsertQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) unit_id: &'a str,
    pub(crate) text: &'a str,
    pub(crate) question_type: QuestionType,
    pub(crate) points: i32,
    pub(crate) correct_answer: Option<&'a str>,
    pub(crate) order_index: i32,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) struct UpsertChoice<'a> {
    pub(crate) id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) text: &'a str,
    pub(crate) is_correct: bool,
    pub(crate) order_index: i32,
}

pub(crate) async fn list_by_unit(
    executor: impl sqlx::PgExecutor<'_>,
    unit_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS}
         FROM questions
         WHERE unit_id = $1
         ORDER BY order_index, created_at, id"
    ))
    .bind(unit_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_choices_by_unit(
    executor: impl sqlx::PgExecutor<'_>,
    unit_id: &str,
) -> Result<Vec<Choice>, sqlx::Error> {
    sqlx::query_as::<_, Choice>(
        "SELECT c.id, c.question_id, c.text, c.is_correct, c.order_index
         FROM choices c
         JOIN questions q ON q.id = c.question_id
         WHERE q.unit_id = $1
         ORDER BY c.question_id, c.order_index, c.id",
    )
    .bind(unit_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_choices_by_question(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: &str,
) -> Result<Vec<Choice>, sqlx::Error> {
    sqlx::query_as::<_, Choice>(&format!(
        "SELECT {CHOICE_COLUMNS}
         FROM choices
         WHERE question_id = $1
         ORDER BY order_index, id"
    ))
    .bind(question_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn find_in_unit(
    executor: impl sqlx::PgExecutor<'_>,
    unit_id: &str,
    question_id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE unit_id = $1 AND id = $2"
    ))
    .bind(unit_id)
    .bind(question_id)
    .fetch_optional(executor)
    .await
}

/// Inserts or updates by id. A question id owned by another unit is left
/// alone and reported as `None`.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertQuestion<'_>,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (
            id, unit_id, text, question_type, points, correct_answer, order_index,
            created_at, updated_at
         )
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$8)
         ON CONFLICT (id) DO UPDATE
         SET text = EXCLUDED.text,
             question_type = EXCLUDED.question_type,
             points = EXCLUDED.points,
             correct_answer = EXCLUDED.correct_answer,
             order_index = EXCLUDED.order_index,
             updated_at = EXCLUDED.updated_at
         WHERE questions.unit_id = EXCLUDED.unit_id
         RETURNING {QUESTION_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.unit_id)
    .bind(params.text)
    .bind(params.question_type)
    .bind(params.points)
    .bind(params.correct_answer)
    .bind(params.order_index)
    .bind(params.now)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn upsert_choice(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertChoice<'_>,
) -> Result<Option<Choice>, sqlx::Error> {
    sqlx::query_as::<_, Choice>(&format!(
        "INSERT INTO choices (id, question_id, text, is_correct, order_index)
         VALUES ($1,$2,$3,$4,$5)
         ON CONFLICT (id) DO UPDATE
         SET text = EXCLUDED.text,
             is_correct = EXCLUDED.is_correct,
             order_index = EXCLUDED.order_index
         WHERE choices.question_id = EXCLUDED.question_id
         RETURNING {CHOICE_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.question_id)
    .bind(params.text)
    .bind(params.is_correct)
    .bind(params.order_index)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn delete(
    executor: impl sqlx::PgExecutor<'_>,
    unit_id: &str,
    question_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM questions WHERE unit_id = $1 AND id = $2")
        .bind(unit_id)
        .bind(question_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
