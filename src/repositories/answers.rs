use sqlx::{Postgres, QueryBuilder};

use crate::db::models::Answer;

const COLUMNS: &str = "id, submission_id, question_id, text, score, created_at, updated_at";

pub(crate) async fn list_by_submission(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: &str,
) -> Result<Vec<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(
        "SELECT a.id, a.submission_id, a.question_id, a.text, a.score, a.created_at, a.updated_at
         FROM answers a
         JOIN questions q ON q.id = a.question_id
         WHERE a.submission_id = $1
         ORDER BY q.order_index, a.id",
    )
    .bind(submission_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn delete_by_submission(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM answers WHERE submission_id = $1")
        .bind(submission_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn insert_many(
    executor: impl sqlx::PgExecutor<'_>,
    answers: &[Answer],
) -> Result<(), sqlx::Error> {
    if answers.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<'_, Postgres> =
        QueryBuilder::new(format!("INSERT INTO answers ({COLUMNS}) "));
    builder.push_values(answers, |mut row, answer| {
        row.push_bind(&answer.id)
            .push_bind(&answer.submission_id)
            .push_bind(&answer.question_id)
            .push_bind(&answer.text)
            .push_bind(answer.score)
            .push_bind(answer.created_at)
            .push_bind(answer.updated_at);
    });
    builder.build().execute(executor).await?;
    Ok(())
}

pub(crate) async fn update_score(
    executor: impl sqlx::PgExecutor<'_>,
    answer: &Answer,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE answers SET score = $1, updated_at = $2 WHERE id = $3 AND submission_id = $4")
        .bind(answer.score)
        .bind(answer.updated_at)
        .bind(&answer.id)
        .bind(&answer.submission_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn exists_for_question(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM answers WHERE question_id = $1)")
        .bind(question_id)
        .fetch_one(executor)
        .await
}
