use crate::db::models::Submission;

use super::types::COLUMNS;

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(submission_id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_for_student(
    executor: impl sqlx::PgExecutor<'_>,
    unit_id: &str,
    student_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS}
         FROM submissions
         WHERE unit_id = $1 AND student_id = $2"
    ))
    .bind(unit_id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

/// Row lock on the attempt; the caller must already hold `lock_attempt`.
pub(crate) async fn find_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    unit_id: &str,
    student_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS}
         FROM submissions
         WHERE unit_id = $1 AND student_id = $2
         FOR UPDATE"
    ))
    .bind(unit_id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_by_unit(
    executor: impl sqlx::PgExecutor<'_>,
    unit_id: &str,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS}
         FROM submissions
         WHERE unit_id = $1
         ORDER BY created_at, id"
    ))
    .bind(unit_id)
    .fetch_all(executor)
    .await
}
