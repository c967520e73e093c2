use crate::db::models::Submission;

/// Serializes every writer for one (unit, student) pair until the
/// surrounding transaction ends. Also covers the not-yet-inserted case
/// that `FOR UPDATE` cannot lock.
pub(crate) async fn lock_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    unit_id: &str,
    student_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1), hashtext($2))")
        .bind(unit_id)
        .bind(student_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn insert_if_absent(
    executor: impl sqlx::PgExecutor<'_>,
    submission: &Submission,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO submissions (
            id, unit_id, course_id, student_id, status, started_at, submitted_at, grade,
            feedback, created_at, updated_at
         )
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
         ON CONFLICT (unit_id, student_id) DO NOTHING",
    )
    .bind(&submission.id)
    .bind(&submission.unit_id)
    .bind(&submission.course_id)
    .bind(&submission.student_id)
    .bind(submission.status)
    .bind(submission.started_at)
    .bind(submission.submitted_at)
    .bind(submission.grade)
    .bind(&submission.feedback)
    .bind(submission.created_at)
    .bind(submission.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn save(
    executor: impl sqlx::PgExecutor<'_>,
    submission: &Submission,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE submissions
         SET status = $1,
             submitted_at = $2,
             grade = $3,
             feedback = $4,
             updated_at = $5
         WHERE id = $6",
    )
    .bind(submission.status)
    .bind(submission.submitted_at)
    .bind(submission.grade)
    .bind(&submission.feedback)
    .bind(submission.updated_at)
    .bind(&submission.id)
    .execute(executor)
    .await?;
    Ok(())
}
