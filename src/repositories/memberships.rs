use crate::db::types::CourseRole;

pub(crate) async fn has_role(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
    user_id: &str,
    role: CourseRole,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
            SELECT 1 FROM course_memberships
            WHERE course_id = $1 AND user_id = $2 AND role = $3
         )",
    )
    .bind(course_id)
    .bind(user_id)
    .bind(role)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_students(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT user_id
         FROM course_memberships
         WHERE course_id = $1 AND role = $2
         ORDER BY joined_at, user_id",
    )
    .bind(course_id)
    .bind(CourseRole::Student)
    .fetch_all(executor)
    .await
}
