use time::PrimitiveDateTime;

use crate::db::models::Unit;
use crate::db::types::UnitKind;

pub(crate) const COLUMNS: &str = "\
    id, course_id, kind, title, description, due_date, start_time, end_time, \
    time_limit_minutes, created_by, created_at, updated_at";

pub(crate) struct CreateUnit<'a> {
    pub(crate) id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) kind: UnitKind,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) due_date: Option<PrimitiveDateTime>,
    pub(crate) start_time: Option<PrimitiveDateTime>,
    pub(crate) end_time: Option<PrimitiveDateTime>,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) created_by: &'a str,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    unit_id: &str,
) -> Result<Option<Unit>, sqlx::Error> {
    sqlx::query_as::<_, Unit>(&format!("SELECT {COLUMNS} FROM units WHERE id = $1"))
        .bind(unit_id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    unit_id: &str,
) -> Result<Option<Unit>, sqlx::Error> {
    sqlx::query_as::<_, Unit>(&format!("SELECT {COLUMNS} FROM units WHERE id = $1 FOR UPDATE"))
        .bind(unit_id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateUnit<'_>,
) -> Result<Unit, sqlx::Error> {
    sqlx::query_as::<_, Unit>(&format!(
        "INSERT INTO units (
            id, course_id, kind, title, description, due_date, start_time, end_time,
            time_limit_minutes, created_by, created_at, updated_at
         )
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$11)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.course_id)
    .bind(params.kind)
    .bind(params.title)
    .bind(params.description)
    .bind(params.due_date)
    .bind(params.start_time)
    .bind(params.end_time)
    .bind(params.time_limit_minutes)
    .bind(params.created_by)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

/// Writes the already-merged unit fields. Submissions are never touched.
pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    unit: &Unit,
) -> Result<Unit, sqlx::Error> {
    sqlx::query_as::<_, Unit>(&format!(
        "UPDATE units
         SET title = $1,
             description = $2,
             due_date = $3,
             start_time = $4,
             end_time = $5,
             time_limit_minutes = $6,
             updated_at = $7
         WHERE id = $8
         RETURNING {COLUMNS}"
    ))
    .bind(&unit.title)
    .bind(&unit.description)
    .bind(unit.due_date)
    .bind(unit.start_time)
    .bind(unit.end_time)
    .bind(unit.time_limit_minutes)
    .bind(unit.updated_at)
    .bind(&unit.id)
    .fetch_one(executor)
    .await
}
