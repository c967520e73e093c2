use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::schemas::unit::{UnitCreate, UnitResponse, UnitUpdate};
use crate::services::authoring;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/courses/:course_id/units", post(create_unit))
        .route("/units/:unit_id", get(get_unit).patch(update_unit))
        .route("/units/:unit_id/questions/:question_id", delete(remove_question))
}

async fn create_unit(
    Path(course_id): Path<String>,
    CurrentUser(teacher_id): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<UnitCreate>,
) -> Result<(StatusCode, Json<UnitResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let now = state.grading().now();
    let detail =
        authoring::create_unit(state.db(), &course_id, &teacher_id, payload.into(), now).await?;

    Ok((StatusCode::CREATED, Json(detail.into())))
}

async fn get_unit(
    Path(unit_id): Path<String>,
    CurrentUser(user_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<UnitResponse>, ApiError> {
    let now = state.grading().now();
    let detail = authoring::get_unit(state.db(), &unit_id, &user_id, now).await?;
    Ok(Json(detail.into()))
}

async fn update_unit(
    Path(unit_id): Path<String>,
    CurrentUser(teacher_id): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<UnitUpdate>,
) -> Result<Json<UnitResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let now = state.grading().now();
    let detail =
        authoring::update_unit(state.db(), &unit_id, &teacher_id, payload.into(), now).await?;
    Ok(Json(detail.into()))
}

async fn remove_question(
    Path((unit_id, question_id)): Path<(String, String)>,
    CurrentUser(teacher_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    authoring::remove_question(state.db(), &unit_id, &question_id, &teacher_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
