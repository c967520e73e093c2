use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::schemas::submission::{SubmissionResponse, SubmitRequest};
use crate::services::grading::AttemptRef;

pub(super) async fn start_attempt(
    Path(unit_id): Path<String>,
    CurrentUser(student_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let submission = state.grading().start_attempt(&unit_id, &student_id).await?;
    Ok(Json(submission.into()))
}

pub(super) async fn submit_for_unit(
    Path(unit_id): Path<String>,
    CurrentUser(student_id): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmitRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    submit(&state, AttemptRef::Unit(unit_id), &student_id, payload).await
}

pub(super) async fn submit_attempt(
    Path(submission_id): Path<String>,
    CurrentUser(student_id): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmitRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    submit(&state, AttemptRef::Submission(submission_id), &student_id, payload).await
}

async fn submit(
    state: &AppState,
    attempt: AttemptRef,
    student_id: &str,
    payload: SubmitRequest,
) -> Result<Json<SubmissionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let view = state.grading().submit(attempt, student_id, payload.into_inputs()).await?;
    Ok(Json(view.into()))
}
