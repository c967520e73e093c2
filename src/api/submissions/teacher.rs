use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::schemas::submission::{GradeRequest, SubmissionResponse};
use crate::services::grading::AggregateReport;

pub(super) async fn list_unit_submissions(
    Path(unit_id): Path<String>,
    CurrentUser(teacher_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let submissions = state.grading().list_unit_submissions(&unit_id, &teacher_id).await?;
    Ok(Json(submissions.into_iter().map(SubmissionResponse::from).collect()))
}

pub(super) async fn unit_grades(
    Path(unit_id): Path<String>,
    CurrentUser(teacher_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AggregateReport>, ApiError> {
    let report = state.grading().aggregate_status(&unit_id, &teacher_id).await?;
    Ok(Json(report))
}

pub(super) async fn grade_submission(
    Path(submission_id): Path<String>,
    CurrentUser(teacher_id): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<GradeRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let (scores, feedback) = payload.into_parts();
    let view =
        state.grading().override_grade(&submission_id, &teacher_id, scores, feedback).await?;
    Ok(Json(view.into()))
}
