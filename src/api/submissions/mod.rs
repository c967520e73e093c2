mod student;
mod teacher;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::schemas::submission::SubmissionResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        // Student endpoints
        .route("/units/:unit_id/start", post(student::start_attempt))
        .route("/units/:unit_id/submit", post(student::submit_for_unit))
        .route("/submissions/:submission_id/submit", post(student::submit_attempt))
        // Teacher endpoints
        .route("/units/:unit_id/submissions", get(teacher::list_unit_submissions))
        .route("/units/:unit_id/grades", get(teacher::unit_grades))
        .route("/submissions/:submission_id/grade", post(teacher::grade_submission))
        // Owner or course teacher
        .route("/submissions/:submission_id", get(get_submission))
}

async fn get_submission(
    Path(submission_id): Path<String>,
    CurrentUser(user_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let view = state.grading().get_submission(&submission_id, &user_id).await?;
    Ok(Json(view.into()))
}
