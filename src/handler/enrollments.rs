use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    dtos::{
        EnrollmentListResponseDto, HeartbeatDto, HeartbeatResponseDto, ProgressResponseDto,
        ProgressUpdateDto,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    models::coursemodel::CourseId,
    service::progress_sync::PlaybackSample,
    AppState,
};

pub fn enrollments_handler() -> Router {
    Router::new()
        .route("/", get(get_enrollments))
        .route("/:course_id/progress", put(update_progress))
        .route("/:course_id/heartbeat", post(heartbeat))
}

pub async fn get_enrollments(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let enrollments = app_state.progress_hub.enrollments(user.user.id).await?;

    Ok(Json(EnrollmentListResponseDto {
        status: "success".to_string(),
        results: enrollments.len(),
        enrollments,
    }))
}

pub async fn update_progress(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(course_id): Path<String>,
    Json(body): Json<ProgressUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let update = body.into_update(CourseId::new(course_id), Utc::now());
    let confirmed = app_state.progress_hub.record(user.user.id, &update).await?;

    Ok(Json(ProgressResponseDto {
        status: "success".to_string(),
        data: confirmed,
    }))
}

pub async fn heartbeat(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(course_id): Path<String>,
    Json(body): Json<HeartbeatDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let sample = PlaybackSample {
        position_secs: body.position,
        duration_secs: body.duration,
    };
    let entry = app_state
        .progress_hub
        .heartbeat(user.user.id, &CourseId::new(course_id), sample, body.state)
        .await?;

    Ok(Json(HeartbeatResponseDto {
        status: "success".to_string(),
        data: entry,
    }))
}
