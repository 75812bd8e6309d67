use std::sync::Arc;

use axum::{
    middleware,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    dtos::{AnalyticsResponseDto, CreateListingDto, ListingListResponseDto, ListingResponseDto},
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn partner_handler() -> Router {
    Router::new()
        .route("/listings", get(get_listings).post(create_listing))
        .route("/analytics", get(get_analytics))
        .layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![UserRole::Partner])
        }))
}

pub async fn create_listing(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateListingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let listing = app_state
        .resell
        .create_listing(&user.user, &body.course_id, body.selling_amount())
        .await?;

    Ok(Json(ListingResponseDto {
        status: "success".to_string(),
        data: listing,
    }))
}

pub async fn get_listings(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let listings = app_state.resell.partner_listings(&user.user).await?;

    Ok(Json(ListingListResponseDto {
        status: "success".to_string(),
        results: listings.len(),
        listings,
    }))
}

pub async fn get_analytics(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let analytics = app_state.analytics.for_partner(&user.user).await?;

    Ok(Json(AnalyticsResponseDto {
        status: "success".to_string(),
        data: analytics,
    }))
}
