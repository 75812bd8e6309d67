use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Extension, Json, Router};

use crate::{
    dtos::{FilterUserDto, UserData, UserResponseDto},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn users_handler() -> Router {
    Router::new().route("/me", get(get_me))
}

pub async fn get_me(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let filtered_user = FilterUserDto::filter_user(&user.user, &app_state.env.app_url);

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData { user: filtered_user },
    }))
}
