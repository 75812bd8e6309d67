use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        auth::auth_handler,
        courses::courses_handler,
        enrollments::enrollments_handler,
        partner::partner_handler,
        referral::{capture_referral, referral_handler},
        users::users_handler,
    },
    middleware::auth,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest("/referral", referral_handler())
        .nest("/courses", courses_handler())
        .nest(
            "/users",
            users_handler()
                .layer(middleware::from_fn(auth))
        )
        .nest(
            "/enrollments",
            enrollments_handler()
                .layer(middleware::from_fn(auth))
        )
        .nest(
            "/partner",
            partner_handler()
                .layer(middleware::from_fn(auth))
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/r/:code", get(capture_referral))
        .nest("/api", api_route)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state))
}
