use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::{header, HeaderMap},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use validator::Validate;

use crate::{
    dtos::{
        CheckoutResponseDto, CourseListResponseDto, CoursePriceDto, CoursePriceResponseDto,
        PriceQueryDto,
    },
    error::HttpError,
    handler::referral::pending_referral_code,
    middleware::{auth, authenticate, JWTAuthMiddeware},
    models::coursemodel::CourseId,
    service::{
        pricing::attribution_code,
        purchase::{request_attribution, CheckoutRoute, SiteContext},
    },
    AppState,
};

pub fn courses_handler() -> Router {
    Router::new()
        .route("/", get(list_courses))
        .route("/:course_id/price", get(get_course_price))
        .route(
            "/:course_id/purchase",
            post(purchase_course).layer(middleware::from_fn(auth)),
        )
}

/// Storefront the request came in on. Proxies pass the public host along in
/// `X-Forwarded-Host`.
pub fn site_context(headers: &HeaderMap, main_domain: &str) -> SiteContext {
    headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|value| value.to_str().ok())
        .map(|host| SiteContext::from_host(host, main_domain))
        .unwrap_or(SiteContext::Main)
}

/// Partner whose price applies to this request.
async fn quote_attribution(
    app_state: &AppState,
    jar: &CookieJar,
    headers: &HeaderMap,
    query: &PriceQueryDto,
) -> Option<String> {
    // Anonymous visitors see prices too.
    let viewer = authenticate(jar, headers, app_state).await.ok();
    let site = site_context(headers, &app_state.env.main_domain);
    let pending = pending_referral_code(jar, app_state, Utc::now());

    request_attribution(
        viewer.as_ref(),
        &site,
        query.referral.as_deref(),
        pending.as_deref(),
    )
}

pub async fn list_courses(
    Extension(app_state): Extension<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(query): Query<PriceQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let code = quote_attribution(&app_state, &jar, &headers, &query).await;
    let priced = app_state.purchases.catalog(code.as_deref()).await?;

    let courses: Vec<CoursePriceDto> = priced
        .into_iter()
        .map(|(course, price)| CoursePriceDto::new(&course, price, code.clone()))
        .collect();

    Ok(Json(CourseListResponseDto {
        status: "success".to_string(),
        results: courses.len(),
        courses,
    }))
}

pub async fn get_course_price(
    Extension(app_state): Extension<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(course_id): Path<String>,
    Query(query): Query<PriceQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let course_id = CourseId::new(course_id);
    let code = quote_attribution(&app_state, &jar, &headers, &query).await;
    let (course, price) = app_state
        .purchases
        .quote_course(&course_id, code.as_deref())
        .await?;

    Ok(Json(CoursePriceResponseDto {
        status: "success".to_string(),
        data: CoursePriceDto::new(&course, price, code),
    }))
}

pub async fn purchase_course(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(course_id): Path<String>,
    Query(query): Query<PriceQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let course_id = CourseId::new(course_id);
    let site = site_context(&headers, &app_state.env.main_domain);
    let pending = pending_referral_code(&jar, &app_state, Utc::now());
    let referral = attribution_code(None, None, query.referral.as_deref(), pending.as_deref());

    let route = app_state
        .purchases
        .checkout(&user.user, &course_id, &site, referral.as_deref(), Utc::now())
        .await?;

    if let CheckoutRoute::Enrolled { sale } = &route {
        // The purchase is already committed; a stale live view heals on the next load.
        if let Err(e) = app_state.progress_hub.enrolled(user.user.id, &sale.course_id).await {
            tracing::warn!("Could not refresh enrollments for {}: {}", user.user.email, e);
        }
    }

    Ok(Json(CheckoutResponseDto {
        status: "success".to_string(),
        data: route,
    }))
}
