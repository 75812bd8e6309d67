use std::sync::Arc;

use axum::{
    extract::Path,
    response::{IntoResponse, Redirect},
    routing::get,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Utc};

use crate::{
    dtos::ReferralBrandingDto,
    service::referral::PENDING_REFERRAL_COOKIE,
    AppState,
};

pub fn referral_handler() -> Router {
    Router::new().route("/:code", get(get_referral))
}

/// `GET /r/:code`. Remembers the code for a later signup and sends the
/// visitor on to the landing page.
pub async fn capture_referral(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(code): Path<String>,
    jar: CookieJar,
) -> impl IntoResponse {
    let Some(pending) = app_state.referrals.capture(&code, Utc::now()) else {
        return (jar, Redirect::to(&app_state.env.app_url));
    };

    let cookie = Cookie::build((PENDING_REFERRAL_COOKIE, pending.encode()))
        .path("/")
        .max_age(time::Duration::days(app_state.env.pending_referral_max_age_days))
        .http_only(true)
        .build();

    let target = format!(
        "{}/?ref={}",
        app_state.env.app_url,
        urlencoding::encode(&pending.code)
    );
    (jar.add(cookie), Redirect::to(&target))
}

pub async fn get_referral(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    // Branding is cosmetic; a lookup failure shows the default site.
    let partner = app_state.referrals.resolve(&code).await.unwrap_or_else(|e| {
        tracing::warn!("Referral lookup for {} failed: {}", code, e);
        None
    });

    Json(ReferralBrandingDto {
        status: "success".to_string(),
        partner,
    })
}

/// Partner code from the visitor's pending referral cookie, if still fresh.
pub fn pending_referral_code(
    jar: &CookieJar,
    app_state: &AppState,
    now: DateTime<Utc>,
) -> Option<String> {
    let raw = jar.get(PENDING_REFERRAL_COOKIE)?;
    app_state
        .referrals
        .confirm_pending(raw.value(), now)
        .map(|pending| pending.code)
}

pub fn clear_pending_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build((PENDING_REFERRAL_COOKIE, "")).path("/").build())
}
