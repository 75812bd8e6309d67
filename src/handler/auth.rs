use std::sync::Arc;

use axum::{
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use validator::Validate;

use crate::{
    db::userdb::{NewUser, UserExt},
    dtos::{
        FilterUserDto, LoginUserDto, RegisterUserDto, Response, UserData, UserLoginResponseDto,
        UserResponseDto,
    },
    error::{ErrorMessage, HttpError},
    handler::referral::{clear_pending_cookie, pending_referral_code},
    models::usermodel::UserRole,
    utils::{password, token},
    AppState,
};

pub fn auth_handler() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

pub async fn register(
    Extension(app_state): Extension<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let email = body.email.trim().to_lowercase();
    let existing_user = app_state.db_client
        .get_user(None, Some(&email))
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    if existing_user.is_some() {
        return Err(HttpError::unique_constraint_violation(ErrorMessage::EmailExist.to_string()));
    }

    let is_partner = body.role == UserRole::Partner;
    let mobile = body.mobile.map(|m| m.trim().to_string()).filter(|m| !m.is_empty());
    if is_partner && mobile.is_none() {
        return Err(HttpError::bad_request("Partners must provide a mobile number"));
    }

    let hashed_password = password::hash(&body.password)
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    // Partners get their own code; students are attributed after the account exists.
    let referral_code = if is_partner {
        Some(app_state.referrals.allocate_partner_code().await?)
    } else {
        None
    };

    let user = app_state.db_client
        .save_user(NewUser {
            full_name: body.full_name.trim().to_string(),
            email,
            password: hashed_password,
            mobile,
            role: body.role,
            referral_code,
            institute_name: body.institute_name.filter(|name| !name.trim().is_empty()),
        })
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => {
                HttpError::unique_constraint_violation(ErrorMessage::EmailExist.to_string())
            }
            _ => HttpError::server_error(e.to_string()),
        })?;

    // A code typed into the form wins over one captured from a link.
    let attribution = if is_partner {
        None
    } else {
        body.referral_code
            .filter(|code| !code.trim().is_empty())
            .or_else(|| pending_referral_code(&jar, &app_state, Utc::now()))
    };

    let user = match attribution {
        Some(code) => match app_state.referrals.bind(&code, user.id).await {
            Ok(Some(bound)) => bound,
            Ok(None) => user,
            Err(e) => {
                tracing::warn!("Could not attribute {} to referral {}: {}", user.email, code, e);
                user
            }
        },
        None => user,
    };

    tracing::info!("Registered {} as {}", user.email, user.role.to_str());

    let filtered_user = FilterUserDto::filter_user(&user, &app_state.env.app_url);

    Ok((
        clear_pending_cookie(jar),
        Json(UserResponseDto {
            status: "success".to_string(),
            data: UserData { user: filtered_user },
        }),
    ))
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let result = app_state.db_client
        .get_user(None, Some(&body.email.trim().to_lowercase()))
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let user = result.ok_or(HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()))?;

    let password_matched = password::compare(&body.password, &user.password)
        .map_err(|_| HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()))?;

    if !password_matched {
        return Err(HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()));
    }

    let token = token::create_token(
        &user.id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| HttpError::server_error(e.to_string()))?;

    let cookie_duration = time::Duration::minutes(app_state.env.jwt_maxage);
    let cookie = Cookie::build(("token", token.clone()))
        .path("/")
        .max_age(cookie_duration)
        .http_only(true)
        .build();

    Ok((
        jar.add(cookie),
        Json(UserLoginResponseDto {
            status: "success".to_string(),
            token,
        }),
    ))
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let cookie = Cookie::build(("token", "")).path("/").build();
    (
        jar.remove(cookie),
        Json(Response {
            status: "success",
            message: "Logged out".to_string(),
        }),
    )
}
