use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    models::usermodel::{User, UserRole},
    service::referral::generate_referral_link,
};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(length(min = 1, message = "Full name is required"))]
    #[serde(rename = "fullName")]
    pub full_name: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 8, max = 20, message = "Mobile number is invalid"))]
    pub mobile: Option<String>,

    #[validate(
        length(min = 1, message = "Password is required"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub password: String,

    #[validate(
        length(min = 1, message = "Confirm Password is required"),
        must_match(other = "password", message = "passwords do not match")
    )]
    #[serde(rename = "passwordConfirm")]
    pub password_confirm: String,

    #[serde(default = "default_role")]
    pub role: UserRole,

    #[validate(length(max = 120, message = "Institute name is too long"))]
    #[serde(rename = "instituteName")]
    pub institute_name: Option<String>,

    // Typed in by the student; wins over a pending referral cookie.
    #[validate(length(max = 64, message = "Referral code is too long"))]
    #[serde(rename = "referralCode")]
    pub referral_code: Option<String>,
}

fn default_role() -> UserRole {
    UserRole::Student
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(length(min = 1, message = "Email is required"), email(message = "Email is invalid"))]
    pub email: String,
    #[validate(
        length(min = 1, message = "Password is required"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub mobile: Option<String>,
    #[serde(rename = "referralCode")]
    pub referral_code: Option<String>,
    // Partners only.
    #[serde(rename = "referralLink", skip_serializing_if = "Option::is_none")]
    pub referral_link: Option<String>,
    #[serde(rename = "instituteName")]
    pub institute_name: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User, app_url: &str) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            full_name: user.full_name.to_owned(),
            email: user.email.to_owned(),
            role: user.role.to_str().to_string(),
            mobile: user.mobile.clone(),
            referral_code: user.referral_code.clone(),
            referral_link: user
                .partner_code()
                .map(|code| generate_referral_link(app_url, code)),
            institute_name: user.institute_name.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserData {
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub data: UserData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponseDto {
    pub status: String,
    pub token: String,
}

#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}
