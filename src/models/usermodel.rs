use chrono::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    Partner,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Student => "student",
            UserRole::Partner => "partner",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: uuid::Uuid,
    pub email: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub mobile: Option<String>,
    pub role: UserRole,

    // Partners: their own code. Students: the partner code they were attributed to.
    #[serde(rename = "referralCode")]
    pub referral_code: Option<String>,

    #[serde(rename = "instituteName", skip_serializing_if = "Option::is_none")]
    pub institute_name: Option<String>,

    #[serde(skip_serializing)]
    pub password: String,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_partner(&self) -> bool {
        self.role == UserRole::Partner
    }

    /// Code of the partner this student was referred by.
    pub fn attributed_partner_code(&self) -> Option<&str> {
        match self.role {
            UserRole::Student => self.referral_code.as_deref(),
            UserRole::Partner => None,
        }
    }

    /// The partner's own resell code.
    pub fn partner_code(&self) -> Option<&str> {
        match self.role {
            UserRole::Partner => self.referral_code.as_deref(),
            UserRole::Student => None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.institute_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.full_name)
    }
}

#[cfg(test)]
pub(crate) fn test_user(role: UserRole, email: &str, referral_code: Option<&str>) -> User {
    let now = Utc::now();
    User {
        id: uuid::Uuid::new_v4(),
        email: email.to_string(),
        full_name: email.split('@').next().unwrap_or(email).to_string(),
        mobile: None,
        role,
        referral_code: referral_code.map(str::to_string),
        institute_name: None,
        password: String::new(),
        created_at: now,
        updated_at: now,
    }
}
