use async_trait::async_trait;
use uuid::Uuid;

use super::DBClient;
use crate::models::usermodel::{User, UserRole};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub mobile: Option<String>,
    pub role: UserRole,
    pub referral_code: Option<String>,
    pub institute_name: Option<String>,
}

#[async_trait]
pub trait UserExt {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn save_user(&self, new_user: NewUser) -> Result<User, sqlx::Error>;

    /// Partner whose own code is `referral_code`.
    async fn get_user_by_referral_code(
        &self,
        referral_code: &str,
    ) -> Result<Option<User>, sqlx::Error>;

    /// Sets the attribution once. Returns `None` when the user already has a
    /// code or does not exist.
    async fn bind_referral_code(
        &self,
        user_id: Uuid,
        referral_code: &str,
    ) -> Result<Option<User>, sqlx::Error>;
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(
                r#"
                SELECT id, email, full_name, mobile, role, referral_code,
                    institute_name, password, created_at, updated_at
                FROM users
                WHERE id = $1
                "#,
            )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as::<_, User>(
                r#"
                SELECT id, email, full_name, mobile, role, referral_code,
                    institute_name, password, created_at, updated_at
                FROM users
                WHERE email = $1
                "#,
            )
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        }

        Ok(user)
    }

    async fn save_user(&self, new_user: NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (full_name, email, password, mobile, role, referral_code, institute_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, email, full_name, mobile, role, referral_code,
                institute_name, password, created_at, updated_at
            "#,
        )
        .bind(new_user.full_name)
        .bind(new_user.email)
        .bind(new_user.password)
        .bind(new_user.mobile)
        .bind(new_user.role)
        .bind(new_user.referral_code)
        .bind(new_user.institute_name)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_user_by_referral_code(
        &self,
        referral_code: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, full_name, mobile, role, referral_code,
                institute_name, password, created_at, updated_at
            FROM users
            WHERE referral_code = $1 AND role = 'partner'
            "#,
        )
        .bind(referral_code)
        .fetch_optional(&self.pool)
        .await
    }

    async fn bind_referral_code(
        &self,
        user_id: Uuid,
        referral_code: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET referral_code = $1, updated_at = NOW()
            WHERE id = $2 AND referral_code IS NULL
            RETURNING id, email, full_name, mobile, role, referral_code,
                institute_name, password, created_at, updated_at
            "#,
        )
        .bind(referral_code)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }
}
