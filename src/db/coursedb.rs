use async_trait::async_trait;

use super::DBClient;
use crate::models::coursemodel::{Course, CourseId};

/// Read-only view of the course catalog.
#[async_trait]
pub trait CatalogExt {
    async fn list_courses(&self) -> Result<Vec<Course>, sqlx::Error>;

    async fn get_course(&self, course_id: &CourseId) -> Result<Option<Course>, sqlx::Error>;
}

#[async_trait]
impl CatalogExt for DBClient {
    async fn list_courses(&self) -> Result<Vec<Course>, sqlx::Error> {
        sqlx::query_as::<_, Course>(
            r#"
            SELECT id, title, price, reseller_price, plan_days, video_url, youtube_id, created_at
            FROM courses
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_course(&self, course_id: &CourseId) -> Result<Option<Course>, sqlx::Error> {
        sqlx::query_as::<_, Course>(
            r#"
            SELECT id, title, price, reseller_price, plan_days, video_url, youtube_id, created_at
            FROM courses
            WHERE id = $1
            "#,
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
    }
}
