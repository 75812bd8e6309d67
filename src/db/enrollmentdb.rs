use async_trait::async_trait;
use uuid::Uuid;

use super::DBClient;
use crate::models::enrollmentmodel::{EnrolledCourse, ProgressUpdate};

#[async_trait]
pub trait EnrollmentExt {
    /// The user's enrolled courses in enrollment order.
    async fn get_enrollments(&self, user_id: Uuid) -> Result<Vec<EnrolledCourse>, sqlx::Error>;

    /// Field-level monotonic merge of one progress observation. Returns `None`
    /// if the user is not enrolled in the course.
    async fn merge_progress(
        &self,
        user_id: Uuid,
        update: &ProgressUpdate,
    ) -> Result<Option<EnrolledCourse>, sqlx::Error>;
}

#[async_trait]
impl EnrollmentExt for DBClient {
    async fn get_enrollments(&self, user_id: Uuid) -> Result<Vec<EnrolledCourse>, sqlx::Error> {
        sqlx::query_as::<_, EnrolledCourse>(
            r#"
            SELECT course_id, title, progress, status, watched_duration,
                last_accessed, video_url, youtube_id, enrolled_at
            FROM enrolled_courses
            WHERE user_id = $1
            ORDER BY enrolled_at ASC, course_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn merge_progress(
        &self,
        user_id: Uuid,
        update: &ProgressUpdate,
    ) -> Result<Option<EnrolledCourse>, sqlx::Error> {
        let update = update.sanitized();
        // A single UPDATE so concurrent writers never read-modify-write.
        sqlx::query_as::<_, EnrolledCourse>(
            r#"
            UPDATE enrolled_courses
            SET progress = GREATEST(progress, $3),
                watched_duration = GREATEST(watched_duration, $4),
                last_accessed = GREATEST(last_accessed, $5),
                status = CASE
                    WHEN GREATEST(progress, $3) >= 100
                        THEN 'completed'::enrollment_status
                    ELSE status
                END
            WHERE user_id = $1 AND course_id = $2
            RETURNING course_id, title, progress, status, watched_duration,
                last_accessed, video_url, youtube_id, enrolled_at
            "#,
        )
        .bind(user_id)
        .bind(&update.course_id)
        .bind(update.progress)
        .bind(update.watched_duration)
        .bind(update.last_accessed)
        .fetch_optional(&self.pool)
        .await
    }
}
