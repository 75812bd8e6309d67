use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::DBClient;
use crate::models::{
    coursemodel::CourseId,
    enrollmentmodel::EnrolledCourse,
    salemodel::{CommissionPayout, PurchaseRecord, Sale},
};

/// The three rows a purchase writes together.
#[derive(Debug, Clone)]
pub struct PurchaseWrite {
    pub sale: Sale,
    pub purchase: PurchaseRecord,
    pub enrollment: EnrolledCourse,
}

#[derive(Debug, Clone)]
pub enum PurchaseOutcome {
    Recorded(Sale),
    /// An unexpired purchase for the same (user, course) already exists;
    /// nothing was written.
    AlreadyActive,
}

#[async_trait]
pub trait SaleExt {
    async fn get_purchase(
        &self,
        user_id: Uuid,
        course_id: &CourseId,
    ) -> Result<Option<PurchaseRecord>, sqlx::Error>;

    /// Writes sale, purchase and enrollment atomically. An existing enrollment
    /// keeps its progress.
    async fn record_purchase(
        &self,
        write: PurchaseWrite,
        now: DateTime<Utc>,
    ) -> Result<PurchaseOutcome, sqlx::Error>;

    async fn list_sales(&self, partner_id: &str) -> Result<Vec<Sale>, sqlx::Error>;

    async fn list_payouts(&self, partner_id: &str) -> Result<Vec<CommissionPayout>, sqlx::Error>;
}

#[async_trait]
impl SaleExt for DBClient {
    async fn get_purchase(
        &self,
        user_id: Uuid,
        course_id: &CourseId,
    ) -> Result<Option<PurchaseRecord>, sqlx::Error> {
        sqlx::query_as::<_, PurchaseRecord>(
            r#"
            SELECT user_id, course_id, price, purchase_date, expiry_date, status
            FROM purchases
            WHERE user_id = $1 AND course_id = $2
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn record_purchase(
        &self,
        write: PurchaseWrite,
        now: DateTime<Utc>,
    ) -> Result<PurchaseOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Only an expired purchase may be overwritten; an active one makes the
        // upsert return no row.
        let purchase = sqlx::query_as::<_, PurchaseRecord>(
            r#"
            INSERT INTO purchases (user_id, course_id, price, purchase_date, expiry_date, status)
            VALUES ($1, $2, $3, $4, $5, 'active'::purchase_status)
            ON CONFLICT (user_id, course_id) DO UPDATE
            SET price = EXCLUDED.price,
                purchase_date = EXCLUDED.purchase_date,
                expiry_date = EXCLUDED.expiry_date,
                status = 'active'::purchase_status
            WHERE purchases.status = 'expired'::purchase_status
                OR (purchases.expiry_date IS NOT NULL AND purchases.expiry_date <= $6)
            RETURNING user_id, course_id, price, purchase_date, expiry_date, status
            "#,
        )
        .bind(write.purchase.user_id)
        .bind(&write.purchase.course_id)
        .bind(&write.purchase.price)
        .bind(write.purchase.purchase_date)
        .bind(write.purchase.expiry_date.as_datetime())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        if purchase.is_none() {
            tx.rollback().await?;
            return Ok(PurchaseOutcome::AlreadyActive);
        }

        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales
                (id, student_id, student_name, student_email, course_id, course_name,
                 amount, commission, commission_rate, purchase_date, expiry_date, status, partner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id, student_id, student_name, student_email, course_id, course_name,
                amount, commission, commission_rate, purchase_date, expiry_date, status, partner_id
            "#,
        )
        .bind(write.sale.id)
        .bind(write.sale.student_id)
        .bind(&write.sale.student_name)
        .bind(&write.sale.student_email)
        .bind(&write.sale.course_id)
        .bind(&write.sale.course_name)
        .bind(&write.sale.amount)
        .bind(&write.sale.commission)
        .bind(&write.sale.commission_rate)
        .bind(write.sale.purchase_date)
        .bind(write.sale.expiry_date.as_datetime())
        .bind(write.sale.status)
        .bind(&write.sale.partner_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO enrolled_courses
                (user_id, course_id, title, progress, status, watched_duration,
                 last_accessed, video_url, youtube_id, enrolled_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id, course_id) DO NOTHING
            "#,
        )
        .bind(write.purchase.user_id)
        .bind(&write.enrollment.course_id)
        .bind(&write.enrollment.title)
        .bind(write.enrollment.progress)
        .bind(write.enrollment.status)
        .bind(write.enrollment.watched_duration)
        .bind(write.enrollment.last_accessed)
        .bind(&write.enrollment.video_url)
        .bind(&write.enrollment.youtube_id)
        .bind(write.enrollment.enrolled_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(PurchaseOutcome::Recorded(sale))
    }

    async fn list_sales(&self, partner_id: &str) -> Result<Vec<Sale>, sqlx::Error> {
        sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, student_id, student_name, student_email, course_id, course_name,
                amount, commission, commission_rate, purchase_date, expiry_date, status, partner_id
            FROM sales
            WHERE partner_id = $1
            ORDER BY purchase_date ASC, id ASC
            "#,
        )
        .bind(partner_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn list_payouts(&self, partner_id: &str) -> Result<Vec<CommissionPayout>, sqlx::Error> {
        sqlx::query_as::<_, CommissionPayout>(
            r#"
            SELECT id, sale_id, partner_id, paid_at
            FROM commission_payouts
            WHERE partner_id = $1
            ORDER BY paid_at ASC
            "#,
        )
        .bind(partner_id)
        .fetch_all(&self.pool)
        .await
    }
}
