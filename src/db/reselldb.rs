use async_trait::async_trait;
use uuid::Uuid;

use super::DBClient;
use crate::models::{
    coursemodel::CourseId,
    resellmodel::{NewResellListing, ResellListing},
};

#[async_trait]
pub trait ResellExt {
    /// All listings of a partner, oldest first.
    async fn get_partner_listings(
        &self,
        partner_id: Uuid,
    ) -> Result<Vec<ResellListing>, sqlx::Error>;

    async fn get_listing(
        &self,
        partner_id: Uuid,
        course_id: &CourseId,
    ) -> Result<Option<ResellListing>, sqlx::Error>;

    /// Inserts the listing, or returns `None` if the partner already lists the course.
    async fn create_listing(
        &self,
        listing: NewResellListing,
    ) -> Result<Option<ResellListing>, sqlx::Error>;
}

#[async_trait]
impl ResellExt for DBClient {
    async fn get_partner_listings(
        &self,
        partner_id: Uuid,
    ) -> Result<Vec<ResellListing>, sqlx::Error> {
        sqlx::query_as::<_, ResellListing>(
            r#"
            SELECT id, course_id, partner_id, referral_code, selling_price,
                actual_price, commission, status, created_at
            FROM resell_listings
            WHERE partner_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(partner_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_listing(
        &self,
        partner_id: Uuid,
        course_id: &CourseId,
    ) -> Result<Option<ResellListing>, sqlx::Error> {
        sqlx::query_as::<_, ResellListing>(
            r#"
            SELECT id, course_id, partner_id, referral_code, selling_price,
                actual_price, commission, status, created_at
            FROM resell_listings
            WHERE partner_id = $1 AND course_id = $2
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(partner_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_listing(
        &self,
        listing: NewResellListing,
    ) -> Result<Option<ResellListing>, sqlx::Error> {
        let margin = listing.margin();
        sqlx::query_as::<_, ResellListing>(
            r#"
            INSERT INTO resell_listings
                (course_id, partner_id, referral_code, selling_price, actual_price, commission, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'active'::listing_status)
            ON CONFLICT (partner_id, course_id) DO NOTHING
            RETURNING id, course_id, partner_id, referral_code, selling_price,
                actual_price, commission, status, created_at
            "#,
        )
        .bind(listing.course_id)
        .bind(listing.partner_id)
        .bind(listing.referral_code)
        .bind(listing.selling_price)
        .bind(listing.actual_price)
        .bind(margin)
        .fetch_optional(&self.pool)
        .await
    }
}
