use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::coursemodel::CourseId;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "listing_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Inactive,
}

/// A partner's custom selling price for one catalog course.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct ResellListing {
    pub id: Uuid,
    #[serde(rename = "courseId")]
    pub course_id: CourseId,
    #[serde(rename = "partnerId")]
    pub partner_id: Uuid,
    #[serde(rename = "referralCode")]
    pub referral_code: String,
    #[serde(rename = "sellingPrice")]
    pub selling_price: BigDecimal,
    #[serde(rename = "actualPrice")]
    pub actual_price: BigDecimal,
    // Partner margin over the catalog price.
    pub commission: BigDecimal,
    pub status: ListingStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewResellListing {
    pub course_id: CourseId,
    pub partner_id: Uuid,
    pub referral_code: String,
    pub selling_price: BigDecimal,
    pub actual_price: BigDecimal,
}

impl NewResellListing {
    pub fn margin(&self) -> BigDecimal {
        &self.selling_price - &self.actual_price
    }
}
