use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{
    models::{
        coursemodel::{CourseId, Price},
        referralmodel::PartnerIdentity,
        resellmodel::ResellListing,
    },
    service::analytics::PartnerAnalytics,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateListingDto {
    #[serde(rename = "courseId")]
    pub course_id: CourseId,

    #[validate(custom = "validate_selling_price")]
    #[serde(rename = "sellingPrice")]
    pub selling_price: Price,
}

fn validate_selling_price(price: &Price) -> Result<(), ValidationError> {
    match price {
        Price::Paid(_) => Ok(()),
        Price::Free => {
            let mut error = ValidationError::new("selling_price");
            error.message = Some("Selling price must be greater than zero".into());
            Err(error)
        }
    }
}

impl CreateListingDto {
    pub fn selling_amount(&self) -> BigDecimal {
        self.selling_price.amount()
    }
}

#[derive(Debug, Serialize)]
pub struct ListingResponseDto {
    pub status: String,
    pub data: ResellListing,
}

#[derive(Debug, Serialize)]
pub struct ListingListResponseDto {
    pub status: String,
    pub listings: Vec<ResellListing>,
    pub results: usize,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponseDto {
    pub status: String,
    pub data: PartnerAnalytics,
}

/// Branding for a referral link. `partner` is `null` for unknown codes.
#[derive(Debug, Serialize)]
pub struct ReferralBrandingDto {
    pub status: String,
    pub partner: Option<PartnerIdentity>,
}
