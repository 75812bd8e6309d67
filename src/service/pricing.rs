use std::sync::Arc;

use crate::{
    db::{reselldb::ResellExt, userdb::UserExt},
    models::{
        coursemodel::{CourseId, Price},
        resellmodel::{ListingStatus, ResellListing},
    },
    service::{error::ServiceError, referral::clean_code},
};

/// Picks the listing that prices `course_id`. Only active listings count;
/// ties go to the oldest listing, then the smallest id.
pub fn select_listing<'a>(
    listings: &'a [ResellListing],
    course_id: &CourseId,
) -> Option<&'a ResellListing> {
    listings
        .iter()
        .filter(|l| l.status == ListingStatus::Active && &l.course_id == course_id)
        .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
}

/// Partner whose pricing applies to a request. A partner storefront prices
/// its own enquiries; elsewhere a student's bound code wins over an explicit
/// `ref`, which wins over a pending referral.
pub fn attribution_code(
    storefront: Option<&str>,
    bound: Option<&str>,
    explicit: Option<&str>,
    pending: Option<&str>,
) -> Option<String> {
    [storefront, bound, explicit, pending]
        .into_iter()
        .flatten()
        .find_map(clean_code)
}

pub struct PriceResolver<S> {
    store: Arc<S>,
}

impl<S> PriceResolver<S>
where
    S: UserExt + ResellExt + Send + Sync,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Effective price of `course_id` for a visitor attributed to
    /// `partner_code`. Any lookup miss falls back to the catalog price.
    pub async fn price_for(
        &self,
        course_id: &CourseId,
        partner_code: Option<&str>,
        catalog_price: Price,
    ) -> Result<Price, ServiceError> {
        let Some(code) = partner_code.and_then(clean_code) else {
            return Ok(catalog_price);
        };

        let Some(partner) = self.store.get_user_by_referral_code(&code).await? else {
            tracing::debug!("{}; using catalog price", ServiceError::ReferralNotFound(code));
            return Ok(catalog_price);
        };

        let listings = self.store.get_partner_listings(partner.id).await?;
        match select_listing(&listings, course_id) {
            Some(listing) => Ok(Price::from_amount(listing.selling_price.clone())?),
            None => Ok(catalog_price),
        }
    }
}
