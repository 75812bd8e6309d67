use std::sync::Arc;

use bigdecimal::BigDecimal;

use crate::{
    db::{coursedb::CatalogExt, reselldb::ResellExt},
    models::{
        coursemodel::CourseId,
        resellmodel::{NewResellListing, ResellListing},
        usermodel::User,
    },
    service::error::ServiceError,
};

pub struct ResellService<S> {
    store: Arc<S>,
}

impl<S> ResellService<S>
where
    S: CatalogExt + ResellExt + Send + Sync,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn create_listing(
        &self,
        partner: &User,
        course_id: &CourseId,
        selling_price: BigDecimal,
    ) -> Result<ResellListing, ServiceError> {
        let code = partner
            .partner_code()
            .ok_or_else(|| ServiceError::InvalidListing("Only partners can resell courses".to_string()))?;

        let course = self
            .store
            .get_course(course_id)
            .await?
            .ok_or_else(|| ServiceError::CourseNotFound(course_id.clone()))?;

        let actual_price = course.reseller_base_price();
        if selling_price < actual_price {
            tracing::info!(
                "Rejected listing of course {} by {}: {} is below base price {}",
                course.id,
                code,
                selling_price,
                actual_price
            );
            return Err(ServiceError::InvalidListing(format!(
                "Selling price {} must not be below the base price {}",
                selling_price, actual_price
            )));
        }

        if self.store.get_listing(partner.id, &course.id).await?.is_some() {
            return Err(ServiceError::DuplicateListing(course.id));
        }

        let listing = NewResellListing {
            course_id: course.id.clone(),
            partner_id: partner.id,
            referral_code: code.to_string(),
            selling_price,
            actual_price,
        };

        // The unique index still catches a concurrent insert of the same pair.
        let created = self
            .store
            .create_listing(listing)
            .await?
            .ok_or_else(|| ServiceError::DuplicateListing(course.id.clone()))?;

        tracing::info!(
            "Partner {} listed course {} at {}",
            code,
            created.course_id,
            created.selling_price
        );
        Ok(created)
    }

    pub async fn partner_listings(&self, partner: &User) -> Result<Vec<ResellListing>, ServiceError> {
        Ok(self.store.get_partner_listings(partner.id).await?)
    }
}
