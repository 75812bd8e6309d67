use axum::http::StatusCode;
use thiserror::Error;

use crate::{
    error::HttpError,
    models::{coursemodel::CourseId, coursemodel::InvalidPrice, salemodel::InvalidPlanDays},
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("You are already enrolled in course {0}")]
    AlreadyEnrolled(CourseId),

    #[error("Partner {0} has no contact number for this purchase")]
    PartnerContactMissing(String),

    #[error("No partner found for referral code {0}")]
    ReferralNotFound(String),

    #[error("Could not save {0}. Please try again")]
    PersistenceWriteFailed(String),

    #[error("Invalid listing: {0}")]
    InvalidListing(String),

    #[error("Course {0} is already listed by this partner")]
    DuplicateListing(CourseId),

    #[error("Course {0} not found")]
    CourseNotFound(CourseId),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<InvalidPrice> for ServiceError {
    fn from(err: InvalidPrice) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<InvalidPlanDays> for ServiceError {
    fn from(err: InvalidPlanDays) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::AlreadyEnrolled(_) | ServiceError::DuplicateListing(_) => {
                StatusCode::CONFLICT
            }

            ServiceError::PartnerContactMissing(_)
            | ServiceError::InvalidListing(_)
            | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::CourseNotFound(_)
            | ServiceError::ReferralNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::PersistenceWriteFailed(_) | ServiceError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        match error {
            // Driver details stay in the logs.
            ServiceError::Database(_) => {
                HttpError::new("Something went wrong. Please try again", status)
            }
            other => HttpError::new(other.to_string(), status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_failures_map_to_explicit_statuses() {
        let conflict: HttpError = ServiceError::AlreadyEnrolled(CourseId::new("5")).into();
        assert_eq!(conflict.status, StatusCode::CONFLICT);

        let failed: HttpError = ServiceError::PersistenceWriteFailed("purchase".into()).into();
        assert_eq!(failed.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(failed.message.contains("try again"));

        let db: HttpError = ServiceError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(db.message, "Something went wrong. Please try again");
    }

    #[test]
    fn contact_missing_is_a_client_error() {
        let err: HttpError = ServiceError::PartnerContactMissing("PARTNER123".into()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
