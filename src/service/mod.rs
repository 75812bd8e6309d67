pub mod analytics;
pub mod background_jobs;
pub mod enrollment_view;
pub mod error;
pub mod pricing;
pub mod progress_hub;
pub mod progress_sync;
pub mod purchase;
pub mod referral;
pub mod resell;
