pub mod auth;
pub mod courses;
pub mod enrollments;
pub mod partner;
pub mod referral;
pub mod users;
