pub mod coursemodel;
pub mod enrollmentmodel;
pub mod referralmodel;
pub mod resellmodel;
pub mod salemodel;
pub mod usermodel;
