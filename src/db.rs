pub mod coursedb;
pub mod enrollmentdb;
#[cfg(test)]
pub mod memory;
pub mod reselldb;
pub mod saledb;
pub mod userdb;

use sqlx::{Pool, Postgres};

#[derive(Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
}

impl std::fmt::Debug for DBClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DBClient")
            .field("pool", &"Pool<Postgres>")
            .finish()
    }
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}

/// Every store the services need, behind one bound.
pub trait Storage:
    userdb::UserExt
    + coursedb::CatalogExt
    + reselldb::ResellExt
    + enrollmentdb::EnrollmentExt
    + saledb::SaleExt
    + Send
    + Sync
    + 'static
{
}

impl<T> Storage for T where
    T: userdb::UserExt
        + coursedb::CatalogExt
        + reselldb::ResellExt
        + enrollmentdb::EnrollmentExt
        + saledb::SaleExt
        + Send
        + Sync
        + 'static
{
}
