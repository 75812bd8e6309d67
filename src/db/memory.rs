//! In-process store used by the service tests. Mirrors the Postgres
//! semantics of each extension trait, including the atomic purchase write.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    coursedb::CatalogExt,
    enrollmentdb::EnrollmentExt,
    reselldb::ResellExt,
    saledb::{PurchaseOutcome, PurchaseWrite, SaleExt},
    userdb::{NewUser, UserExt},
};
use crate::models::{
    coursemodel::{Course, CourseId},
    enrollmentmodel::{EnrolledCourse, ProgressUpdate},
    resellmodel::{ListingStatus, NewResellListing, ResellListing},
    salemodel::{CommissionPayout, PurchaseRecord, PurchaseStatus, Sale},
    usermodel::User,
};

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    courses: Vec<Course>,
    listings: Vec<ResellListing>,
    enrollments: HashMap<Uuid, Vec<EnrolledCourse>>,
    purchases: HashMap<(Uuid, CourseId), PurchaseRecord>,
    sales: Vec<Sale>,
    payouts: Vec<CommissionPayout>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_progress_writes: AtomicBool,
    fail_sale_writes: AtomicBool,
    progress_writes: AtomicUsize,
}

fn injected_failure() -> sqlx::Error {
    sqlx::Error::PoolTimedOut
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.inner.lock().await.users.push(user);
    }

    pub async fn insert_course(&self, course: Course) {
        self.inner.lock().await.courses.push(course);
    }

    pub async fn insert_listing(&self, listing: ResellListing) {
        self.inner.lock().await.listings.push(listing);
    }

    pub async fn insert_payout(&self, payout: CommissionPayout) {
        self.inner.lock().await.payouts.push(payout);
    }

    pub async fn insert_enrollment(&self, user_id: Uuid, enrollment: EnrolledCourse) {
        self.inner
            .lock()
            .await
            .enrollments
            .entry(user_id)
            .or_default()
            .push(enrollment);
    }

    pub async fn expire_purchase(&self, user_id: Uuid, course_id: &CourseId) {
        if let Some(purchase) = self
            .inner
            .lock()
            .await
            .purchases
            .get_mut(&(user_id, course_id.clone()))
        {
            purchase.status = PurchaseStatus::Expired;
        }
    }

    pub async fn all_sales(&self) -> Vec<Sale> {
        self.inner.lock().await.sales.clone()
    }

    pub async fn enrollment(&self, user_id: Uuid, course_id: &CourseId) -> Option<EnrolledCourse> {
        self.inner
            .lock()
            .await
            .enrollments
            .get(&user_id)
            .and_then(|list| list.iter().find(|e| &e.course_id == course_id).cloned())
    }

    pub fn fail_progress_writes(&self, fail: bool) {
        self.fail_progress_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sale_writes(&self, fail: bool) {
        self.fail_sale_writes.store(fail, Ordering::SeqCst);
    }

    /// Progress writes attempted, failed ones included.
    pub fn progress_write_count(&self) -> usize {
        self.progress_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserExt for MemoryStore {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let inner = self.inner.lock().await;
        let found = match (user_id, email) {
            (Some(id), _) => inner.users.iter().find(|u| u.id == id),
            (None, Some(email)) => inner.users.iter().find(|u| u.email == email),
            (None, None) => None,
        };
        Ok(found.cloned())
    }

    async fn save_user(&self, new_user: NewUser) -> Result<User, sqlx::Error> {
        let mut inner = self.inner.lock().await;
        if inner.users.iter().any(|u| u.email == new_user.email) {
            return Err(sqlx::Error::Protocol("duplicate email".to_string()));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            full_name: new_user.full_name,
            mobile: new_user.mobile,
            role: new_user.role,
            referral_code: new_user.referral_code,
            institute_name: new_user.institute_name,
            password: new_user.password,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn get_user_by_referral_code(
        &self,
        referral_code: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.partner_code() == Some(referral_code))
            .cloned())
    }

    async fn bind_referral_code(
        &self,
        user_id: Uuid,
        referral_code: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut inner = self.inner.lock().await;
        let Some(user) = inner.users.iter_mut().find(|u| u.id == user_id) else {
            return Ok(None);
        };
        if user.referral_code.is_some() {
            return Ok(None);
        }
        user.referral_code = Some(referral_code.to_string());
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl CatalogExt for MemoryStore {
    async fn list_courses(&self) -> Result<Vec<Course>, sqlx::Error> {
        Ok(self.inner.lock().await.courses.clone())
    }

    async fn get_course(&self, course_id: &CourseId) -> Result<Option<Course>, sqlx::Error> {
        let inner = self.inner.lock().await;
        Ok(inner.courses.iter().find(|c| &c.id == course_id).cloned())
    }
}

#[async_trait]
impl ResellExt for MemoryStore {
    async fn get_partner_listings(
        &self,
        partner_id: Uuid,
    ) -> Result<Vec<ResellListing>, sqlx::Error> {
        let inner = self.inner.lock().await;
        let mut listings: Vec<ResellListing> = inner
            .listings
            .iter()
            .filter(|l| l.partner_id == partner_id)
            .cloned()
            .collect();
        listings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(listings)
    }

    async fn get_listing(
        &self,
        partner_id: Uuid,
        course_id: &CourseId,
    ) -> Result<Option<ResellListing>, sqlx::Error> {
        Ok(self
            .get_partner_listings(partner_id)
            .await?
            .into_iter()
            .find(|l| &l.course_id == course_id))
    }

    async fn create_listing(
        &self,
        listing: NewResellListing,
    ) -> Result<Option<ResellListing>, sqlx::Error> {
        let mut inner = self.inner.lock().await;
        if inner
            .listings
            .iter()
            .any(|l| l.partner_id == listing.partner_id && l.course_id == listing.course_id)
        {
            return Ok(None);
        }
        let margin = listing.margin();
        let created = ResellListing {
            id: Uuid::new_v4(),
            course_id: listing.course_id,
            partner_id: listing.partner_id,
            referral_code: listing.referral_code,
            selling_price: listing.selling_price,
            actual_price: listing.actual_price,
            commission: margin,
            status: ListingStatus::Active,
            created_at: Utc::now(),
        };
        inner.listings.push(created.clone());
        Ok(Some(created))
    }
}

#[async_trait]
impl EnrollmentExt for MemoryStore {
    async fn get_enrollments(&self, user_id: Uuid) -> Result<Vec<EnrolledCourse>, sqlx::Error> {
        let inner = self.inner.lock().await;
        Ok(inner.enrollments.get(&user_id).cloned().unwrap_or_default())
    }

    async fn merge_progress(
        &self,
        user_id: Uuid,
        update: &ProgressUpdate,
    ) -> Result<Option<EnrolledCourse>, sqlx::Error> {
        self.progress_writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_progress_writes.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }

        let mut inner = self.inner.lock().await;
        let Some(course) = inner
            .enrollments
            .get_mut(&user_id)
            .and_then(|list| list.iter_mut().find(|e| e.course_id == update.course_id))
        else {
            return Ok(None);
        };
        course.merge_progress(update);
        Ok(Some(course.clone()))
    }
}

#[async_trait]
impl SaleExt for MemoryStore {
    async fn get_purchase(
        &self,
        user_id: Uuid,
        course_id: &CourseId,
    ) -> Result<Option<PurchaseRecord>, sqlx::Error> {
        let inner = self.inner.lock().await;
        Ok(inner.purchases.get(&(user_id, course_id.clone())).cloned())
    }

    async fn record_purchase(
        &self,
        write: PurchaseWrite,
        now: DateTime<Utc>,
    ) -> Result<PurchaseOutcome, sqlx::Error> {
        if self.fail_sale_writes.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }

        let mut inner = self.inner.lock().await;
        let key = (write.purchase.user_id, write.purchase.course_id.clone());
        if inner.purchases.get(&key).is_some_and(|p| p.is_active(now)) {
            return Ok(PurchaseOutcome::AlreadyActive);
        }

        inner.purchases.insert(key, write.purchase.clone());
        inner.sales.push(write.sale.clone());

        let list = inner.enrollments.entry(write.purchase.user_id).or_default();
        if !list.iter().any(|e| e.course_id == write.enrollment.course_id) {
            list.push(write.enrollment);
        }

        Ok(PurchaseOutcome::Recorded(write.sale))
    }

    async fn list_sales(&self, partner_id: &str) -> Result<Vec<Sale>, sqlx::Error> {
        let inner = self.inner.lock().await;
        Ok(inner
            .sales
            .iter()
            .filter(|s| s.partner_id.as_deref() == Some(partner_id))
            .cloned()
            .collect())
    }

    async fn list_payouts(&self, partner_id: &str) -> Result<Vec<CommissionPayout>, sqlx::Error> {
        let inner = self.inner.lock().await;
        Ok(inner
            .payouts
            .iter()
            .filter(|p| p.partner_id == partner_id)
            .cloned()
            .collect())
    }
}
