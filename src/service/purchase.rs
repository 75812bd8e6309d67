use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{
        saledb::{PurchaseOutcome, PurchaseWrite},
        Storage,
    },
    models::{
        coursemodel::{Course, CourseId, Price},
        enrollmentmodel::EnrolledCourse,
        salemodel::{commission_for, Expiry, PurchaseRecord, PurchaseStatus, Sale, SaleStatus},
        usermodel::{User, UserRole},
    },
    service::{
        error::ServiceError,
        pricing::{attribution_code, PriceResolver},
        referral::clean_code,
    },
    utils::currency::format_price,
};

/// Which storefront the buyer is on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteContext {
    Main,
    PartnerBranded { code: String },
}

impl SiteContext {
    /// `code.example.com` is partner `CODE`'s storefront when `main_domain`
    /// is `example.com`. Ports are ignored.
    pub fn from_host(host: &str, main_domain: &str) -> Self {
        let host = host.split(':').next().unwrap_or(host).trim().to_ascii_lowercase();
        let main_domain = main_domain.trim().to_ascii_lowercase();

        let sub = host
            .strip_suffix(&main_domain)
            .and_then(|rest| rest.strip_suffix('.'))
            .filter(|sub| !sub.is_empty() && *sub != "www" && !sub.contains('.'));

        match sub.and_then(clean_code) {
            Some(code) => SiteContext::PartnerBranded { code },
            None => SiteContext::Main,
        }
    }

    pub fn partner_code(&self) -> Option<&str> {
        match self {
            SiteContext::Main => None,
            SiteContext::PartnerBranded { code } => Some(code),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum CheckoutRoute {
    /// Enrolled directly; the sale is recorded.
    Enrolled { sale: Sale },
    /// Paid course on a partner storefront; the buyer is sent to the partner.
    ContactPartner {
        #[serde(rename = "partnerCode")]
        partner_code: String,
        #[serde(rename = "whatsappUrl")]
        whatsapp_url: String,
        price: Price,
    },
}

pub fn whatsapp_link(mobile: &str, course_title: &str, price: &Price) -> Option<String> {
    let digits: String = mobile.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 8 {
        return None;
    }
    let message = format!(
        "Hi, I would like to buy \"{}\" ({})",
        course_title,
        format_price(price)
    );
    Some(format!(
        "https://wa.me/{}?text={}",
        digits,
        urlencoding::encode(&message)
    ))
}

/// Attribution for one request. Quotes and checkout both go through here so
/// the price shown is the price charged.
pub fn request_attribution(
    viewer: Option<&User>,
    site: &SiteContext,
    explicit: Option<&str>,
    pending: Option<&str>,
) -> Option<String> {
    attribution_code(
        site.partner_code(),
        viewer.and_then(User::attributed_partner_code),
        explicit,
        pending,
    )
}

pub struct PurchaseService<S> {
    store: Arc<S>,
    pricing: PriceResolver<S>,
    commission_rate: BigDecimal,
}

impl<S> PurchaseService<S>
where
    S: Storage,
{
    pub fn new(store: Arc<S>, commission_rate: BigDecimal) -> Self {
        Self {
            pricing: PriceResolver::new(store.clone()),
            store,
            commission_rate,
        }
    }

    /// The whole catalog priced for one attribution.
    pub async fn catalog(
        &self,
        partner_code: Option<&str>,
    ) -> Result<Vec<(Course, Price)>, ServiceError> {
        let courses = self.store.list_courses().await?;
        let mut priced = Vec::with_capacity(courses.len());
        for course in courses {
            let price = self
                .pricing
                .price_for(&course.id, partner_code, course.catalog_price())
                .await?;
            priced.push((course, price));
        }
        Ok(priced)
    }

    /// Catalog entry and effective price for an already resolved attribution.
    pub async fn quote_course(
        &self,
        course_id: &CourseId,
        partner_code: Option<&str>,
    ) -> Result<(Course, Price), ServiceError> {
        let course = self
            .store
            .get_course(course_id)
            .await?
            .ok_or_else(|| ServiceError::CourseNotFound(course_id.clone()))?;
        let price = self
            .pricing
            .price_for(&course.id, partner_code, course.catalog_price())
            .await?;
        Ok((course, price))
    }

    /// Decides how the buyer gets the course: free courses and main-site
    /// purchases enroll directly, paid courses on a partner storefront go to
    /// the partner's WhatsApp at that partner's price. `referral` is an
    /// explicit or pending code the buyer arrived with.
    pub async fn checkout(
        &self,
        buyer: &User,
        course_id: &CourseId,
        site: &SiteContext,
        referral: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<CheckoutRoute, ServiceError> {
        let course = self
            .store
            .get_course(course_id)
            .await?
            .ok_or_else(|| ServiceError::CourseNotFound(course_id.clone()))?;

        let code = request_attribution(Some(buyer), site, referral, None);
        let price = self
            .pricing
            .price_for(&course.id, code.as_deref(), course.catalog_price())
            .await?;

        if let SiteContext::PartnerBranded { code } = site {
            if !price.is_free() {
                self.ensure_not_enrolled(buyer.id, &course.id, now).await?;

                let mobile = self
                    .store
                    .get_user_by_referral_code(code)
                    .await?
                    .and_then(|partner| partner.mobile);

                let whatsapp_url = mobile
                    .as_deref()
                    .and_then(|m| whatsapp_link(m, &course.title, &price))
                    .ok_or_else(|| ServiceError::PartnerContactMissing(code.clone()))?;

                return Ok(CheckoutRoute::ContactPartner {
                    partner_code: code.clone(),
                    whatsapp_url,
                    price,
                });
            }
        }

        self.ensure_not_enrolled(buyer.id, &course.id, now).await?;
        let buyer = self.adopt_attribution(buyer, code.as_deref()).await?;
        let sale = self.purchase(&buyer, &course, price, now).await?;
        Ok(CheckoutRoute::Enrolled { sale })
    }

    /// Binds an unattributed student to the partner whose price they are
    /// about to pay, so the sale credits that partner.
    async fn adopt_attribution(
        &self,
        buyer: &User,
        code: Option<&str>,
    ) -> Result<User, ServiceError> {
        let Some(code) = code.and_then(clean_code) else {
            return Ok(buyer.clone());
        };
        if buyer.role != UserRole::Student || buyer.referral_code.is_some() {
            return Ok(buyer.clone());
        }

        match self.store.get_user_by_referral_code(&code).await? {
            Some(partner) if partner.id != buyer.id => {}
            _ => return Ok(buyer.clone()),
        }

        match self.store.bind_referral_code(buyer.id, &code).await? {
            Some(bound) => {
                tracing::info!("Referral bound at checkout: {} attributed to {}", bound.email, code);
                Ok(bound)
            }
            None => Ok(buyer.clone()),
        }
    }

    /// Records a purchase: sale, purchase record and enrollment in one write.
    /// Fails with `AlreadyEnrolled` and writes nothing if the buyer already
    /// holds an unexpired purchase of the course.
    pub async fn purchase(
        &self,
        buyer: &User,
        course: &Course,
        resolved_price: Price,
        now: DateTime<Utc>,
    ) -> Result<Sale, ServiceError> {
        self.ensure_not_enrolled(buyer.id, &course.id, now).await?;

        let expiry = Expiry::from_plan(now, course.plan_days)?;
        let amount = resolved_price.amount();
        let commission = commission_for(&amount, &self.commission_rate);
        let partner_id = buyer.attributed_partner_code().and_then(clean_code);

        let sale = Sale {
            id: Uuid::new_v4(),
            student_id: buyer.id,
            student_name: buyer.full_name.clone(),
            student_email: buyer.email.clone(),
            course_id: course.id.clone(),
            course_name: course.title.clone(),
            amount: amount.clone(),
            commission,
            commission_rate: self.commission_rate.clone(),
            purchase_date: now,
            expiry_date: expiry,
            status: if resolved_price.is_free() {
                SaleStatus::Free
            } else {
                SaleStatus::Paid
            },
            partner_id,
        };

        let write = PurchaseWrite {
            purchase: PurchaseRecord {
                user_id: buyer.id,
                course_id: course.id.clone(),
                price: amount,
                purchase_date: now,
                expiry_date: expiry,
                status: PurchaseStatus::Active,
            },
            enrollment: EnrolledCourse::new(course, now),
            sale,
        };

        match self.store.record_purchase(write, now).await {
            Ok(PurchaseOutcome::Recorded(sale)) => {
                tracing::info!(
                    "Purchase recorded: {} bought {} for {} (commission {}, partner {:?})",
                    sale.student_email,
                    sale.course_id,
                    sale.amount,
                    sale.commission,
                    sale.partner_id
                );
                Ok(sale)
            }
            Ok(PurchaseOutcome::AlreadyActive) => Err(ServiceError::AlreadyEnrolled(course.id.clone())),
            Err(e) => {
                tracing::error!(
                    "Failed to record purchase of {} by {}: {}",
                    course.id,
                    buyer.email,
                    e
                );
                Err(ServiceError::PersistenceWriteFailed("your purchase".to_string()))
            }
        }
    }

    async fn ensure_not_enrolled(
        &self,
        user_id: Uuid,
        course_id: &CourseId,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let existing = self.store.get_purchase(user_id, course_id).await?;
        if existing.is_some_and(|p| p.is_active(now)) {
            return Err(ServiceError::AlreadyEnrolled(course_id.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;

    use crate::{
        db::{enrollmentdb::EnrollmentExt, memory::MemoryStore, saledb::SaleExt, userdb::UserExt},
        models::{
            coursemodel::LIFETIME_PLAN_DAYS,
            resellmodel::{ListingStatus, ResellListing},
            usermodel::{test_user, UserRole},
        },
        service::referral::ReferralService,
    };

    fn course(id: &str, price: i64, plan_days: i32) -> Course {
        Course {
            id: CourseId::new(id),
            title: format!("Course {id}"),
            price: BigDecimal::from(price),
            reseller_price: Some(BigDecimal::from(2000)),
            plan_days,
            video_url: None,
            youtube_id: Some("abc123".to_string()),
            created_at: Utc::now(),
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        service: PurchaseService<MemoryStore>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let mut partner = test_user(UserRole::Partner, "ravi@example.com", Some("PARTNER123"));
        partner.mobile = Some("+91 98000 00000".to_string());
        store.insert_user(partner.clone()).await;
        store.insert_course(course("5", 2999, 365)).await;
        store.insert_course(course("6", 0, LIFETIME_PLAN_DAYS)).await;
        store.insert_course(course("7", 1499, LIFETIME_PLAN_DAYS)).await;
        store
            .insert_listing(ResellListing {
                id: Uuid::new_v4(),
                course_id: CourseId::new("5"),
                partner_id: partner.id,
                referral_code: "PARTNER123".to_string(),
                selling_price: BigDecimal::from(2500),
                actual_price: BigDecimal::from(2000),
                commission: BigDecimal::from(500),
                status: ListingStatus::Active,
                created_at: Utc::now(),
            })
            .await;

        let service = PurchaseService::new(store.clone(), BigDecimal::from_str("0.20").unwrap());
        Fixture { store, service }
    }

    async fn second_partner(store: &MemoryStore) -> User {
        let mut partner = test_user(UserRole::Partner, "meena@example.com", Some("BBBB"));
        partner.mobile = Some("+91 97000 00000".to_string());
        store.insert_user(partner.clone()).await;
        store
            .insert_listing(ResellListing {
                id: Uuid::new_v4(),
                course_id: CourseId::new("5"),
                partner_id: partner.id,
                referral_code: "BBBB".to_string(),
                selling_price: BigDecimal::from(4200),
                actual_price: BigDecimal::from(2000),
                commission: BigDecimal::from(2200),
                status: ListingStatus::Active,
                created_at: Utc::now(),
            })
            .await;
        partner
    }

    async fn student(store: &MemoryStore, code: Option<&str>) -> User {
        let user = test_user(UserRole::Student, "asha@example.com", code);
        store.insert_user(user.clone()).await;
        user
    }

    #[tokio::test]
    async fn referral_to_sale_end_to_end() {
        let f = fixture().await;
        let referrals = ReferralService::new(f.store.clone(), Duration::days(30));
        let now = Utc::now();

        // Visitor lands on /r/PARTNER123, then signs up.
        let pending = referrals.capture("PARTNER123", now).unwrap();
        let confirmed = referrals.confirm_pending(&pending.encode(), now).unwrap();
        let buyer = student(&f.store, None).await;
        referrals.bind(&confirmed.code, buyer.id).await.unwrap();
        let buyer = f.store.get_user(Some(buyer.id), None).await.unwrap().unwrap();

        let route = f
            .service
            .checkout(&buyer, &CourseId::from(5u64), &SiteContext::Main, None, now)
            .await
            .unwrap();
        let CheckoutRoute::Enrolled { sale } = route else {
            panic!("expected direct enrollment");
        };

        assert_eq!(sale.amount, BigDecimal::from(2500));
        assert_eq!(sale.commission, BigDecimal::from(500));
        assert_eq!(sale.partner_id.as_deref(), Some("PARTNER123"));
        assert_eq!(sale.status, SaleStatus::Paid);
        assert_eq!(f.store.list_sales("PARTNER123").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn commission_is_twenty_percent_of_amount() {
        let f = fixture().await;
        let buyer = student(&f.store, None).await;
        let c = course("5", 2999, 365);
        let sale = f
            .service
            .purchase(&buyer, &c, Price::Paid(BigDecimal::from_str("2999.99").unwrap()), Utc::now())
            .await
            .unwrap();
        assert_eq!(sale.commission, BigDecimal::from_str("599.998").unwrap());
        assert_eq!(sale.partner_id, None);
    }

    #[tokio::test]
    async fn duplicate_purchase_raises_and_writes_nothing() {
        let f = fixture().await;
        let buyer = student(&f.store, Some("PARTNER123")).await;
        let c = course("5", 2999, 365);
        let now = Utc::now();

        f.service
            .purchase(&buyer, &c, Price::Paid(BigDecimal::from(2500)), now)
            .await
            .unwrap();
        let before = f.store.all_sales().await.len();

        let err = f
            .service
            .purchase(&buyer, &c, Price::Paid(BigDecimal::from(2500)), now + Duration::minutes(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyEnrolled(_)));
        assert_eq!(f.store.all_sales().await.len(), before);
    }

    #[tokio::test]
    async fn expired_purchase_can_be_renewed_keeping_progress() {
        let f = fixture().await;
        let buyer = student(&f.store, None).await;
        let c = course("5", 2999, 30);
        let now = Utc::now();

        f.service.purchase(&buyer, &c, c.catalog_price(), now).await.unwrap();
        let later = now + Duration::days(31);
        let sale = f.service.purchase(&buyer, &c, c.catalog_price(), later).await.unwrap();

        assert_eq!(sale.purchase_date, later);
        assert_eq!(f.store.all_sales().await.len(), 2);
        assert_eq!(f.store.get_enrollments(buyer.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn purchase_marked_expired_can_be_renewed() {
        let f = fixture().await;
        let buyer = student(&f.store, None).await;
        let c = course("7", 1499, LIFETIME_PLAN_DAYS);
        let now = Utc::now();

        f.service.purchase(&buyer, &c, c.catalog_price(), now).await.unwrap();
        f.store.expire_purchase(buyer.id, &c.id).await;
        let record = f.store.get_purchase(buyer.id, &c.id).await.unwrap().unwrap();
        assert!(!record.is_active(now));

        let later = now + Duration::days(1);
        let sale = f.service.purchase(&buyer, &c, c.catalog_price(), later).await.unwrap();
        assert_eq!(sale.expiry_date, Expiry::Lifetime);
        let record = f.store.get_purchase(buyer.id, &c.id).await.unwrap().unwrap();
        assert!(record.is_active(later));
        assert_eq!(f.store.all_sales().await.len(), 2);
        assert_eq!(f.store.get_enrollments(buyer.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lifetime_purchase_never_expires() {
        let f = fixture().await;
        let buyer = student(&f.store, None).await;
        let c = course("7", 1499, LIFETIME_PLAN_DAYS);
        let now = Utc::now();

        let sale = f.service.purchase(&buyer, &c, c.catalog_price(), now).await.unwrap();
        assert_eq!(sale.expiry_date, Expiry::Lifetime);
        assert_eq!(serde_json::to_value(&sale).unwrap()["expiryDate"], "Lifetime");

        let record = f.store.get_purchase(buyer.id, &c.id).await.unwrap().unwrap();
        assert!(record.is_active(now + Duration::days(365 * 50)));
    }

    #[tokio::test]
    async fn partner_storefront_routes_paid_courses_to_whatsapp() {
        let f = fixture().await;
        let buyer = student(&f.store, None).await;
        let site = SiteContext::PartnerBranded {
            code: "PARTNER123".to_string(),
        };

        let route = f
            .service
            .checkout(&buyer, &CourseId::new("5"), &site, None, Utc::now())
            .await
            .unwrap();
        match route {
            CheckoutRoute::ContactPartner {
                whatsapp_url,
                price,
                ..
            } => {
                assert!(whatsapp_url.starts_with("https://wa.me/919800000000?text="));
                assert_eq!(price, Price::Paid(BigDecimal::from(2500)));
            }
            other => panic!("unexpected route {other:?}"),
        }
        assert!(f.store.all_sales().await.is_empty());
    }

    #[tokio::test]
    async fn partner_storefront_enrolls_free_courses_directly() {
        let f = fixture().await;
        let buyer = student(&f.store, None).await;
        let site = SiteContext::PartnerBranded {
            code: "PARTNER123".to_string(),
        };

        let route = f
            .service
            .checkout(&buyer, &CourseId::new("6"), &site, None, Utc::now())
            .await
            .unwrap();
        let CheckoutRoute::Enrolled { sale } = route else {
            panic!("free course should enroll directly");
        };
        assert_eq!(sale.status, SaleStatus::Free);
        assert_eq!(sale.commission, BigDecimal::from(0));
    }

    #[tokio::test]
    async fn missing_partner_contact_blocks_storefront_purchase() {
        let f = fixture().await;
        let mut silent = test_user(UserRole::Partner, "quiet@example.com", Some("QUIET001"));
        silent.mobile = None;
        f.store.insert_user(silent).await;
        let buyer = student(&f.store, None).await;
        let site = SiteContext::PartnerBranded {
            code: "QUIET001".to_string(),
        };

        let err = f
            .service
            .checkout(&buyer, &CourseId::new("5"), &site, None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PartnerContactMissing(_)));
    }

    #[tokio::test]
    async fn failed_sale_write_surfaces() {
        let f = fixture().await;
        let buyer = student(&f.store, None).await;
        let c = course("5", 2999, 365);
        f.store.fail_sale_writes(true);

        let err = f
            .service
            .purchase(&buyer, &c, c.catalog_price(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PersistenceWriteFailed(_)));
        assert!(f.store.get_purchase(buyer.id, &c.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purchases_of_different_courses_are_independent() {
        let f = fixture().await;
        let buyer = student(&f.store, None).await;
        let a = course("5", 2999, 365);
        let b = course("7", 1499, LIFETIME_PLAN_DAYS);
        let now = Utc::now();

        let (ra, rb) = tokio::join!(
            f.service.purchase(&buyer, &a, a.catalog_price(), now),
            f.service.purchase(&buyer, &b, b.catalog_price(), now),
        );
        assert!(ra.is_ok() && rb.is_ok());
        assert_eq!(f.store.get_enrollments(buyer.id).await.unwrap().len(), 2);
    }

    #[test]
    fn storefront_detection() {
        assert_eq!(
            SiteContext::from_host("partner123.coursenest.in:443", "coursenest.in"),
            SiteContext::PartnerBranded {
                code: "PARTNER123".to_string()
            }
        );
        assert_eq!(SiteContext::from_host("coursenest.in", "coursenest.in"), SiteContext::Main);
        assert_eq!(SiteContext::from_host("www.coursenest.in", "coursenest.in"), SiteContext::Main);
        assert_eq!(SiteContext::from_host("localhost:8000", "coursenest.in"), SiteContext::Main);
        assert_eq!(SiteContext::from_host("a.b.coursenest.in", "coursenest.in"), SiteContext::Main);
    }

    #[test]
    fn whatsapp_link_needs_a_number() {
        assert_eq!(whatsapp_link("n/a", "Course", &Price::Free), None);
        let link = whatsapp_link("+91-98000-00000", "Course 5", &Price::Paid(BigDecimal::from(2500))).unwrap();
        assert!(link.starts_with("https://wa.me/919800000000?text=Hi%2C"));
    }

    #[tokio::test]
    async fn catalog_is_priced_per_attribution() {
        let f = fixture().await;
        let default: Vec<Price> = f.service.catalog(None).await.unwrap().into_iter().map(|(_, p)| p).collect();
        assert_eq!(
            default,
            vec![Price::Paid(BigDecimal::from(2999)), Price::Free, Price::Paid(BigDecimal::from(1499))]
        );

        let (course, price) = f
            .service
            .quote_course(&CourseId::new("05"), Some("partner123"))
            .await
            .unwrap();
        assert_eq!(course.id.as_str(), "5");
        assert_eq!(price, Price::Paid(BigDecimal::from(2500)));

        let err = f.service.quote_course(&CourseId::new("42"), None).await.unwrap_err();
        assert!(matches!(err, ServiceError::CourseNotFound(_)));
    }

    #[tokio::test]
    async fn oversized_plan_fails_without_writing() {
        let f = fixture().await;
        let buyer = student(&f.store, None).await;
        let c = course("9", 999, 200_000_000);

        let err = f
            .service
            .purchase(&buyer, &c, c.catalog_price(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(f.store.all_sales().await.is_empty());
    }

    #[tokio::test]
    async fn referred_visitor_pays_the_quoted_price() {
        let f = fixture().await;
        let buyer = student(&f.store, None).await;
        let code = request_attribution(Some(&buyer), &SiteContext::Main, None, Some("partner123"));
        let (_, shown) = f
            .service
            .quote_course(&CourseId::new("5"), code.as_deref())
            .await
            .unwrap();

        let route = f
            .service
            .checkout(&buyer, &CourseId::new("5"), &SiteContext::Main, Some("partner123"), Utc::now())
            .await
            .unwrap();
        let CheckoutRoute::Enrolled { sale } = route else {
            panic!("expected direct enrollment");
        };

        assert_eq!(Price::Paid(sale.amount.clone()), shown);
        assert_eq!(sale.amount, BigDecimal::from(2500));
        assert_eq!(sale.partner_id.as_deref(), Some("PARTNER123"));
        let buyer = f.store.get_user(Some(buyer.id), None).await.unwrap().unwrap();
        assert_eq!(buyer.attributed_partner_code(), Some("PARTNER123"));
    }

    #[tokio::test]
    async fn bound_partner_outranks_a_later_referral() {
        let f = fixture().await;
        second_partner(&f.store).await;
        let buyer = student(&f.store, Some("PARTNER123")).await;

        let code = request_attribution(Some(&buyer), &SiteContext::Main, Some("BBBB"), None);
        assert_eq!(code.as_deref(), Some("PARTNER123"));

        let route = f
            .service
            .checkout(&buyer, &CourseId::new("5"), &SiteContext::Main, Some("BBBB"), Utc::now())
            .await
            .unwrap();
        let CheckoutRoute::Enrolled { sale } = route else {
            panic!("expected direct enrollment");
        };
        assert_eq!(sale.amount, BigDecimal::from(2500));
        assert_eq!(sale.partner_id.as_deref(), Some("PARTNER123"));
    }

    #[tokio::test]
    async fn storefront_enquiry_quotes_the_storefront_partner_price() {
        let f = fixture().await;
        second_partner(&f.store).await;
        let buyer = student(&f.store, Some("PARTNER123")).await;
        let site = SiteContext::PartnerBranded {
            code: "BBBB".to_string(),
        };

        let code = request_attribution(Some(&buyer), &site, None, None);
        let (_, shown) = f
            .service
            .quote_course(&CourseId::new("5"), code.as_deref())
            .await
            .unwrap();

        let route = f
            .service
            .checkout(&buyer, &CourseId::new("5"), &site, None, Utc::now())
            .await
            .unwrap();
        match route {
            CheckoutRoute::ContactPartner {
                partner_code,
                whatsapp_url,
                price,
            } => {
                assert_eq!(partner_code, "BBBB");
                assert_eq!(price, Price::Paid(BigDecimal::from(4200)));
                assert_eq!(price, shown);
                assert!(whatsapp_url.starts_with("https://wa.me/919700000000?text="));
                assert!(whatsapp_url.contains("4%2C200"));
            }
            other => panic!("unexpected route {other:?}"),
        }
    }
}
