use std::fmt;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::models::coursemodel::{CourseId, LIFETIME_PLAN_DAYS};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// When a purchase stops granting access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Lifetime,
    At(DateTime<Utc>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid plan length: {0} days")]
pub struct InvalidPlanDays(pub i32);

impl Expiry {
    pub fn from_plan(purchase_date: DateTime<Utc>, plan_days: i32) -> Result<Self, InvalidPlanDays> {
        if plan_days == LIFETIME_PLAN_DAYS {
            return Ok(Expiry::Lifetime);
        }
        if plan_days < 1 {
            return Err(InvalidPlanDays(plan_days));
        }
        purchase_date
            .checked_add_signed(Duration::milliseconds(i64::from(plan_days) * MILLIS_PER_DAY))
            .map(Expiry::At)
            .ok_or(InvalidPlanDays(plan_days))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self {
            Expiry::Lifetime => false,
            Expiry::At(at) => *at <= now,
        }
    }

    /// Column value; lifetime access is stored as NULL.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Expiry::Lifetime => None,
            Expiry::At(at) => Some(*at),
        }
    }
}

impl From<Option<DateTime<Utc>>> for Expiry {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Expiry::Lifetime, Expiry::At)
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expiry::Lifetime => f.write_str("Lifetime"),
            Expiry::At(at) => f.write_str(&at.to_rfc3339()),
        }
    }
}

impl Serialize for Expiry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "sale_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Paid,
    Free,
}

/// Append-only ledger entry. Never updated after insert.
#[derive(Debug, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Sale {
    pub id: Uuid,
    #[serde(rename = "studentId")]
    pub student_id: Uuid,
    #[serde(rename = "studentName")]
    pub student_name: String,
    #[serde(rename = "studentEmail")]
    pub student_email: String,
    #[serde(rename = "courseId")]
    pub course_id: CourseId,
    #[serde(rename = "courseName")]
    pub course_name: String,
    pub amount: BigDecimal,
    pub commission: BigDecimal,
    #[serde(rename = "commissionRate")]
    pub commission_rate: BigDecimal,
    #[serde(rename = "purchaseDate")]
    pub purchase_date: DateTime<Utc>,
    #[serde(rename = "expiryDate")]
    #[sqlx(try_from = "Option<DateTime<Utc>>")]
    pub expiry_date: Expiry,
    pub status: SaleStatus,
    #[serde(rename = "partnerId")]
    pub partner_id: Option<String>,
}

/// Commission owed on a sale, fixed at write time.
pub fn commission_for(amount: &BigDecimal, rate: &BigDecimal) -> BigDecimal {
    amount * rate
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "purchase_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Active,
    Expired,
}

/// The buyer's side of a purchase, one row per (user, course).
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct PurchaseRecord {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    #[serde(rename = "courseId")]
    pub course_id: CourseId,
    pub price: BigDecimal,
    #[serde(rename = "purchaseDate")]
    pub purchase_date: DateTime<Utc>,
    #[serde(rename = "expiryDate")]
    #[sqlx(try_from = "Option<DateTime<Utc>>")]
    pub expiry_date: Expiry,
    pub status: PurchaseStatus,
}

impl PurchaseRecord {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == PurchaseStatus::Active && !self.expiry_date.is_expired(now)
    }
}

/// Payout of the commission on one sale to its partner.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct CommissionPayout {
    pub id: Uuid,
    #[serde(rename = "saleId")]
    pub sale_id: Uuid,
    #[serde(rename = "partnerId")]
    pub partner_id: String,
    #[serde(rename = "paidAt")]
    pub paid_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn commission_is_exact() {
        let rate = BigDecimal::from_str("0.20").unwrap();
        assert_eq!(commission_for(&BigDecimal::from(2500), &rate), BigDecimal::from(500));
        assert_eq!(
            commission_for(&BigDecimal::from_str("1999.99").unwrap(), &rate),
            BigDecimal::from_str("399.998").unwrap()
        );
        let odd_rate = BigDecimal::from_str("0.1234").unwrap();
        assert_eq!(
            commission_for(&BigDecimal::from_str("2999.99").unwrap(), &odd_rate),
            BigDecimal::from_str("370.198766").unwrap()
        );
    }

    #[test]
    fn oversized_plan_is_rejected() {
        let err = Expiry::from_plan(Utc::now(), 200_000_000).unwrap_err();
        assert_eq!(err, InvalidPlanDays(200_000_000));
        assert!(Expiry::from_plan(Utc::now(), i32::MAX).is_err());
    }

    #[test]
    fn plan_days_become_an_expiry() {
        let bought = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let expiry = Expiry::from_plan(bought, 30).unwrap();
        assert_eq!(expiry, Expiry::At(bought + Duration::days(30)));
        assert!(!expiry.is_expired(bought + Duration::days(29)));
        assert!(expiry.is_expired(bought + Duration::days(30)));
    }

    #[test]
    fn lifetime_never_expires() {
        let bought = Utc::now();
        let expiry = Expiry::from_plan(bought, LIFETIME_PLAN_DAYS).unwrap();
        assert_eq!(expiry, Expiry::Lifetime);
        assert!(!expiry.is_expired(bought + Duration::days(365 * 100)));
        assert_eq!(expiry.to_string(), "Lifetime");
        assert_eq!(serde_json::to_string(&expiry).unwrap(), "\"Lifetime\"");
        assert_eq!(expiry.as_datetime(), None);
        assert_eq!(Expiry::from(None), Expiry::Lifetime);
    }

    #[test]
    fn other_negative_plans_are_rejected() {
        assert_eq!(Expiry::from_plan(Utc::now(), -2), Err(InvalidPlanDays(-2)));
        assert_eq!(Expiry::from_plan(Utc::now(), 0), Err(InvalidPlanDays(0)));
    }
}
