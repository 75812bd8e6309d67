use std::{fmt, str::FromStr};

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Catalog product id. Ids reach us both as JSON numbers and as strings, so
/// every id is canonicalised on the way in and compared only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, sqlx::Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct CourseId(String);

impl CourseId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            let stripped = trimmed.trim_start_matches('0');
            if stripped.is_empty() {
                return CourseId("0".to_string());
            }
            return CourseId(stripped.to_string());
        }
        CourseId(trimmed.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for CourseId {
    fn from(value: u64) -> Self {
        CourseId(value.to_string())
    }
}

impl From<&str> for CourseId {
    fn from(value: &str) -> Self {
        CourseId::new(value)
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CourseId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(serde_json::Number),
            Text(String),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Ok(CourseId::new(text)),
            RawId::Number(number) => {
                if let Some(n) = number.as_u64() {
                    return Ok(CourseId::from(n));
                }
                match number.as_f64() {
                    Some(f) if f >= 0.0 && f.fract() == 0.0 => Ok(CourseId((f as u64).to_string())),
                    _ => Err(de::Error::custom(format!("invalid course id: {}", number))),
                }
            }
        }
    }
}

/// Effective price of a catalog item. `"Free"`, `0` and `"0"` all collapse
/// into [`Price::Free`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Price {
    Free,
    Paid(BigDecimal),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid price: {0}")]
pub struct InvalidPrice(pub String);

impl Price {
    pub fn from_amount(amount: BigDecimal) -> Result<Self, InvalidPrice> {
        if amount < BigDecimal::zero() {
            return Err(InvalidPrice(amount.to_string()));
        }
        if amount.is_zero() {
            Ok(Price::Free)
        } else {
            Ok(Price::Paid(amount))
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Price::Free)
    }

    /// Amount charged; zero for free items.
    pub fn amount(&self) -> BigDecimal {
        match self {
            Price::Free => BigDecimal::zero(),
            Price::Paid(amount) => amount.clone(),
        }
    }
}

impl FromStr for Price {
    type Err = InvalidPrice;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("free") {
            return Ok(Price::Free);
        }

        let cleaned: String = trimmed
            .trim_start_matches('₹')
            .chars()
            .filter(|c| *c != ',')
            .collect();

        let amount = BigDecimal::from_str(cleaned.trim())
            .map_err(|_| InvalidPrice(raw.to_string()))?;
        Price::from_amount(amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Free => f.write_str("Free"),
            Price::Paid(amount) => write!(f, "₹{}", amount.normalized()),
        }
    }
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Price::Free => serializer.serialize_str("Free"),
            Price::Paid(amount) => amount.normalized().serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawPrice {
            Number(serde_json::Number),
            Text(String),
        }

        let raw = match RawPrice::deserialize(deserializer)? {
            RawPrice::Number(number) => number.to_string(),
            RawPrice::Text(text) => text,
        };
        Price::from_str(&raw).map_err(de::Error::custom)
    }
}

/// Plan length sentinel for lifetime access.
pub const LIFETIME_PLAN_DAYS: i32 = -1;

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    // Catalog price, zero for free courses.
    pub price: BigDecimal,
    // Base price a partner pays per resold seat; defaults to the catalog price.
    #[serde(rename = "resellerPrice")]
    pub reseller_price: Option<BigDecimal>,
    #[serde(rename = "planDays")]
    pub plan_days: i32,
    #[serde(rename = "videoUrl")]
    pub video_url: Option<String>,
    #[serde(rename = "youtubeId")]
    pub youtube_id: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Course {
    pub fn catalog_price(&self) -> Price {
        Price::from_amount(self.price.clone()).unwrap_or(Price::Free)
    }

    /// Floor for a partner's selling price.
    pub fn reseller_base_price(&self) -> BigDecimal {
        self.reseller_price.clone().unwrap_or_else(|| self.price.clone())
    }
}
