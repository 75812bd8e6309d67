use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::usermodel::User;

/// Referral captured from a link before the visitor has an account.
/// Lives only on the client, never in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReferral {
    pub code: String,
    #[serde(rename = "capturedAt")]
    pub captured_at: DateTime<Utc>,
}

impl PendingReferral {
    pub fn new(code: impl Into<String>, captured_at: DateTime<Utc>) -> Self {
        PendingReferral {
            code: code.into(),
            captured_at,
        }
    }

    /// Cookie value, `CODE|unix_millis`.
    pub fn encode(&self) -> String {
        format!("{}|{}", self.code, self.captured_at.timestamp_millis())
    }

    pub fn decode(raw: &str) -> Option<Self> {
        let (code, millis) = raw.split_once('|')?;
        if code.is_empty() {
            return None;
        }
        let millis = millis.parse::<i64>().ok()?;
        let captured_at = Utc.timestamp_millis_opt(millis).single()?;
        Some(PendingReferral::new(code, captured_at))
    }

    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.captured_at > max_age
    }
}

/// What a referral code resolves to, for branding and attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartnerIdentity {
    #[serde(rename = "partnerId")]
    pub partner_id: Uuid,
    pub code: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "instituteName")]
    pub institute_name: Option<String>,
    #[serde(skip_serializing)]
    pub mobile: Option<String>,
}

impl PartnerIdentity {
    pub fn from_user(user: &User, code: String) -> Self {
        PartnerIdentity {
            partner_id: user.id,
            code,
            display_name: user.display_name().to_string(),
            institute_name: user.institute_name.clone(),
            mobile: user.mobile.clone(),
        }
    }
}
