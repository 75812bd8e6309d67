use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::{distr::Alphanumeric, Rng};
use uuid::Uuid;

use crate::{
    db::userdb::UserExt,
    models::{
        referralmodel::{PartnerIdentity, PendingReferral},
        usermodel::User,
    },
    service::error::ServiceError,
};

/// Cookie holding the visitor's pending referral.
pub const PENDING_REFERRAL_COOKIE: &str = "pending_referral";

const REFERRAL_CODE_LEN: usize = 8;

pub fn generate_referral_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(REFERRAL_CODE_LEN)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}

pub fn generate_referral_link(base_url: &str, code: &str) -> String {
    format!("{}/r/{}", base_url.trim_end_matches('/'), code)
}

/// Canonical partner code: trimmed, any `.domain` suffix removed, upper-case.
/// Returns `None` for blank input or codes with characters other than
/// ASCII alphanumerics, `-` and `_`.
pub fn clean_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let code = trimmed.split('.').next().unwrap_or(trimmed).trim();
    if code.is_empty()
        || !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return None;
    }
    Some(code.to_ascii_uppercase())
}

/// Maps referral tokens to partners and binds them to new accounts.
pub struct ReferralService<S> {
    store: Arc<S>,
    pending_max_age: Duration,
}

impl<S> ReferralService<S>
where
    S: UserExt + Send + Sync,
{
    pub fn new(store: Arc<S>, pending_max_age: Duration) -> Self {
        Self {
            store,
            pending_max_age,
        }
    }

    /// Builds the pending referral for a visited link. Nothing is written to
    /// the database; the caller stores the value client-side, replacing any
    /// earlier one.
    pub fn capture(&self, token: &str, now: DateTime<Utc>) -> Option<PendingReferral> {
        let code = clean_code(token)?;
        tracing::info!("Captured pending referral {}", code);
        Some(PendingReferral::new(code, now))
    }

    /// Re-reads a stored pending referral, dropping malformed or stale values.
    pub fn confirm_pending(&self, raw: &str, now: DateTime<Utc>) -> Option<PendingReferral> {
        let pending = PendingReferral::decode(raw)?;
        if pending.is_stale(now, self.pending_max_age) {
            tracing::debug!("Ignoring stale pending referral {}", pending.code);
            return None;
        }
        let code = clean_code(&pending.code)?;
        Some(PendingReferral::new(code, pending.captured_at))
    }

    /// Partner for a token, or `None` so callers fall back to the default site.
    pub async fn resolve(&self, token: &str) -> Result<Option<PartnerIdentity>, ServiceError> {
        match self.resolve_partner(token).await? {
            Some((partner, code)) => Ok(Some(PartnerIdentity::from_user(&partner, code))),
            None => Ok(None),
        }
    }

    pub(crate) async fn resolve_partner(
        &self,
        token: &str,
    ) -> Result<Option<(User, String)>, ServiceError> {
        let Some(code) = clean_code(token) else {
            return Ok(None);
        };

        let partner = self.store.get_user_by_referral_code(&code).await?;
        if partner.is_none() {
            tracing::debug!("{}", ServiceError::ReferralNotFound(code.clone()));
        }
        Ok(partner.map(|p| (p, code)))
    }

    /// Attributes a freshly registered student to the partner behind `token`.
    /// Unknown codes leave the account unattributed; signup is never blocked.
    pub async fn bind(&self, token: &str, new_user_id: Uuid) -> Result<Option<User>, ServiceError> {
        let Some((partner, code)) = self.resolve_partner(token).await? else {
            return Ok(None);
        };

        if partner.id == new_user_id {
            return Ok(None);
        }

        let bound = self.store.bind_referral_code(new_user_id, &code).await?;
        match &bound {
            Some(user) => tracing::info!(
                "Referral bound: {} attributed to partner {}",
                user.email,
                code
            ),
            None => tracing::warn!(
                "Referral {} not bound to user {}: account missing or already attributed",
                code,
                new_user_id
            ),
        }
        Ok(bound)
    }

    /// Fresh partner code that no existing partner uses.
    pub async fn allocate_partner_code(&self) -> Result<String, ServiceError> {
        for _ in 0..5 {
            let code = generate_referral_code();
            if self.store.get_user_by_referral_code(&code).await?.is_none() {
                return Ok(code);
            }
        }
        Err(ServiceError::Validation(
            "Could not allocate a unique referral code".to_string(),
        ))
    }
}
