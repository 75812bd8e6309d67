use std::str::FromStr;

use bigdecimal::BigDecimal;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub app_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    // Partner storefronts live on `<code>.<main_domain>`.
    pub main_domain: String,
    pub commission_rate: BigDecimal,
    pub progress_sample_secs: u64,
    pub progress_flush_secs: u64,
    // Heartbeat silence after which a player session is closed and flushed.
    pub progress_idle_secs: u64,
    pub pending_referral_max_age_days: i64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            tracing::warn!("{} has an invalid value {:?}; using the default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");

        let app_url =
            std::env::var("APP_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
        let main_domain = std::env::var("MAIN_DOMAIN").unwrap_or_else(|_| "localhost".to_string());

        let commission_rate = env_or(
            "COMMISSION_RATE",
            BigDecimal::from_str("0.20").expect("default commission rate"),
        );
        if commission_rate < BigDecimal::from(0) || commission_rate > BigDecimal::from(1) {
            panic!("COMMISSION_RATE must be between 0 and 1, got {}", commission_rate);
        }

        Config {
            database_url,
            app_url: app_url.trim_end_matches('/').to_string(),
            jwt_secret,
            jwt_maxage: jwt_maxage
                .parse::<i64>()
                .expect("JWT_MAXAGE must be a number of minutes"),
            port: env_or("PORT", 8000),
            main_domain,
            commission_rate,
            progress_sample_secs: env_or("PROGRESS_SAMPLE_SECS", 1),
            progress_flush_secs: env_or("PROGRESS_FLUSH_SECS", 5),
            progress_idle_secs: env_or("PROGRESS_IDLE_SECS", 60),
            pending_referral_max_age_days: env_or("PENDING_REFERRAL_MAX_AGE_DAYS", 30),
        }
    }
}
