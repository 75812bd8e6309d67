mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE}, HeaderValue, Method};
use config::Config;
use db::DBClient;
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use service::{
    analytics::AnalyticsService,
    background_jobs::start_idle_session_sweeper,
    progress_hub::ProgressHub,
    progress_sync::SyncTiming,
    purchase::PurchaseService,
    referral::ReferralService,
    resell::ResellService,
};

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    pub referrals: Arc<ReferralService<DBClient>>,
    pub resell: Arc<ResellService<DBClient>>,
    pub purchases: Arc<PurchaseService<DBClient>>,
    pub analytics: Arc<AnalyticsService<DBClient>>,
    pub progress_hub: Arc<ProgressHub<DBClient>>,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config) -> Self {
        let db_client_arc = Arc::new(db_client);

        let referrals = Arc::new(ReferralService::new(
            db_client_arc.clone(),
            chrono::Duration::days(config.pending_referral_max_age_days),
        ));
        let resell = Arc::new(ResellService::new(db_client_arc.clone()));
        let purchases = Arc::new(PurchaseService::new(
            db_client_arc.clone(),
            config.commission_rate.clone(),
        ));
        let analytics = Arc::new(AnalyticsService::new(db_client_arc.clone()));
        let progress_hub = Arc::new(ProgressHub::new(
            db_client_arc.clone(),
            SyncTiming::from_secs(config.progress_sample_secs, config.progress_flush_secs),
            std::time::Duration::from_secs(config.progress_idle_secs),
        ));

        Self {
            env: config,
            db_client: db_client_arc,
            referrals,
            resell,
            purchases,
            analytics,
            progress_hub,
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown requested");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
    {
        Ok(pool) => {
            println!("✅Connection to the database is successful!");
            pool
        }
        Err(err) => {
            println!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!().run(&pool).await {
        println!("🔥 Failed to run migrations: {:?}", err);
        std::process::exit(1);
    }

    let mut allowed_origins = vec![
        HeaderValue::from_static("http://localhost:5173"),
        HeaderValue::from_static("http://localhost:8000"),
    ];
    match config.app_url.parse::<HeaderValue>() {
        Ok(origin) => allowed_origins.push(origin),
        Err(_) => tracing::warn!("APP_URL {} is not a valid CORS origin", config.app_url),
    }

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT]);

    let db_client = DBClient::new(pool);
    let app_state = Arc::new(AppState::new(db_client, config.clone()));

    let app = create_router(app_state.clone()).layer(cors);

    tokio::spawn(start_idle_session_sweeper(app_state.clone()));

    println!("🚀 Server is running on http://localhost:{}", config.port);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            println!("🔥 Failed to bind port {}: {:?}", config.port, err);
            std::process::exit(1);
        }
    };

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", err);
    }

    // Open players get their last position written before exit.
    let open = app_state.progress_hub.live_sessions().await;
    app_state.progress_hub.close_all().await;
    tracing::info!("Flushed {} progress sessions", open);
}
