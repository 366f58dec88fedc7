use std::sync::Arc;

use governor::{clock::DefaultClock, state::keyed::DashMapStateStore, Quota, RateLimiter};

use crate::auth::{RemoteSessionProvider, SessionProvider, StaticSessionProvider};
use crate::storage::{DataStore, SqliteStore};

pub type KeyedRateLimiter = Arc<RateLimiter<String, DashMapStateStore<String>, DefaultClock>>;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn DataStore>,
    pub sessions: Arc<dyn SessionProvider>,
    pub http: reqwest::Client,
    pub rate_limiter: KeyedRateLimiter,
    pub config: Arc<AppConfig>,
}

#[derive(Clone)]
pub struct AppConfig {
    pub share_base_url: String,
    /// 0 disables share-link expiry.
    pub share_expiry_days: i64,
    pub rate_limit_per_minute: u32,
    pub rate_limit_burst: u32,
    pub logo_fetch_timeout_ms: u64,
    pub max_capture_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            share_base_url: "http://localhost:8080".to_string(),
            share_expiry_days: 7,
            rate_limit_per_minute: 100,
            rate_limit_burst: 20,
            logo_fetch_timeout_ms: 5000,
            max_capture_bytes: 20_971_520, // 20MB
        }
    }
}

impl ApiState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://hippo.db?mode=rwc".to_string());
        let store = Arc::new(SqliteStore::connect(&database_url).await?);

        let http = reqwest::Client::new();

        // The remote provider is used when an auth endpoint is configured;
        // otherwise a static token table serves development setups.
        let sessions: Arc<dyn SessionProvider> = match std::env::var("AUTH_ENDPOINT") {
            Ok(endpoint) => Arc::new(RemoteSessionProvider::new(http.clone(), endpoint)),
            Err(_) => {
                let spec = std::env::var("AUTH_STATIC_TOKENS")
                    .unwrap_or_else(|_| "dev=dev-user:dev@localhost".to_string());
                Arc::new(StaticSessionProvider::from_spec(&spec))
            }
        };

        Ok(Self::with_parts(store, sessions, http, config))
    }

    /// Assembles state from explicit collaborators. Tests use this with an
    /// in-memory store and a static session table.
    pub fn with_parts(
        store: Arc<dyn DataStore>,
        sessions: Arc<dyn SessionProvider>,
        http: reqwest::Client,
        config: AppConfig,
    ) -> Self {
        let quota = Quota::per_minute(
            std::num::NonZeroU32::new(config.rate_limit_per_minute.max(1)).unwrap_or(
                std::num::NonZeroU32::MIN,
            ),
        )
        .allow_burst(
            std::num::NonZeroU32::new(config.rate_limit_burst.max(1))
                .unwrap_or(std::num::NonZeroU32::MIN),
        );
        let rate_limiter = Arc::new(RateLimiter::dashmap_with_clock(
            quota,
            &DefaultClock::default(),
        ));

        ApiState {
            store,
            sessions,
            http,
            rate_limiter,
            config: Arc::new(config),
        }
    }
}
