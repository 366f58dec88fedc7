use actix_web::{middleware, web, App, HttpServer};
use anyhow::Result;
use hippo::api::state::AppConfig;
use hippo::api::{configure_routes, ApiState};
use std::env;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Hippo invoicing API");

    // Process metrics for /metrics
    prometheus::default_registry().register(Box::new(
        prometheus::process_collector::ProcessCollector::for_self(),
    ))?;

    // Load configuration
    let config = load_config()?;

    // Initialize application state
    let state = web::Data::new(ApiState::new(config).await?);

    // Get server settings
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()?;

    tracing::info!("Starting server on {}:{}", host, port);

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(TracingLogger::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(configure_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}

fn load_config() -> Result<AppConfig> {
    let config = AppConfig {
        share_base_url: env::var("SHARE_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string()),
        share_expiry_days: env::var("SHARE_EXPIRY_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()?,
        rate_limit_per_minute: env::var("RATE_LIMIT_PER_MINUTE")
            .unwrap_or_else(|_| "100".to_string())
            .parse()?,
        rate_limit_burst: env::var("RATE_LIMIT_BURST")
            .unwrap_or_else(|_| "20".to_string())
            .parse()?,
        logo_fetch_timeout_ms: env::var("LOGO_FETCH_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()?,
        max_capture_bytes: env::var("MAX_CAPTURE_BYTES")
            .unwrap_or_else(|_| "20971520".to_string())
            .parse()?,
    };

    Ok(config)
}
