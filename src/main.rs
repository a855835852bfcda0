mod api;
mod app;
mod auth;
mod config;
mod domain;
mod error;
mod logging;
mod middleware;
mod routes;
mod services;
mod store;
#[cfg(test)]
mod testing;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use config::{Settings, StorageKind};
use services::{ApiClient, NotificationChannel, RedisStorage, RestBackend, SocketHub};
use store::{BackendFactory, LoadPolicy, SessionRegistry, StorageBackend};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        api_base_url = %settings.api_base_url,
        "Starting Connect-Accel gateway"
    );

    // Marketplace API client; sessions clone it with their own token
    let api_client = ApiClient::new(&settings.api_base_url, settings.api_timeout_seconds)?;

    // Check marketplace API health without blocking startup
    tokio::spawn({
        let api_client = api_client.clone();
        async move {
            match api_client.health_check().await {
                Ok(()) => tracing::info!("Marketplace API is healthy"),
                Err(e) => tracing::warn!(error = %e, "Marketplace API health check failed - will retry on first request"),
            }
        }
    });

    let storage = session_storage(&settings).await?;

    let backends: BackendFactory = {
        let api_client = api_client.clone();
        Arc::new(move |token: &str| -> Arc<dyn RestBackend> {
            Arc::new(api_client.with_token(token))
        })
    };

    let hub = SocketHub::new(256);
    let channel: Arc<dyn NotificationChannel> = Arc::new(hub.clone());
    let policy = LoadPolicy {
        project_freshness: settings.project_cache_ttl,
        rate_limit_retry_delay: settings.rate_limit_retry_delay,
    };
    let sessions = SessionRegistry::new(backends, storage, Some(channel), policy);

    let verifier = auth::TokenVerifier::new(&settings.jwt_secret, settings.jwt_issuer.as_deref());

    // Create application state
    let state = app::AppState::new(settings.clone(), verifier, sessions, hub, api_client);

    // Drop sessions idle for longer than the session TTL
    tokio::spawn({
        let state = state.clone();
        let max_idle = Duration::from_secs(settings.session_ttl_seconds);
        async move {
            state
                .sessions
                .run_eviction(SESSION_SWEEP_INTERVAL, max_idle)
                .await
        }
    });

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn session_storage(settings: &Settings) -> Result<StorageBackend> {
    let storage = match settings.session_storage {
        StorageKind::Memory => StorageBackend::Memory,
        StorageKind::File => {
            std::fs::create_dir_all(&settings.session_storage_dir)?;
            StorageBackend::File {
                root: settings.session_storage_dir.clone(),
            }
        }
        StorageKind::Redis => {
            let redis =
                RedisStorage::connect(&settings.redis_url, settings.session_ttl_seconds).await?;
            if let Err(e) = redis.health_check().await {
                tracing::warn!(error = %e, "Redis health check failed");
            }
            StorageBackend::Redis(redis)
        }
    };

    tracing::info!(storage = ?settings.session_storage, "Session storage initialized");
    Ok(storage)
}
