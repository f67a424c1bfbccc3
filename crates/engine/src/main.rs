//! Tidewatch Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tidewatch_engine::api::{self, websocket::WsState, ConnectionManager};
use tidewatch_engine::config::EngineConfig;
use tidewatch_engine::infrastructure::{
    identity::{JwtIdentityVerifier, RejectAllIdentity},
    ports::IdentityPort,
    sqlite::{self, SqliteRepositories},
};
use tidewatch_engine::use_cases::raid::next_summon_after;
use tidewatch_engine::App;

/// How often elapsed cooldowns and seen nonces are dropped.
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine may be run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tidewatch_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Tidewatch Engine");

    let config = EngineConfig::from_env();

    tracing::info!("Opening store at {}", config.database_url);
    let pool = sqlite::connect(&config.database_url).await?;
    let repos = SqliteRepositories::new(pool);

    let identity: Arc<dyn IdentityPort> = match config.token_secret.as_deref() {
        Some(secret) => Arc::new(JwtIdentityVerifier::new(secret, &config.token_audience)),
        None => {
            tracing::warn!("TOKEN_SECRET is not set, every join will be refused");
            Arc::new(RejectAllIdentity)
        }
    };

    let connections = Arc::new(ConnectionManager::new());
    let app = Arc::new(App::new(repos, identity, connections.clone(), &config));

    let restored = app.use_cases.combat.restore().await?;
    tracing::info!(restored, "Combat sessions loaded");

    let shutdown = CancellationToken::new();

    // Deadline scheduler: challenge expiry and session activation
    tokio::spawn(
        app.scheduler
            .clone()
            .run(app.deadline_router(), shutdown.clone()),
    );

    // Housekeeping: seen nonces and elapsed cooldowns
    let housekeeping_app = app.clone();
    let housekeeping_cancel = shutdown.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HOUSEKEEPING_INTERVAL);
        loop {
            tokio::select! {
                _ = housekeeping_cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let nonces = housekeeping_app.replay.cleanup_expired().await;
            match housekeeping_app.use_cases.cooldowns.sweep().await {
                Ok(cooldowns) => {
                    tracing::debug!(nonces, cooldowns, "Housekeeping pass complete");
                }
                Err(e) => tracing::warn!(error = %e, "Failed to sweep cooldowns"),
            }
        }
    });

    // Scheduled raid summons
    if config.raid_schedule_enabled {
        let raid_app = app.clone();
        let raid_cancel = shutdown.clone();
        tokio::spawn(async move {
            loop {
                let now = chrono::Utc::now();
                let next = next_summon_after(now);
                let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                tracing::info!(next = %next, "Next scheduled raid summon");

                tokio::select! {
                    _ = raid_cancel.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }

                let summoned = raid_app.use_cases.raid.summon_scheduled().await;
                tracing::info!(count = summoned.len(), "Scheduled raid summon");
            }
        });
    }

    let ws_state = Arc::new(WsState {
        app: app.clone(),
        connections,
        allowed_origins: config.allowed_origins.clone(),
    });

    let mut router = api::http::routes()
        .with_state(app)
        .route("/ws", get(api::websocket::ws_handler).with_state(ws_state))
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = build_cors_layer(&config.allowed_origins) {
        router = router.layer(cors);
    }

    let addr: SocketAddr = config.bind_address().parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let signal_cancel = shutdown.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown requested");
            signal_cancel.cancel();
        })
        .await?;

    shutdown.cancel();
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

/// An empty list allows any origin.
fn build_cors_layer(allowed_origins: &[String]) -> Option<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        // Bearer tokens and JSON bodies trigger CORS preflights.
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    if allowed_origins.is_empty() {
        return Some(cors.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|s| HeaderValue::from_str(s).ok())
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(cors.allow_origin(origins))
}
