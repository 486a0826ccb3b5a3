//! PlayZone - gaming center discovery and booking service
//!
//! Loads configuration, opens the database and serves the HTTP API until
//! Ctrl+C or SIGTERM.

use std::process::ExitCode;
use std::time::Duration;

use playzone_net::{shutdown_signal, ApiState, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod jobs;
mod state;

use config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting PlayZone");

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), String> {
    let db_path = config.database_path().map_err(|e| e.to_string())?;
    let db = state::open_database(&db_path)
        .map_err(|e| format!("Failed to open database {}: {}", db_path.display(), e))?;

    if let Some(admin) = &config.admin {
        let guard = db.lock().map_err(|_| "Database lock poisoned".to_string())?;
        let username = admin.username.as_deref().unwrap_or("admin");
        state::bootstrap_admin(&guard, &admin.email, &admin.password, username)
            .map_err(|e| format!("Failed to bootstrap admin: {}", e))?;
    }

    let api_state = ApiState::from_shared(db.clone(), config.api_settings());
    let server = Server::start(config.addr(), api_state.clone(), &config.allowed_origins)
        .await
        .map_err(|e| format!("Failed to start server on {}: {}", config.addr(), e))?;

    let interval = Duration::from_secs(config.cleanup_interval_hours.max(1) * 60 * 60);
    let maintenance = jobs::spawn_maintenance(
        db,
        config.booking_retention_days,
        interval,
        server.subscribe_shutdown(),
    );
    let event_log = jobs::spawn_event_logger(&api_state.events, server.subscribe_shutdown());

    tracing::info!(addr = %server.addr(), "PlayZone listening");

    shutdown_signal().await;
    server.shutdown();

    let _ = maintenance.await;
    let _ = event_log.await;
    server.wait().await.map_err(|e| format!("Server error: {}", e))
}
