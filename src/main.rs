//! C360 customer metrics pipeline service.
//!
//! Serves the two pipeline stages over HTTP:
//! - raw sales event deduplication by natural key
//! - customer session/purchase rollups grouped by segment, tier and location

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState};
use pipeline_core::MetricsWindows;
use telemetry::{health, init_tracing_from_env};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// Comma-separated allowed origins, `*` for any
    #[serde(default = "default_cors_origins")]
    cors_origins: String,

    #[serde(default = "default_max_body_bytes")]
    max_body_bytes: usize,

    #[serde(default)]
    windows: MetricsWindows,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> String {
    "*".to_string()
}

fn default_max_body_bytes() -> usize {
    api::state::DEFAULT_MAX_BODY_BYTES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            max_body_bytes: default_max_body_bytes(),
            windows: MetricsWindows::default(),
        }
    }
}

impl Config {
    fn cors_origins(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting C360 pipeline v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    if let Err(e) = config.windows.validate() {
        health().pipeline.set_unhealthy(e.to_string());
        error!(error = %e, "Invalid metrics windows");
        return Err(e).context("Invalid window configuration");
    }
    health().pipeline.set_healthy();

    info!(
        session_days = config.windows.session_days,
        purchase_days = config.windows.purchase_days,
        recent_days = config.windows.recent_days,
        new_customer_days = config.windows.new_customer_days,
        regular_customer_days = config.windows.regular_customer_days,
        "Loaded metrics windows"
    );

    let state = AppState::new(config.windows)
        .with_cors_origins(config.cors_origins())
        .with_max_body_bytes(config.max_body_bytes);

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
///
/// Nested keys use a double underscore, e.g. `C360_WINDOWS__SESSION_DAYS=14`.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::with_prefix("C360")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
