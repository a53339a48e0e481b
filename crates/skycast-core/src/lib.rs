pub mod config;
pub mod error;
pub mod security;

pub use config::{AlertConfig, ApiConfig, Config, StorageConfig, UiConfig, ValidationResult, WeatherConfig};
pub use error::{AppError, ConfigError, NetworkError, StorageError, WeatherError};

use anyhow::Result;

/// Initialize logging for the dashboard.
///
/// Honors `RUST_LOG`; defaults to `info`.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("SkyCast core initialized");
    Ok(())
}
