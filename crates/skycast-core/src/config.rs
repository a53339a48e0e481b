use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::security;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Weather API access
    #[serde(default)]
    pub api: ApiConfig,

    /// Weather settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Alert thresholds and banner timings
    #[serde(default)]
    pub alerts: AlertConfig,

    /// Local key-value storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// UI preferences
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the OpenWeatherMap-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key (optional here, can be set via SKYCAST_API_KEY)
    #[serde(default = "default_api_key")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_api_key() -> Option<String> {
    std::env::var("SKYCAST_API_KEY").ok()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: default_api_key(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// City shown when no location is available
    #[serde(default = "default_city")]
    pub default_city: String,

    /// Auto-refresh interval in minutes (0 disables)
    #[serde(default = "default_refresh_minutes")]
    pub refresh_minutes: u32,
}

fn default_city() -> String {
    "Istanbul".to_string()
}

fn default_refresh_minutes() -> u32 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            default_city: default_city(),
            refresh_minutes: default_refresh_minutes(),
        }
    }
}

/// Alert thresholds (metric units) and banner rotation timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub heat_celsius: f64,
    pub cold_celsius: f64,
    pub wind_speed_mps: f64,
    pub rain_3h_mm: f64,
    pub rain_1h_mm: f64,
    /// Number of leading forecast entries inspected
    pub forecast_window: usize,
    pub rotate_interval_ms: u64,
    pub fade_delay_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            heat_celsius: 35.0,
            cold_celsius: -10.0,
            wind_speed_mps: 15.0,
            rain_3h_mm: 10.0,
            rain_1h_mm: 5.0,
            forecast_window: 3,
            rotate_interval_ms: 8000,
            fade_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file (relative to config_dir) backing favorites and preferences
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

fn default_database_file() -> String {
    "skycast.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: default_database_file(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    /// Dark mode enabled
    #[serde(default)]
    pub dark_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skycast");

        Self {
            config_dir,
            api: ApiConfig::default(),
            weather: WeatherConfig::default(),
            alerts: AlertConfig::default(),
            storage: StorageConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_defaults_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.api.base_url, "api.base_url", &mut result);

        match self.api.api_key.as_deref() {
            None | Some("") => result.add_warning(
                "api.api_key",
                "No API key configured - weather requests will be rejected",
            ),
            Some(key) if !security::is_valid_api_key(key) => {
                result.add_error("api.api_key", "API key must be 32 alphanumeric characters")
            }
            Some(_) => {}
        }

        if self.api.timeout_secs == 0 {
            result.add_error("api.timeout_secs", "Timeout must be greater than 0");
        }

        if self.weather.default_city.trim().is_empty() {
            result.add_error("weather.default_city", "Default city must not be empty");
        }

        if self.weather.refresh_minutes == 0 {
            result.add_warning(
                "weather.refresh_minutes",
                "Weather refresh disabled (0 minutes)",
            );
        } else if self.weather.refresh_minutes > 1440 {
            result.add_warning(
                "weather.refresh_minutes",
                "Weather refresh interval is more than 24 hours",
            );
        }

        if self.alerts.cold_celsius >= self.alerts.heat_celsius {
            result.add_error(
                "alerts.cold_celsius",
                "Cold threshold must be below the heat threshold",
            );
        }

        if self.alerts.forecast_window == 0 {
            result.add_warning(
                "alerts.forecast_window",
                "Forecast window is 0 - rain and thunderstorm alerts are disabled",
            );
        }

        if self.alerts.rotate_interval_ms <= self.alerts.fade_delay_ms {
            result.add_error(
                "alerts.rotate_interval_ms",
                "Rotation interval must be longer than the fade delay",
            );
        }

        if self.storage.database_file.trim().is_empty() {
            result.add_error("storage.database_file", "Database file name must not be empty");
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Path of the key-value database
    pub fn database_path(&self) -> PathBuf {
        self.config_dir.join(&self.storage.database_file)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Write a fresh config file. The API key is left out: it comes from
    /// `SKYCAST_API_KEY` and must not end up on disk in plaintext.
    fn save_defaults_to(&self, path: &Path) -> Result<()> {
        let mut on_disk = self.clone();
        on_disk.api.api_key = None;
        on_disk.save_to(path)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}
