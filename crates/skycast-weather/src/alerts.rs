//! Threshold alerts derived from a weather snapshot and its forecast.
//!
//! Rules are evaluated in a fixed order and the output keeps that order:
//! temperature (heat or cold), wind, heavy rain, thunderstorm. The banner
//! shows the first alert first, so the order matters.

use serde::{Deserialize, Serialize};
use skycast_core::AlertConfig;

use crate::types::{ForecastSnapshot, WeatherSnapshot};

/// Alert severity. Carries no ordering; alerts stay in rule order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Extreme,
    Severe,
    Moderate,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extreme => "extreme",
            Self::Severe => "severe",
            Self::Moderate => "moderate",
        }
    }
}

/// Which rule produced an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ExtremeHeat,
    ExtremeCold,
    StrongWind,
    HeavyRain,
    Thunderstorm,
}

impl AlertKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::ExtremeHeat => "Extreme Heat",
            Self::ExtremeCold => "Extreme Cold",
            Self::StrongWind => "Strong Wind",
            Self::HeavyRain => "Heavy Rain",
            Self::Thunderstorm => "Thunderstorm",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::ExtremeHeat | Self::ExtremeCold => Severity::Extreme,
            Self::StrongWind | Self::Thunderstorm => Severity::Severe,
            Self::HeavyRain => Severity::Moderate,
        }
    }

    fn description(&self, thresholds: &AlertThresholds) -> String {
        match self {
            Self::ExtremeHeat => format!(
                "Temperature is {}°C or above. Avoid direct sunlight and drink plenty of water.",
                thresholds.heat_celsius
            ),
            Self::ExtremeCold => format!(
                "Temperature is {}°C or below. Avoid outdoor activities.",
                thresholds.cold_celsius
            ),
            Self::StrongWind => format!(
                "Wind speed is above {} m/s. Take care in open areas.",
                thresholds.wind_speed_mps
            ),
            Self::HeavyRain => {
                "Heavy rain is expected in the coming hours. Flooding is possible.".to_string()
            }
            Self::Thunderstorm => {
                "Thunderstorms are expected soon. Stay indoors if you can.".to_string()
            }
        }
    }
}

/// A derived weather alert. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Alert {
    fn from_kind(kind: AlertKind, thresholds: &AlertThresholds) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            description: kind.description(thresholds),
            severity: kind.severity(),
        }
    }
}

/// Alert thresholds in metric units
#[derive(Debug, Clone, PartialEq)]
pub struct AlertThresholds {
    pub heat_celsius: f64,
    pub cold_celsius: f64,
    pub wind_speed_mps: f64,
    pub rain_3h_mm: f64,
    pub rain_1h_mm: f64,
    /// Leading forecast entries inspected for rain and thunderstorms
    pub forecast_window: usize,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self::from(&AlertConfig::default())
    }
}

impl From<&AlertConfig> for AlertThresholds {
    fn from(config: &AlertConfig) -> Self {
        Self {
            heat_celsius: config.heat_celsius,
            cold_celsius: config.cold_celsius,
            wind_speed_mps: config.wind_speed_mps,
            rain_3h_mm: config.rain_3h_mm,
            rain_1h_mm: config.rain_1h_mm,
            forecast_window: config.forecast_window,
        }
    }
}

/// Derive alerts with the default thresholds.
pub fn derive(weather: &WeatherSnapshot, forecast: &ForecastSnapshot) -> Vec<Alert> {
    derive_with(&AlertThresholds::default(), weather, forecast)
}

/// Derive alerts with explicit thresholds.
///
/// Pure: the same inputs always produce equal output.
pub fn derive_with(
    thresholds: &AlertThresholds,
    weather: &WeatherSnapshot,
    forecast: &ForecastSnapshot,
) -> Vec<Alert> {
    let mut kinds = Vec::with_capacity(4);

    // NaN compares false everywhere, so a garbled reading fires nothing
    if weather.temperature >= thresholds.heat_celsius {
        kinds.push(AlertKind::ExtremeHeat);
    } else if weather.temperature <= thresholds.cold_celsius {
        kinds.push(AlertKind::ExtremeCold);
    }

    if weather.wind_speed > thresholds.wind_speed_mps {
        kinds.push(AlertKind::StrongWind);
    }

    let upcoming = forecast.leading(thresholds.forecast_window);

    let heavy_rain = upcoming.iter().any(|entry| {
        entry.rain_3h.unwrap_or(0.0) > thresholds.rain_3h_mm
            || entry.rain_1h.unwrap_or(0.0) > thresholds.rain_1h_mm
    });
    if heavy_rain {
        kinds.push(AlertKind::HeavyRain);
    }

    let thunderstorm = upcoming.iter().any(|entry| entry.mentions("thunderstorm"));
    if thunderstorm {
        kinds.push(AlertKind::Thunderstorm);
    }

    let alerts: Vec<Alert> = kinds
        .into_iter()
        .map(|kind| Alert::from_kind(kind, thresholds))
        .collect();

    tracing::debug!(
        count = alerts.len(),
        temperature = weather.temperature,
        wind_speed = weather.wind_speed,
        forecast_entries = forecast.entries.len(),
        "Derived weather alerts"
    );

    alerts
}
