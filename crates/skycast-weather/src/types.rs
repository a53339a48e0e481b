use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Weather condition groups as reported in the API's `weather[].main` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    Clouds,
    Drizzle,
    Rain,
    Snow,
    Thunderstorm,
    /// Mist, fog, haze and the other low-visibility groups
    Atmosphere,
    Other,
}

impl WeatherCondition {
    /// Classify a `weather[].main` string, ignoring case
    pub fn from_main(main: &str) -> Self {
        let main = main.trim().to_lowercase();
        match main.as_str() {
            "clear" => Self::Clear,
            "clouds" => Self::Clouds,
            "drizzle" => Self::Drizzle,
            "rain" => Self::Rain,
            "snow" => Self::Snow,
            "thunderstorm" => Self::Thunderstorm,
            "mist" | "smoke" | "haze" | "dust" | "fog" | "sand" | "ash" | "squall"
            | "tornado" => Self::Atmosphere,
            _ => Self::Other,
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::Clouds => "Cloudy",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::Snow => "Snow",
            Self::Thunderstorm => "Thunderstorm",
            Self::Atmosphere => "Low visibility",
            Self::Other => "Unknown",
        }
    }

    /// Animation/icon name used by the presentation layer
    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Clear => "sun",
            Self::Clouds => "cloud",
            Self::Drizzle | Self::Rain => "cloud_rain",
            Self::Snow => "cloud_snow",
            Self::Thunderstorm => "cloud_lightning",
            Self::Atmosphere => "cloud_fog",
            Self::Other => "cloud",
        }
    }
}

/// Geographic coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Current conditions for one place (metric units)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// °C
    pub temperature: f64,
    /// m/s
    pub wind_speed: f64,
    /// Raw condition group, e.g. "Clear", "Thunderstorm"
    pub condition_main: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub city_name: String,
    #[serde(default)]
    pub feels_like: Option<f64>,
    #[serde(default)]
    pub humidity: Option<u8>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub observed_at: Option<DateTime<Utc>>,
    /// hPa
    #[serde(default)]
    pub pressure: Option<f64>,
    /// Meters
    #[serde(default)]
    pub visibility: Option<u32>,
    #[serde(default)]
    pub sunrise: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sunset: Option<DateTime<Utc>>,
}

impl WeatherSnapshot {
    /// Minimal snapshot with only the fields alert derivation reads
    pub fn new(temperature: f64, wind_speed: f64, condition_main: impl Into<String>) -> Self {
        Self {
            temperature,
            wind_speed,
            condition_main: condition_main.into(),
            description: String::new(),
            city_name: String::new(),
            feels_like: None,
            humidity: None,
            coordinates: None,
            observed_at: None,
            pressure: None,
            visibility: None,
            sunrise: None,
            sunset: None,
        }
    }

    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_main(&self.condition_main)
    }
}

/// One forecast bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub timestamp: DateTime<Utc>,
    /// First reported condition group
    pub condition_main: String,
    /// Every reported condition group, `condition_main` first
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub temp_min: Option<f64>,
    #[serde(default)]
    pub temp_max: Option<f64>,
    #[serde(default)]
    pub humidity: Option<u8>,
    /// Rain accumulation over the last 3 hours, mm
    #[serde(default)]
    pub rain_3h: Option<f64>,
    /// Rain accumulation over the last hour, mm
    #[serde(default)]
    pub rain_1h: Option<f64>,
}

impl ForecastEntry {
    pub fn new(timestamp: DateTime<Utc>, condition_main: impl Into<String>) -> Self {
        let condition_main = condition_main.into();
        Self {
            timestamp,
            conditions: vec![condition_main.clone()],
            condition_main,
            description: String::new(),
            temperature: None,
            temp_min: None,
            temp_max: None,
            humidity: None,
            rain_3h: None,
            rain_1h: None,
        }
    }

    /// Add a secondary condition group
    pub fn with_condition(mut self, main: impl Into<String>) -> Self {
        self.conditions.push(main.into());
        self
    }

    pub fn with_temperature(mut self, celsius: f64) -> Self {
        self.temperature = Some(celsius);
        self
    }

    pub fn with_rain_3h(mut self, mm: f64) -> Self {
        self.rain_3h = Some(mm);
        self
    }

    pub fn with_rain_1h(mut self, mm: f64) -> Self {
        self.rain_1h = Some(mm);
        self
    }

    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_main(&self.condition_main)
    }

    /// True if any reported condition contains `needle`, ignoring case
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        std::iter::once(&self.condition_main)
            .chain(self.conditions.iter())
            .any(|c| c.to_lowercase().contains(&needle))
    }

    fn low(&self) -> Option<f64> {
        self.temp_min.or(self.temperature)
    }

    fn high(&self) -> Option<f64> {
        self.temp_max.or(self.temperature)
    }
}

/// One-word outlook for a forecast day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOutlook {
    Stormy,
    Sleet,
    Snowy,
    Rainy,
    PartlyCloudy,
    Cloudy,
    Clear,
    /// None of the above; carries the first entry's description
    Other(String),
}

impl DayOutlook {
    fn from_entries(entries: &[&ForecastEntry]) -> Self {
        let any = |needle: &str| {
            entries
                .iter()
                .any(|e| e.condition_main.to_lowercase().contains(needle))
        };
        let rain = any("rain") || any("drizzle");
        let snow = any("snow");

        if any("thunder") {
            Self::Stormy
        } else if rain && snow {
            Self::Sleet
        } else if snow {
            Self::Snowy
        } else if rain {
            Self::Rainy
        } else if any("cloud") && any("clear") {
            Self::PartlyCloudy
        } else if any("cloud") {
            Self::Cloudy
        } else if any("clear") {
            Self::Clear
        } else {
            Self::Other(
                entries
                    .first()
                    .map(|e| e.description.clone())
                    .unwrap_or_default(),
            )
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Stormy => "Stormy",
            Self::Sleet => "Rain and snow",
            Self::Snowy => "Snowy",
            Self::Rainy => "Rainy",
            Self::PartlyCloudy => "Partly cloudy",
            Self::Cloudy => "Cloudy",
            Self::Clear => "Clear",
            Self::Other(description) => description,
        }
    }
}

/// Forecast summary for one local calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    /// Midday entry (12:00-14:00 local) if there is one, else the first
    pub representative: ForecastEntry,
    pub outlook: DayOutlook,
}

/// Entries shown in the hourly strip
pub const HOURLY_ENTRIES: usize = 8;
/// Days shown in the daily forecast
pub const DAILY_DAYS: usize = 5;

/// Chronological forecast entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastSnapshot {
    #[serde(default)]
    pub entries: Vec<ForecastEntry>,
    /// Offset of the forecast location from UTC, seconds
    #[serde(default)]
    pub utc_offset_secs: i32,
}

impl ForecastSnapshot {
    pub fn new(entries: Vec<ForecastEntry>) -> Self {
        Self {
            entries,
            utc_offset_secs: 0,
        }
    }

    pub fn with_utc_offset(mut self, secs: i32) -> Self {
        self.utc_offset_secs = secs;
        self
    }

    /// The first `n` entries, or fewer if the forecast is shorter
    pub fn leading(&self, n: usize) -> &[ForecastEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// The next `n` forecast buckets for the hourly strip
    pub fn hourly(&self, n: usize) -> &[ForecastEntry] {
        self.leading(n)
    }

    /// Entries grouped by local calendar day, earliest first, at most `days`
    pub fn daily(&self, days: usize) -> Vec<DailyForecast> {
        let offset = FixedOffset::east_opt(self.utc_offset_secs)
            .unwrap_or_else(|| Utc.fix());

        let mut grouped: BTreeMap<NaiveDate, Vec<&ForecastEntry>> = BTreeMap::new();
        for entry in &self.entries {
            let local = entry.timestamp.with_timezone(&offset);
            grouped.entry(local.date_naive()).or_default().push(entry);
        }

        grouped
            .into_iter()
            .take(days)
            .filter_map(|(date, entries)| {
                let representative = entries
                    .iter()
                    .find(|e| (12..=14).contains(&e.timestamp.with_timezone(&offset).hour()))
                    .or_else(|| entries.first())
                    .map(|e| (*e).clone())?;

                Some(DailyForecast {
                    date,
                    min_temp: entries.iter().filter_map(|e| e.low()).reduce(f64::min),
                    max_temp: entries.iter().filter_map(|e| e.high()).reduce(f64::max),
                    outlook: DayOutlook::from_entries(&entries),
                    representative,
                })
            })
            .collect()
    }
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Location not found: {0}")]
    NotFound(String),
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("Invalid coordinates: {lat}, {lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}
