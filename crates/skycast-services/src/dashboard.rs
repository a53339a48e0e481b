//! Dashboard session: what is shown, for which city, and the actions on it.
//!
//! Every successful load replaces the current conditions and forecast and
//! hands them to the alert banner, which restarts its rotation.

use serde::Serialize;
use skycast_core::security::{safe_error_message, sanitize_input};
use skycast_core::{AppError, Config};
use skycast_weather::{
    Alert, AlertThresholds, BannerController, Coordinates, ForecastSnapshot, Place,
    RotationTiming, WeatherProvider, WeatherSnapshot,
};

use crate::favorites::Favorites;
use crate::notification::Notification;

/// Whether the user allowed access to their position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationPermission {
    #[default]
    Unknown,
    Granted,
    Denied,
}

pub struct Dashboard {
    provider: WeatherProvider,
    banner: BannerController,
    favorites: Favorites,
    default_city: String,
    current_city: Option<String>,
    weather: Option<WeatherSnapshot>,
    forecast: Option<ForecastSnapshot>,
    alerts: Vec<Alert>,
    error: Option<String>,
}

impl Dashboard {
    pub fn new(
        provider: WeatherProvider,
        banner: BannerController,
        favorites: Favorites,
        default_city: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            banner,
            favorites,
            default_city: default_city.into(),
            current_city: None,
            weather: None,
            forecast: None,
            alerts: Vec::new(),
            error: None,
        }
    }

    /// Must be called inside a tokio runtime; the banner task is spawned here.
    pub fn from_config(config: &Config, favorites: Favorites) -> Result<Self, AppError> {
        let provider = WeatherProvider::from_config(&config.api)?;
        let banner = BannerController::spawn(
            AlertThresholds::from(&config.alerts),
            RotationTiming::from(&config.alerts),
        );
        Ok(Self::new(
            provider,
            banner,
            favorites,
            config.weather.default_city.clone(),
        ))
    }

    /// First load. Uses the user's position when allowed, otherwise (or if
    /// that fails) the default city.
    pub async fn load_initial(
        &mut self,
        permission: LocationPermission,
        coordinates: Option<Coordinates>,
    ) -> Result<(), AppError> {
        if let (LocationPermission::Granted, Some(coordinates)) = (permission, coordinates) {
            match self.load(Place::Coordinates(coordinates)).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        "Weather for current location failed, using {}: {}",
                        self.default_city,
                        e
                    );
                }
            }
        }

        let city = self.default_city.clone();
        self.load(Place::City(city)).await
    }

    /// Load `city`. Returns `Ok(false)` when the query is blank.
    pub async fn search(&mut self, city: &str) -> Result<bool, AppError> {
        let city = city.trim();
        if city.is_empty() {
            return Ok(false);
        }
        self.load(Place::City(city.to_string())).await?;
        Ok(true)
    }

    /// Reload the current city. `None` if nothing has been loaded yet.
    ///
    /// A failed refresh is reported only through the returned notification;
    /// the data and error message on screen are left as they were.
    pub async fn refresh(&mut self) -> Option<Notification> {
        let city = self.current_city.clone()?;
        let previous_error = self.error.clone();
        Some(match self.load(Place::City(city)).await {
            Ok(()) => Notification::success("Weather updated"),
            Err(_) => {
                self.error = previous_error;
                Notification::error("Weather could not be updated")
            }
        })
    }

    pub fn add_current_to_favorites(&self) -> Result<Option<Notification>, AppError> {
        let Some(city) = self.current_city.as_deref() else {
            return Ok(None);
        };

        Ok(Some(if self.favorites.add(city)? {
            Notification::success(format!("{} added to favorites", city))
        } else {
            Notification::info(format!("{} is already in your favorites", city))
        }))
    }

    pub fn remove_favorite(&self, city: &str) -> Result<Option<Notification>, AppError> {
        Ok(self
            .favorites
            .remove(city)?
            .then(|| Notification::info(format!("{} removed from favorites", city.trim()))))
    }

    /// One-line summary for sharing, e.g. "Istanbul: 21°C, clear sky".
    pub fn share_text(&self) -> Option<String> {
        let weather = self.weather.as_ref()?;
        let city = if weather.city_name.is_empty() {
            self.current_city.as_deref()?
        } else {
            weather.city_name.as_str()
        };
        Some(format!(
            "{}: {}°C, {}",
            city,
            weather.temperature.round() as i64,
            weather.description
        ))
    }

    /// User closed the visible alert.
    pub fn dismiss_alert(&self) {
        self.banner.dismiss_current();
    }

    pub fn current_city(&self) -> Option<&str> {
        self.current_city.as_deref()
    }

    pub fn weather(&self) -> Option<&WeatherSnapshot> {
        self.weather.as_ref()
    }

    pub fn forecast(&self) -> Option<&ForecastSnapshot> {
        self.forecast.as_ref()
    }

    /// Alerts derived from the last successful load.
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    /// Message for the last failed load, cleared by the next success.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn banner(&self) -> &BannerController {
        &self.banner
    }

    pub fn favorites(&self) -> &Favorites {
        &self.favorites
    }

    pub async fn shutdown(self) {
        self.banner.shutdown().await;
    }

    async fn load(&mut self, place: Place) -> Result<(), AppError> {
        match self.provider.fetch(&place).await {
            Ok((weather, forecast)) => {
                self.current_city = Some(match &place {
                    Place::City(city) => city.clone(),
                    Place::Coordinates(_) => weather.city_name.clone(),
                });
                self.alerts = self.banner.on_weather_updated(&weather, &forecast);
                tracing::info!(
                    city = %weather.city_name,
                    alerts = self.alerts.len(),
                    "Dashboard updated"
                );
                self.weather = Some(weather);
                self.forecast = Some(forecast);
                self.error = None;
                Ok(())
            }
            Err(e) => {
                let err = AppError::from(e);
                self.error = Some(match (&place, &err) {
                    (
                        Place::City(city),
                        AppError::Weather(skycast_core::WeatherError::LocationNotFound(_)),
                    ) => format!("No weather found for \"{}\"", sanitize_input(city)),
                    _ => err.user_message().to_string(),
                });
                tracing::error!("Weather load failed: {}", safe_error_message(&err.to_string()));
                Err(err)
            }
        }
    }
}
