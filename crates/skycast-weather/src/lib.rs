//! Weather data, threshold alerts and the rotating alert banner.
//!
//! Fetches conditions from an OpenWeatherMap-compatible API, derives
//! alerts from them and drives the banner that presents those alerts.

pub mod alerts;
pub mod banner;
pub mod provider;
pub mod recommendations;
pub mod rotation;
pub mod types;

pub use alerts::{derive, derive_with, Alert, AlertKind, AlertThresholds, Severity};
pub use banner::BannerController;
pub use provider::{Place, WeatherProvider};
pub use recommendations::{recommend, Recommendation, RecommendationKind};
pub use rotation::{AlertRotation, Phase, RotationTiming, RotationView};
pub use types::*;

use skycast_core::{AppError, NetworkError};
use skycast_core::error::ReqwestErrorExt;

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::Network(err) => AppError::Network(err.into_network_error()),
            WeatherError::NotFound(place) => {
                AppError::Weather(skycast_core::WeatherError::LocationNotFound(place))
            }
            WeatherError::InvalidApiKey => {
                AppError::Weather(skycast_core::WeatherError::InvalidApiKey)
            }
            WeatherError::InvalidCoordinates { lat, lon } => {
                AppError::Weather(skycast_core::WeatherError::InvalidCoordinates { lat, lon })
            }
            WeatherError::Api { status, .. } if status >= 500 => {
                AppError::Weather(skycast_core::WeatherError::ServiceUnavailable)
            }
            WeatherError::Api { status, message } => AppError::Weather(
                skycast_core::WeatherError::ApiError(format!("{} - {}", status, message)),
            ),
            WeatherError::Parse(msg) => AppError::Network(NetworkError::InvalidResponse(msg)),
        }
    }
}
