use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Timelike;
use skycast_core::Config;
use skycast_services::{
    format_countdown, AutoRefresh, Dashboard, Favorites, LocationPermission, Preferences,
    RefreshTrigger, SqliteKvStore, Storage,
};
use skycast_weather::{recommend, DAILY_DAYS};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    skycast_core::init()?;

    let (config, _) = Config::load_validated()?;
    tracing::info!("Config directory: {}", config.config_dir.display());

    std::fs::create_dir_all(&config.config_dir).context("Failed to create config directory")?;
    let storage = match SqliteKvStore::open(config.database_path()) {
        Ok(store) => Storage::new(store),
        Err(e) => {
            tracing::warn!("Falling back to in-memory storage: {}", e);
            Storage::memory()
        }
    };

    let preferences = Preferences::new(storage.clone(), config.ui.dark_mode);
    tracing::info!(dark_mode = preferences.dark_mode(), "Preferences loaded");

    let favorites = Favorites::new(storage);
    let saved = favorites.list();
    if !saved.is_empty() {
        tracing::info!("Favorites: {}", saved.join(", "));
    }

    let mut dashboard = Dashboard::from_config(&config, favorites)?;

    let loaded = match std::env::args().nth(1) {
        Some(city) => dashboard.search(&city).await.map(|_| ()),
        None => dashboard.load_initial(LocationPermission::Unknown, None).await,
    };
    match loaded {
        Ok(()) => report(&dashboard),
        Err(e) => tracing::error!("{}", dashboard.error().unwrap_or(e.user_message())),
    }

    let (refresh, mut triggers) = if config.weather.refresh_minutes > 0 {
        let interval = Duration::from_secs(u64::from(config.weather.refresh_minutes) * 60);
        let (refresh, triggers) = AutoRefresh::spawn(interval);
        tracing::info!(
            "Auto-refresh every {}",
            format_countdown(refresh.view().remaining_secs)
        );
        (Some(refresh), Some(triggers))
    } else {
        (None, None)
    };

    let mut banner = dashboard.banner().subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
            trigger = next_trigger(&mut triggers) => {
                let Some(trigger) = trigger else {
                    triggers = None;
                    continue;
                };
                tracing::debug!(?trigger, "Refreshing");
                if let Some(notification) = dashboard.refresh().await {
                    tracing::info!(kind = ?notification.kind, "{}", notification.message);
                    if dashboard.error().is_none() {
                        report(&dashboard);
                    }
                }
            }
            changed = banner.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = banner.borrow_and_update().clone();
                match (view.current, view.index) {
                    (Some(alert), Some(index)) if view.visible => tracing::warn!(
                        severity = alert.severity.as_str(),
                        "[{}/{}] {}: {}",
                        index + 1,
                        view.total,
                        alert.title,
                        alert.description
                    ),
                    _ if view.fully_dismissed => tracing::info!("Alerts dismissed"),
                    _ => {}
                }
            }
        }
    }

    if let Some(refresh) = refresh {
        refresh.shutdown().await;
    }
    dashboard.shutdown().await;

    Ok(())
}

async fn next_trigger(
    triggers: &mut Option<mpsc::UnboundedReceiver<RefreshTrigger>>,
) -> Option<RefreshTrigger> {
    match triggers {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn report(dashboard: &Dashboard) {
    let Some(weather) = dashboard.weather() else {
        return;
    };

    tracing::info!(
        city = %weather.city_name,
        temperature = weather.temperature,
        wind_speed = weather.wind_speed,
        icon = weather.condition().icon_name(),
        "{} ({})",
        weather.condition().description(),
        weather.description
    );

    for rec in recommend(weather, chrono::Local::now().hour()) {
        tracing::info!(kind = ?rec.kind, "{}", rec.text);
    }

    if let Some(forecast) = dashboard.forecast() {
        for day in forecast.daily(DAILY_DAYS) {
            tracing::info!(
                icon = day.representative.condition().icon_name(),
                "{}: {}, {} / {}",
                day.date.format("%a %d %b"),
                day.outlook.label(),
                format_temp(day.min_temp),
                format_temp(day.max_temp)
            );
        }
    }

    if dashboard.alerts().is_empty() {
        tracing::info!("No active weather alerts");
    }
}

fn format_temp(celsius: Option<f64>) -> String {
    celsius
        .map(|t| format!("{}°C", t.round() as i64))
        .unwrap_or_else(|| "-".to_string())
}
