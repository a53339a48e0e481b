//! Alert banner controller: runs [`AlertRotation`] on a tokio task.
//!
//! The task is the only owner of rotation state. Commands arrive over an
//! mpsc channel; the periodic rotation tick and the fade timer are armed
//! independently, and every change is published through a `watch` channel. Cancelling the token (or dropping the
//! controller) stops the task; no timer fires afterwards.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::alerts::{derive_with, Alert, AlertThresholds};
use crate::rotation::{AlertRotation, RotationTiming, RotationView, TimerRequest};
use crate::types::{ForecastSnapshot, WeatherSnapshot};

#[derive(Debug)]
enum BannerCommand {
    Replace(Vec<Alert>),
    Dismiss,
}

pub struct BannerController {
    thresholds: AlertThresholds,
    commands: mpsc::UnboundedSender<BannerCommand>,
    view: watch::Receiver<RotationView>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl BannerController {
    /// Spawn the controller task on the current tokio runtime.
    pub fn spawn(thresholds: AlertThresholds, timing: RotationTiming) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (view_tx, view) = watch::channel(RotationView::default());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run(
            AlertRotation::new(timing),
            rx,
            view_tx,
            cancel.clone(),
        ));

        Self {
            thresholds,
            commands,
            view,
            cancel,
            task: Some(task),
        }
    }

    /// Fresh weather arrived: derive alerts and restart the rotation with them.
    pub fn on_weather_updated(
        &self,
        weather: &WeatherSnapshot,
        forecast: &ForecastSnapshot,
    ) -> Vec<Alert> {
        let alerts = derive_with(&self.thresholds, weather, forecast);
        self.replace(alerts.clone());
        alerts
    }

    /// Replace the alert list wholesale.
    pub fn replace(&self, alerts: Vec<Alert>) {
        self.send(BannerCommand::Replace(alerts));
    }

    /// User closed the visible alert.
    pub fn dismiss_current(&self) {
        self.send(BannerCommand::Dismiss);
    }

    /// Latest published state.
    pub fn view(&self) -> RotationView {
        self.view.borrow().clone()
    }

    /// Receiver that is notified on every banner change.
    pub fn subscribe(&self) -> watch::Receiver<RotationView> {
        self.view.clone()
    }

    /// Stop the controller and wait for its task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Banner task ended abnormally: {}", e);
            }
        }
    }

    fn send(&self, command: BannerCommand) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Banner controller stopped; command dropped");
        }
    }
}

impl Drop for BannerController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// A timer request together with its deadline.
#[derive(Debug, Clone, Copy)]
struct Armed {
    timer: TimerRequest,
    at: Instant,
}

/// Keep `slot` in step with the rotation: disarm when nothing is wanted, arm
/// from `now` when the request changed, otherwise leave the deadline alone.
fn sync(slot: &mut Option<Armed>, wanted: Option<TimerRequest>, now: Instant) {
    match wanted {
        None => *slot = None,
        Some(timer) if slot.map(|a| a.timer) != Some(timer) => {
            *slot = Some(Armed {
                timer,
                at: now + timer.delay,
            });
        }
        Some(_) => {}
    }
}

async fn run(
    mut rotation: AlertRotation,
    mut commands: mpsc::UnboundedReceiver<BannerCommand>,
    view: watch::Sender<RotationView>,
    cancel: CancellationToken,
) {
    let mut rotate: Option<Armed> = None;
    let mut fade: Option<Armed> = None;

    loop {
        let rotate_at = rotate.map(|a| a.at);
        let fade_at = fade.map(|a| a.at);

        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            command = commands.recv() => match command {
                Some(BannerCommand::Replace(alerts)) => {
                    tracing::debug!(count = alerts.len(), "Banner received alerts");
                    rotation.replace(alerts);
                }
                Some(BannerCommand::Dismiss) => {
                    rotation.dismiss_current();
                }
                None => break,
            },

            _ = tokio::time::sleep_until(fade_at.unwrap_or_else(Instant::now)), if fade_at.is_some() => {
                if let Some(armed) = fade.take() {
                    rotation.on_timer(armed.timer.kind, armed.timer.epoch);
                }
            }

            _ = tokio::time::sleep_until(rotate_at.unwrap_or_else(Instant::now)), if rotate_at.is_some() => {
                if let Some(armed) = rotate.as_mut() {
                    rotation.on_timer(armed.timer.kind, armed.timer.epoch);
                    // Next tick is anchored to the previous deadline, not to
                    // when this one was handled.
                    armed.at += armed.timer.delay;
                    let now = Instant::now();
                    if armed.at <= now {
                        armed.at = now + armed.timer.delay;
                    }
                }
            }
        }

        let now = Instant::now();
        sync(&mut rotate, rotation.rotate_timer(), now);
        sync(&mut fade, rotation.fade_timer(), now);

        view.send_replace(rotation.view());
    }

    rotation.teardown();
    view.send_replace(rotation.view());
    tracing::debug!("Banner controller stopped");
}
