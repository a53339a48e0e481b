//! Auto-refresh countdown.
//!
//! [`Countdown`] is the pure one-second-tick state; [`AutoRefresh`] runs it
//! on a tokio task and emits a [`RefreshTrigger`] whenever data should be
//! reloaded.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const TICK: Duration = Duration::from_secs(1);

/// Why a refresh was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Scheduled,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CountdownView {
    pub remaining_secs: u64,
    pub paused: bool,
}

#[derive(Debug, Clone)]
pub struct Countdown {
    interval_secs: u64,
    remaining_secs: u64,
    paused: bool,
}

impl Countdown {
    /// `interval_secs` of 0 is treated as 1.
    pub fn new(interval_secs: u64) -> Self {
        let interval_secs = interval_secs.max(1);
        Self {
            interval_secs,
            remaining_secs: interval_secs,
            paused: false,
        }
    }

    /// Advance one second. Returns true when the countdown ran out; it is
    /// then already restarted.
    pub fn tick(&mut self) -> bool {
        if self.paused {
            return false;
        }
        if self.remaining_secs <= 1 {
            self.remaining_secs = self.interval_secs;
            return true;
        }
        self.remaining_secs -= 1;
        false
    }

    pub fn reset(&mut self) {
        self.remaining_secs = self.interval_secs;
    }

    /// Returns the new paused state.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn view(&self) -> CountdownView {
        CountdownView {
            remaining_secs: self.remaining_secs,
            paused: self.paused,
        }
    }
}

/// `m:ss`, e.g. 605 -> "10:05".
pub fn format_countdown(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[derive(Debug)]
enum RefreshCommand {
    Now,
    TogglePause,
}

/// Handle to the running countdown task.
pub struct AutoRefresh {
    commands: mpsc::UnboundedSender<RefreshCommand>,
    view: watch::Receiver<CountdownView>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl AutoRefresh {
    /// Spawn the countdown on the current runtime. Triggers are delivered on
    /// the returned receiver.
    pub fn spawn(interval: Duration) -> (Self, mpsc::UnboundedReceiver<RefreshTrigger>) {
        let countdown = Countdown::new(interval.as_secs());
        let (commands, rx) = mpsc::unbounded_channel();
        let (triggers_tx, triggers) = mpsc::unbounded_channel();
        let (view_tx, view) = watch::channel(countdown.view());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run(countdown, rx, triggers_tx, view_tx, cancel.clone()));

        (
            Self {
                commands,
                view,
                cancel,
                task: Some(task),
            },
            triggers,
        )
    }

    /// Request a refresh immediately and restart the countdown.
    pub fn refresh_now(&self) {
        self.send(RefreshCommand::Now);
    }

    pub fn toggle_pause(&self) {
        self.send(RefreshCommand::TogglePause);
    }

    pub fn view(&self) -> CountdownView {
        *self.view.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CountdownView> {
        self.view.clone()
    }

    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Refresh task ended abnormally: {}", e);
            }
        }
    }

    fn send(&self, command: RefreshCommand) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Auto-refresh stopped; command dropped");
        }
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    mut countdown: Countdown,
    mut commands: mpsc::UnboundedReceiver<RefreshCommand>,
    triggers: mpsc::UnboundedSender<RefreshTrigger>,
    view: watch::Sender<CountdownView>,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let trigger = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(RefreshCommand::Now) => {
                    countdown.reset();
                    ticker.reset();
                    Some(RefreshTrigger::Manual)
                }
                Some(RefreshCommand::TogglePause) => {
                    let paused = countdown.toggle_pause();
                    tracing::info!(paused, "Auto-refresh toggled");
                    None
                }
                None => break,
            },
            _ = ticker.tick() => countdown.tick().then_some(RefreshTrigger::Scheduled),
        };

        view.send_replace(countdown.view());

        if let Some(trigger) = trigger {
            tracing::debug!(?trigger, "Refresh due");
            if triggers.send(trigger).is_err() {
                break;
            }
        }
    }

    tracing::debug!("Auto-refresh stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_fires_after_interval() {
        let mut countdown = Countdown::new(3);
        assert!(!countdown.tick());
        assert!(!countdown.tick());
        assert!(countdown.tick());
        assert_eq!(countdown.view().remaining_secs, 3);
    }

    #[test]
    fn test_paused_countdown_holds() {
        let mut countdown = Countdown::new(2);
        assert!(countdown.toggle_pause());
        for _ in 0..5 {
            assert!(!countdown.tick());
        }
        assert_eq!(countdown.view().remaining_secs, 2);
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(600), "10:00");
        assert_eq!(format_countdown(65), "1:05");
        assert_eq!(format_countdown(9), "0:09");
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_trigger() {
        let (refresh, mut triggers) = AutoRefresh::spawn(Duration::from_secs(3));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(triggers.try_recv().is_err());
        assert_eq!(refresh.view().remaining_secs, 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(triggers.recv().await, Some(RefreshTrigger::Scheduled));
        assert_eq!(refresh.view().remaining_secs, 3);

        refresh.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_refresh_restarts_countdown() {
        let (refresh, mut triggers) = AutoRefresh::spawn(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_millis(4500)).await;
        refresh.refresh_now();
        assert_eq!(triggers.recv().await, Some(RefreshTrigger::Manual));
        assert_eq!(refresh.view().remaining_secs, 10);

        refresh.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_triggers() {
        let (refresh, mut triggers) = AutoRefresh::spawn(Duration::from_secs(2));
        refresh.toggle_pause();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(triggers.try_recv().is_err());
        assert!(refresh.view().paused);

        refresh.toggle_pause();
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(triggers.recv().await, Some(RefreshTrigger::Scheduled));

        refresh.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_triggers() {
        let (refresh, mut triggers) = AutoRefresh::spawn(Duration::from_secs(1));
        refresh.shutdown().await;
        assert_eq!(triggers.recv().await, None);
    }
}
