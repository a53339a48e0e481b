//! Alert banner rotation state machine.
//!
//! Pure and clock-free. Two timers can be pending at once: the periodic
//! rotation tick, armed when the alert list is replaced and kept at a fixed
//! cadence until the next replace, and the one-shot fade that ends a
//! fade-out. Each request is stamped with the epoch it was armed at; a tick
//! whose epoch does not match the pending request of its kind is stale and
//! ignored. The async driver lives in [`crate::banner`].

use std::time::Duration;

use serde::Serialize;
use skycast_core::AlertConfig;

use crate::alerts::Alert;

/// Banner timings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationTiming {
    /// How long an alert stays visible before advancing
    pub rotate_interval: Duration,
    /// Fade-out duration before the next alert appears
    pub fade_delay: Duration,
}

impl Default for RotationTiming {
    fn default() -> Self {
        Self::from(&AlertConfig::default())
    }
}

impl From<&AlertConfig> for RotationTiming {
    fn from(config: &AlertConfig) -> Self {
        Self {
            rotate_interval: Duration::from_millis(config.rotate_interval_ms),
            fade_delay: Duration::from_millis(config.fade_delay_ms),
        }
    }
}

/// Presentation phase of the banner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Empty,
    Showing(usize),
    FadingOut(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Periodic rotation tick; start fading out
    Rotate,
    /// Fade finished; show the next alert
    Fade,
}

/// A timer the driver should keep armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRequest {
    pub kind: TimerKind,
    pub delay: Duration,
    pub epoch: u64,
}

/// Read-only view of the rotation for the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RotationView {
    pub phase: Phase,
    pub current: Option<Alert>,
    pub index: Option<usize>,
    pub total: usize,
    pub visible: bool,
    /// The only alert was dismissed; the banner region can be hidden
    pub fully_dismissed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AlertRotation {
    alerts: Vec<Alert>,
    phase: Phase,
    epoch: u64,
    rotate: Option<TimerRequest>,
    fade: Option<TimerRequest>,
    fully_dismissed: bool,
    timing: RotationTiming,
}

impl AlertRotation {
    pub fn new(timing: RotationTiming) -> Self {
        Self {
            timing,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Periodic rotation tick. Repeats every `rotate_interval` from the
    /// moment it was armed; fades and dismissals do not move it.
    pub fn rotate_timer(&self) -> Option<TimerRequest> {
        self.rotate
    }

    /// One-shot timer ending the current fade-out.
    pub fn fade_timer(&self) -> Option<TimerRequest> {
        self.fade
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.phase, Phase::Showing(_))
    }

    pub fn is_fully_dismissed(&self) -> bool {
        self.fully_dismissed
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.phase {
            Phase::Showing(i) | Phase::FadingOut(i) => Some(i),
            Phase::Empty => None,
        }
    }

    pub fn current(&self) -> Option<&Alert> {
        self.current_index().and_then(|i| self.alerts.get(i))
    }

    pub fn view(&self) -> RotationView {
        RotationView {
            phase: self.phase,
            current: self.current().cloned(),
            index: self.current_index(),
            total: self.alerts.len(),
            visible: self.is_visible(),
            fully_dismissed: self.fully_dismissed,
        }
    }

    /// Replace the alert list wholesale. Always restarts from the first alert,
    /// cancels both timers and arms a fresh rotation tick when there is more
    /// than one alert. Returns that tick.
    pub fn replace(&mut self, alerts: Vec<Alert>) -> Option<TimerRequest> {
        self.alerts = alerts;
        self.fully_dismissed = false;
        self.fade = None;

        if self.alerts.is_empty() {
            self.transition(Phase::Empty);
        } else {
            self.transition(Phase::Showing(0));
        }

        self.rotate = (self.alerts.len() > 1).then_some(TimerRequest {
            kind: TimerKind::Rotate,
            delay: self.timing.rotate_interval,
            epoch: self.epoch,
        });
        self.rotate
    }

    /// User dismissed the visible alert.
    ///
    /// With several alerts this fades to the next one and returns the fade
    /// timer; the rotation tick keeps its schedule. With a single alert the
    /// banner empties immediately.
    pub fn dismiss_current(&mut self) -> Option<TimerRequest> {
        match self.phase {
            Phase::Empty => {
                tracing::debug!("Dismiss ignored: no alert shown");
                None
            }
            Phase::Showing(_) | Phase::FadingOut(_) if self.alerts.len() == 1 => {
                self.fully_dismissed = true;
                self.rotate = None;
                self.fade = None;
                self.transition(Phase::Empty);
                None
            }
            Phase::Showing(i) | Phase::FadingOut(i) => Some(self.fade_out(i)),
        }
    }

    /// Start fading out the visible alert, as the rotation tick would.
    /// Returns the fade timer.
    pub fn begin_advance(&mut self) -> Option<TimerRequest> {
        match self.phase {
            Phase::Showing(i) if self.alerts.len() > 1 => Some(self.fade_out(i)),
            _ => {
                tracing::debug!(phase = ?self.phase, "Advance ignored");
                None
            }
        }
    }

    /// Finish a fade: show the next alert, wrapping around.
    pub fn complete_advance(&mut self) {
        match self.phase {
            Phase::FadingOut(i) if !self.alerts.is_empty() => {
                let next = (i + 1) % self.alerts.len();
                self.fade = None;
                self.transition(Phase::Showing(next));
            }
            _ => tracing::debug!(phase = ?self.phase, "Fade completion ignored"),
        }
    }

    /// Full advance without waiting for the fade.
    pub fn advance(&mut self) {
        self.begin_advance();
        self.complete_advance();
    }

    /// Deliver a fired timer. Ticks that do not match the pending request of
    /// their kind are dropped. Returns a newly armed fade timer, if any.
    pub fn on_timer(&mut self, kind: TimerKind, epoch: u64) -> Option<TimerRequest> {
        let pending = match kind {
            TimerKind::Rotate => self.rotate,
            TimerKind::Fade => self.fade,
        };
        if pending.map(|t| t.epoch) != Some(epoch) {
            tracing::debug!(?kind, epoch, "Dropping stale banner timer");
            return None;
        }

        match kind {
            TimerKind::Rotate => self.begin_advance(),
            TimerKind::Fade => {
                self.complete_advance();
                None
            }
        }
    }

    /// Stop everything; no timer remains armed.
    pub fn teardown(&mut self) {
        self.alerts.clear();
        self.fully_dismissed = false;
        self.rotate = None;
        self.fade = None;
        self.transition(Phase::Empty);
    }

    fn fade_out(&mut self, index: usize) -> TimerRequest {
        self.transition(Phase::FadingOut(index));
        let fade = TimerRequest {
            kind: TimerKind::Fade,
            delay: self.timing.fade_delay,
            epoch: self.epoch,
        };
        self.fade = Some(fade);
        fade
    }

    fn transition(&mut self, phase: Phase) {
        self.epoch = self.epoch.wrapping_add(1);
        self.phase = phase;
        tracing::debug!(phase = ?self.phase, epoch = self.epoch, "Banner transition");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{derive, AlertKind};
    use crate::types::{ForecastEntry, ForecastSnapshot, WeatherSnapshot};
    use chrono::Utc;

    fn alerts(n: usize) -> Vec<Alert> {
        // heat, wind, heavy rain, thunderstorm: take the first n
        let forecast = ForecastSnapshot::new(vec![
            ForecastEntry::new(Utc::now(), "Thunderstorm").with_rain_3h(20.0),
        ]);
        let mut all = derive(&WeatherSnapshot::new(40.0, 20.0, "Clear"), &forecast);
        all.truncate(n);
        all
    }

    #[test]
    fn test_starts_empty() {
        let rotation = AlertRotation::default();
        assert_eq!(rotation.phase(), Phase::Empty);
        assert!(rotation.current().is_none());
        assert!(!rotation.is_visible());
        assert!(rotation.rotate_timer().is_none());
        assert!(rotation.fade_timer().is_none());
    }

    #[test]
    fn test_replace_with_many_shows_first_and_arms_rotation() {
        let mut rotation = AlertRotation::default();
        let timer = rotation.replace(alerts(3)).unwrap();
        assert_eq!(rotation.phase(), Phase::Showing(0));
        assert!(rotation.is_visible());
        assert_eq!(timer.kind, TimerKind::Rotate);
        assert_eq!(timer.delay, Duration::from_millis(8000));
        assert_eq!(rotation.current().map(|a| a.kind), Some(AlertKind::ExtremeHeat));
    }

    #[test]
    fn test_single_alert_never_rotates() {
        let mut rotation = AlertRotation::default();
        assert!(rotation.replace(alerts(1)).is_none());
        assert!(rotation.begin_advance().is_none());
        assert_eq!(rotation.phase(), Phase::Showing(0));
    }

    #[test]
    fn test_replace_with_empty_list() {
        let mut rotation = AlertRotation::default();
        rotation.replace(alerts(2));
        assert!(rotation.replace(Vec::new()).is_none());
        assert_eq!(rotation.phase(), Phase::Empty);
        assert!(rotation.fade_timer().is_none());
        assert!(!rotation.is_fully_dismissed());
    }

    #[test]
    fn test_advance_cycles_back_to_start() {
        let mut rotation = AlertRotation::default();
        rotation.replace(alerts(3));
        let mut seen = Vec::new();
        for _ in 0..3 {
            rotation.advance();
            seen.push(rotation.current_index());
        }
        assert_eq!(seen, vec![Some(1), Some(2), Some(0)]);
    }

    #[test]
    fn test_timer_driven_rotation() {
        let mut rotation = AlertRotation::default();
        let rotate = rotation.replace(alerts(2)).unwrap();

        let fade = rotation.on_timer(rotate.kind, rotate.epoch).unwrap();
        assert_eq!(rotation.phase(), Phase::FadingOut(0));
        assert!(!rotation.is_visible());
        assert_eq!(fade.kind, TimerKind::Fade);
        assert_eq!(fade.delay, Duration::from_millis(500));

        assert!(rotation.on_timer(fade.kind, fade.epoch).is_none());
        assert_eq!(rotation.phase(), Phase::Showing(1));
        assert!(rotation.fade_timer().is_none());
    }

    #[test]
    fn test_rotation_tick_survives_transitions() {
        let mut rotation = AlertRotation::default();
        let rotate = rotation.replace(alerts(3)).unwrap();

        let fade = rotation.on_timer(rotate.kind, rotate.epoch).unwrap();
        rotation.on_timer(fade.kind, fade.epoch);
        assert_eq!(rotation.rotate_timer(), Some(rotate));

        // the same periodic tick keeps driving the rotation
        let fade = rotation.on_timer(rotate.kind, rotate.epoch).unwrap();
        assert_eq!(rotation.phase(), Phase::FadingOut(1));
        rotation.on_timer(fade.kind, fade.epoch);
        assert_eq!(rotation.phase(), Phase::Showing(2));
    }

    #[test]
    fn test_dismiss_single_alert_empties_banner() {
        let mut rotation = AlertRotation::default();
        rotation.replace(alerts(1));
        assert!(rotation.dismiss_current().is_none());
        assert_eq!(rotation.phase(), Phase::Empty);
        assert!(rotation.is_fully_dismissed());
        assert!(rotation.view().fully_dismissed);
    }

    #[test]
    fn test_dismiss_with_many_keeps_rotation_schedule() {
        let mut rotation = AlertRotation::default();
        let rotate = rotation.replace(alerts(3)).unwrap();
        let fade = rotation.dismiss_current().unwrap();
        assert_eq!(rotation.phase(), Phase::FadingOut(0));
        assert_eq!(rotation.rotate_timer(), Some(rotate));

        rotation.on_timer(fade.kind, fade.epoch);
        assert_eq!(rotation.phase(), Phase::Showing(1));
        assert!(!rotation.is_fully_dismissed());

        rotation.on_timer(rotate.kind, rotate.epoch);
        assert_eq!(rotation.phase(), Phase::FadingOut(1));
    }

    #[test]
    fn test_rotation_tick_during_manual_fade_is_ignored() {
        let mut rotation = AlertRotation::default();
        let rotate = rotation.replace(alerts(3)).unwrap();
        let fade = rotation.dismiss_current().unwrap();

        assert!(rotation.on_timer(rotate.kind, rotate.epoch).is_none());
        assert_eq!(rotation.fade_timer(), Some(fade));

        rotation.on_timer(fade.kind, fade.epoch);
        assert_eq!(rotation.phase(), Phase::Showing(1));
    }

    #[test]
    fn test_dismiss_during_automatic_fade_restarts_fade() {
        let mut rotation = AlertRotation::default();
        let rotate = rotation.replace(alerts(3)).unwrap();
        let auto_fade = rotation.on_timer(rotate.kind, rotate.epoch).unwrap();
        let manual_fade = rotation.dismiss_current().unwrap();
        assert_ne!(auto_fade.epoch, manual_fade.epoch);

        rotation.on_timer(auto_fade.kind, auto_fade.epoch);
        assert_eq!(rotation.phase(), Phase::FadingOut(0));

        rotation.on_timer(manual_fade.kind, manual_fade.epoch);
        assert_eq!(rotation.phase(), Phase::Showing(1));
    }

    #[test]
    fn test_replace_while_fading_cancels_both_timers() {
        let mut rotation = AlertRotation::default();
        let old_rotate = rotation.replace(alerts(3)).unwrap();
        rotation.advance();
        let stale_fade = rotation.begin_advance().unwrap();
        assert_eq!(rotation.phase(), Phase::FadingOut(1));

        let new_rotate = rotation.replace(alerts(2)).unwrap();
        assert_ne!(old_rotate.epoch, new_rotate.epoch);
        assert_eq!(rotation.phase(), Phase::Showing(0));
        assert!(rotation.fade_timer().is_none());

        rotation.on_timer(stale_fade.kind, stale_fade.epoch);
        rotation.on_timer(old_rotate.kind, old_rotate.epoch);
        assert_eq!(rotation.phase(), Phase::Showing(0));
        assert_eq!(rotation.current().map(|a| a.kind), Some(AlertKind::ExtremeHeat));
    }

    #[test]
    fn test_guarded_noops_on_empty() {
        let mut rotation = AlertRotation::default();
        rotation.advance();
        rotation.complete_advance();
        assert!(rotation.begin_advance().is_none());
        assert!(rotation.dismiss_current().is_none());
        assert_eq!(rotation.phase(), Phase::Empty);
    }

    #[test]
    fn test_teardown_disarms_timers() {
        let mut rotation = AlertRotation::default();
        let rotate = rotation.replace(alerts(3)).unwrap();
        rotation.dismiss_current();
        rotation.teardown();
        assert!(rotation.rotate_timer().is_none());
        assert!(rotation.fade_timer().is_none());
        assert!(rotation.on_timer(rotate.kind, rotate.epoch).is_none());
        assert_eq!(rotation.phase(), Phase::Empty);
    }

    #[test]
    fn test_timing_from_config() {
        let config = AlertConfig {
            rotate_interval_ms: 3000,
            fade_delay_ms: 250,
            ..AlertConfig::default()
        };
        let timing = RotationTiming::from(&config);
        assert_eq!(timing.rotate_interval, Duration::from_secs(3));
        assert_eq!(timing.fade_delay, Duration::from_millis(250));
    }
}
