//! Feedback loop: shared distance to buzzer cadence

use crate::algorithms::{BeepTiming, Cadence, CadencePolicy, CadenceState, Zone};
use crate::core::Distance;
use crate::device::{ProximitySnapshot, SharedState};
use crate::hardware::BuzzerActuator;
use crate::utils::ConfigError;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Feedback loop pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Sleep between cycles (milliseconds)
    pub poll_interval_ms: u32,
    /// Treat the distance as unknown once the last fix is this old
    pub stale_after_ms: Option<u32>,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            stale_after_ms: Some(10_000),
        }
    }
}

impl FeedbackConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms as u64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=1000).contains(&self.poll_interval_ms) {
            return Err(ConfigError::InvalidParameter {
                parameter: "feedback.poll_interval_ms".to_string(),
                value: self.poll_interval_ms.to_string(),
                reason: "must be between 1 and 1000".to_string(),
            });
        }
        if let Some(stale) = self.stale_after_ms {
            if stale < 100 {
                return Err(ConfigError::InvalidParameter {
                    parameter: "feedback.stale_after_ms".to_string(),
                    value: stale.to_string(),
                    reason: "must be at least 100".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Result of one feedback cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedbackAction {
    /// A beep pattern was issued
    Beeped(BeepTiming),
    /// Previous pattern still within its off-time
    Waiting,
    /// Idle cadence turned an active buzzer off
    Silenced,
    /// Idle cadence, buzzer already quiet
    Quiet,
    /// The buzzer refused the request
    Failed,
}

/// Feedback side of the detector; owns the buzzer
pub struct FeedbackLoop<B: BuzzerActuator> {
    buzzer: B,
    policy: CadencePolicy,
    cadence_state: CadenceState,
    config: FeedbackConfig,
    state: Arc<SharedState>,
    running: Arc<AtomicBool>,
    last_zone: Option<Zone>,
    stale: bool,
}

impl<B: BuzzerActuator> FeedbackLoop<B> {
    pub fn new(
        buzzer: B,
        policy: CadencePolicy,
        config: FeedbackConfig,
        state: Arc<SharedState>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            buzzer,
            policy,
            cadence_state: CadenceState::new(),
            config,
            state,
            running,
            last_zone: None,
            stale: false,
        }
    }

    /// Distance to act on, `None` when there is no fix or it went stale
    fn effective_distance(&mut self, snapshot: &ProximitySnapshot, now: Instant) -> Option<Distance> {
        let distance = snapshot.current_distance?;

        let stale = match (self.config.stale_after_ms, snapshot.fix_age(now)) {
            (Some(limit), Some(age)) => age > Duration::from_millis(limit as u64),
            _ => false,
        };

        if stale != self.stale {
            if stale {
                warn!("No valid GPS fix for over {} ms, treating distance as unknown",
                    self.config.stale_after_ms.unwrap_or_default());
            } else {
                info!("GPS fix recovered");
            }
            self.stale = stale;
        }

        if stale {
            None
        } else {
            Some(distance)
        }
    }

    fn log_transition(&mut self, cadence: &Cadence) {
        let zone = cadence.zone();
        if self.last_zone != Some(zone) {
            match self.last_zone {
                Some(previous) => info!("Zone {} -> {}", previous, zone),
                None => info!("Zone {}", zone),
            }
            self.last_zone = Some(zone);
        }

        if let (Cadence::Approaching(next), Some(active)) = (cadence, self.cadence_state.active()) {
            if *next != active {
                debug!("Cadence {} -> {}", active, next);
            }
        }
    }

    /// One cycle: snapshot, cadence, debounce, actuate
    pub fn cycle(&mut self, now: Instant) -> FeedbackAction {
        let snapshot = self.state.snapshot();
        let distance = self.effective_distance(&snapshot, now);
        let cadence = self.policy.compute_cadence(distance);
        self.log_transition(&cadence);

        let timing = match cadence.timing() {
            Some(timing) => timing,
            None => {
                self.cadence_state.clear();
                if !self.buzzer.is_active() {
                    return FeedbackAction::Quiet;
                }
                return match self.buzzer.off() {
                    Ok(()) => FeedbackAction::Silenced,
                    Err(e) => {
                        warn!("Failed to silence buzzer: {}", e);
                        FeedbackAction::Failed
                    }
                };
            }
        };

        if !self.cadence_state.is_due(&timing, now) {
            return FeedbackAction::Waiting;
        }

        match self.buzzer.beep(timing.on_time_s, timing.off_time_s, 1) {
            Ok(()) => {
                self.cadence_state.record(timing, now);
                FeedbackAction::Beeped(timing)
            }
            Err(e) => {
                warn!("Buzzer failed ({}): {}", timing, e);
                FeedbackAction::Failed
            }
        }
    }

    /// Run until the running flag clears
    pub fn run(mut self) {
        info!("Feedback loop started");
        let interval = self.config.poll_interval();

        while self.running.load(Ordering::SeqCst) {
            self.cycle(Instant::now());
            std::thread::sleep(interval);
        }
    }

    pub fn cadence_state(&self) -> &CadenceState {
        &self.cadence_state
    }
}

impl<B: BuzzerActuator> Drop for FeedbackLoop<B> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        match self.buzzer.off() {
            Ok(()) => info!("Feedback loop stopped, buzzer off"),
            Err(e) => warn!("Feedback loop stopped, buzzer off failed: {}", e),
        }
    }
}
