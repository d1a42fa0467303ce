//! Distance-to-cadence mapping and the buzzer re-trigger rule
//!
//! The policy turns the latest known distance into an on/off timing pair:
//! a randomized "searching" cue while far away, a linearly tightening beep
//! while approaching, and the fastest beep once the target is reached. With
//! no fix at all the policy answers `Idle` instead of a number.

use crate::core::{Distance, MAX_PATTERN_TIME_S};
use crate::utils::config::ConfigError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// One buzz cycle: buzzer on for `on_time_s`, then silent for `off_time_s`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeepTiming {
    pub on_time_s: f64,
    pub off_time_s: f64,
}

impl BeepTiming {
    pub fn new(on_time_s: f64, off_time_s: f64) -> Self {
        Self {
            on_time_s,
            off_time_s,
        }
    }
}

impl fmt::Display for BeepTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "on={:.2}s off={:.2}s", self.on_time_s, self.off_time_s)
    }
}

/// Coarse classification of a cadence, used for transition logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    NoFix,
    Searching,
    Approaching,
    Reached,
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Zone::NoFix => "no-fix",
            Zone::Searching => "searching",
            Zone::Approaching => "approaching",
            Zone::Reached => "reached",
        };
        f.write_str(name)
    }
}

/// Output of the cadence policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cadence {
    /// Distance unknown; silent, or the configured heartbeat
    Idle { heartbeat: Option<BeepTiming> },
    /// Beyond the far threshold; off-time randomized per call
    Searching(BeepTiming),
    /// Between the close and far thresholds
    Approaching(BeepTiming),
    /// At or inside the close threshold
    Reached(BeepTiming),
}

impl Cadence {
    pub fn zone(&self) -> Zone {
        match self {
            Cadence::Idle { .. } => Zone::NoFix,
            Cadence::Searching(_) => Zone::Searching,
            Cadence::Approaching(_) => Zone::Approaching,
            Cadence::Reached(_) => Zone::Reached,
        }
    }

    /// Timing to drive, if any
    pub fn timing(&self) -> Option<BeepTiming> {
        match self {
            Cadence::Idle { heartbeat } => *heartbeat,
            Cadence::Searching(t) | Cadence::Approaching(t) | Cadence::Reached(t) => Some(*t),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Cadence::Idle { .. })
    }
}

/// A distance band of the stepped profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepBand {
    /// Upper bound of the band (inclusive, meters)
    pub up_to_m: f64,
    /// Off-time used inside the band (seconds)
    pub off_time_s: f64,
}

/// Shape of the off-time curve between the close and far thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CadenceProfile {
    /// Off-time interpolated linearly from max (far) down towards min
    Linear,
    /// Fixed off-time per distance band; beyond the last band uses max
    Stepped { bands: Vec<StepBand> },
}

impl Default for CadenceProfile {
    fn default() -> Self {
        CadenceProfile::Linear
    }
}

impl CadenceProfile {
    /// Bands of the first-generation seeker
    pub fn stepped_default() -> Self {
        CadenceProfile::Stepped {
            bands: vec![
                StepBand { up_to_m: 10.0, off_time_s: 0.5 },
                StepBand { up_to_m: 20.0, off_time_s: 1.0 },
                StepBand { up_to_m: 30.0, off_time_s: 2.0 },
            ],
        }
    }
}

/// Cadence policy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    /// Beyond this distance the device is "searching" (meters)
    pub far_threshold_m: f64,
    /// At or inside this distance the target counts as reached (meters)
    pub close_threshold_m: f64,
    /// Buzzer on-time for every cadence (seconds)
    pub on_time_s: f64,
    /// Fastest off-time, used at the close threshold (seconds)
    pub min_off_time_s: f64,
    /// Slowest off-time, used at the far threshold (seconds)
    pub max_off_time_s: f64,
    /// Lower bound of the randomized searching off-time (seconds)
    pub search_off_min_s: f64,
    /// Upper bound of the randomized searching off-time (seconds)
    pub search_off_max_s: f64,
    pub profile: CadenceProfile,
    /// Slow beep while there is no fix; `None` keeps the buzzer silent
    pub idle_heartbeat: Option<BeepTiming>,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            far_threshold_m: 50.0,
            close_threshold_m: 5.0,
            on_time_s: 0.1,
            min_off_time_s: 0.1,
            max_off_time_s: 5.0,
            search_off_min_s: 1.0,
            search_off_max_s: 5.0,
            profile: CadenceProfile::Linear,
            idle_heartbeat: None,
        }
    }
}

impl CadenceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |parameter: &str, value: f64, reason: &str| ConfigError::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let scalars = [
            ("far_threshold_m", self.far_threshold_m),
            ("close_threshold_m", self.close_threshold_m),
            ("on_time_s", self.on_time_s),
            ("min_off_time_s", self.min_off_time_s),
            ("max_off_time_s", self.max_off_time_s),
            ("search_off_min_s", self.search_off_min_s),
            ("search_off_max_s", self.search_off_max_s),
        ];
        if let Some((parameter, value)) = scalars.iter().find(|(_, value)| !value.is_finite()) {
            return Err(invalid(parameter, *value, "must be finite"));
        }

        // Timings the buzzer would refuse to sleep
        let timings = [
            ("on_time_s", self.on_time_s),
            ("max_off_time_s", self.max_off_time_s),
            ("search_off_max_s", self.search_off_max_s),
        ];
        if let Some((parameter, value)) = timings.iter().find(|(_, value)| *value > MAX_PATTERN_TIME_S) {
            return Err(invalid(parameter, *value, "exceeds the longest beep pattern"));
        }

        if !(self.close_threshold_m >= 0.0) {
            return Err(invalid("close_threshold_m", self.close_threshold_m, "must be non-negative"));
        }
        if !(self.far_threshold_m > self.close_threshold_m) {
            return Err(invalid(
                "far_threshold_m",
                self.far_threshold_m,
                "must be greater than close_threshold_m",
            ));
        }
        if !(self.on_time_s > 0.0) {
            return Err(invalid("on_time_s", self.on_time_s, "must be positive"));
        }
        if !(self.min_off_time_s > 0.0) {
            return Err(invalid("min_off_time_s", self.min_off_time_s, "must be positive"));
        }
        if !(self.max_off_time_s >= self.min_off_time_s) {
            return Err(invalid(
                "max_off_time_s",
                self.max_off_time_s,
                "must not be below min_off_time_s",
            ));
        }
        if !(self.search_off_min_s > 0.0) {
            return Err(invalid("search_off_min_s", self.search_off_min_s, "must be positive"));
        }
        if !(self.search_off_max_s >= self.search_off_min_s) {
            return Err(invalid(
                "search_off_max_s",
                self.search_off_max_s,
                "must not be below search_off_min_s",
            ));
        }

        if let CadenceProfile::Stepped { bands } = &self.profile {
            let mut previous: Option<&StepBand> = None;
            for band in bands {
                if !(band.off_time_s > 0.0 && band.off_time_s <= MAX_PATTERN_TIME_S) {
                    return Err(invalid("bands.off_time_s", band.off_time_s, "out of range"));
                }
                if !band.up_to_m.is_finite() {
                    return Err(invalid("bands.up_to_m", band.up_to_m, "must be finite"));
                }
                if let Some(prev) = previous {
                    if !(band.up_to_m > prev.up_to_m) {
                        return Err(invalid("bands.up_to_m", band.up_to_m, "bands must be ascending"));
                    }
                    if band.off_time_s < prev.off_time_s {
                        return Err(invalid(
                            "bands.off_time_s",
                            band.off_time_s,
                            "off-time must not shrink as distance grows",
                        ));
                    }
                }
                previous = Some(band);
            }
        }

        if let Some(heartbeat) = &self.idle_heartbeat {
            let in_range = |t: f64| t > 0.0 && t <= MAX_PATTERN_TIME_S;
            if !in_range(heartbeat.on_time_s) || !in_range(heartbeat.off_time_s) {
                return Err(invalid(
                    "idle_heartbeat",
                    heartbeat.off_time_s,
                    "heartbeat timings out of range",
                ));
            }
        }

        Ok(())
    }
}

/// Maps distance to cadence
pub struct CadencePolicy {
    config: CadenceConfig,
    rng: StdRng,
}

impl CadencePolicy {
    pub fn new(config: CadenceConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Policy with a caller-supplied generator for the searching cue
    pub fn with_rng(config: CadenceConfig, rng: StdRng) -> Self {
        Self { config, rng }
    }

    pub fn config(&self) -> &CadenceConfig {
        &self.config
    }

    /// Cadence for the latest distance; `None` means no fix yet
    pub fn compute_cadence(&mut self, distance: Option<Distance>) -> Cadence {
        let Some(distance) = distance else {
            return Cadence::Idle {
                heartbeat: self.config.idle_heartbeat,
            };
        };

        let d = distance.meters();
        let on_time = self.config.on_time_s;

        if d > self.config.far_threshold_m {
            let off_time = self
                .rng
                .gen_range(self.config.search_off_min_s..=self.config.search_off_max_s);
            Cadence::Searching(BeepTiming::new(on_time, off_time))
        } else if d <= self.config.close_threshold_m {
            Cadence::Reached(BeepTiming::new(on_time, self.config.min_off_time_s))
        } else {
            Cadence::Approaching(BeepTiming::new(on_time, self.approach_off_time(d)))
        }
    }

    /// Off-time inside `(close, far]`, clamped to `[min_off, max_off]`
    pub fn approach_off_time(&self, distance_m: f64) -> f64 {
        let cfg = &self.config;
        let off_time = match &cfg.profile {
            CadenceProfile::Linear => {
                let far = cfg.far_threshold_m;
                cfg.max_off_time_s
                    - ((far - distance_m) / far) * (cfg.max_off_time_s - cfg.min_off_time_s)
            }
            CadenceProfile::Stepped { bands } => bands
                .iter()
                .find(|band| distance_m <= band.up_to_m)
                .map(|band| band.off_time_s)
                .unwrap_or(cfg.max_off_time_s),
        };

        off_time.clamp(cfg.min_off_time_s, cfg.max_off_time_s)
    }
}

/// Re-trigger bookkeeping of the feedback loop
#[derive(Debug, Clone, Default)]
pub struct CadenceState {
    last_beep_time: Option<Instant>,
    active: Option<BeepTiming>,
}

impl CadenceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `next` should be issued now.
    ///
    /// Due when nothing has been issued yet, when `next` differs from the
    /// active pair, or when more than the active off-time has elapsed since
    /// the last actuation.
    pub fn is_due(&self, next: &BeepTiming, now: Instant) -> bool {
        match (self.last_beep_time, self.active) {
            (Some(last), Some(active)) => {
                active != *next
                    || now.saturating_duration_since(last).as_secs_f64() > active.off_time_s
            }
            _ => true,
        }
    }

    pub fn record(&mut self, timing: BeepTiming, now: Instant) {
        self.last_beep_time = Some(now);
        self.active = Some(timing);
    }

    /// Forget the active pair, e.g. after the buzzer was silenced
    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<BeepTiming> {
        self.active
    }

    pub fn last_beep_time(&self) -> Option<Instant> {
        self.last_beep_time
    }
}
