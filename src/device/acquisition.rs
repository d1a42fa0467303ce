//! GPS acquisition loop
//!
//! Reads one line at a time from the transport, keeps position sentences,
//! converts both axes and publishes changed locations to the shared state.
//! The unread input is flushed after every read attempt so the next read
//! sees the receiver's newest sentence rather than a backlog.

use crate::algorithms::coordinates::{latitude_to_decimal, longitude_to_decimal};
use crate::algorithms::DistanceCalculator;
use crate::core::{Distance, Location};
use crate::device::SharedState;
use crate::hardware::{RawLine, RecoveryStrategy, Transport, TransportError, TransportResult};
use crate::processing::{ParsedFix, SentenceParser};
use crate::utils::ConfigError;
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Sentence filtering for the acquisition loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Lines must start with one of these to be parsed
    pub sentence_prefixes: Vec<String>,
    /// Drop GGA quality 0 and RMC status `V`
    pub require_valid_fix: bool,
    /// Drop sentences without a `*hh` checksum
    pub require_checksum: bool,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            sentence_prefixes: ["$GPGGA", "$GPRMC", "$GNGGA", "$GNRMC"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            require_valid_fix: true,
            require_checksum: false,
        }
    }
}

impl AcquisitionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sentence_prefixes.is_empty() {
            return Err(ConfigError::MissingParameter {
                parameter: "acquisition.sentence_prefixes".to_string(),
            });
        }

        if let Some(prefix) = self.sentence_prefixes.iter().find(|p| !p.starts_with('$') || p.len() < 2) {
            return Err(ConfigError::InvalidParameter {
                parameter: "acquisition.sentence_prefixes".to_string(),
                value: prefix.clone(),
                reason: "prefix must start with '$'".to_string(),
            });
        }

        Ok(())
    }

    fn matches(&self, line: &[u8]) -> bool {
        self.sentence_prefixes
            .iter()
            .any(|prefix| line.starts_with(prefix.as_bytes()))
    }
}

/// What happened to one line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineOutcome {
    /// Not a position sentence
    Ignored,
    /// Position sentence that failed parsing, validity or conversion
    Rejected,
    /// Valid fix at the location already published
    Unchanged,
    /// New location published with this distance
    Updated(Distance),
}

/// Acquisition side of the detector; owns the transport
pub struct AcquisitionLoop<T: Transport> {
    transport: T,
    parser: SentenceParser,
    calculator: DistanceCalculator,
    config: AcquisitionConfig,
    read_timeout: Duration,
    state: Arc<SharedState>,
    running: Arc<AtomicBool>,
    last_location: Option<Location>,
}

impl<T: Transport> AcquisitionLoop<T> {
    pub fn new(
        transport: T,
        config: AcquisitionConfig,
        calculator: DistanceCalculator,
        read_timeout: Duration,
        state: Arc<SharedState>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let mut parser = SentenceParser::new();
        parser.set_require_checksum(config.require_checksum);

        Self {
            transport,
            parser,
            calculator,
            config,
            read_timeout,
            state,
            running,
            last_location: None,
        }
    }

    /// Handle one line received at `line.received_at`
    pub fn process_line(&mut self, line: &RawLine) -> LineOutcome {
        if !self.config.matches(&line.bytes) {
            trace!("Ignoring sentence {}", String::from_utf8_lossy(&line.bytes));
            return LineOutcome::Ignored;
        }

        let fix = match self.parser.parse_bytes(&line.bytes) {
            Ok(fix) => fix,
            Err(e) => {
                warn!("Discarding sentence: {}", e);
                return LineOutcome::Rejected;
            }
        };

        if self.config.require_valid_fix && !fix.has_valid_fix() {
            debug!("Discarding {}{} without a valid fix", fix.talker, fix.kind);
            return LineOutcome::Rejected;
        }

        let location = match Self::locate(&fix) {
            Some(location) => location,
            None => return LineOutcome::Rejected,
        };

        if self.last_location == Some(location) {
            self.state.refresh(fix.quality, line.received_at);
            return LineOutcome::Unchanged;
        }

        let distance = self.calculator.distance_to_target(&location);
        self.state.update(location, distance, fix.quality, line.received_at);
        self.last_location = Some(location);

        match fix.quality {
            Some(quality) => info!("Fix {} ({}), {} to target", location, quality, distance),
            None => info!("Fix {}, {} to target", location, distance),
        }
        LineOutcome::Updated(distance)
    }

    /// Convert both axes, logging why a fix is unusable
    fn locate(fix: &ParsedFix) -> Option<Location> {
        let (latitude, longitude) = match (&fix.latitude, &fix.longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                debug!("Discarding {}{} without a position", fix.talker, fix.kind);
                return None;
            }
        };

        let (latitude, longitude) = match (
            latitude_to_decimal(&latitude.value, latitude.hemisphere),
            longitude_to_decimal(&longitude.value, longitude.hemisphere),
        ) {
            (Ok(lat), Ok(lon)) => (lat, lon),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Discarding fix: {}", e);
                return None;
            }
        };

        match Location::new(latitude, longitude) {
            Ok(location) => Some(location),
            Err(e) => {
                warn!("Discarding fix: {}", e);
                None
            }
        }
    }

    /// One bounded read; `Ok(None)` on timeout
    pub fn poll_once(&mut self) -> TransportResult<Option<LineOutcome>> {
        let result = self.transport.read_line(self.read_timeout);
        let outcome = match result {
            Ok(Some(line)) => Ok(Some(self.process_line(&line))),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };

        if !matches!(outcome, Err(TransportError::Closed)) {
            if let Err(e) = self.transport.flush_unread() {
                debug!("Flushing GPS input failed: {}", e);
            }
        }
        outcome
    }

    /// Run until the running flag clears or the transport fails for good
    pub fn run(mut self) {
        info!("GPS acquisition started");

        while self.running.load(Ordering::SeqCst) {
            let error = match self.poll_once() {
                Ok(_) => continue,
                Err(e) => e,
            };

            match error.recovery_strategy() {
                RecoveryStrategy::Retry | RecoveryStrategy::Skip => {
                    warn!("GPS read failed: {}", error);
                }
                RecoveryStrategy::RetryWithDelay { delay_ms } => {
                    warn!("GPS read failed: {}, retrying in {} ms", error, delay_ms);
                    std::thread::sleep(Duration::from_millis(delay_ms as u64));
                }
                RecoveryStrategy::Fail => {
                    if self.running.load(Ordering::SeqCst) {
                        error!("GPS acquisition stopping: {}", error);
                    }
                    break;
                }
            }
        }
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }
}

impl<T: Transport> Drop for AcquisitionLoop<T> {
    fn drop(&mut self) {
        // Runs on every exit of the owning thread, including unwinding
        self.running.store(false, Ordering::SeqCst);
        let status = self.transport.get_status();
        self.transport.close();
        info!(
            "GPS acquisition stopped after {} location updates ({} lines read, {} read errors)",
            self.state.snapshot().update_count,
            status.lines_received,
            status.error_count
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::DistanceStrategy;
    use crate::hardware::{MockTransport, MockTransportHandle};
    use crate::processing::FixQuality;

    /// 48 07.638 N, 11 31.000 E
    fn target() -> Location {
        Location::new(48.0 + 7.638 / 60.0, 11.0 + 31.0 / 60.0).unwrap()
    }

    const FAR: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";
    const CLOSE: &str = "$GPGGA,123521,4807.630,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";
    const NO_FIX: &str = "$GPGGA,123520,4807.300,N,01131.000,E,0,00,,,M,,M,,";

    fn build(lines: &[&str]) -> (AcquisitionLoop<MockTransport>, MockTransportHandle) {
        let transport = MockTransport::with_lines(lines.iter());
        let handle = transport.handle();
        let acquisition = AcquisitionLoop::new(
            transport,
            AcquisitionConfig::default(),
            DistanceCalculator::new(DistanceStrategy::GreatCircle, target()),
            Duration::from_millis(5),
            Arc::new(SharedState::new()),
            Arc::new(AtomicBool::new(true)),
        );
        (acquisition, handle)
    }

    #[test]
    fn test_far_then_close_updates() {
        let (mut acquisition, _handle) = build(&[]);

        let far = match acquisition.process_line(&RawLine::new(FAR.as_bytes().to_vec())) {
            LineOutcome::Updated(d) => d.meters(),
            other => panic!("unexpected {:?}", other),
        };
        let close = match acquisition.process_line(&RawLine::new(CLOSE.as_bytes().to_vec())) {
            LineOutcome::Updated(d) => d.meters(),
            other => panic!("unexpected {:?}", other),
        };

        // 0.6 and 0.008 arc-minutes of latitude
        assert!((far - 1112.0).abs() < 5.0, "far {}", far);
        assert!((close - 14.8).abs() < 1.0, "close {}", close);

        let snapshot = acquisition.state().snapshot();
        assert_eq!(snapshot.update_count, 2);
        assert_eq!(snapshot.quality, Some(FixQuality::Gps));
    }

    #[test]
    fn test_identical_fix_is_not_an_update() {
        let (mut acquisition, _handle) = build(&[]);
        let line = RawLine::new(FAR.as_bytes().to_vec());
        assert!(matches!(acquisition.process_line(&line), LineOutcome::Updated(_)));

        let first = acquisition.state().snapshot();
        let later = RawLine::new(FAR.as_bytes().to_vec())
            .with_timestamp(line.received_at + Duration::from_secs(1));
        assert_eq!(acquisition.process_line(&later), LineOutcome::Unchanged);

        let second = acquisition.state().snapshot();
        assert_eq!(second.update_count, 1);
        assert_eq!(second.last_update_time, first.last_update_time);
        assert_eq!(second.last_fix_time, Some(later.received_at));
    }

    #[test]
    fn test_discarded_lines() {
        let (mut acquisition, _handle) = build(&[]);
        let outcome = |acquisition: &mut AcquisitionLoop<MockTransport>, text: &str| {
            acquisition.process_line(&RawLine::new(text.as_bytes().to_vec()))
        };

        assert_eq!(outcome(&mut acquisition, "$GPGSV,3,1,11,03,03,111,00"), LineOutcome::Ignored);
        assert_eq!(outcome(&mut acquisition, "garbage"), LineOutcome::Ignored);
        assert_eq!(outcome(&mut acquisition, "$GPGGA,123519,48x7.038,N,01131.000,E,1,08"), LineOutcome::Rejected);
        assert_eq!(outcome(&mut acquisition, "$GPGGA,123519,4807.038,Q,01131.000,E,1,08"), LineOutcome::Rejected);
        assert_eq!(outcome(&mut acquisition, "$GPGGA,123519,,,,,0,00"), LineOutcome::Rejected);
        assert_eq!(outcome(&mut acquisition, NO_FIX), LineOutcome::Rejected);
        assert_eq!(
            outcome(&mut acquisition, "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*00"),
            LineOutcome::Rejected
        );

        let snapshot = acquisition.state().snapshot();
        assert!(!snapshot.has_fix());
        assert_eq!(snapshot.update_count, 0);
    }

    #[test]
    fn test_non_utf8_line_rejected() {
        let (mut acquisition, handle) = build(&[]);
        let mut bytes = b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, b',', b'M']);
        handle.push_bytes(&bytes);
        handle.push_line(FAR);

        assert_eq!(acquisition.poll_once().unwrap(), Some(LineOutcome::Rejected));
        assert!(!acquisition.state().snapshot().has_fix());

        // The next clean line still goes through
        assert!(matches!(acquisition.poll_once(), Ok(Some(LineOutcome::Updated(_)))));
        assert_eq!(handle.status().lines_received, 2);
    }

    #[test]
    fn test_no_fix_accepted_when_validity_not_required() {
        let (mut acquisition, _handle) = build(&[]);
        acquisition.config.require_valid_fix = false;

        let outcome = acquisition.process_line(&RawLine::new(NO_FIX.as_bytes().to_vec()));
        assert!(matches!(outcome, LineOutcome::Updated(_)));
        assert_eq!(acquisition.state().snapshot().quality, Some(FixQuality::Invalid));
    }

    #[test]
    fn test_flush_after_every_read() {
        let (mut acquisition, handle) = build(&[FAR, "$GPGGA,bad"]);
        handle.push_error(TransportError::ReadFailed { details: "eio".to_string() });

        assert!(matches!(acquisition.poll_once(), Ok(Some(LineOutcome::Updated(_)))));
        assert_eq!(acquisition.poll_once().unwrap(), Some(LineOutcome::Rejected));
        assert!(acquisition.poll_once().is_err());
        assert_eq!(acquisition.poll_once().unwrap(), None);

        assert_eq!(handle.flush_count(), 4);
    }

    #[test]
    fn test_drop_closes_transport_and_clears_flag() {
        let (acquisition, handle) = build(&[]);
        let running = Arc::clone(&acquisition.running);
        drop(acquisition);

        assert!(handle.is_closed());
        assert_eq!(handle.close_count(), 1);
        assert!(!running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_run_exits_when_transport_closes() {
        let (acquisition, handle) = build(&[FAR]);
        handle.push_error(TransportError::Closed);
        let state = Arc::clone(acquisition.state());

        acquisition.run();

        assert_eq!(state.snapshot().update_count, 1);
        assert!(handle.is_closed());
    }
}
