//! Mock transport and buzzer for testing and development
//!
//! Both mocks keep their state behind a shared handle so a test can keep
//! feeding and inspecting them after the device has moved them into its
//! worker threads.

use crate::hardware::buzzer::check_timing;
use crate::hardware::{
    ActuatorError, ActuatorResult, BuzzerActuator, RawLine, Transport, TransportError,
    TransportResult, TransportStatus,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One scripted result for `read_line`
#[derive(Debug, Clone)]
enum MockRead {
    Line(Vec<u8>),
    Error(TransportError),
}

#[derive(Debug)]
struct MockTransportState {
    queue: VecDeque<MockRead>,
    status: TransportStatus,
    flush_count: u32,
    close_count: u32,
    closed: bool,
    simulate_errors: bool,
    error_probability: f32,
}

/// Mock GPS transport fed from a scripted queue
pub struct MockTransport {
    state: Arc<Mutex<MockTransportState>>,
}

/// Test-side view of a `MockTransport`
#[derive(Clone)]
pub struct MockTransportHandle {
    state: Arc<Mutex<MockTransportState>>,
}

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        let mut status = TransportStatus::new();
        status.connected = true;

        Self {
            state: Arc::new(Mutex::new(MockTransportState {
                queue: VecDeque::new(),
                status,
                flush_count: 0,
                close_count: 0,
                closed: false,
                simulate_errors: false,
                error_probability: 0.0,
            })),
        }
    }

    /// Create a mock that yields `lines` in order
    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let transport = Self::new();
        let handle = transport.handle();
        for line in lines {
            handle.push_line(line.as_ref());
        }
        transport
    }

    pub fn handle(&self) -> MockTransportHandle {
        MockTransportHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Enable or disable random read failures
    pub fn simulate_errors(&mut self, enable: bool, probability: f32) {
        let mut state = lock(&self.state);
        state.simulate_errors = enable;
        state.error_probability = probability.clamp(0.0, 1.0);
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransportHandle {
    /// Queue a line; the transport strips no terminator from it
    pub fn push_line(&self, line: &str) {
        lock(&self.state)
            .queue
            .push_back(MockRead::Line(line.as_bytes().to_vec()));
    }

    /// Queue raw bytes, which need not be UTF-8
    pub fn push_bytes(&self, bytes: &[u8]) {
        lock(&self.state).queue.push_back(MockRead::Line(bytes.to_vec()));
    }

    /// Queue a read failure
    pub fn push_error(&self, error: TransportError) {
        lock(&self.state).queue.push_back(MockRead::Error(error));
    }

    pub fn queued_line_count(&self) -> usize {
        lock(&self.state).queue.len()
    }

    pub fn flush_count(&self) -> u32 {
        lock(&self.state).flush_count
    }

    pub fn close_count(&self) -> u32 {
        lock(&self.state).close_count
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    pub fn status(&self) -> TransportStatus {
        lock(&self.state).status.clone()
    }
}

/// Check if we should simulate an error
fn should_simulate_error(state: &MockTransportState) -> bool {
    if !state.simulate_errors {
        return false;
    }

    use rand::Rng;
    let mut rng = rand::thread_rng();
    rng.gen::<f32>() < state.error_probability
}

impl Transport for MockTransport {
    fn read_line(&mut self, timeout: Duration) -> TransportResult<Option<RawLine>> {
        let next = {
            let mut state = lock(&self.state);
            if state.closed {
                return Err(TransportError::Closed);
            }

            if should_simulate_error(&state) {
                state.status.error_count += 1;
                return Err(TransportError::ReadFailed {
                    details: "Simulated read failure".to_string(),
                });
            }

            let next = state.queue.pop_front();
            match &next {
                Some(MockRead::Line(_)) => state.status.lines_received += 1,
                Some(MockRead::Error(_)) => state.status.error_count += 1,
                None => {}
            }
            next
        };

        match next {
            Some(MockRead::Line(bytes)) => {
                let line = RawLine::new(bytes);
                lock(&self.state).status.last_line_time = Some(line.received_at);
                Ok(Some(line))
            }
            Some(MockRead::Error(error)) => Err(error),
            None => {
                // Nothing queued; behave like a quiet receiver
                std::thread::sleep(timeout);
                Ok(None)
            }
        }
    }

    fn flush_unread(&mut self) -> TransportResult<()> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(TransportError::Closed);
        }
        state.flush_count += 1;
        Ok(())
    }

    fn close(&mut self) {
        let mut state = lock(&self.state);
        state.close_count += 1;
        state.closed = true;
        state.status.connected = false;
    }

    fn is_open(&self) -> bool {
        !lock(&self.state).closed
    }

    fn get_status(&self) -> TransportStatus {
        lock(&self.state).status.clone()
    }
}

/// Something the mock buzzer was asked to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuzzerEvent {
    Beep {
        on_time_s: f64,
        off_time_s: f64,
        repetitions: u32,
    },
    Off,
}

#[derive(Debug, Default)]
struct MockBuzzerState {
    events: Vec<BuzzerEvent>,
    failing_beeps: u32,
    /// Beeps whose final release fails, leaving the buzzer sounding
    stuck_beeps: u32,
    active: bool,
}

/// Mock buzzer that records requests instead of sounding
pub struct MockBuzzer {
    state: Arc<Mutex<MockBuzzerState>>,
    /// Sleep through each pattern like real hardware
    real_time: bool,
}

/// Test-side view of a `MockBuzzer`
#[derive(Clone)]
pub struct MockBuzzerHandle {
    state: Arc<Mutex<MockBuzzerState>>,
}

impl MockBuzzer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockBuzzerState::default())),
            real_time: false,
        }
    }

    /// Sleep for the requested on/off durations
    pub fn with_real_time(mut self, real_time: bool) -> Self {
        self.real_time = real_time;
        self
    }

    pub fn handle(&self) -> MockBuzzerHandle {
        MockBuzzerHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for MockBuzzer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBuzzerHandle {
    pub fn events(&self) -> Vec<BuzzerEvent> {
        lock(&self.state).events.clone()
    }

    /// Beep requests only, in order
    pub fn beeps(&self) -> Vec<(f64, f64, u32)> {
        lock(&self.state)
            .events
            .iter()
            .filter_map(|event| match *event {
                BuzzerEvent::Beep {
                    on_time_s,
                    off_time_s,
                    repetitions,
                } => Some((on_time_s, off_time_s, repetitions)),
                BuzzerEvent::Off => None,
            })
            .collect()
    }

    pub fn off_count(&self) -> usize {
        lock(&self.state)
            .events
            .iter()
            .filter(|event| matches!(event, BuzzerEvent::Off))
            .count()
    }

    pub fn last_event(&self) -> Option<BuzzerEvent> {
        lock(&self.state).events.last().copied()
    }

    /// Make the next `count` beeps fail
    pub fn fail_next_beeps(&self, count: u32) {
        lock(&self.state).failing_beeps = count;
    }

    /// Make the next `count` beeps sound but fail to release the pin
    pub fn fail_release_next_beeps(&self, count: u32) {
        lock(&self.state).stuck_beeps = count;
    }

    pub fn is_active(&self) -> bool {
        lock(&self.state).active
    }
}

impl BuzzerActuator for MockBuzzer {
    fn beep(&mut self, on_time_s: f64, off_time_s: f64, repetitions: u32) -> ActuatorResult<()> {
        check_timing(on_time_s, off_time_s)?;

        {
            let mut state = lock(&self.state);
            if state.failing_beeps > 0 {
                state.failing_beeps -= 1;
                return Err(ActuatorError::PinError {
                    pin: 0,
                    details: "Simulated drive failure".to_string(),
                });
            }
            state.events.push(BuzzerEvent::Beep {
                on_time_s,
                off_time_s,
                repetitions,
            });
            state.active = true;
        }

        if self.real_time {
            let pattern = Duration::from_secs_f64(on_time_s + off_time_s);
            std::thread::sleep(pattern * repetitions);
        }

        let mut state = lock(&self.state);
        if state.stuck_beeps > 0 {
            state.stuck_beeps -= 1;
            return Err(ActuatorError::PinError {
                pin: 0,
                details: "Simulated release failure".to_string(),
            });
        }
        state.active = false;
        Ok(())
    }

    fn off(&mut self) -> ActuatorResult<()> {
        let mut state = lock(&self.state);
        state.events.push(BuzzerEvent::Off);
        state.active = false;
        Ok(())
    }

    fn is_active(&self) -> bool {
        lock(&self.state).active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(1);

    #[test]
    fn test_line_queue() {
        let mut transport = MockTransport::with_lines(["$GPGGA,a", "$GPRMC,b"]);
        let handle = transport.handle();
        assert_eq!(handle.queued_line_count(), 2);

        let line = transport.read_line(SHORT).unwrap().unwrap();
        assert_eq!(line.bytes, b"$GPGGA,a".to_vec());
        assert!(transport.read_line(SHORT).unwrap().is_some());

        // Empty queue behaves like a timeout
        assert!(transport.read_line(SHORT).unwrap().is_none());
        assert_eq!(handle.status().lines_received, 2);
    }

    #[test]
    fn test_scripted_error_and_close() {
        let mut transport = MockTransport::new();
        let handle = transport.handle();
        handle.push_error(TransportError::ReadFailed {
            details: "eio".to_string(),
        });

        assert!(transport.read_line(SHORT).is_err());
        assert!(transport.flush_unread().is_ok());
        assert_eq!(handle.flush_count(), 1);

        transport.close();
        assert!(handle.is_closed());
        assert!(!transport.is_open());
        assert!(matches!(
            transport.read_line(SHORT),
            Err(TransportError::Closed)
        ));
        assert!(transport.flush_unread().is_err());
    }

    #[test]
    fn test_error_simulation() {
        let mut transport = MockTransport::new();
        transport.simulate_errors(true, 1.0); // 100% error rate

        let result = transport.read_line(SHORT);
        assert!(result.is_err());
        assert!(transport.get_status().error_count > 0);
    }

    #[test]
    fn test_buzzer_records_events() {
        let mut buzzer = MockBuzzer::new();
        let handle = buzzer.handle();

        buzzer.beep(0.2, 1.0, 2).unwrap();
        buzzer.off().unwrap();

        assert_eq!(handle.beeps(), vec![(0.2, 1.0, 2)]);
        assert_eq!(handle.off_count(), 1);
        assert_eq!(handle.last_event(), Some(BuzzerEvent::Off));
    }

    #[test]
    fn test_buzzer_active_during_pattern() {
        let mut buzzer = MockBuzzer::new().with_real_time(true);
        let handle = buzzer.handle();

        let worker = std::thread::spawn(move || buzzer.beep(0.3, 0.0, 1));
        std::thread::sleep(Duration::from_millis(100));
        assert!(handle.is_active());

        assert!(worker.join().unwrap().is_ok());
        assert!(!handle.is_active());
    }

    #[test]
    fn test_buzzer_left_on_until_off() {
        let mut buzzer = MockBuzzer::new();
        let handle = buzzer.handle();
        handle.fail_release_next_beeps(1);

        assert!(buzzer.beep(0.1, 0.1, 1).is_err());
        assert!(buzzer.is_active());
        assert_eq!(handle.beeps(), vec![(0.1, 0.1, 1)]);

        buzzer.off().unwrap();
        assert!(!handle.is_active());
    }

    #[test]
    fn test_buzzer_failure_injection() {
        let mut buzzer = MockBuzzer::new();
        let handle = buzzer.handle();
        handle.fail_next_beeps(1);

        assert!(buzzer.beep(0.1, 0.1, 1).is_err());
        assert!(buzzer.beep(0.1, 0.1, 1).is_ok());
        assert_eq!(handle.beeps().len(), 1);
    }
}
