//! Detector lifecycle: startup beep, worker threads, stop and teardown

use crate::algorithms::{CadencePolicy, DistanceCalculator};
use crate::core::TargetLocation;
use crate::device::{
    AcquisitionLoop, DeviceError, DeviceResult, FeedbackLoop, ProximitySnapshot, SharedState,
};
use crate::hardware::{BuzzerActuator, Transport};
use crate::utils::DeviceConfig;
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Lifecycle phase of a detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorPhase {
    Ready,
    Running,
    Stopped,
}

/// Cloneable, signal-safe way to ask a running detector to stop
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
}

impl StopHandle {
    /// Clear the running flag; both loops exit within one iteration.
    /// A request made before or during startup keeps the loops from spawning.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Proximity detector owning the GPS transport and the buzzer
pub struct ProximityDetector<T, B>
where
    T: Transport + 'static,
    B: BuzzerActuator + 'static,
{
    config: DeviceConfig,
    target: TargetLocation,
    /// Collaborators until `start` hands them to the workers
    devices: Option<(T, B)>,
    state: Arc<SharedState>,
    running: Arc<AtomicBool>,
    /// Latched by any stop request, never cleared
    stop_requested: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    phase: DetectorPhase,
}

impl<T, B> ProximityDetector<T, B>
where
    T: Transport + 'static,
    B: BuzzerActuator + 'static,
{
    /// Build a detector around an already opened transport
    pub fn new(config: DeviceConfig, transport: T, buzzer: B) -> DeviceResult<Self> {
        config.validate()?;
        let target = config.target_location()?;

        Ok(Self {
            config,
            target,
            devices: Some((transport, buzzer)),
            state: Arc::new(SharedState::new()),
            running: Arc::new(AtomicBool::new(false)),
            stop_requested: Arc::new(AtomicBool::new(false)),
            workers: Vec::new(),
            phase: DetectorPhase::Ready,
        })
    }

    pub fn target(&self) -> &TargetLocation {
        &self.target
    }

    pub fn phase(&self) -> DetectorPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> ProximitySnapshot {
        self.state.snapshot()
    }

    /// Handle for signal handlers and other threads
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: Arc::clone(&self.running),
            stop_requested: Arc::clone(&self.stop_requested),
        }
    }

    /// Sound the startup beep once, then spawn both loops
    pub fn start(&mut self) -> DeviceResult<()> {
        let (transport, mut buzzer) = match (self.phase, self.devices.take()) {
            (DetectorPhase::Ready, Some(devices)) => devices,
            (_, devices) => {
                self.devices = devices;
                return Err(DeviceError::AlreadyStarted);
            }
        };

        if self.stop_requested() {
            self.abandon_start(transport, buzzer);
            return Ok(());
        }

        let startup = &self.config.startup_beep;
        if let Err(e) = buzzer.beep(startup.on_time_s, startup.off_time_s, startup.repetitions) {
            warn!("Startup beep failed: {}", e);
        }

        // Publish running before the check so a concurrent stop either
        // lands in the flag or is seen here
        self.running.store(true, Ordering::SeqCst);
        if self.stop_requested() {
            self.abandon_start(transport, buzzer);
            return Ok(());
        }
        self.phase = DetectorPhase::Running;

        let acquisition = AcquisitionLoop::new(
            transport,
            self.config.acquisition.clone(),
            DistanceCalculator::new(self.config.distance.strategy, self.target),
            self.config.transport.read_timeout(),
            Arc::clone(&self.state),
            Arc::clone(&self.running),
        );
        let feedback = FeedbackLoop::new(
            buzzer,
            CadencePolicy::new(self.config.cadence.clone()),
            self.config.feedback.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.running),
        );

        // A loop that fails to spawn is dropped here, which runs its teardown
        // and clears the running flag for the other one
        self.spawn("gps-acquisition", move || acquisition.run())?;
        self.spawn("feedback", move || feedback.run())?;

        info!(
            "Proximity detector started, target {} ({:?})",
            self.target, self.config.distance.strategy
        );
        Ok(())
    }

    fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Stop arrived before the loops were spawned
    fn abandon_start(&mut self, mut transport: T, mut buzzer: B) {
        self.running.store(false, Ordering::SeqCst);
        if let Err(e) = buzzer.off() {
            warn!("Buzzer off failed: {}", e);
        }
        transport.close();
        self.phase = DetectorPhase::Stopped;
        info!("Stop requested during startup, proximity detector not started");
    }

    fn spawn<F>(&mut self, name: &str, body: F) -> DeviceResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        match thread::Builder::new().name(name.to_string()).spawn(body) {
            Ok(handle) => {
                self.workers.push(handle);
                Ok(())
            }
            Err(e) => {
                self.stop();
                Err(DeviceError::ThreadSpawn {
                    name: name.to_string(),
                    details: e.to_string(),
                })
            }
        }
    }

    /// Stop both loops and wait for their teardown; safe to call repeatedly
    pub fn stop(&mut self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);

        for worker in self.workers.drain(..) {
            let name = worker.thread().name().unwrap_or("worker").to_string();
            if worker.join().is_err() {
                error!("{} thread panicked", name);
            }
        }

        // Never started: tear down the collaborators here instead
        if let Some((mut transport, mut buzzer)) = self.devices.take() {
            if let Err(e) = buzzer.off() {
                warn!("Buzzer off failed: {}", e);
            }
            transport.close();
        }

        if self.phase != DetectorPhase::Stopped {
            self.phase = DetectorPhase::Stopped;
            info!("Proximity detector stopped");
        }
    }

    /// Start and block until the stop handle fires or a loop gives up
    pub fn run(&mut self) -> DeviceResult<()> {
        self.start()?;

        while self.is_running() {
            thread::sleep(Duration::from_millis(100));
        }

        self.stop();
        Ok(())
    }
}

impl<T, B> Drop for ProximityDetector<T, B>
where
    T: Transport + 'static,
    B: BuzzerActuator + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}
