//! Proximity detector: acquisition and feedback threads around shared state
//!
//! The acquisition thread owns the GPS transport and publishes each changed
//! fix with its distance to the target. The feedback thread owns the buzzer
//! and turns the latest distance into beeps. `ProximityDetector` starts both,
//! and stopping it (or either loop failing) tears everything down once.

pub mod state;
pub mod acquisition;
pub mod feedback;
pub mod lifecycle;
pub mod error;

pub use state::{ProximitySnapshot, SharedState};
pub use acquisition::{AcquisitionConfig, AcquisitionLoop, LineOutcome};
pub use feedback::{FeedbackAction, FeedbackConfig, FeedbackLoop};
pub use lifecycle::{DetectorPhase, ProximityDetector, StopHandle};
pub use error::{DeviceError, DeviceResult};
