//! Core types and constants for the proximity beacon

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
