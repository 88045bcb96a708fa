//! Core functionality for the AeroMesh telemetry mesh.
//!
//! This crate provides the configuration, error, logging and clock
//! plumbing shared by every other AeroMesh crate.

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, NodeConfig, PropagationConfig, RadioConfig, EU868_CHANNELS};
pub use error::{CoreError, Result};
