//! Cross-crate integration tests for AeroMesh
//!
//! This test suite validates:
//! - Packet build, transmit and parse across the codec, signer and radio
//! - Duty-cycle enforcement over a simulated hour
//! - Propagation-driven tuning and link feedback
//! - Tampered and spoofed frames under detached signature verification

pub mod test_utils;

#[cfg(test)]
mod mesh_scenarios;

#[cfg(test)]
mod propagation_scenarios;

#[cfg(test)]
mod spoof_tests;
