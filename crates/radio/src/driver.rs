//! Transmitter boundary.
//!
//! The controller never touches hardware directly. It hands a finished frame
//! and the settings to key it with to a [`RadioDriver`] and awaits the result.

use crate::airtime::SPREADING_FACTORS;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("transmitter fault: {0}")]
    Fault(String),

    #[error("unsupported setting {setting}: {value}")]
    Unsupported { setting: &'static str, value: String },
}

/// Per-transmission radio settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSettings {
    pub frequency_hz: u32,
    pub spreading_factor: u8,
    pub tx_power_dbm: i8,
}

impl TxSettings {
    /// Reject settings no LoRa transceiver can be keyed with.
    pub fn validate(&self) -> Result<(), DriverError> {
        if !SPREADING_FACTORS.contains(&self.spreading_factor) {
            return Err(DriverError::Unsupported {
                setting: "spreading_factor",
                value: self.spreading_factor.to_string(),
            });
        }
        if self.frequency_hz == 0 {
            return Err(DriverError::Unsupported {
                setting: "frequency_hz",
                value: self.frequency_hz.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
pub trait RadioDriver: Send + Sync {
    /// Key the transmitter with `frame` for `airtime`. Resolves once the
    /// frame is off the air.
    async fn key(
        &self,
        frame: &[u8],
        settings: &TxSettings,
        airtime: Duration,
    ) -> Result<(), DriverError>;
}

/// A frame the simulated driver put on the air.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxFrame {
    pub bytes: Vec<u8>,
    pub settings: TxSettings,
    pub airtime: Duration,
}

#[derive(Debug, Default)]
struct SimState {
    frames: Vec<TxFrame>,
    fault: Option<String>,
    stall: Option<Duration>,
}

/// In-process driver that sleeps for the airtime and records every frame.
///
/// Faults and stalls can be injected to exercise the controller's failure
/// paths.
#[derive(Debug, Default)]
pub struct SimulatedDriver {
    state: Mutex<SimState>,
}

impl SimulatedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent transmission with `reason`, or clear the fault.
    pub fn set_fault(&self, reason: Option<&str>) {
        self.lock().fault = reason.map(str::to_string);
    }

    /// Hold the transmitter for `extra` beyond the airtime.
    pub fn set_stall(&self, extra: Option<Duration>) {
        self.lock().stall = extra;
    }

    pub fn frames(&self) -> Vec<TxFrame> {
        self.lock().frames.clone()
    }

    pub fn frame_count(&self) -> usize {
        self.lock().frames.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RadioDriver for SimulatedDriver {
    async fn key(
        &self,
        frame: &[u8],
        settings: &TxSettings,
        airtime: Duration,
    ) -> Result<(), DriverError> {
        settings.validate()?;
        let (fault, stall) = {
            let state = self.lock();
            (state.fault.clone(), state.stall)
        };
        if let Some(reason) = fault {
            return Err(DriverError::Fault(reason));
        }

        tokio::time::sleep(airtime + stall.unwrap_or_default()).await;

        self.lock().frames.push(TxFrame {
            bytes: frame.to_vec(),
            settings: *settings,
            airtime,
        });
        tracing::trace!(
            bytes = frame.len(),
            frequency_hz = settings.frequency_hz,
            sf = settings.spreading_factor,
            "simulated frame sent"
        );
        Ok(())
    }
}
