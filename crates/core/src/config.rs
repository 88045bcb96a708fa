//! Configuration management for AeroMesh.
//!
//! Defaults follow the EU868 regulatory profile: eight 125 kHz channels in
//! 867.1–868.5 MHz, SF7, CR 4/5, 14 dBm and a 1% duty cycle per rolling hour.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// EU868 channel plan in Hz. The first entry doubles as the fallback channel
/// when signal absorption is high.
pub const EU868_CHANNELS: [u32; 8] = [
    868_100_000,
    868_300_000,
    868_500_000,
    867_100_000,
    867_300_000,
    867_500_000,
    867_700_000,
    867_900_000,
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub node: NodeConfig,
    pub radio: RadioConfig,
    pub propagation: PropagationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// 32-bit origin id; a random id is drawn when absent.
    pub node_id: Option<u32>,
    /// ICAO location used when a message does not name one.
    pub default_icao: String,
    /// Hop budget for outgoing packets.
    pub default_ttl: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Default carrier frequency in Hz
    pub frequency_hz: u32,
    pub bandwidth_hz: u32,
    pub spreading_factor: u8,
    /// Coding rate denominator: 5 means 4/5, 8 means 4/8.
    pub coding_rate: u8,
    pub tx_power_dbm: i8,
    /// Preamble length in symbols
    pub preamble_length: u16,
    pub sync_word: u8,
    /// Largest LoRa frame the radio accepts, in bytes
    pub max_payload: usize,
    /// Fraction of the window the transmitter may be keyed (0.01 = 1%)
    pub duty_cycle_limit: f64,
    pub duty_cycle_window_secs: u64,
    pub channels: Vec<u32>,
    /// Upper bound on a single keying operation
    pub keying_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    pub sample_interval_secs: u64,
    pub retention_hours: u64,
    /// Offset of the node's local time from UTC, used for time-of-day buckets.
    pub utc_offset_minutes: i32,
    pub absorption_threshold_db: f64,
    pub min_tx_power_dbm: i8,
    pub max_tx_power_dbm: i8,
    pub min_spreading_factor: u8,
    pub max_spreading_factor: u8,
    pub default_retry_count: u8,
    pub default_backoff_ms: u64,
    /// Fixed RNG seed for the solar-activity jitter. Entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: None,
            default_icao: "UNKN".to_string(),
            default_ttl: 5,
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            frequency_hz: EU868_CHANNELS[0],
            bandwidth_hz: 125_000,
            spreading_factor: 7,
            coding_rate: 5,
            tx_power_dbm: 14,
            preamble_length: 8,
            sync_word: 0x12,
            max_payload: 222,
            duty_cycle_limit: 0.01,
            duty_cycle_window_secs: 3600,
            channels: EU868_CHANNELS.to_vec(),
            keying_timeout_ms: 10_000,
        }
    }
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: 15 * 60,
            retention_hours: 168,
            utc_offset_minutes: 0,
            absorption_threshold_db: 2.0,
            min_tx_power_dbm: 2,
            max_tx_power_dbm: 14,
            min_spreading_factor: 7,
            max_spreading_factor: 12,
            default_retry_count: 3,
            default_backoff_ms: 1000,
            seed: None,
        }
    }
}

/// Largest UTC offset magnitude a local clock can carry.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 24 * 60 - 1;

impl PropagationConfig {
    /// Number of snapshots kept before the history is truncated from the front.
    pub fn max_history_len(&self) -> usize {
        let interval = self.sample_interval_secs.max(1);
        ((self.retention_hours * 3600) / interval).max(1) as usize
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self::default()
    }

    /// Reject values the radio or the regulatory profile cannot honour.
    pub fn validate(&self) -> Result<()> {
        let radio = &self.radio;
        if !(7..=12).contains(&radio.spreading_factor) {
            return Err(invalid("radio.spreading_factor", "must be within 7..=12"));
        }
        if ![125_000, 250_000, 500_000].contains(&radio.bandwidth_hz) {
            return Err(invalid(
                "radio.bandwidth_hz",
                "must be 125000, 250000 or 500000",
            ));
        }
        if !(5..=8).contains(&radio.coding_rate) {
            return Err(invalid("radio.coding_rate", "denominator must be within 5..=8"));
        }
        if radio.channels.is_empty() {
            return Err(invalid("radio.channels", "at least one channel is required"));
        }
        if !(radio.duty_cycle_limit > 0.0 && radio.duty_cycle_limit <= 1.0) {
            return Err(invalid("radio.duty_cycle_limit", "must be within (0, 1]"));
        }
        if radio.duty_cycle_window_secs == 0 {
            return Err(invalid("radio.duty_cycle_window_secs", "must be positive"));
        }
        if radio.max_payload == 0 || radio.max_payload > 255 {
            return Err(invalid("radio.max_payload", "must be within 1..=255"));
        }

        let prop = &self.propagation;
        if prop.sample_interval_secs == 0 {
            return Err(invalid("propagation.sample_interval_secs", "must be positive"));
        }
        if !(-MAX_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(&prop.utc_offset_minutes) {
            return Err(invalid(
                "propagation.utc_offset_minutes",
                "must be strictly within one day of UTC",
            ));
        }
        if prop.min_tx_power_dbm > prop.max_tx_power_dbm {
            return Err(invalid(
                "propagation.min_tx_power_dbm",
                "must not exceed max_tx_power_dbm",
            ));
        }
        if prop.min_spreading_factor > prop.max_spreading_factor
            || prop.min_spreading_factor < 7
            || prop.max_spreading_factor > 12
        {
            return Err(invalid(
                "propagation.spreading_factor",
                "range must be ordered and within 7..=12",
            ));
        }
        if self.node.default_icao.len() > 4 {
            return Err(invalid("node.default_icao", "at most 4 characters"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> CoreError {
    CoreError::InvalidConfig {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
