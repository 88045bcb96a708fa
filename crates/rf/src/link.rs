//! Per-neighbour link quality tracking.

use serde::{Deserialize, Serialize};

/// Observed quality of the link to one remote node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkQualityMetrics {
    /// Received Signal Strength Indicator (dBm)
    pub rssi: f64,
    /// Signal-to-Noise Ratio (dB)
    pub snr: f64,
    /// Packet loss fraction (0.0 to 1.0)
    pub packet_loss: f64,
    /// Round-trip time in milliseconds
    pub latency_ms: f64,
    /// Effective data rate
    pub throughput_bps: f64,
    /// Composite score (0.0 to 1.0), recomputed on every merge
    pub reliability_score: f64,
    /// Last update, epoch ms
    pub last_updated: u64,
}

impl LinkQualityMetrics {
    /// Pessimistic record assumed for a node on first contact.
    pub fn baseline(now_ms: u64) -> Self {
        Self {
            rssi: -100.0,
            snr: -10.0,
            packet_loss: 0.5,
            latency_ms: 1000.0,
            throughput_bps: 300.0,
            reliability_score: 0.5,
            last_updated: now_ms,
        }
    }

    /// Merge a partial measurement and recompute the reliability score.
    pub fn merge(&mut self, update: &LinkUpdate, now_ms: u64) {
        if let Some(rssi) = update.rssi {
            self.rssi = rssi;
        }
        if let Some(snr) = update.snr {
            self.snr = snr;
        }
        if let Some(loss) = update.packet_loss {
            self.packet_loss = if loss.is_nan() { 1.0 } else { loss.clamp(0.0, 1.0) };
        }
        if let Some(latency) = update.latency_ms {
            self.latency_ms = latency;
        }
        if let Some(throughput) = update.throughput_bps {
            self.throughput_bps = throughput;
        }
        self.last_updated = now_ms;
        self.reliability_score = reliability_score(self);
    }
}

/// Partial link measurement; `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkUpdate {
    pub rssi: Option<f64>,
    pub snr: Option<f64>,
    pub packet_loss: Option<f64>,
    pub latency_ms: Option<f64>,
    pub throughput_bps: Option<f64>,
}

impl LinkUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rssi(mut self, dbm: f64) -> Self {
        self.rssi = Some(dbm);
        self
    }

    pub fn snr(mut self, db: f64) -> Self {
        self.snr = Some(db);
        self
    }

    pub fn packet_loss(mut self, fraction: f64) -> Self {
        self.packet_loss = Some(fraction);
        self
    }

    pub fn latency_ms(mut self, ms: f64) -> Self {
        self.latency_ms = Some(ms);
        self
    }

    pub fn throughput_bps(mut self, bps: f64) -> Self {
        self.throughput_bps = Some(bps);
        self
    }
}

/// Composite reliability in [0, 1].
///
/// `0.3·rssi + 0.3·snr + 0.3·(1 − loss) + 0.1·latency`, with RSSI normalised
/// over [−120, −70] dBm, SNR over [−10, 10] dB and latency over [0, 2000] ms
/// (inverted). Each term is clamped to [0, 1]; NaN counts as the worst value.
pub fn reliability_score(metrics: &LinkQualityMetrics) -> f64 {
    let rssi = unit((metrics.rssi + 120.0) / 50.0);
    let snr = unit((metrics.snr + 10.0) / 20.0);
    let loss = unit(1.0 - metrics.packet_loss);
    let latency = unit((2000.0 - metrics.latency_ms) / 2000.0);

    rssi * 0.3 + snr * 0.3 + loss * 0.3 + latency * 0.1
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
