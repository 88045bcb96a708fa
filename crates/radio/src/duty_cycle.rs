//! Regulatory duty-cycle accounting.
//!
//! EU868 sub-bands allow a node to occupy the channel for at most 1% of any
//! rolling hour. The manager keeps a ledger of past transmissions and admits a
//! new one only if the total airtime in the window, including the candidate,
//! stays within the limit.

use aeromesh_core::{Clock, RadioConfig};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// One keyed transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub timestamp_ms: u64,
    pub duration_ms: u64,
}

#[derive(Debug)]
pub struct DutyCycleManager {
    limit: f64,
    window_ms: u64,
    ledger: VecDeque<TxRecord>,
    clock: Arc<dyn Clock>,
}

impl DutyCycleManager {
    pub fn new(limit: f64, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            limit,
            window_ms: (window.as_millis() as u64).max(1),
            ledger: VecDeque::new(),
            clock,
        }
    }

    pub fn from_config(config: &RadioConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            config.duty_cycle_limit,
            Duration::from_secs(config.duty_cycle_window_secs),
            clock,
        )
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Drop records that fell out of the window. A record exactly one window
    /// old is out.
    fn evict(&mut self) {
        let Some(cutoff) = self.clock.now_ms().checked_sub(self.window_ms) else {
            return;
        };
        while self.ledger.front().is_some_and(|r| r.timestamp_ms <= cutoff) {
            self.ledger.pop_front();
        }
    }

    fn used_ms(&self) -> u64 {
        self.ledger.iter().map(|r| r.duration_ms).sum()
    }

    /// Whether `duration_ms` more airtime fits in the current window.
    pub fn can_transmit(&mut self, duration_ms: u64) -> bool {
        self.evict();
        let projected = (self.used_ms() + duration_ms) as f64 / self.window_ms as f64;
        let allowed = projected <= self.limit;
        if !allowed {
            tracing::debug!(
                used_ms = self.used_ms(),
                requested_ms = duration_ms,
                limit = self.limit,
                "duty cycle would be exceeded"
            );
        }
        allowed
    }

    /// Append a completed transmission at the current clock time.
    pub fn record_transmission(&mut self, duration_ms: u64) {
        self.ledger.push_back(TxRecord {
            timestamp_ms: self.clock.now_ms(),
            duration_ms,
        });
    }

    /// Fraction of the window used so far.
    pub fn current_duty_cycle(&mut self) -> f64 {
        self.evict();
        self.used_ms() as f64 / self.window_ms as f64
    }

    /// Airtime still available in the current window.
    pub fn remaining_airtime_ms(&mut self) -> u64 {
        self.evict();
        let budget = (self.limit * self.window_ms as f64).floor() as u64;
        budget.saturating_sub(self.used_ms())
    }

    /// Records currently held, including any not yet evicted.
    pub fn ledger_len(&self) -> usize {
        self.ledger.len()
    }

    pub fn records(&self) -> impl Iterator<Item = &TxRecord> {
        self.ledger.iter()
    }
}
