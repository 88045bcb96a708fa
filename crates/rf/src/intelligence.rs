//! Propagation intelligence store.
//!
//! Shared, read-mostly state behind every adaptive radio in the process:
//! the condition history (appended on a fixed timer), per-node link metrics,
//! and the rules that turn both into transmission parameters.
//!
//! History entries are published as `Arc<PropagationConditions>` and never
//! mutated after the append, so readers holding a snapshot are unaffected by
//! later ticks.

use crate::conditions::{PropagationConditions, Season, TimeOfDay};
use crate::link::{LinkQualityMetrics, LinkUpdate};
use crate::model::PropagationModel;
use aeromesh_core::{Clock, Config, PropagationConfig};
use chrono::{DateTime, Datelike, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

/// Weight of the newest delivery sample in the packet-loss moving average.
pub const DELIVERY_EWMA_ALPHA: f64 = 0.2;

/// Reliability below which a link gets the robust parameter set.
pub const POOR_LINK_THRESHOLD: f64 = 0.5;

/// Longest forecast horizon; matches the default history retention.
pub const MAX_FORECAST_HOURS: u32 = 168;

/// Hours covered by the optimization report's prediction table.
pub const REPORT_HORIZON_HOURS: u32 = 3;

/// Recommended radio settings for one transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimalTransmissionParams {
    pub tx_power_dbm: i8,
    /// Spreading factor
    pub data_rate: u8,
    pub frequency_mhz: f64,
    pub retry_count: u8,
    pub backoff_ms: u64,
    /// Confidence in the recommendation (0.0 to 1.0)
    pub confidence: f64,
}

impl OptimalTransmissionParams {
    pub fn frequency_hz(&self) -> u32 {
        (self.frequency_mhz * 1_000_000.0).round() as u32
    }
}

/// Expected change for one hour of the report horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedChange {
    pub time: String,
    pub expected_range_change: String,
    pub suggested_actions: Vec<String>,
}

/// Network-wide summary for operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkOptimizationReport {
    pub current_performance: String,
    pub average_reliability: f64,
    pub tracked_nodes: usize,
    pub recommendations: Vec<String>,
    pub predicted_changes: Vec<PredictedChange>,
}

/// Radio defaults and safety limits the recommendations start from.
#[derive(Debug, Clone)]
struct TransmissionPolicy {
    tx_power_dbm: i8,
    spreading_factor: u8,
    frequency_hz: u32,
    fallback_channel_hz: u32,
    limits: PropagationConfig,
}

impl TransmissionPolicy {
    fn clamp_power(&self, dbm: i32) -> i32 {
        dbm.clamp(
            self.limits.min_tx_power_dbm as i32,
            self.limits.max_tx_power_dbm as i32,
        )
    }

    fn clamp_sf(&self, sf: i32) -> i32 {
        sf.clamp(
            self.limits.min_spreading_factor as i32,
            self.limits.max_spreading_factor as i32,
        )
    }
}

/// Shared propagation and link-quality store.
pub struct PropagationIntelligence {
    model: Arc<dyn PropagationModel>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    policy: TransmissionPolicy,
    max_history: usize,
    history: RwLock<VecDeque<Arc<PropagationConditions>>>,
    links: RwLock<HashMap<String, LinkQualityMetrics>>,
}

impl PropagationIntelligence {
    pub fn new(config: &Config, model: Arc<dyn PropagationModel>, clock: Arc<dyn Clock>) -> Self {
        let offset = config
            .propagation
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                tracing::warn!(
                    utc_offset_minutes = config.propagation.utc_offset_minutes,
                    "UTC offset out of range, using UTC"
                );
                Utc.fix()
            });

        let policy = TransmissionPolicy {
            tx_power_dbm: config.radio.tx_power_dbm,
            spreading_factor: config.radio.spreading_factor,
            frequency_hz: config.radio.frequency_hz,
            fallback_channel_hz: config
                .radio
                .channels
                .first()
                .copied()
                .unwrap_or(config.radio.frequency_hz),
            limits: config.propagation.clone(),
        };

        Self {
            model,
            clock,
            offset,
            policy,
            max_history: config.propagation.max_history_len(),
            history: RwLock::new(VecDeque::new()),
            links: RwLock::new(HashMap::new()),
        }
    }

    fn local_now(&self) -> DateTime<FixedOffset> {
        self.clock.now().with_timezone(&self.offset)
    }

    /// Sample the model, append the snapshot and enforce the retention bound.
    pub fn refresh(&self) -> Arc<PropagationConditions> {
        let conditions = Arc::new(self.model.assess(self.local_now()));

        let mut history = self.history.write().unwrap_or_else(|e| e.into_inner());
        history.push_back(Arc::clone(&conditions));
        while history.len() > self.max_history {
            history.pop_front();
        }
        drop(history);

        tracing::debug!(
            time_of_day = conditions.time_of_day.as_str(),
            muf = conditions.muf,
            range_km = conditions.predicted_range_km,
            absorption_db = conditions.signal_absorption_db,
            "propagation conditions updated"
        );
        conditions
    }

    /// Most recent snapshot, if any sample has been taken.
    pub fn current_conditions(&self) -> Option<Arc<PropagationConditions>> {
        self.history
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .back()
            .cloned()
    }

    /// Snapshot of the retained history, oldest first.
    pub fn history(&self) -> Vec<Arc<PropagationConditions>> {
        self.history
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Merge a partial measurement for `node_id`, creating the baseline
    /// record on first contact. Returns the merged record.
    pub fn update_link_metrics(&self, node_id: &str, update: &LinkUpdate) -> LinkQualityMetrics {
        let now = self.clock.now_ms();
        let mut links = self.links.write().unwrap_or_else(|e| e.into_inner());
        let entry = links
            .entry(node_id.to_string())
            .or_insert_with(|| LinkQualityMetrics::baseline(now));
        entry.merge(update, now);

        tracing::debug!(
            node = node_id,
            reliability = entry.reliability_score,
            "link metrics updated"
        );
        entry.clone()
    }

    /// Fold one delivery outcome into the node's packet-loss average.
    pub fn record_delivery(&self, node_id: &str, delivered: bool) -> LinkQualityMetrics {
        let now = self.clock.now_ms();
        let mut links = self.links.write().unwrap_or_else(|e| e.into_inner());
        let entry = links
            .entry(node_id.to_string())
            .or_insert_with(|| LinkQualityMetrics::baseline(now));

        let sample = if delivered { 0.0 } else { 1.0 };
        let loss = (1.0 - DELIVERY_EWMA_ALPHA) * entry.packet_loss + DELIVERY_EWMA_ALPHA * sample;
        entry.merge(&LinkUpdate::new().packet_loss(loss), now);
        entry.clone()
    }

    pub fn link_metrics(&self, node_id: &str) -> Option<LinkQualityMetrics> {
        self.links
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(node_id)
            .cloned()
    }

    pub fn tracked_nodes(&self) -> usize {
        self.links.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Recommend power, spreading factor, channel and retry policy for
    /// `node_id` under the current conditions.
    pub fn get_optimal_transmission_params(&self, node_id: &str) -> OptimalTransmissionParams {
        let policy = &self.policy;
        let mut tx_power = policy.clamp_power(policy.tx_power_dbm as i32);
        let mut sf = policy.clamp_sf(policy.spreading_factor as i32);
        let mut frequency_hz = policy.frequency_hz;
        let mut retry_count = policy.limits.default_retry_count as u32;
        let mut backoff_ms = policy.limits.default_backoff_ms;
        let mut confidence = 0.7;

        if let Some(conditions) = self.current_conditions() {
            match conditions.time_of_day {
                // Night: favour throughput
                TimeOfDay::Night => {
                    tx_power = policy.clamp_power(tx_power - 3);
                    sf = policy.clamp_sf(sf - 1);
                    confidence = 0.9;
                }
                // Day: favour robustness against D-layer absorption
                TimeOfDay::Day => {
                    tx_power = policy.clamp_power(tx_power + 2);
                    sf = policy.clamp_sf(sf + 1);
                    retry_count = 5;
                    confidence = 0.8;
                }
                TimeOfDay::Dawn | TimeOfDay::Dusk => {}
            }

            if conditions.signal_absorption_db > policy.limits.absorption_threshold_db {
                frequency_hz = policy.fallback_channel_hz;
            }
        }

        if let Some(link) = self.link_metrics(node_id) {
            if link.reliability_score < POOR_LINK_THRESHOLD {
                tx_power = policy.clamp_power(tx_power + 3);
                sf = policy.clamp_sf(sf + 2);
                retry_count = (retry_count + 2).min(8);
                backoff_ms = backoff_ms.saturating_mul(2);
            }
        }

        OptimalTransmissionParams {
            tx_power_dbm: tx_power as i8,
            data_rate: sf as u8,
            frequency_mhz: frequency_hz as f64 / 1_000_000.0,
            retry_count: retry_count.min(u8::MAX as u32) as u8,
            backoff_ms,
            confidence,
        }
    }

    /// Project conditions `hours_ahead` into the future. The season is held
    /// at the current one and the horizon is capped at
    /// [`MAX_FORECAST_HOURS`].
    pub fn predict_propagation_conditions(&self, hours_ahead: u32) -> PropagationConditions {
        let now = self.local_now();
        let season = self
            .current_conditions()
            .map(|c| c.season)
            .unwrap_or_else(|| Season::from_month(now.month()));
        let hours = hours_ahead.min(MAX_FORECAST_HOURS);
        let future = now
            .checked_add_signed(chrono::Duration::hours(i64::from(hours)))
            .unwrap_or(now);
        self.model.forecast(future, season)
    }

    /// Average reliability, qualitative advice and a short-horizon forecast.
    pub fn get_network_optimization_report(&self) -> NetworkOptimizationReport {
        let (tracked_nodes, average_reliability) = {
            let links = self.links.read().unwrap_or_else(|e| e.into_inner());
            let total: f64 = links.values().map(|m| m.reliability_score).sum();
            let avg = if links.is_empty() {
                0.0
            } else {
                total / links.len() as f64
            };
            (links.len(), avg)
        };

        let mut recommendations = Vec::new();
        match self.current_conditions().map(|c| c.time_of_day) {
            Some(TimeOfDay::Day) if average_reliability < 0.7 => {
                recommendations.push(
                    "Increase transmission power during daytime due to D-layer absorption"
                        .to_string(),
                );
                recommendations.push("Consider lower data rates for better penetration".to_string());
            }
            Some(TimeOfDay::Night) if average_reliability > 0.8 => {
                recommendations.push(
                    "Reduce power consumption - excellent night propagation detected".to_string(),
                );
                recommendations.push("Increase data rates to maximize throughput".to_string());
            }
            _ => {}
        }

        let predicted_changes = (1..=REPORT_HORIZON_HOURS)
            .map(|hour| {
                let future = self.predict_propagation_conditions(hour);
                let night = future.time_of_day == TimeOfDay::Night;
                let (range, actions): (&str, &[&str]) = if night {
                    (
                        "+200% (skywave propagation)",
                        &["Reduce TX power", "Increase data rates", "Schedule bulk transfers"],
                    )
                } else {
                    (
                        "-30% (ground wave only)",
                        &[
                            "Increase TX power",
                            "Use robust modulation",
                            "Prioritize critical traffic",
                        ],
                    )
                };
                PredictedChange {
                    time: format!("+{}h", hour),
                    expected_range_change: range.to_string(),
                    suggested_actions: actions.iter().map(|a| a.to_string()).collect(),
                }
            })
            .collect();

        NetworkOptimizationReport {
            current_performance: format!("{:.1}% network reliability", average_reliability * 100.0),
            average_reliability,
            tracked_nodes,
            recommendations,
            predicted_changes,
        }
    }
}

impl std::fmt::Debug for PropagationIntelligence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropagationIntelligence")
            .field("offset", &self.offset)
            .field("max_history", &self.max_history)
            .field("history_len", &self.history_len())
            .field("tracked_nodes", &self.tracked_nodes())
            .finish()
    }
}
