//! Pluggable propagation models.
//!
//! [`HeuristicModel`] stands in for a real space-weather feed: calendar time
//! drives the ionospheric heuristics and a slow sinusoid with bounded jitter
//! approximates solar activity. A deployment with live telemetry implements
//! [`PropagationModel`] and hands it to the store instead.

use crate::conditions::{PropagationConditions, Season, TimeOfDay};
use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

const YEAR_MS: f64 = 365.0 * 24.0 * 3600.0 * 1000.0;

/// Source of propagation snapshots.
pub trait PropagationModel: Send + Sync {
    /// Assess conditions at a local calendar time.
    fn assess(&self, at: DateTime<FixedOffset>) -> PropagationConditions;

    /// Deterministic projection for a future local time with the season held
    /// fixed.
    fn forecast(&self, at: DateTime<FixedOffset>, season: Season) -> PropagationConditions;
}

/// Calendar-and-sinusoid heuristic model.
#[derive(Debug)]
pub struct HeuristicModel {
    rng: Mutex<StdRng>,
}

impl HeuristicModel {
    /// Model with entropy-seeded jitter.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Model with reproducible jitter.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Solar flux baseline for an instant: 150 ± 50 on a slow sinusoid.
    pub fn base_flux(epoch_ms: i64) -> f64 {
        150.0 + (epoch_ms as f64 / YEAR_MS).sin() * 50.0
    }
}

impl Default for HeuristicModel {
    fn default() -> Self {
        Self::new()
    }
}

impl PropagationModel for HeuristicModel {
    fn assess(&self, at: DateTime<FixedOffset>) -> PropagationConditions {
        let time_of_day = TimeOfDay::from_hour(at.hour());
        let season = Season::from_month(at.month());
        let epoch_ms = at.timestamp_millis();
        let base_flux = Self::base_flux(epoch_ms);

        let (flux_jitter, k_index, sunspot_jitter) = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            (
                rng.gen_range(-10.0..10.0),
                rng.gen_range(0..4u8),
                rng.gen_range(-20.0..20.0),
            )
        };

        PropagationConditions::derive(
            time_of_day,
            season,
            base_flux + flux_jitter,
            k_index,
            (base_flux - 80.0 + sunspot_jitter).max(0.0),
            epoch_ms.max(0) as u64,
        )
    }

    fn forecast(&self, at: DateTime<FixedOffset>, season: Season) -> PropagationConditions {
        PropagationConditions::derive(
            TimeOfDay::from_hour(at.hour()),
            season,
            150.0,
            2,
            70.0,
            at.timestamp_millis().max(0) as u64,
        )
    }
}
