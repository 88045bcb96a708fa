//! Propagation condition snapshots and the heuristics that derive them.
//!
//! The multipliers model the usual day/night behaviour of the ionosphere:
//! D-layer absorption during daylight, F2 reflection at night, and better
//! winter propagation.

use serde::{Deserialize, Serialize};

/// Coarse time-of-day bucket with dawn and dusk transition windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Dawn,
    Day,
    Dusk,
    Night,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 4] = [Self::Dawn, Self::Day, Self::Dusk, Self::Night];

    /// Bucket a local hour (0..=23): 05–07 dawn, 08–17 day, 18–20 dusk.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=7 => Self::Dawn,
            8..=17 => Self::Day,
            18..=20 => Self::Dusk,
            _ => Self::Night,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dawn => "dawn",
            Self::Day => "day",
            Self::Dusk => "dusk",
            Self::Night => "night",
        }
    }
}

/// Meteorological season (northern hemisphere).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Self::Spring, Self::Summer, Self::Autumn, Self::Winter];

    /// Season for a calendar month (1 = January).
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Autumn,
            _ => Self::Winter,
        }
    }
}

/// Dominant ionospheric layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IonosphericLayer {
    D,
    E,
    F1,
    F2,
}

impl IonosphericLayer {
    /// D layer by day, F2 otherwise.
    pub fn for_time_of_day(time_of_day: TimeOfDay) -> Self {
        if time_of_day == TimeOfDay::Day {
            Self::D
        } else {
            Self::F2
        }
    }
}

/// Immutable propagation snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationConditions {
    pub time_of_day: TimeOfDay,
    pub season: Season,
    /// Solar flux index (roughly 67–300)
    pub solar_flux: f64,
    /// Geomagnetic activity (0–9)
    pub k_index: u8,
    pub sunspot_number: f64,
    pub ionospheric_layer: IonosphericLayer,
    /// Maximum usable frequency in MHz
    pub muf: f64,
    pub predicted_range_km: f64,
    pub signal_absorption_db: f64,
    /// When the snapshot was taken (or the instant it forecasts), epoch ms
    pub sampled_at: u64,
}

impl PropagationConditions {
    /// Assemble a snapshot, deriving MUF, range, absorption and layer from
    /// the time-of-day and season.
    pub fn derive(
        time_of_day: TimeOfDay,
        season: Season,
        solar_flux: f64,
        k_index: u8,
        sunspot_number: f64,
        sampled_at: u64,
    ) -> Self {
        Self {
            time_of_day,
            season,
            solar_flux,
            k_index,
            sunspot_number,
            ionospheric_layer: IonosphericLayer::for_time_of_day(time_of_day),
            muf: maximum_usable_frequency(time_of_day, season),
            predicted_range_km: predicted_range_km(time_of_day, season),
            signal_absorption_db: signal_absorption_db(time_of_day, season),
            sampled_at,
        }
    }
}

/// Maximum usable frequency in MHz.
pub fn maximum_usable_frequency(time_of_day: TimeOfDay, season: Season) -> f64 {
    let mut muf = 14.0;
    match time_of_day {
        TimeOfDay::Night => muf *= 1.5,
        TimeOfDay::Day => muf *= 0.8,
        TimeOfDay::Dawn | TimeOfDay::Dusk => {}
    }
    match season {
        Season::Winter => muf *= 1.2,
        Season::Summer => muf *= 0.9,
        Season::Spring | Season::Autumn => {}
    }
    muf
}

/// Expected link range in kilometres.
pub fn predicted_range_km(time_of_day: TimeOfDay, season: Season) -> f64 {
    let mut range = 15.0;
    match time_of_day {
        TimeOfDay::Night => range *= 3.0,
        TimeOfDay::Dawn | TimeOfDay::Dusk => range *= 2.0,
        TimeOfDay::Day => {}
    }
    if season == Season::Winter {
        range *= 1.3;
    }
    range
}

/// Signal absorption in dB, never negative.
pub fn signal_absorption_db(time_of_day: TimeOfDay, season: Season) -> f64 {
    let mut absorption: f64 = 0.5;
    match time_of_day {
        TimeOfDay::Day => absorption += 3.0,
        TimeOfDay::Night => absorption -= 1.0,
        TimeOfDay::Dawn | TimeOfDay::Dusk => {}
    }
    if season == Season::Summer {
        absorption += 1.0;
    }
    absorption.max(0.0)
}
