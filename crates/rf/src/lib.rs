//! Propagation intelligence for AeroMesh radios.
//!
//! Tracks ionospheric conditions over time and per-neighbour link quality,
//! and turns both into recommended transmission parameters.

pub mod conditions;
pub mod error;
pub mod intelligence;
pub mod link;
pub mod model;
pub mod service;

pub use conditions::{IonosphericLayer, PropagationConditions, Season, TimeOfDay};
pub use error::PropagationError;
pub use intelligence::{
    NetworkOptimizationReport, OptimalTransmissionParams, PredictedChange,
    PropagationIntelligence,
};
pub use link::{reliability_score, LinkQualityMetrics, LinkUpdate};
pub use model::{HeuristicModel, PropagationModel};
pub use service::PropagationService;
