//! Test fixtures shared by the integration scenarios

use aeromesh_core::logging::{self, LogFormat};
use aeromesh_core::{Config, ManualClock};
use aeromesh_mesh::{IntelligentMeshRadio, MeshRadio, Metar};
use aeromesh_radio::SimulatedDriver;
use aeromesh_rf::{HeuristicModel, PropagationIntelligence};
use chrono::{TimeZone, Utc};
use std::sync::Arc;

/// Route test output through the node's logger. Safe to call repeatedly.
pub fn init_test_logging() {
    logging::init_with(LogFormat::Pretty, "warn");
}

/// Epoch ms for a UTC calendar hour.
pub fn utc_ms(year: i32, month: u32, day: u32, hour: u32) -> u64 {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .map(|t| t.timestamp_millis() as u64)
        .unwrap_or(0)
}

/// A node wired to a simulated transmitter and a manual clock
pub struct TestNode {
    pub config: Config,
    pub clock: Arc<ManualClock>,
    pub driver: Arc<SimulatedDriver>,
    pub radio: MeshRadio,
}

impl TestNode {
    pub fn new(node_id: u32, start_ms: u64) -> Self {
        let mut config = Config::default_config();
        config.node.node_id = Some(node_id);
        Self::with_config(config, start_ms)
    }

    pub fn with_config(config: Config, start_ms: u64) -> Self {
        let clock = Arc::new(ManualClock::new(start_ms));
        let driver = Arc::new(SimulatedDriver::new());
        let radio = MeshRadio::new(&config, driver.clone(), clock.clone())
            .expect("key generation must succeed in tests");
        Self {
            config,
            clock,
            driver,
            radio,
        }
    }

    /// Shared propagation store on this node's clock, sampled once.
    pub fn intelligence(&self, seed: u64) -> Arc<PropagationIntelligence> {
        let intelligence = Arc::new(PropagationIntelligence::new(
            &self.config,
            Arc::new(HeuristicModel::with_seed(seed)),
            self.clock.clone(),
        ));
        intelligence.refresh();
        intelligence
    }

    /// Turn this node into an adaptive one sharing `intelligence`.
    pub fn into_intelligent(
        self,
        intelligence: Arc<PropagationIntelligence>,
    ) -> (IntelligentMeshRadio, Arc<ManualClock>, Arc<SimulatedDriver>) {
        (
            IntelligentMeshRadio::new(self.radio, intelligence),
            self.clock,
            self.driver,
        )
    }
}

/// METAR with wind 12 kt and QNH 1013.
pub fn sample_metar(icao: &str) -> Metar {
    Metar {
        wind_speed: 12,
        wind_gust: Some(22),
        wind_dir: 250,
        qnh: 1013,
        visibility: 9999,
        temperature: 17,
        dewpoint: Some(11),
        clouds: Some(vec!["SCT025".to_string(), "BKN040".to_string()]),
        weather: Some(vec!["-RA".to_string()]),
        raw_metar: format!("{icao} 121150Z 25012G22KT 9999 -RA SCT025 BKN040 17/11 Q1013"),
    }
}
