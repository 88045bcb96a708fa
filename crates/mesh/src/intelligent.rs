//! Propagation-aware transmit.

use crate::controller::{MeshRadio, TransmitOutcome};
use aeromesh_radio::TxSettings;
use aeromesh_rf::{
    NetworkOptimizationReport, OptimalTransmissionParams, PropagationConditions,
    PropagationIntelligence,
};
use std::ops::Deref;
use std::sync::Arc;

/// A [`MeshRadio`] that tunes each transmission from shared propagation
/// intelligence and feeds delivery results back into the link metrics.
#[derive(Debug)]
pub struct IntelligentMeshRadio {
    radio: MeshRadio,
    intelligence: Arc<PropagationIntelligence>,
}

impl IntelligentMeshRadio {
    pub fn new(radio: MeshRadio, intelligence: Arc<PropagationIntelligence>) -> Self {
        Self {
            radio,
            intelligence,
        }
    }

    pub fn intelligence(&self) -> &Arc<PropagationIntelligence> {
        &self.intelligence
    }

    pub fn into_inner(self) -> MeshRadio {
        self.radio
    }

    /// Transmit to `target` with recommended parameters. Returns true when
    /// the frame went out.
    pub async fn intelligent_transmit(&self, packet: &[u8], target: &str) -> bool {
        self.intelligent_try_transmit(packet, target).await.is_sent()
    }

    pub async fn intelligent_try_transmit(&self, packet: &[u8], target: &str) -> TransmitOutcome {
        let params = self.intelligence.get_optimal_transmission_params(target);
        tracing::info!(
            target,
            tx_power_dbm = params.tx_power_dbm,
            sf = params.data_rate,
            frequency_mhz = params.frequency_mhz,
            confidence = params.confidence,
            "adaptive transmit"
        );

        let outcome = self
            .radio
            .try_transmit_with(packet, settings_from(&params))
            .await;

        // Busy or duty-cycle refusals say nothing about the link.
        if outcome.reached_air() {
            self.intelligence.record_delivery(target, outcome.is_sent());
        }
        outcome
    }

    pub fn get_network_optimization_report(&self) -> NetworkOptimizationReport {
        self.intelligence.get_network_optimization_report()
    }

    pub fn get_current_propagation_conditions(&self) -> Option<Arc<PropagationConditions>> {
        self.intelligence.current_conditions()
    }

    pub fn predict_propagation_conditions(&self, hours_ahead: u32) -> PropagationConditions {
        self.intelligence.predict_propagation_conditions(hours_ahead)
    }
}

impl Deref for IntelligentMeshRadio {
    type Target = MeshRadio;

    fn deref(&self) -> &MeshRadio {
        &self.radio
    }
}

fn settings_from(params: &OptimalTransmissionParams) -> TxSettings {
    TxSettings {
        frequency_hz: params.frequency_hz(),
        spreading_factor: params.data_rate,
        tx_power_dbm: params.tx_power_dbm,
    }
}
