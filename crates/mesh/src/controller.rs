//! Mesh radio controller.
//!
//! Owns the node identity, sequence counter, duty-cycle ledger and channel
//! rotation for one physical radio. A single transmitter means a single
//! transmission at a time: a second `transmit` while the radio is keyed is
//! refused, not queued.

use crate::codec::{self, BuiltPacket, ParsedPacket};
use crate::error::MeshResult;
use crate::packet::{icao_to_int, MeshHeader, MessageType, PacketFlags, Priority, SequenceCounter};
use crate::packet::{PROTOCOL_VERSION, SIGNATURE_SLOT_LEN};
use crate::payload::{Alert, Metar, Payload, Sensor, Severity};
use aeromesh_core::{Clock, Config, NodeConfig, RadioConfig};
use aeromesh_crypto::{NodeSigner, PublicKey, SignatureProvider};
use aeromesh_radio::{time_on_air, DutyCycleManager, RadioDriver, TxSettings};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Result of a transmit attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransmitOutcome {
    Sent { channel_hz: u32, airtime_ms: u64 },
    RadioBusy,
    DutyCycleExceeded,
    /// Caller-supplied settings the transceiver cannot use
    InvalidSettings { reason: String },
    KeyingFailed { reason: String },
    KeyingTimeout,
}

impl TransmitOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }

    /// Whether the transmitter was actually keyed. Admission denials never
    /// reach the air.
    pub fn reached_air(&self) -> bool {
        matches!(
            self,
            Self::Sent { .. } | Self::KeyingFailed { .. } | Self::KeyingTimeout
        )
    }
}

/// Snapshot of controller state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioStats {
    /// Origin id as 8 hex digits
    pub node_id: String,
    pub duty_cycle: f64,
    pub remaining_airtime_ms: u64,
    pub sequence: u16,
    pub busy: bool,
    /// Index of the channel the next transmission will use
    pub channel_index: usize,
}

struct TxState {
    duty_cycle: DutyCycleManager,
    channel_index: usize,
}

/// Clears the busy flag when the transmission ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct MeshRadio {
    node_id: u32,
    node: NodeConfig,
    radio: RadioConfig,
    signer: Arc<dyn SignatureProvider>,
    driver: Arc<dyn RadioDriver>,
    clock: Arc<dyn Clock>,
    sequence: SequenceCounter,
    busy: AtomicBool,
    state: Mutex<TxState>,
}

impl MeshRadio {
    /// Create a radio with a freshly generated signing key.
    ///
    /// The node id comes from `config.node.node_id`, or is drawn at random.
    ///
    /// # Errors
    /// `Config` when the configuration fails validation,
    /// `Crypto(CryptoUnavailable)` when no key material can be generated.
    pub fn new(
        config: &Config,
        driver: Arc<dyn RadioDriver>,
        clock: Arc<dyn Clock>,
    ) -> MeshResult<Self> {
        config.validate()?;
        let signer = NodeSigner::generate()?;
        let node_id = config.node.node_id.unwrap_or_else(rand::random);
        Self::with_signer(node_id, config, Arc::new(signer), driver, clock)
    }

    /// Create a radio around an existing signature provider.
    pub fn with_signer(
        node_id: u32,
        config: &Config,
        signer: Arc<dyn SignatureProvider>,
        driver: Arc<dyn RadioDriver>,
        clock: Arc<dyn Clock>,
    ) -> MeshResult<Self> {
        config.validate()?;
        let duty_cycle = DutyCycleManager::from_config(&config.radio, Arc::clone(&clock));

        tracing::info!(
            node_id = %format!("{:08x}", node_id),
            key_id = %signer.public_key().key_id(),
            channels = config.radio.channels.len(),
            "mesh radio initialized"
        );

        Ok(Self {
            node_id,
            node: config.node.clone(),
            radio: config.radio.clone(),
            signer,
            driver,
            clock,
            sequence: SequenceCounter::new(),
            busy: AtomicBool::new(false),
            state: Mutex::new(TxState {
                duty_cycle,
                channel_index: 0,
            }),
        })
    }

    pub fn node_id(&self) -> u32 {
        self.node_id
    }

    pub fn public_key(&self) -> PublicKey {
        self.signer.public_key()
    }

    pub fn export_public_key(&self) -> [u8; 32] {
        self.signer.public_key().to_bytes()
    }

    pub fn radio_config(&self) -> &RadioConfig {
        &self.radio
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn lock_state(&self) -> MutexGuard<'_, TxState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Build and sign a packet with the next sequence number.
    pub fn create_packet(
        &self,
        msg_type: MessageType,
        payload: &Payload,
        icao: &str,
        priority: Priority,
        ttl: u8,
    ) -> MeshResult<BuiltPacket> {
        let header = MeshHeader {
            version: PROTOCOL_VERSION,
            msg_type,
            sequence: self.sequence.next(),
            timestamp: self.clock.now_secs_u32(),
            origin_id: self.node_id,
            icao_code: icao_to_int(icao),
            ttl,
            priority,
            flags: PacketFlags::SIGNED,
            reserved: 0,
            signature: [0u8; SIGNATURE_SLOT_LEN],
        };

        let built = codec::build_packet(self.signer.as_ref(), header, payload, self.radio.max_payload)?;
        tracing::debug!(
            msg_type = ?msg_type,
            sequence = built.header.sequence,
            icao,
            bytes = built.len(),
            "packet built"
        );
        Ok(built)
    }

    pub fn create_metar_message(&self, metar: Metar, icao: &str) -> MeshResult<Vec<u8>> {
        self.create_packet(
            MessageType::Metar,
            &Payload::Metar(metar),
            icao,
            Priority::Normal,
            self.node.default_ttl,
        )
        .map(|b| b.packet)
    }

    /// Critical alerts go out at CRITICAL priority, everything else at HIGH.
    pub fn create_alert_message(&self, alert: Alert, icao: &str) -> MeshResult<Vec<u8>> {
        let priority = match alert.severity {
            Severity::Critical => Priority::Critical,
            Severity::High | Severity::Low => Priority::High,
        };
        self.create_packet(
            MessageType::Alert,
            &Payload::Alert(alert),
            icao,
            priority,
            self.node.default_ttl,
        )
        .map(|b| b.packet)
    }

    pub fn create_sensor_message(&self, sensor: Sensor, icao: &str) -> MeshResult<Vec<u8>> {
        self.create_packet(
            MessageType::Sensor,
            &Payload::Sensor(sensor),
            icao,
            Priority::Low,
            self.node.default_ttl,
        )
        .map(|b| b.packet)
    }

    pub fn parse_packet(&self, bytes: &[u8]) -> Option<ParsedPacket> {
        codec::parse_packet(bytes)
    }

    /// Transmit with the configured radio settings. Returns true when the
    /// frame went out.
    pub async fn transmit(&self, packet: &[u8]) -> bool {
        self.try_transmit(packet).await.is_sent()
    }

    pub async fn try_transmit(&self, packet: &[u8]) -> TransmitOutcome {
        self.transmit_inner(packet, None).await
    }

    /// Transmit with explicit power, spreading factor and frequency. Airtime
    /// and duty-cycle accounting use the given spreading factor.
    pub async fn try_transmit_with(&self, packet: &[u8], settings: TxSettings) -> TransmitOutcome {
        self.transmit_inner(packet, Some(settings)).await
    }

    async fn transmit_inner(&self, packet: &[u8], tuned: Option<TxSettings>) -> TransmitOutcome {
        if let Some(Err(e)) = tuned.as_ref().map(TxSettings::validate) {
            tracing::warn!(error = %e, "transmission refused");
            return TransmitOutcome::InvalidSettings {
                reason: e.to_string(),
            };
        }

        let spreading_factor = tuned
            .map(|s| s.spreading_factor)
            .unwrap_or(self.radio.spreading_factor);
        let airtime_ms = time_on_air(
            packet.len(),
            spreading_factor,
            self.radio.bandwidth_hz,
            self.radio.coding_rate,
            self.radio.preamble_length,
        );

        // Admission: busy check, duty check, busy acquisition and channel
        // selection happen under one lock.
        let (_busy, channel_hz) = {
            let mut state = self.lock_state();
            if self.busy.load(Ordering::SeqCst) {
                tracing::warn!("radio busy, transmission refused");
                return TransmitOutcome::RadioBusy;
            }
            if !state.duty_cycle.can_transmit(airtime_ms) {
                tracing::warn!(
                    duty_cycle_pct = state.duty_cycle.current_duty_cycle() * 100.0,
                    airtime_ms,
                    "transmission blocked by duty cycle"
                );
                return TransmitOutcome::DutyCycleExceeded;
            }
            self.busy.store(true, Ordering::SeqCst);
            let guard = BusyGuard(&self.busy);

            let channels = &self.radio.channels;
            let channel_hz = if channels.is_empty() {
                self.radio.frequency_hz
            } else {
                let hz = channels[state.channel_index % channels.len()];
                state.channel_index = (state.channel_index + 1) % channels.len();
                hz
            };
            (guard, channel_hz)
        };

        let settings = tuned.unwrap_or(TxSettings {
            frequency_hz: channel_hz,
            spreading_factor,
            tx_power_dbm: self.radio.tx_power_dbm,
        });

        tracing::debug!(
            bytes = packet.len(),
            frequency_mhz = settings.frequency_hz as f64 / 1e6,
            sf = settings.spreading_factor,
            tx_power_dbm = settings.tx_power_dbm,
            airtime_ms,
            "transmitting"
        );

        let airtime = Duration::from_millis(airtime_ms);
        let keying = self.driver.key(packet, &settings, airtime);
        match tokio::time::timeout(Duration::from_millis(self.radio.keying_timeout_ms), keying).await {
            Ok(Ok(())) => {
                self.lock_state().duty_cycle.record_transmission(airtime_ms);
                TransmitOutcome::Sent {
                    channel_hz: settings.frequency_hz,
                    airtime_ms,
                }
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "transmission failed");
                TransmitOutcome::KeyingFailed {
                    reason: e.to_string(),
                }
            }
            Err(_) => {
                tracing::error!(
                    timeout_ms = self.radio.keying_timeout_ms,
                    "transmitter keying timed out"
                );
                TransmitOutcome::KeyingTimeout
            }
        }
    }

    pub fn stats(&self) -> RadioStats {
        let mut state = self.lock_state();
        RadioStats {
            node_id: format!("{:08x}", self.node_id),
            duty_cycle: state.duty_cycle.current_duty_cycle(),
            remaining_airtime_ms: state.duty_cycle.remaining_airtime_ms(),
            sequence: self.sequence.current(),
            busy: self.is_busy(),
            channel_index: state.channel_index,
        }
    }

    /// Transmissions currently held in the duty-cycle ledger.
    pub fn ledger_len(&self) -> usize {
        self.lock_state().duty_cycle.ledger_len()
    }
}

impl std::fmt::Debug for MeshRadio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshRadio")
            .field("node_id", &format_args!("{:08x}", self.node_id))
            .field("busy", &self.is_busy())
            .field("sequence", &self.sequence.current())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeromesh_core::ManualClock;
    use aeromesh_radio::SimulatedDriver;

    fn metar() -> Metar {
        Metar {
            wind_speed: 12,
            wind_gust: None,
            wind_dir: 240,
            qnh: 1013,
            visibility: 9999,
            temperature: 14,
            dewpoint: None,
            clouds: None,
            weather: None,
            raw_metar: "EDDF 011020Z 24012KT 9999 14/08 Q1013".into(),
        }
    }

    fn radio() -> (MeshRadio, Arc<SimulatedDriver>, Arc<ManualClock>) {
        let mut config = Config::default_config();
        config.node.node_id = Some(0x00C0FFEE);
        let driver = Arc::new(SimulatedDriver::new());
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let radio = MeshRadio::new(&config, driver.clone(), clock.clone()).unwrap();
        (radio, driver, clock)
    }

    #[test]
    fn test_metar_packet_shape() {
        let (radio, _, _) = radio();
        let built = radio
            .create_packet(
                MessageType::Metar,
                &Payload::Metar(metar()),
                "EDDF",
                Priority::Normal,
                5,
            )
            .unwrap();

        assert_eq!(built.packet.len(), 64 + built.payload.len());
        assert_eq!(built.header.sequence, 1);
        assert_eq!(built.header.origin_id, 0x00C0FFEE);
        assert_eq!(built.header.timestamp, 1_700_000_000);
        assert_eq!(built.header.icao(), "EDDF");

        let parsed = radio.parse_packet(&built.packet).unwrap();
        assert_eq!(parsed.payload, Payload::Metar(metar()));
    }

    #[test]
    fn test_alert_priority_follows_severity() {
        let (radio, _, _) = radio();
        let alert = |severity| Alert {
            alert_type: "WIND_SPEED".into(),
            severity,
            value: 40.0,
            threshold: 35.0,
            description: "gusting".into(),
            expires_at: None,
        };

        let critical = radio.create_alert_message(alert(Severity::Critical), "EDDF").unwrap();
        let high = radio.create_alert_message(alert(Severity::Low), "EDDF").unwrap();
        assert_eq!(critical[17], Priority::Critical as u8);
        assert_eq!(high[17], Priority::High as u8);
    }

    #[test]
    fn test_sensor_messages_are_low_priority() {
        let (radio, _, _) = radio();
        let sensor = Sensor {
            sensor_id: "s1".into(),
            readings: Default::default(),
            battery: None,
            signal_strength: None,
            location: None,
        };
        let packet = radio.create_sensor_message(sensor, "KJFK").unwrap();
        assert_eq!(packet[17], Priority::Low as u8);
        assert_eq!(packet[16], 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transmit_records_ledger_and_rotates_channels() {
        let (radio, driver, _) = radio();
        let packet = radio.create_metar_message(metar(), "EDDF").unwrap();

        let first = radio.try_transmit(&packet).await;
        let second = radio.try_transmit(&packet).await;

        assert!(matches!(first, TransmitOutcome::Sent { channel_hz: 868_100_000, .. }));
        assert!(matches!(second, TransmitOutcome::Sent { channel_hz: 868_300_000, .. }));
        assert_eq!(radio.ledger_len(), 2);
        assert_eq!(driver.frame_count(), 2);
        assert!(!radio.is_busy());
        assert_eq!(radio.stats().channel_index, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_transmit_is_refused() {
        let (radio, _, _) = radio();
        let packet = radio.create_metar_message(metar(), "EDDF").unwrap();

        let (a, b) = tokio::join!(radio.try_transmit(&packet), radio.try_transmit(&packet));
        assert!(a.is_sent());
        assert_eq!(b, TransmitOutcome::RadioBusy);
        assert_eq!(radio.ledger_len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duty_cycle_denial_leaves_radio_idle() {
        let mut config = Config::default_config();
        config.radio.duty_cycle_limit = 0.00001;
        let driver = Arc::new(SimulatedDriver::new());
        let radio = MeshRadio::new(&config, driver.clone(), Arc::new(ManualClock::new(0))).unwrap();
        let packet = radio.create_metar_message(metar(), "EDDF").unwrap();

        assert_eq!(radio.try_transmit(&packet).await, TransmitOutcome::DutyCycleExceeded);
        assert!(!radio.is_busy());
        assert_eq!(driver.frame_count(), 0);
        assert_eq!(radio.stats().channel_index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_fault_releases_busy_without_ledger_entry() {
        let (radio, driver, _) = radio();
        driver.set_fault(Some("antenna disconnected"));
        let packet = radio.create_metar_message(metar(), "EDDF").unwrap();

        let outcome = radio.try_transmit(&packet).await;
        assert!(matches!(outcome, TransmitOutcome::KeyingFailed { .. }));
        assert!(outcome.reached_air());
        assert!(!radio.is_busy());
        assert_eq!(radio.ledger_len(), 0);
        assert!(!radio.transmit(&packet).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keying_timeout() {
        let (radio, driver, _) = radio();
        driver.set_stall(Some(Duration::from_secs(60)));
        let packet = radio.create_metar_message(metar(), "EDDF").unwrap();

        assert_eq!(radio.try_transmit(&packet).await, TransmitOutcome::KeyingTimeout);
        assert!(!radio.is_busy());
        assert_eq!(radio.ledger_len(), 0);

        driver.set_stall(None);
        assert!(radio.transmit(&packet).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tuned_transmit_uses_given_settings() {
        let (radio, driver, _) = radio();
        let packet = radio.create_metar_message(metar(), "EDDF").unwrap();
        let settings = TxSettings {
            frequency_hz: 867_500_000,
            spreading_factor: 10,
            tx_power_dbm: 8,
        };

        let outcome = radio.try_transmit_with(&packet, settings).await;
        let expected_airtime = time_on_air(packet.len(), 10, 125_000, 5, 8);
        assert_eq!(
            outcome,
            TransmitOutcome::Sent {
                channel_hz: 867_500_000,
                airtime_ms: expected_airtime
            }
        );
        assert_eq!(driver.frames()[0].settings, settings);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_spreading_factor_refused() {
        let (radio, driver, _) = radio();
        let packet = radio.create_metar_message(metar(), "EDDF").unwrap();
        let settings = TxSettings {
            frequency_hz: 868_100_000,
            spreading_factor: 64,
            tx_power_dbm: 14,
        };

        let outcome = radio.try_transmit_with(&packet, settings).await;
        assert!(matches!(
            outcome,
            TransmitOutcome::InvalidSettings { ref reason } if reason.contains("spreading_factor")
        ));
        assert!(!outcome.reached_air());
        assert!(!radio.is_busy());
        assert_eq!(radio.ledger_len(), 0);
        assert_eq!(radio.stats().channel_index, 0);
        assert_eq!(driver.frame_count(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default_config();
        config.radio.spreading_factor = 2;
        let result = MeshRadio::new(
            &config,
            Arc::new(SimulatedDriver::new()),
            Arc::new(ManualClock::new(0)),
        );
        assert!(matches!(result, Err(crate::error::MeshError::Config(_))));
    }

    #[test]
    fn test_stats_report_hex_node_id() {
        let (radio, _, _) = radio();
        radio.create_metar_message(metar(), "EDDF").unwrap();
        let stats = radio.stats();
        assert_eq!(stats.node_id, "00c0ffee");
        assert_eq!(stats.sequence, 1);
        assert_eq!(stats.duty_cycle, 0.0);
        assert_eq!(stats.remaining_airtime_ms, 36_000);
    }
}
