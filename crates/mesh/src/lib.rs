//! AeroMesh Mesh - signed telemetry packets over a duty-cycled LoRa radio
//!
//! # Core Components
//!
//! - **Packet Codec**: fixed 64-byte header plus CBOR payload, signed with the
//!   node's Ed25519 key
//! - **Mesh Radio**: sequence allocation, duty-cycle admission, round-robin
//!   channel selection and transmitter keying
//! - **Intelligent Radio**: per-transmission tuning from propagation
//!   intelligence, with delivery feedback into link metrics
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use aeromesh_core::{Config, SystemClock};
//! use aeromesh_mesh::{MeshRadio, Metar};
//! use aeromesh_radio::SimulatedDriver;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let radio = MeshRadio::new(
//!     &Config::default_config(),
//!     Arc::new(SimulatedDriver::new()),
//!     Arc::new(SystemClock),
//! )?;
//!
//! let packet = radio.create_metar_message(
//!     Metar {
//!         wind_speed: 12,
//!         wind_gust: None,
//!         wind_dir: 270,
//!         qnh: 1013,
//!         visibility: 9999,
//!         temperature: 15,
//!         dewpoint: None,
//!         clouds: None,
//!         weather: None,
//!         raw_metar: "EDDF 121150Z 27012KT 9999 15/09 Q1013".into(),
//!     },
//!     "EDDF",
//! )?;
//! let sent = radio.transmit(&packet).await;
//! # let _ = sent;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod controller;
pub mod error;
pub mod intelligent;
pub mod packet;
pub mod payload;

pub use codec::{
    build_packet, parse_packet, signing_data, try_parse_packet, verify_detached, BuiltPacket,
    ParsedPacket,
};
pub use controller::{MeshRadio, RadioStats, TransmitOutcome};
pub use error::{MeshError, MeshResult};
pub use intelligent::IntelligentMeshRadio;
pub use packet::{
    encode_header, icao_to_int, int_to_icao, MeshHeader, MessageType, PacketFlags, Priority,
    SequenceCounter, HEADER_LEN, PROTOCOL_VERSION,
};
pub use payload::{Alert, Location, Metar, Payload, Reading, Sensor, Severity};
