//! LoRa radio primitives: time-on-air, regulatory duty-cycle accounting and
//! the transmitter driver boundary.

pub mod airtime;
pub mod driver;
pub mod duty_cycle;

pub use airtime::{symbol_time_ms, time_on_air, SPREADING_FACTORS};
pub use driver::{DriverError, RadioDriver, SimulatedDriver, TxFrame, TxSettings};
pub use duty_cycle::{DutyCycleManager, TxRecord};
