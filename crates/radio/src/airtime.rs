//! LoRa time-on-air.
//!
//! Semtech SX127x datasheet formula with explicit header and CRC enabled.
//! Low data rate optimisation is switched on whenever a symbol lasts longer
//! than 16 ms (SF11/SF12 at 125 kHz).

use std::ops::RangeInclusive;

/// Symbol duration above which low data rate optimisation is mandatory.
pub const LOW_DATA_RATE_SYMBOL_MS: f64 = 16.0;

/// Spreading factors usable with an explicit header.
pub const SPREADING_FACTORS: RangeInclusive<u8> = 7..=12;

fn clamp_sf(spreading_factor: u8) -> u8 {
    spreading_factor.clamp(*SPREADING_FACTORS.start(), *SPREADING_FACTORS.end())
}

/// Symbol duration in milliseconds. The spreading factor is clamped to
/// [`SPREADING_FACTORS`].
pub fn symbol_time_ms(spreading_factor: u8, bandwidth_hz: u32) -> f64 {
    (1u64 << clamp_sf(spreading_factor)) as f64 / bandwidth_hz.max(1) as f64 * 1000.0
}

/// Milliseconds a frame of `payload_bytes` occupies the channel, rounded up.
///
/// `coding_rate` is the denominator of the 4/x rate (5..=8). Spreading
/// factors outside [`SPREADING_FACTORS`] are clamped; callers that must
/// refuse them check the range first.
pub fn time_on_air(
    payload_bytes: usize,
    spreading_factor: u8,
    bandwidth_hz: u32,
    coding_rate: u8,
    preamble_symbols: u16,
) -> u64 {
    let spreading_factor = clamp_sf(spreading_factor);
    let sf = spreading_factor as f64;
    let ts = symbol_time_ms(spreading_factor, bandwidth_hz);
    let de = if ts > LOW_DATA_RATE_SYMBOL_MS { 1.0 } else { 0.0 };
    let cr = coding_rate.saturating_sub(4) as f64;
    let crc = 1.0;
    let implicit_header = 0.0;

    let preamble_ms = (preamble_symbols as f64 + 4.25) * ts;

    let numerator = 8.0 * payload_bytes as f64 - 4.0 * sf + 28.0 + 16.0 * crc - 20.0 * implicit_header;
    let denominator = 4.0 * (sf - 2.0 * de);
    let extra = ((numerator / denominator).ceil() * (cr + 4.0)).max(0.0);
    let payload_symbols = 8.0 + extra;

    (preamble_ms + payload_symbols * ts).ceil() as u64
}
