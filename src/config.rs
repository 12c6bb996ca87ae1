//! Compile-time configuration and protocol constants.
//!
//! Identity, timing parameters and buffer capacities live here so they can
//! be tuned in one place.

/// Default advertised device name (shown in the host's Bluetooth settings).
/// Compatibility strategies may substitute a host-specific variant.
pub const DEVICE_NAME: &str = "BLE Remote";

/// Maximum bytes kept from a peer's advertised name.
pub const MAX_PEER_NAME: usize = 32;

// BLE connection parameters requested after a central connects.
//
// This peripheral's entire value proposition is input latency, so the
// lowest-latency profile the platform exposes is requested and no
// power-saving fallback is applied here; that trade-off belongs to the
// embedding layer's battery/UX policy.

/// Connection interval range (in 1.25 ms units). 6 = 7.5 ms.
pub const CONN_INTERVAL_MIN: u16 = 6;
pub const CONN_INTERVAL_MAX: u16 = 12;

/// Peripheral latency (connection events the peripheral may skip).
pub const PERIPHERAL_LATENCY: u16 = 0;

/// Supervision timeout (in 10 ms units). 400 = 4 s.
pub const SUPERVISION_TIMEOUT: u16 = 400;

/// ATT MTU to request after connecting.
pub const PREFERRED_MTU: u16 = 247;

// GATT attribute capacities

/// Largest attribute value carried in a service plan (the report map).
pub const MAX_ATTRIBUTE_LEN: usize = 384;

/// Largest input report across all profiles (keyboard, 8 bytes).
pub const MAX_INPUT_REPORT_LEN: usize = 8;

// Device Information service

/// PnP ID: vendor-ID source 0x02 (USB-IF), the "pid.codes" open-source
/// test VID 0x1209, PID 0x0001, product version 1.0. Replace with an
/// allocated VID/PID for production.
pub const PNP_ID: [u8; 7] = [0x02, 0x09, 0x12, 0x01, 0x00, 0x00, 0x01];

/// Battery level exposed until the embedding layer reports a real one.
pub const DEFAULT_BATTERY_LEVEL: u8 = 100;
