//! BLE HID-over-GATT peripheral protocol engine.
//!
//! Turns semantic input events (key presses, pointer deltas, media
//! commands) into byte-exact HID input reports, composes the GATT service
//! tree a HID host expects, classifies the connected host to work around
//! cross-platform quirks, and drives the advertise → connect → stream →
//! reconnect lifecycle as an explicit state machine.
//!
//! The crate is pure `no_std` logic: the platform Bluetooth stack is
//! reached only through the [`link::Transport`] trait, which keeps the
//! whole engine host-testable. Bonding/encryption cryptography, runtime
//! permissions and the on-screen UI belong to the embedding layer.
//!
//! Typical wiring:
//!
//! 1. implement [`link::Transport`] over the platform peripheral API,
//! 2. build a [`peripheral::HidPeripheral`], activate profiles and start
//!    advertising (or spawn [`engine::engine_task`] and drive it over
//!    channels),
//! 3. forward platform connect/disconnect callbacks and inbound GATT
//!    writes into the engine.

#![cfg_attr(not(test), no_std)]

pub mod adv;
pub mod compat;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod gatt;
pub mod link;
pub mod peripheral;
pub mod report;
pub mod reporter;

pub use descriptor::HidProfile;
pub use error::{Error, TransportError};
pub use link::{ConnectionState, Transport};
pub use peripheral::HidPeripheral;
