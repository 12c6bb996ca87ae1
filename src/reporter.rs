//! Per-profile reporters: small stateful builders that turn semantic input
//! events into the next input report.
//!
//! Reporters hold only sender-side state (held keys, button masks, owed
//! releases). They never talk to the transport; the peripheral facade
//! snapshots a report from them and hands it to the link layer.

use heapless::Vec;

use crate::error::Error;
use crate::report::consumer::ConsumerReport;
use crate::report::keyboard::{modifier_bit, KeyboardReport};
use crate::report::mouse::{clamp_delta, MouseReport, BUTTON_MASK};
use crate::report::remote::RemoteReport;

/// Tracks held keys and builds keyboard reports.
///
/// Keys are kept in press order so repeated snapshots of the same held set
/// serialise to identical bytes. Capacity is the 6-key rollover the report
/// layout declares; a seventh press is rejected, never silently dropped.
#[derive(Default, Debug)]
pub struct KeyboardReporter {
    modifier: u8,
    keys: Vec<u8, 6>,
}

impl KeyboardReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key press. Modifier usages (0xE0..=0xE7) set their bit;
    /// other usages join the key array. Pressing a key already held is a
    /// no-op, as is usage 0.
    pub fn press(&mut self, usage: u8) -> Result<(), Error> {
        if usage == 0 {
            return Ok(());
        }
        if let Some(bit) = modifier_bit(usage) {
            self.modifier |= bit;
            return Ok(());
        }
        if self.keys.contains(&usage) {
            return Ok(());
        }
        self.keys.push(usage).map_err(|_| Error::RolloverExceeded)
    }

    /// Register a key release. Releasing a key that is not held is a no-op.
    pub fn release(&mut self, usage: u8) {
        if let Some(bit) = modifier_bit(usage) {
            self.modifier &= !bit;
            return;
        }
        if let Some(pos) = self.keys.iter().position(|&k| k == usage) {
            // Later keys shift down; press order is preserved.
            self.keys.remove(pos);
        }
    }

    pub fn release_all(&mut self) {
        self.modifier = 0;
        self.keys.clear();
    }

    pub fn is_idle(&self) -> bool {
        self.modifier == 0 && self.keys.is_empty()
    }

    /// Snapshot the current held set as a report.
    pub fn report(&self) -> KeyboardReport {
        let mut keycodes = [0u8; 6];
        for (slot, &key) in keycodes.iter_mut().zip(self.keys.iter()) {
            *slot = key;
        }
        KeyboardReport {
            modifier: self.modifier,
            reserved: 0,
            keycodes,
        }
    }
}

/// Tracks mouse button state; motion is per-report and never accumulated.
#[derive(Default, Debug)]
pub struct MouseReporter {
    buttons: u8,
}

impl MouseReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a movement report carrying the current button state. Deltas
    /// beyond ±127 are clamped; callers split large movements.
    pub fn motion(&self, dx: i16, dy: i16, wheel: i16) -> MouseReport {
        MouseReport {
            buttons: self.buttons,
            x: clamp_delta(dx),
            y: clamp_delta(dy),
            wheel: clamp_delta(wheel),
        }
    }

    /// Replace the button state. Bits outside the declared three buttons
    /// are masked off.
    pub fn set_buttons(&mut self, mask: u8) {
        self.buttons = mask & BUTTON_MASK;
    }

    pub fn buttons(&self) -> u8 {
        self.buttons
    }

    /// Button-state-only report (no movement).
    pub fn report(&self) -> MouseReport {
        MouseReport {
            buttons: self.buttons,
            x: 0,
            y: 0,
            wheel: 0,
        }
    }

    pub fn reset(&mut self) {
        self.buttons = 0;
    }
}

/// Consumer control sender state. Every press is paired with a zero
/// release report; if the release cannot be delivered it is recorded as
/// owed and retried on the next connection.
#[derive(Default, Debug)]
pub struct ConsumerReporter {
    held: u16,
    pending_release: bool,
}

impl ConsumerReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a press; the release is owed until [`release`](Self::release)
    /// succeeds.
    pub fn press(&mut self, usage: u16) -> ConsumerReport {
        self.held = usage;
        self.pending_release = true;
        ConsumerReport { usage }
    }

    /// The zero report completing the current press.
    pub fn release(&mut self) -> ConsumerReport {
        self.held = 0;
        self.pending_release = false;
        ConsumerReport::empty()
    }

    /// A release report still owed from a failed delivery, if any.
    pub fn release_pending(&self) -> bool {
        self.pending_release
    }

    /// Record that a release went unsent and must be retried.
    pub fn mark_release_owed(&mut self) {
        self.held = 0;
        self.pending_release = true;
    }

    pub fn report(&self) -> ConsumerReport {
        ConsumerReport { usage: self.held }
    }
}

/// TV-remote button state.
#[derive(Default, Debug)]
pub struct RemoteReporter {
    buttons: u8,
}

impl RemoteReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_buttons(&mut self, mask: u8) {
        self.buttons = mask;
    }

    pub fn release_all(&mut self) {
        self.buttons = 0;
    }

    pub fn report(&self) -> RemoteReport {
        RemoteReport {
            buttons: self.buttons,
        }
    }
}
