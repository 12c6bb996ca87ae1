//! Consumer Control input report - media keys, volume, browser controls.
//!
//! Consumer Control is a separate HID usage page (0x0C). The report is a
//! single little-endian 16-bit usage code; the 16-bit zero value encodes
//! "released". This profile models discrete press/release, not chords.

use crate::descriptor::{push_items, ReportMap};
use crate::error::Error;

/// Consumer control report size (one 16-bit usage).
pub const CONSUMER_REPORT_SIZE: usize = 2;

/// Common consumer control usage codes (Usage Page 0x0C).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum ConsumerUsage {
    /// No action (release).
    None = 0x0000,
    /// Play/Pause toggle.
    PlayPause = 0x00CD,
    /// Next track.
    NextTrack = 0x00B5,
    /// Previous track.
    PrevTrack = 0x00B6,
    /// Stop.
    Stop = 0x00B7,
    /// Volume up.
    VolumeUp = 0x00E9,
    /// Volume down.
    VolumeDown = 0x00EA,
    /// Mute toggle.
    Mute = 0x00E2,
    /// Browser home.
    BrowserHome = 0x0223,
    /// Browser back.
    BrowserBack = 0x0224,
    /// Browser forward.
    BrowserForward = 0x0225,
    /// Sleep.
    Sleep = 0x0032,
}

impl From<u16> for ConsumerUsage {
    fn from(code: u16) -> Self {
        match code {
            0x00CD => ConsumerUsage::PlayPause,
            0x00B5 => ConsumerUsage::NextTrack,
            0x00B6 => ConsumerUsage::PrevTrack,
            0x00B7 => ConsumerUsage::Stop,
            0x00E9 => ConsumerUsage::VolumeUp,
            0x00EA => ConsumerUsage::VolumeDown,
            0x00E2 => ConsumerUsage::Mute,
            0x0223 => ConsumerUsage::BrowserHome,
            0x0224 => ConsumerUsage::BrowserBack,
            0x0225 => ConsumerUsage::BrowserForward,
            0x0032 => ConsumerUsage::Sleep,
            _ => ConsumerUsage::None,
        }
    }
}

/// Consumer Control input report: one held usage or zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConsumerReport {
    /// Active consumer control usage (serialised little-endian).
    pub usage: u16,
}

impl ConsumerReport {
    /// Released report (usage 0x0000).
    pub const fn empty() -> Self {
        Self { usage: 0 }
    }

    pub const fn new(usage: ConsumerUsage) -> Self {
        Self {
            usage: usage as u16,
        }
    }

    /// Parse from raw report bytes.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < CONSUMER_REPORT_SIZE {
            return None;
        }
        Some(Self {
            usage: u16::from_le_bytes([data[0], data[1]]),
        })
    }

    /// Serialise into a byte slice for GATT notification.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < CONSUMER_REPORT_SIZE {
            return 0;
        }
        buf[..2].copy_from_slice(&self.usage.to_le_bytes());
        CONSUMER_REPORT_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.usage == 0
    }
}

/// Emit the consumer-control section of a report map.
pub(crate) fn write_map_fragment(map: &mut ReportMap, report_id: Option<u8>) -> Result<(), Error> {
    push_items(
        map,
        &[
            0x05, 0x0C, // Usage Page (Consumer)
            0x09, 0x01, // Usage (Consumer Control)
            0xA1, 0x01, // Collection (Application)
        ],
    )?;
    if let Some(id) = report_id {
        push_items(map, &[0x85, id])?; // Report ID
    }
    push_items(
        map,
        &[
            0x15, 0x00, //   Logical Minimum (0)
            0x26, 0xFF, 0x03, //   Logical Maximum (1023)
            0x19, 0x00, //   Usage Minimum (0)
            0x2A, 0xFF, 0x03, //   Usage Maximum (1023)
            0x75, 0x10, //   Report Size (16)
            0x95, 0x01, //   Report Count (1)
            0x81, 0x00, //   Input (Data, Array)
            0xC0, // End Collection
        ],
    )
}
