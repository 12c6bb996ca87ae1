//! TV-remote composite report: navigation and transport controls packed
//! into one byte.
//!
//! Constraint carried over from the remote-control hardware target this
//! profile mirrors: the "Up" navigation bit doubles as "Play/Pause". The
//! profile assumes a host never needs directional navigation and playback
//! toggling held at the same time. The overlap is a property of this
//! profile only and must not be generalised to the other profiles.

use crate::descriptor::{push_items, ReportMap};
use crate::error::Error;

/// Remote report size in bytes.
pub const REMOTE_REPORT_SIZE: usize = 1;

pub const SELECT: u8 = 0x01;
pub const UP: u8 = 0x02;
/// Shares a bit position with [`UP`]; see the module docs.
pub const PLAY_PAUSE: u8 = 0x02;
pub const DOWN: u8 = 0x04;
pub const LEFT: u8 = 0x08;
pub const RIGHT: u8 = 0x10;
pub const BACK: u8 = 0x20;
pub const HOME: u8 = 0x40;
pub const MENU: u8 = 0x80;

/// TV-remote input report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RemoteReport {
    /// Button bitfield (see the bit constants above).
    pub buttons: u8,
}

impl RemoteReport {
    /// All-buttons-released report.
    pub const fn empty() -> Self {
        Self { buttons: 0 }
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }
        Some(Self { buttons: data[0] })
    }

    /// Serialise into a byte slice for GATT notification.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < REMOTE_REPORT_SIZE {
            return 0;
        }
        buf[0] = self.buttons;
        REMOTE_REPORT_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.buttons == 0
    }
}

/// Emit the TV-remote section of a report map: eight one-bit consumer
/// usages. Bit 1 is declared as Menu Up; the Play/Pause doubling is a
/// sender-side convention (see module docs).
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
            0x25, 0x01, //   Logical Maximum (1)
            0x75, 0x01, //   Report Size (1)
            0x95, 0x08, //   Report Count (8)
            0x09, 0x41, //   Usage (Menu Pick)
            0x09, 0x42, //   Usage (Menu Up)
            0x09, 0x43, //   Usage (Menu Down)
            0x09, 0x44, //   Usage (Menu Left)
            0x09, 0x45, //   Usage (Menu Right)
            0x0A, 0x24, 0x02, //   Usage (AC Back)
            0x0A, 0x23, 0x02, //   Usage (AC Home)
            0x09, 0x40, //   Usage (Menu)
            0x81, 0x02, //   Input (Data, Variable, Absolute)
            0xC0, // End Collection
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn up_and_play_pause_share_a_bit() {
        assert_eq!(UP, PLAY_PAUSE);
    }

    #[test]
    fn serialize_roundtrip() {
        let report = RemoteReport {
            buttons: SELECT | BACK,
        };
        let mut buf = [0u8; 1];
        assert_eq!(report.serialize(&mut buf), 1);
        assert_eq!(buf, [0x21]);
        assert_eq!(RemoteReport::from_bytes(&buf), Some(report));
    }

    #[test]
    fn empty_buffer_rejected() {
        let report = RemoteReport::empty();
        assert_eq!(report.serialize(&mut []), 0);
        assert!(RemoteReport::from_bytes(&[]).is_none());
    }
}
