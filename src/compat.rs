//! Host classification and per-host compatibility strategies.
//!
//! A newly connected central is classified from its advertised name into a
//! coarse [`HostKind`]. Each kind carries a strategy that may rewrite the
//! report map, the HID Information value, individual outgoing reports and
//! the advertised device name. Adaptation is best-effort: a strategy that
//! fails degrades to the Generic one instead of failing the connection -
//! a lost cosmetic fix is acceptable, a lost connection is not.

use log::warn;

use crate::config;
use crate::descriptor::ReportMap;
use crate::error::Error;

/// HID Information flag bits.
const FLAG_REMOTE_WAKE: u8 = 0x01;
const FLAG_NORMALLY_CONNECTABLE: u8 = 0x02;

/// Coarse classification of the connected host platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostKind {
    Generic,
    Apple,
    Windows,
    Android,
}

/// One name matcher. The table is evaluated in order and the first match
/// wins, so specific signatures must be listed before broad tokens
/// ("apple tv" has to win over the bare "tv").
struct Matcher {
    needle: &'static str,
    kind: HostKind,
}

const MATCHERS: &[Matcher] = &[
    // Specific vendor/OS signatures.
    Matcher {
        needle: "apple tv",
        kind: HostKind::Apple,
    },
    Matcher {
        needle: "macbook",
        kind: HostKind::Apple,
    },
    Matcher {
        needle: "imac",
        kind: HostKind::Apple,
    },
    Matcher {
        needle: "mac mini",
        kind: HostKind::Apple,
    },
    Matcher {
        needle: "ipad",
        kind: HostKind::Apple,
    },
    Matcher {
        needle: "iphone",
        kind: HostKind::Apple,
    },
    Matcher {
        needle: "surface",
        kind: HostKind::Windows,
    },
    // Default Windows computer names look like DESKTOP-4F2A9B.
    Matcher {
        needle: "desktop-",
        kind: HostKind::Windows,
    },
    Matcher {
        needle: "xbox",
        kind: HostKind::Windows,
    },
    Matcher {
        needle: "fire tv",
        kind: HostKind::Android,
    },
    Matcher {
        needle: "chromecast",
        kind: HostKind::Android,
    },
    Matcher {
        needle: "shield",
        kind: HostKind::Android,
    },
    // Broad tokens last.
    Matcher {
        needle: "windows",
        kind: HostKind::Windows,
    },
    Matcher {
        needle: "android",
        kind: HostKind::Android,
    },
    Matcher {
        needle: "tv",
        kind: HostKind::Android,
    },
];

/// Classify a peer from its advertised name. Unknown names are Generic.
pub fn classify(peer_name: &str) -> HostKind {
    for m in MATCHERS {
        if contains_ignore_ascii_case(peer_name, m.needle) {
            return m.kind;
        }
    }
    HostKind::Generic
}

fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() {
        return true;
    }
    if h.len() < n.len() {
        return false;
    }
    h.windows(n.len()).any(|w| w.eq_ignore_ascii_case(n))
}

impl HostKind {
    /// HID Information characteristic value: bcdHID 1.11 little-endian,
    /// country code 0, flags.
    pub fn hid_information(self) -> [u8; 4] {
        // Apple hosts have been seen to drop reconnects from peripherals
        // that advertise remote wake without having negotiated it; the
        // flag stays cleared there.
        let flags = match self {
            HostKind::Apple => FLAG_NORMALLY_CONNECTABLE,
            _ => FLAG_NORMALLY_CONNECTABLE | FLAG_REMOTE_WAKE,
        };
        [0x11, 0x01, 0x00, flags]
    }

    /// Name shown in the host's Bluetooth settings. Users disambiguate
    /// devices by this string, so it must stay stable per host kind.
    pub fn device_name(self) -> &'static str {
        match self {
            // iOS/tvOS settings surface keyboard-capable peripherals more
            // reliably when the name says what the device is.
            HostKind::Apple => "BLE Remote Keyboard",
            _ => config::DEVICE_NAME,
        }
    }

    /// Rewrite report-map items the host parses incorrectly. The item
    /// stream length is always preserved: values are rewritten in place,
    /// never inserted or removed.
    pub fn adapt_report_map(self, map: &ReportMap) -> Result<ReportMap, Error> {
        match self {
            HostKind::Apple => clamp_keyboard_array_maxima(map),
            _ => Ok(map.clone()),
        }
    }

    /// Rewrite one outgoing report before transmission. Identity for the
    /// current host kinds; kept in the send path so per-host report fixes
    /// stay local to this module.
    pub fn adapt_report(self, _report_id: u8, _report: &mut [u8]) {}
}

/// macOS/iOS reject key arrays whose usage range runs past 0x65 (Keypad
/// Application): clamp the keyboard array maxima from 0xFF down to 0x65.
///
/// Walks the HID short items (prefix byte = tag/type/size) and rewrites
/// Usage Maximum / Logical Maximum values inside the Keyboard usage page.
fn clamp_keyboard_array_maxima(map: &ReportMap) -> Result<ReportMap, Error> {
    let mut out = map.clone();
    let mut usage_page: u16 = 0;
    let mut i = 0;
    while i < out.len() {
        let prefix = out[i];
        let size = match prefix & 0x03 {
            0 => 0,
            1 => 1,
            2 => 2,
            _ => 4,
        };
        if i + 1 + size > out.len() {
            return Err(Error::MapAdaptFailed);
        }

        // Usage Page (global item, tag 0).
        if prefix & 0xFC == 0x04 {
            usage_page = match size {
                1 => out[i + 1] as u16,
                2 => u16::from_le_bytes([out[i + 1], out[i + 2]]),
                _ => 0,
            };
        }

        if usage_page == 0x07 {
            match (prefix, size) {
                // Usage Maximum (1 byte)
                (0x29, 1) if out[i + 1] == 0xFF => out[i + 1] = 0x65,
                // Logical/Usage Maximum (2 bytes)
                (0x26, 2) | (0x2A, 2) if out[i + 1] == 0xFF && out[i + 2] == 0x00 => {
                    out[i + 1] = 0x65
                }
                _ => {}
            }
        }

        i += 1 + size;
    }
    Ok(out)
}

/// The compatibility strategy selected for one connection. Cached for the
/// connection's lifetime; a reconnect re-runs classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Strategy {
    kind: HostKind,
}

impl Strategy {
    pub const GENERIC: Strategy = Strategy {
        kind: HostKind::Generic,
    };

    pub fn select(kind: HostKind) -> Self {
        Self { kind }
    }

    pub fn host(self) -> HostKind {
        self.kind
    }

    /// Build the attribute overlay for this host from the base report map.
    /// A failing adaptation falls back to the Generic strategy.
    pub fn overlay(self, base_map: &ReportMap) -> CompatOverlay {
        let (kind, report_map) = match self.kind.adapt_report_map(base_map) {
            Ok(map) => (self.kind, map),
            Err(e) => {
                warn!(
                    "report map adaptation failed for {:?} ({:?}), using generic",
                    self.kind, e
                );
                (HostKind::Generic, base_map.clone())
            }
        };
        CompatOverlay {
            host: kind,
            report_map,
            hid_information: kind.hid_information(),
            device_name: kind.device_name(),
        }
    }

    pub fn adapt_report(self, report_id: u8, report: &mut [u8]) {
        self.kind.adapt_report(report_id, report);
    }
}

/// Host-adapted attribute values pushed to the transport after a peer is
/// classified. Deterministic per host kind, so a bonded host reads the
/// same report map on every reconnect.
#[derive(Clone, Debug, PartialEq)]
pub struct CompatOverlay {
    pub host: HostKind,
    pub report_map: ReportMap,
    pub hid_information: [u8; 4],
    pub device_name: &'static str,
}
