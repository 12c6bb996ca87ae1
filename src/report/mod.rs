//! HID input report types and byte-exact encoding.
//!
//! Each profile's report is a fixed-size buffer whose layout is declared
//! by its report-map fragment (see [`crate::descriptor`]). Encoding is
//! pure: the same logical state always serializes to identical bytes.

pub mod consumer;
pub mod keyboard;
pub mod mouse;
pub mod remote;

pub use consumer::ConsumerReport;
pub use keyboard::KeyboardReport;
pub use mouse::MouseReport;
pub use remote::RemoteReport;

use crate::descriptor::HidProfile;
use crate::error::Error;

/// One outgoing input report, unified across profiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidReport {
    Keyboard(KeyboardReport),
    Mouse(MouseReport),
    Consumer(ConsumerReport),
    Remote(RemoteReport),
}

impl HidReport {
    /// The profile whose descriptor shapes this report.
    pub fn profile(&self) -> HidProfile {
        match self {
            HidReport::Keyboard(_) => HidProfile::Keyboard,
            HidReport::Mouse(_) => HidProfile::Mouse,
            HidReport::Consumer(_) => HidProfile::ConsumerControl,
            HidReport::Remote(_) => HidProfile::TvRemote,
        }
    }

    /// Serialise into `buf`. Returns the number of bytes written, or 0 if
    /// the buffer is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        match self {
            HidReport::Keyboard(r) => r.serialize(buf),
            HidReport::Mouse(r) => r.serialize(buf),
            HidReport::Consumer(r) => r.serialize(buf),
            HidReport::Remote(r) => r.serialize(buf),
        }
    }
}

/// All-zero report for a profile. Answers host Get Report queries before
/// any input happened and represents "everything released".
pub fn empty_report(profile: HidProfile) -> HidReport {
    match profile {
        HidProfile::Keyboard => HidReport::Keyboard(KeyboardReport::empty()),
        HidProfile::Mouse => HidReport::Mouse(MouseReport::empty()),
        HidProfile::ConsumerControl => HidReport::Consumer(ConsumerReport::empty()),
        HidProfile::TvRemote => HidReport::Remote(RemoteReport::empty()),
    }
}

/// Encode a report into `buf`, checking the declared size invariant: a
/// report that does not match its descriptor's input size is rejected or
/// misinterpreted by the host.
pub fn encode(report: &HidReport, buf: &mut [u8]) -> Result<usize, Error> {
    let written = report.serialize(buf);
    if written == 0 {
        return Err(Error::BufferOverflow);
    }
    debug_assert_eq!(written, report.profile().input_report_size());
    Ok(written)
}
