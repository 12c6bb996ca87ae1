//! Unified error types.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! `defmt::Format` is derived behind the `defmt` feature for efficient
//! on-target logging.
//!
//! Nothing here is fatal: every failure is surfaced as a return value and
//! the connection state machine keeps running.

/// Top-level error type surfaced across the public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A send was attempted while no central is connected. Expected in
    /// normal operation (e.g. a button tap before the host connects).
    NotConnected,

    /// The operation is not valid in the current connection state.
    InvalidState,

    /// Advertising was requested with no active HID profile.
    NoActiveProfiles,

    /// The targeted profile is not part of the active set.
    ProfileNotActive,

    /// A seventh simultaneous key press was rejected (6-key rollover).
    RolloverExceeded,

    /// A host request referenced a report ID this peripheral never exposed.
    UnknownReportId,

    /// A fixed-capacity buffer was too small for the requested operation.
    BufferOverflow,

    /// A compatibility strategy failed to adapt the report map.
    MapAdaptFailed,

    /// A consumer-control release could not be delivered after its press
    /// went out. The release stays owed and is retried on reconnect.
    IncompleteRelease,

    /// The platform transport reported a failure.
    Transport(TransportError),
}

/// Errors surfaced by the platform `Transport` implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Advertising could not be started or stopped.
    AdvertiseFailed,

    /// The notify/send primitive failed (link busy, GATT congestion).
    NotifyFailed,

    /// The stack is temporarily unable to accept the operation.
    Busy,

    /// The link dropped while the operation was in flight.
    Disconnected,

    /// Raw platform error code.
    Raw(u32),
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}
