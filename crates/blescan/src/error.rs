//! Error types for the blescan library
//!
//! Failures are classified once, where they happen: at the socket read, at
//! the command exchange with the controller, or inside the packet decoder.

use std::io;
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors that can occur while scanning
#[derive(Error, Debug)]
pub enum ScanError {
    /// A blocking read was interrupted by a signal. Nothing was consumed and
    /// the call may be retried immediately.
    #[error("interrupted while reading HCI packet")]
    Interrupted,

    /// The transport failed. The scanner should be considered unusable.
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("no Bluetooth controller matches {0:?}")]
    NoDevice(String),

    /// The controller rejected an HCI command with a non-zero status.
    #[error("HCI command 0x{opcode:04X} failed with status 0x{status:02X}")]
    Command { opcode: u16, status: u8 },

    /// The controller emitted structurally invalid data.
    #[error("malformed HCI data: {0}")]
    Protocol(#[from] ProtocolError),

    /// The API was driven in an invalid order.
    #[error("scanner misuse: {0}")]
    Misuse(&'static str),
}

impl ScanError {
    pub(crate) fn io(context: &'static str, source: io::Error) -> Self {
        ScanError::Io { context, source }
    }

    pub(crate) fn last_os_error(context: &'static str) -> Self {
        ScanError::io(context, io::Error::last_os_error())
    }

    /// True for the one condition a caller can retry without reinitializing.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ScanError::Interrupted)
    }

    /// True when the scanner must be torn down and rebuilt from scratch.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::Io { .. } | ScanError::Protocol(_) | ScanError::Command { .. }
        )
    }

    /// The platform error code, if this error came from the OS.
    pub fn os_error(&self) -> Option<i32> {
        match self {
            ScanError::Io { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

/// Structural violations found while decoding controller output.
///
/// Offsets are relative to the start of the packet handed to the decoder,
/// which begins with the HCI packet-type indicator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("expected an HCI event packet, got packet type 0x{0:02X}")]
    NotAnEvent(u8),

    #[error("expected an LE meta event, got event code 0x{0:02X}")]
    UnexpectedEvent(u8),

    #[error("expected an LE advertising report, got subevent 0x{0:02X}")]
    UnexpectedSubevent(u8),

    #[error("packet truncated reading {field} at offset {offset}")]
    Truncated { field: &'static str, offset: usize },

    #[error("event declares {declared} parameter bytes but {actual} are present")]
    ParameterLength { declared: usize, actual: usize },

    #[error("unknown advertising event type 0x{value:02X} at offset {offset}")]
    UnknownEventType { value: u8, offset: usize },

    #[error("unknown address type 0x{value:02X} at offset {offset}")]
    UnknownAddressType { value: u8, offset: usize },

    #[error("AD structure at offset {offset} declares {declared} bytes but only {remaining} remain")]
    AdOverrun {
        offset: usize,
        declared: usize,
        remaining: usize,
    },

    #[error("second Flags AD structure at offset {offset}")]
    DuplicateFlags { offset: usize },

    #[error("{width}-bit UUID list at offset {offset} has {len} bytes")]
    UuidListLength {
        width: usize,
        len: usize,
        offset: usize,
    },

    #[error("non-zero byte after AD terminator at offset {offset}")]
    NonZeroPadding { offset: usize },

    #[error("{count} unconsumed bytes after the last report at offset {offset}")]
    TrailingBytes { count: usize, offset: usize },
}
