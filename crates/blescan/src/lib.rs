//! blescan - Bluetooth LE advertisement scanning over raw HCI sockets
//!
//! This library opens a raw HCI socket on a Linux Bluetooth controller,
//! enables LE scanning and decodes LE Advertising Report events into
//! [`AdvertisingResponse`] records. The decoder is pure and can be used on
//! captured packets without any hardware.

pub mod address;
pub mod advertising;
pub mod error;
pub mod filter;
pub mod hci;
pub mod reader;
pub mod scanner;
pub mod uuid;

#[cfg(test)]
mod testing;

// Re-export common types for convenience
pub use address::{AddressType, BdAddr};
pub use advertising::{
    parse_packet, AdFlags, AdvertisingResponse, Flags, LeAdvertisingEventType, Name,
};
pub use error::{ProtocolError, Result, ScanError};
pub use filter::{FilterDuplicates, ScanType};
pub use hci::{DeviceSelector, HciSocket};
pub use scanner::{HciScanner, ScanTransport, ScannerConfig};
pub use uuid::Uuid;
