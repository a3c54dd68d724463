//! Bluetooth HCI (Host Controller Interface) implementation
//!
//! This module provides the raw socket, its kernel filter, controller
//! discovery and the packets exchanged while scanning.

pub mod constants;
pub mod device;
pub mod filter;
pub mod packet;
pub mod socket;


pub use device::DeviceSelector;
pub use filter::HciFilter;
pub use packet::{HciCommand, HciEvent};
pub use socket::HciSocket;
