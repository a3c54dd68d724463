//! Duplicate filtering and scan filter configuration
//!
//! Duplicates can be dropped by the controller, by this crate, or both. The
//! controller's cache is small and silently re-admits devices once it fills
//! up under heavy traffic, so the software filter is the only one that is
//! exact.

use crate::address::BdAddr;
use crate::advertising::{AdvertisingResponse, LeAdvertisingEventType};
use crate::hci::constants::*;
use crate::hci::{HciCommand, HciFilter};
use std::collections::HashSet;

/// Where duplicate advertisements are suppressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterDuplicates {
    /// Deliver every event
    Off,
    /// Controller only; low power, may leak duplicates under load
    Hardware,
    /// Receive everything and filter here
    #[default]
    Software,
    Both,
}

impl FilterDuplicates {
    pub fn hardware(self) -> bool {
        matches!(self, FilterDuplicates::Hardware | FilterDuplicates::Both)
    }

    pub fn software(self) -> bool {
        matches!(self, FilterDuplicates::Software | FilterDuplicates::Both)
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanType {
    Passive = 0x00,
    /// Also sends scan requests, so scannable devices answer with SCAN_RSP
    #[default]
    Active = 0x01,
}

/// Everything the scanner installs on the controller and the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    pub hardware_filtering: bool,
    pub software_filtering: bool,
    pub scan_type: ScanType,
    pub scan_interval: u16,
    pub scan_window: u16,
}

impl FilterConfig {
    pub fn new(filter_duplicates: FilterDuplicates, scan_type: ScanType) -> Self {
        FilterConfig {
            hardware_filtering: filter_duplicates.hardware(),
            software_filtering: filter_duplicates.software(),
            scan_type,
            scan_interval: LE_SCAN_INTERVAL,
            scan_window: LE_SCAN_WINDOW,
        }
    }

    pub fn scan_parameters(&self) -> HciCommand {
        HciCommand::LeSetScanParameters {
            scan_type: self.scan_type as u8,
            scan_interval: self.scan_interval,
            scan_window: self.scan_window,
            own_address_type: PUBLIC_DEVICE_ADDRESS,
            filter_policy: LE_FILTER_POLICY_ACCEPT_ALL,
        }
    }

    pub fn scan_enable(&self) -> HciCommand {
        HciCommand::LeSetScanEnable {
            enable: true,
            filter_duplicates: self.hardware_filtering,
        }
    }

    pub fn scan_disable(&self) -> HciCommand {
        HciCommand::LeSetScanEnable {
            enable: false,
            filter_duplicates: true,
        }
    }

    /// The socket filter used while scanning: LE meta events only.
    ///
    /// The kernel cannot filter on subevent; the decoder checks that.
    pub fn socket_filter(&self) -> HciFilter {
        let mut filter = HciFilter::new();
        filter.set_ptype(HCI_EVENT_PKT).set_event(EVT_LE_META_EVENT);
        filter
    }
}

/// The set of devices already delivered since scanning started.
///
/// An address that advertises and later answers a scan request produces two
/// entries, one per event type. Entries are never evicted; the set lives as
/// long as the scanner that owns it.
#[derive(Debug, Default)]
pub struct DuplicateFilter {
    seen: HashSet<(BdAddr, LeAdvertisingEventType)>,
}

impl DuplicateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time this response's identity is seen.
    pub fn should_emit(&mut self, response: &AdvertisingResponse) -> bool {
        self.seen.insert((response.address, response.event_type))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
