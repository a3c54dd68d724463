//! Decoded LE advertisements
//!
//! An [`AdvertisingResponse`] is built for every report in an LE Advertising
//! Report event. It owns all of its data; nothing borrows from the socket
//! buffer it was read from.

mod parser;


pub use parser::parse_packet;

use crate::address::{AddressType, BdAddr};
use crate::hci::constants::*;
use crate::uuid::Uuid;
use bitflags::bitflags;

/// Advertising PDU kind, as reported by the controller.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LeAdvertisingEventType {
    /// Connectable undirected: anyone may connect or send a scan request
    AdvInd = ADV_IND,
    /// Connectable directed at one known device
    AdvDirectInd = ADV_DIRECT_IND,
    /// Scannable undirected: no connections, scan requests allowed
    AdvScanInd = ADV_SCAN_IND,
    /// Non-connectable undirected: pure broadcast
    AdvNonconnInd = ADV_NONCONN_IND,
    /// Reply to one of our scan requests
    ScanRsp = SCAN_RSP,
}

impl LeAdvertisingEventType {
    pub fn is_connectable(self) -> bool {
        matches!(self, Self::AdvInd | Self::AdvDirectInd)
    }

    pub fn is_scannable(self) -> bool {
        matches!(self, Self::AdvInd | Self::AdvScanInd)
    }
}

impl TryFrom<u8> for LeAdvertisingEventType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            ADV_IND => Ok(Self::AdvInd),
            ADV_DIRECT_IND => Ok(Self::AdvDirectInd),
            ADV_SCAN_IND => Ok(Self::AdvScanInd),
            ADV_NONCONN_IND => Ok(Self::AdvNonconnInd),
            SCAN_RSP => Ok(Self::ScanRsp),
            other => Err(other),
        }
    }
}

bitflags! {
    /// Bits of the Flags AD structure.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AdFlags: u8 {
        const LE_LIMITED_DISCOVERABLE = 1 << 0;
        const LE_GENERAL_DISCOVERABLE = 1 << 1;
        const BR_EDR_UNSUPPORTED = 1 << 2;
        const SIMULTANEOUS_LE_BR_CONTROLLER = 1 << 3;
        const SIMULTANEOUS_LE_BR_HOST = 1 << 4;
    }
}

/// Decoded Flags AD structure.
///
/// The defined bits come from the first octet; `flag_data` keeps every octet
/// so bits this decoder does not know about are not lost.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flags {
    pub le_limited_discoverable: bool,
    pub le_general_discoverable: bool,
    pub br_edr_unsupported: bool,
    pub simultaneous_le_br_controller: bool,
    pub simultaneous_le_br_host: bool,
    pub flag_data: Vec<u8>,
}

impl Flags {
    pub fn new(flag_data: Vec<u8>) -> Self {
        let bits = AdFlags::from_bits_truncate(flag_data.first().copied().unwrap_or(0));
        Flags {
            le_limited_discoverable: bits.contains(AdFlags::LE_LIMITED_DISCOVERABLE),
            le_general_discoverable: bits.contains(AdFlags::LE_GENERAL_DISCOVERABLE),
            br_edr_unsupported: bits.contains(AdFlags::BR_EDR_UNSUPPORTED),
            simultaneous_le_br_controller: bits.contains(AdFlags::SIMULTANEOUS_LE_BR_CONTROLLER),
            simultaneous_le_br_host: bits.contains(AdFlags::SIMULTANEOUS_LE_BR_HOST),
            flag_data,
        }
    }

    pub fn bits(&self) -> AdFlags {
        AdFlags::from_bits_truncate(self.flag_data.first().copied().unwrap_or(0))
    }
}

/// Advertised local name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub name: String,
    /// False for the Shortened Local Name AD type
    pub complete: bool,
}

/// One advertisement or scan response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingResponse {
    pub address: BdAddr,
    pub address_type: AddressType,
    pub event_type: LeAdvertisingEventType,
    /// Signal strength in dBm, or [`RSSI_UNAVAILABLE`].
    pub rssi: i8,

    pub local_name: Option<Name>,
    pub flags: Option<Flags>,

    /// Service UUIDs in advertised order, all widths.
    pub uuids: Vec<Uuid>,
    pub uuid_16_bit_complete: bool,
    pub uuid_32_bit_complete: bool,
    pub uuid_128_bit_complete: bool,

    pub manufacturer_specific_data: Vec<Vec<u8>>,
    pub service_data: Vec<Vec<u8>>,
    /// `(AD type, payload)` for every structure not decoded above
    pub unparsed_data_with_types: Vec<(u8, Vec<u8>)>,
    /// Every AD structure verbatim, length and type bytes included
    pub raw_packet: Vec<Vec<u8>>,
}

impl AdvertisingResponse {
    pub fn new(
        address: BdAddr,
        address_type: AddressType,
        event_type: LeAdvertisingEventType,
        rssi: i8,
    ) -> Self {
        Self {
            address,
            address_type,
            event_type,
            rssi,
            local_name: None,
            flags: None,
            uuids: Vec::new(),
            uuid_16_bit_complete: false,
            uuid_32_bit_complete: false,
            uuid_128_bit_complete: false,
            manufacturer_specific_data: Vec::new(),
            service_data: Vec::new(),
            unparsed_data_with_types: Vec::new(),
            raw_packet: Vec::new(),
        }
    }

    /// RSSI in dBm, `None` when the controller had no reading.
    pub fn rssi_dbm(&self) -> Option<i8> {
        (self.rssi != RSSI_UNAVAILABLE).then_some(self.rssi)
    }

    /// The advertising data exactly as received, padding included.
    pub fn ad_payload(&self) -> Vec<u8> {
        self.raw_packet.concat()
    }
}
