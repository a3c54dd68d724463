//! HCI packet structures and parsing
//!
//! This module contains the commands the scanner sends and the event
//! envelope it receives.

use crate::error::ProtocolError;
use crate::hci::constants::*;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// HCI commands used to drive LE scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HciCommand {
    LeSetScanParameters {
        scan_type: u8,
        scan_interval: u16,
        scan_window: u16,
        own_address_type: u8,
        filter_policy: u8,
    },
    LeSetScanEnable {
        enable: bool,
        filter_duplicates: bool,
    },
}

/// Packs an OGF/OCF pair into a command opcode.
pub const fn opcode(ogf: u8, ocf: u16) -> u16 {
    ((ogf as u16) << 10) | (ocf & 0x3ff)
}

impl HciCommand {
    /// Get the OGF and OCF for this command
    pub fn opcode_parts(&self) -> (u8, u16) {
        match self {
            Self::LeSetScanParameters { .. } => (OGF_LE, OCF_LE_SET_SCAN_PARAMETERS),
            Self::LeSetScanEnable { .. } => (OGF_LE, OCF_LE_SET_SCAN_ENABLE),
        }
    }

    pub fn opcode(&self) -> u16 {
        let (ogf, ocf) = self.opcode_parts();
        opcode(ogf, ocf)
    }

    fn parameters(&self) -> Vec<u8> {
        match *self {
            Self::LeSetScanParameters {
                scan_type,
                scan_interval,
                scan_window,
                own_address_type,
                filter_policy,
            } => {
                let mut params = Vec::with_capacity(7);
                params.push(scan_type);
                params.extend_from_slice(&scan_interval.to_le_bytes());
                params.extend_from_slice(&scan_window.to_le_bytes());
                params.push(own_address_type);
                params.push(filter_policy);
                params
            }

            Self::LeSetScanEnable {
                enable,
                filter_duplicates,
            } => vec![enable as u8, filter_duplicates as u8],
        }
    }

    /// Convert the command to a raw HCI packet
    pub fn to_packet(&self) -> Vec<u8> {
        let params = self.parameters();

        let mut packet = vec![HCI_COMMAND_PKT];
        packet.extend_from_slice(&self.opcode().to_le_bytes());
        packet.push(params.len() as u8);
        packet.extend_from_slice(&params);
        packet
    }
}

/// HCI Event packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HciEvent {
    pub event_code: u8,
    pub parameters: Vec<u8>,
}

impl HciEvent {
    /// Parse an event from a packet as read off the socket, starting with
    /// the packet-type indicator.
    pub fn from_packet(packet: &[u8]) -> Result<Self, ProtocolError> {
        match packet.first() {
            None => Err(ProtocolError::Truncated {
                field: "packet type",
                offset: 0,
            }),
            Some(&HCI_EVENT_PKT) => Self::parse_at(&packet[1..], 1),
            Some(&other) => Err(ProtocolError::NotAnEvent(other)),
        }
    }

    fn parse_at(data: &[u8], base: usize) -> Result<Self, ProtocolError> {
        if data.len() < HCI_EVENT_HDR_SIZE {
            return Err(ProtocolError::Truncated {
                field: "event header",
                offset: base + data.len(),
            });
        }

        let event_code = data[0];
        let declared = data[1] as usize;
        let actual = data.len() - HCI_EVENT_HDR_SIZE;
        if declared != actual {
            return Err(ProtocolError::ParameterLength { declared, actual });
        }

        Ok(HciEvent {
            event_code,
            parameters: data[HCI_EVENT_HDR_SIZE..].to_vec(),
        })
    }

    /// The LE meta subevent code, if this is an LE meta event.
    pub fn le_subevent(&self) -> Option<u8> {
        match self.event_code {
            EVT_LE_META_EVENT => self.parameters.first().copied(),
            _ => None,
        }
    }

    /// Opcode and return parameters of a Command Complete event.
    pub fn command_complete(&self) -> Option<(u16, &[u8])> {
        if self.event_code != EVT_CMD_COMPLETE {
            return None;
        }
        let mut cursor = Cursor::new(&self.parameters[..]);
        let _num_packets = cursor.read_u8().ok()?;
        let opcode = cursor.read_u16::<LittleEndian>().ok()?;
        Some((opcode, &self.parameters[3..]))
    }

    /// Status and opcode of a Command Status event.
    pub fn command_status(&self) -> Option<(u8, u16)> {
        if self.event_code != EVT_CMD_STATUS {
            return None;
        }
        let mut cursor = Cursor::new(&self.parameters[..]);
        let status = cursor.read_u8().ok()?;
        let _num_packets = cursor.read_u8().ok()?;
        let opcode = cursor.read_u16::<LittleEndian>().ok()?;
        Some((status, opcode))
    }
}
