//! Synthetic HCI packets and fake transports used across the unit tests

use crate::error::{Result, ScanError};
use crate::hci::constants::*;
use crate::hci::{HciCommand, HciFilter};
use crate::reader::PacketSource;
use crate::scanner::ScanTransport;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::rc::Rc;
use std::time::Duration;

/// One report inside an LE Advertising Report event
#[derive(Debug, Clone)]
pub struct Report {
    pub event_type: u8,
    pub address_type: u8,
    /// Wire order, least significant byte first
    pub address: [u8; 6],
    pub data: Vec<u8>,
    pub rssi: i8,
}

impl Report {
    /// An ADV_IND from public address AA:BB:CC:DD:EE:FF with no data.
    pub fn new() -> Self {
        Report {
            event_type: ADV_IND,
            address_type: PUBLIC_DEVICE_ADDRESS,
            address: [0xFF, 0xEE, 0xDD, 0xCC, 0xBB, 0xAA],
            data: Vec::new(),
            rssi: -60,
        }
    }

    pub fn event_type(mut self, event_type: u8) -> Self {
        self.event_type = event_type;
        self
    }

    pub fn address(mut self, address: [u8; 6]) -> Self {
        self.address = address;
        self
    }

    pub fn rssi(mut self, rssi: i8) -> Self {
        self.rssi = rssi;
        self
    }

    /// Appends one AD structure.
    pub fn ad(mut self, ad_type: u8, payload: &[u8]) -> Self {
        self.data.extend(ad_structure(ad_type, payload));
        self
    }

    /// Appends bytes verbatim, for malformed data.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }
}

pub fn ad_structure(ad_type: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![payload.len() as u8 + 1, ad_type];
    out.extend_from_slice(payload);
    out
}

/// A complete packet as read from the socket, packet-type byte first.
pub fn advertising_packet(reports: &[Report]) -> Vec<u8> {
    let mut params = vec![EVT_LE_ADVERTISING_REPORT, reports.len() as u8];
    for r in reports {
        params.push(r.event_type);
        params.push(r.address_type);
        params.extend_from_slice(&r.address);
        params.push(r.data.len() as u8);
        params.extend_from_slice(&r.data);
        params.push(r.rssi as u8);
    }

    let mut packet = vec![HCI_EVENT_PKT, EVT_LE_META_EVENT, params.len() as u8];
    packet.extend(params);
    packet
}

/// A packet source that replays a fixed script of read outcomes.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    pub script: VecDeque<io::Result<Vec<u8>>>,
    /// Outcomes of successive `wait_readable` calls; `Ok` once empty
    pub wait_errors: VecDeque<io::Error>,
    pub reads: usize,
    pub waits: usize,
}

impl ScriptedSource {
    pub fn new(script: Vec<io::Result<Vec<u8>>>) -> Self {
        ScriptedSource {
            script: script.into(),
            ..Default::default()
        }
    }
}

impl PacketSource for ScriptedSource {
    fn read_packet(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        match self.script.pop_front() {
            Some(Ok(packet)) => {
                buf[..packet.len()].copy_from_slice(&packet);
                Ok(packet.len())
            }
            Some(Err(e)) => Err(e),
            None => Err(io::Error::from_raw_os_error(libc::EBADF)),
        }
    }

    fn wait_readable(&mut self) -> io::Result<()> {
        self.waits += 1;
        match self.wait_errors.pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

pub fn interrupted() -> io::Error {
    io::Error::from_raw_os_error(libc::EINTR)
}

/// One control operation seen by [`FakeController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCall {
    GetFilter,
    SetFilter(HciFilter),
    Request(HciCommand),
}

/// A scan transport that records every control call and plays back packets.
///
/// The call log is shared so it can still be inspected after the scanner
/// owning the controller has been dropped.
#[derive(Debug, Default)]
pub struct FakeController {
    pub installed: HciFilter,
    pub calls: Rc<RefCell<Vec<ControlCall>>>,
    pub packets: ScriptedSource,
    /// Fail every `set_filter` with `EPERM`
    pub fail_set_filter: bool,
    /// Reject commands with this opcode with status 0x0C (Command Disallowed)
    pub reject_opcode: Option<u16>,
}

impl FakeController {
    /// A controller whose socket starts with a recognizable filter.
    pub fn new() -> Self {
        FakeController {
            installed: Self::initial_filter(),
            ..Default::default()
        }
    }

    pub fn initial_filter() -> HciFilter {
        let mut filter = HciFilter::new();
        filter.set_ptype(HCI_EVENT_PKT).set_event(EVT_CMD_STATUS);
        filter
    }

    pub fn call_log(&self) -> Rc<RefCell<Vec<ControlCall>>> {
        Rc::clone(&self.calls)
    }
}

impl PacketSource for FakeController {
    fn read_packet(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.packets.read_packet(buf)
    }
}

impl AsRawFd for FakeController {
    fn as_raw_fd(&self) -> RawFd {
        -1
    }
}

impl ScanTransport for FakeController {
    fn filter(&mut self) -> Result<HciFilter> {
        self.calls.borrow_mut().push(ControlCall::GetFilter);
        Ok(self.installed)
    }

    fn set_filter(&mut self, filter: &HciFilter) -> Result<()> {
        self.calls.borrow_mut().push(ControlCall::SetFilter(*filter));
        if self.fail_set_filter {
            return Err(ScanError::io(
                "setting HCI filter",
                io::Error::from_raw_os_error(libc::EPERM),
            ));
        }
        self.installed = *filter;
        Ok(())
    }

    fn request(&mut self, command: &HciCommand, _timeout: Duration) -> Result<Vec<u8>> {
        self.calls
            .borrow_mut()
            .push(ControlCall::Request(command.clone()));
        match self.reject_opcode {
            Some(opcode) if opcode == command.opcode() => {
                Err(ScanError::Command { opcode, status: 0x0C })
            }
            _ => Ok(Vec::new()),
        }
    }
}
