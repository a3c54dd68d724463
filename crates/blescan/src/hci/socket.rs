//! HCI Socket implementation for Bluetooth communication
//!
//! This module provides a wrapper around the raw HCI socket interface,
//! allowing for communication with Bluetooth controllers.

use crate::error::{Result, ScanError};
use crate::hci::constants::*;
use crate::hci::filter::HciFilter;
use crate::hci::packet::{HciCommand, HciEvent};
use log::trace;
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::time::{Duration, Instant};

/// An exclusively owned raw HCI socket. Closed when dropped.
#[derive(Debug)]
pub struct HciSocket {
    fd: OwnedFd,
}

// Define the sockaddr_hci structure
#[repr(C)]
struct SockaddrHci {
    hci_family: libc::sa_family_t,
    hci_dev: u16,
    hci_channel: u16,
}

impl HciSocket {
    /// Opens an unbound HCI socket, usable for controller ioctls.
    pub fn open_unbound() -> Result<Self> {
        let fd = unsafe {
            libc::socket(
                AF_BLUETOOTH,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                BTPROTO_HCI,
            )
        };
        if fd < 0 {
            return Err(ScanError::last_os_error("opening HCI socket"));
        }

        // Owned from here on, so every later failure closes it.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        Ok(HciSocket { fd })
    }

    /// Opens a raw HCI socket bound to controller `dev_id`
    pub fn open(dev_id: u16) -> Result<Self> {
        let socket = Self::open_unbound()?;

        let addr = SockaddrHci {
            hci_family: AF_BLUETOOTH as libc::sa_family_t,
            hci_dev: dev_id,
            hci_channel: HCI_CHANNEL_RAW,
        };

        let result = unsafe {
            libc::bind(
                socket.as_raw_fd(),
                &addr as *const _ as *const libc::sockaddr,
                std::mem::size_of::<SockaddrHci>() as libc::socklen_t,
            )
        };
        if result < 0 {
            return Err(ScanError::last_os_error("binding HCI socket"));
        }

        Ok(socket)
    }

    /// Reads the filter currently installed on this socket
    pub fn filter(&self) -> Result<HciFilter> {
        let mut filter = HciFilter::new();
        let mut len = std::mem::size_of::<HciFilter>() as libc::socklen_t;
        let result = unsafe {
            libc::getsockopt(
                self.as_raw_fd(),
                SOL_HCI,
                HCI_FILTER,
                &mut filter as *mut _ as *mut libc::c_void,
                &mut len,
            )
        };
        if result < 0 {
            return Err(ScanError::last_os_error("reading HCI filter"));
        }
        Ok(filter)
    }

    /// Installs `filter` on this socket
    pub fn set_filter(&self, filter: &HciFilter) -> Result<()> {
        let result = unsafe {
            libc::setsockopt(
                self.as_raw_fd(),
                SOL_HCI,
                HCI_FILTER,
                filter as *const _ as *const libc::c_void,
                std::mem::size_of::<HciFilter>() as libc::socklen_t,
            )
        };
        if result < 0 {
            return Err(ScanError::last_os_error("setting HCI filter"));
        }
        Ok(())
    }

    /// Sends an HCI command to the controller
    pub fn send_command(&self, command: &HciCommand) -> Result<()> {
        let packet = command.to_packet();
        let written = unsafe {
            libc::write(
                self.as_raw_fd(),
                packet.as_ptr() as *const libc::c_void,
                packet.len(),
            )
        };
        if written < 0 {
            return Err(ScanError::last_os_error("sending HCI command"));
        }
        Ok(())
    }

    /// Reads one packet into `buf`, returning its length
    pub fn read_packet(&self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe {
            libc::read(
                self.as_raw_fd(),
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    /// Waits up to `timeout` (forever for `None`) for the socket to become
    /// readable.
    pub fn wait_readable(&self, timeout: Option<Duration>) -> io::Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let ms = match timeout {
            Some(t) => t.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
            None => -1,
        };
        match unsafe { libc::poll(&mut pfd, 1, ms) } {
            n if n < 0 => Err(io::Error::last_os_error()),
            0 => Ok(false),
            _ => Ok(true),
        }
    }

    /// Sends `command` and waits for its Command Complete event.
    ///
    /// The socket filter is narrowed to command events for the exchange and
    /// restored afterwards. Returns the return parameters after the status
    /// byte.
    pub fn request(&self, command: &HciCommand, timeout: Duration) -> Result<Vec<u8>> {
        let saved = self.filter()?;

        let mut narrowed = HciFilter::new();
        narrowed
            .set_ptype(HCI_EVENT_PKT)
            .set_event(EVT_CMD_COMPLETE)
            .set_event(EVT_CMD_STATUS)
            .set_opcode(command.opcode());
        self.set_filter(&narrowed)?;

        let outcome = self.exchange(command, timeout);
        let restored = self.set_filter(&saved);
        let params = outcome?;
        restored?;
        Ok(params)
    }

    fn exchange(&self, command: &HciCommand, timeout: Duration) -> Result<Vec<u8>> {
        let opcode = command.opcode();
        self.send_command(command)?;

        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; HCI_MAX_EVENT_SIZE + 1];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.wait_readable(Some(remaining)) {
                Ok(true) => {}
                Ok(false) => {
                    return Err(ScanError::io(
                        "waiting for HCI command completion",
                        io::ErrorKind::TimedOut.into(),
                    ))
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ScanError::io("polling HCI socket", e)),
            }

            let len = match self.read_packet(&mut buf) {
                Ok(len) => len,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                    ) =>
                {
                    continue
                }
                Err(e) => return Err(ScanError::io("reading HCI command response", e)),
            };

            let event = HciEvent::from_packet(&buf[..len])?;
            if let Some((status, op)) = event.command_status() {
                if op == opcode && status != 0 {
                    return Err(ScanError::Command { opcode, status });
                }
                continue;
            }
            match event.command_complete() {
                Some((op, ret)) if op == opcode => {
                    trace!("command 0x{:04X} complete: {:02X?}", opcode, ret);
                    return match ret.split_first() {
                        Some((&0, rest)) => Ok(rest.to_vec()),
                        Some((&status, _)) => Err(ScanError::Command { opcode, status }),
                        None => Ok(Vec::new()),
                    };
                }
                _ => continue,
            }
        }
    }
}

impl AsRawFd for HciSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl AsFd for HciSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}
