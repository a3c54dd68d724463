//! Controller discovery
//!
//! Turns the user-facing device selector (`""`, `"hci1"`, `"1"` or a
//! controller address) into a controller index.

use crate::address::BdAddr;
use crate::error::{Result, ScanError};
use crate::hci::constants::*;
use crate::hci::socket::HciSocket;
use log::debug;
use std::os::fd::AsRawFd;
use std::str::FromStr;

/// Which controller to scan with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSelector {
    /// The first controller that is up
    FirstAvailable,
    Index(u16),
    Address(BdAddr),
}

impl FromStr for DeviceSelector {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(DeviceSelector::FirstAvailable);
        }

        let digits = s.strip_prefix("hci").unwrap_or(s);
        if let Ok(index) = digits.parse::<u16>() {
            return Ok(DeviceSelector::Index(index));
        }

        s.parse::<BdAddr>()
            .map(DeviceSelector::Address)
            .map_err(|_| ScanError::NoDevice(s.to_string()))
    }
}

/// A controller known to the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerInfo {
    pub id: u16,
    pub up: bool,
    pub address: BdAddr,
}

impl DeviceSelector {
    /// Picks the matching controller out of `controllers`.
    pub fn select(&self, controllers: &[ControllerInfo]) -> Option<u16> {
        let found = match *self {
            DeviceSelector::FirstAvailable => controllers.iter().find(|c| c.up),
            DeviceSelector::Index(id) => controllers.iter().find(|c| c.id == id),
            DeviceSelector::Address(addr) => {
                controllers.iter().find(|c| c.up && c.address == addr)
            }
        };
        found.map(|c| c.id)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct HciDevReq {
    dev_id: u16,
    dev_opt: u32,
}

#[repr(C)]
struct HciDevListReq {
    dev_num: u16,
    dev_req: [HciDevReq; HCI_MAX_DEV],
}

// Only the address is read, the rest sizes the struct for the kernel.
#[allow(dead_code)]
#[repr(C)]
#[derive(Default)]
struct HciDevInfo {
    dev_id: u16,
    name: [u8; 8],
    bdaddr: [u8; 6],
    flags: u32,
    dev_type: u8,
    features: [u8; 8],
    pkt_type: u32,
    link_policy: u32,
    link_mode: u32,
    acl_mtu: u16,
    acl_pkts: u16,
    sco_mtu: u16,
    sco_pkts: u16,
    stat: [u32; 10],
}

/// Lists the controllers the kernel knows about.
pub fn list_controllers() -> Result<Vec<ControllerInfo>> {
    let ctl = HciSocket::open_unbound()?;

    let mut list = HciDevListReq {
        dev_num: HCI_MAX_DEV as u16,
        dev_req: [HciDevReq::default(); HCI_MAX_DEV],
    };
    let result = unsafe {
        libc::ioctl(
            ctl.as_raw_fd(),
            HCIGETDEVLIST as _,
            &mut list as *mut HciDevListReq as *mut libc::c_void,
        )
    };
    if result < 0 {
        return Err(ScanError::last_os_error("listing HCI controllers"));
    }

    let count = (list.dev_num as usize).min(HCI_MAX_DEV);
    let mut controllers = Vec::with_capacity(count);
    for req in &list.dev_req[..count] {
        let mut info = HciDevInfo {
            dev_id: req.dev_id,
            ..Default::default()
        };
        let result = unsafe {
            libc::ioctl(
                ctl.as_raw_fd(),
                HCIGETDEVINFO as _,
                &mut info as *mut HciDevInfo as *mut libc::c_void,
            )
        };
        if result < 0 {
            // Unplugged between the two calls.
            debug!("skipping hci{}: {}", req.dev_id, std::io::Error::last_os_error());
            continue;
        }
        controllers.push(ControllerInfo {
            id: req.dev_id,
            up: req.dev_opt & (1 << HCI_UP) != 0,
            address: BdAddr::new(info.bdaddr),
        });
    }
    Ok(controllers)
}

/// Resolves a selector string to a controller index.
pub fn resolve(selector: &str) -> Result<u16> {
    let parsed: DeviceSelector = selector.parse()?;
    let controllers = list_controllers()?;
    parsed
        .select(&controllers)
        .ok_or_else(|| ScanError::NoDevice(selector.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(id: u16, up: bool, last: u8) -> ControllerInfo {
        ControllerInfo {
            id,
            up,
            address: BdAddr::new([last, 0, 0, 0, 0, 0]),
        }
    }

    #[test]
    fn test_parse_selectors() {
        assert_eq!("".parse::<DeviceSelector>().unwrap(), DeviceSelector::FirstAvailable);
        assert_eq!("hci2".parse::<DeviceSelector>().unwrap(), DeviceSelector::Index(2));
        assert_eq!("0".parse::<DeviceSelector>().unwrap(), DeviceSelector::Index(0));
        assert_eq!(
            "00:00:00:00:00:07".parse::<DeviceSelector>().unwrap(),
            DeviceSelector::Address(BdAddr::new([7, 0, 0, 0, 0, 0]))
        );
        assert!(matches!(
            "bluetooth".parse::<DeviceSelector>(),
            Err(ScanError::NoDevice(_))
        ));
    }

    #[test]
    fn test_select() {
        let controllers = [controller(0, false, 1), controller(1, true, 2), controller(3, true, 3)];

        assert_eq!(DeviceSelector::FirstAvailable.select(&controllers), Some(1));
        assert_eq!(DeviceSelector::Index(0).select(&controllers), Some(0));
        assert_eq!(DeviceSelector::Index(2).select(&controllers), None);
        assert_eq!(
            DeviceSelector::Address(BdAddr::new([3, 0, 0, 0, 0, 0])).select(&controllers),
            Some(3)
        );
        // Down controllers are never matched by address.
        assert_eq!(
            DeviceSelector::Address(BdAddr::new([1, 0, 0, 0, 0, 0])).select(&controllers),
            None
        );
        assert_eq!(DeviceSelector::FirstAvailable.select(&[]), None);
    }
}
