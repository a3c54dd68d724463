//! Example: LE scan
//!
//! Prints every advertisement seen on a controller until interrupted.
//!
//! ```text
//! cargo run --example lescan -- [hciN | N | AA:BB:CC:DD:EE:FF]
//! RUST_LOG=debug cargo run --example lescan
//! ```
//!
//! Needs `CAP_NET_RAW` (or root).

use blescan::{AdvertisingResponse, FilterDuplicates, HciScanner, ScanType, ScannerConfig};
use log::LevelFilter;
use std::os::fd::RawFd;
use std::time::Duration;

fn print_response(rsp: &AdvertisingResponse) {
    let rssi = match rsp.rssi_dbm() {
        Some(dbm) => format!("{} dBm", dbm),
        None => "n/a".to_string(),
    };
    println!(
        "{} ({:?}) {:?} RSSI {}",
        rsp.address, rsp.address_type, rsp.event_type, rssi
    );

    if let Some(name) = &rsp.local_name {
        let kind = if name.complete { "complete" } else { "short" };
        println!("  Name: {} ({})", name.name, kind);
    }
    if let Some(flags) = &rsp.flags {
        println!("  Flags: {:?}", flags.bits());
    }
    for uuid in &rsp.uuids {
        println!("  Service: {}", uuid);
    }
    for data in &rsp.manufacturer_specific_data {
        println!("  Manufacturer data: {}", hex::encode(data));
    }
    for data in &rsp.service_data {
        println!("  Service data: {}", hex::encode(data));
    }
    for (ad_type, data) in &rsp.unparsed_data_with_types {
        println!("  AD 0x{:02X}: {}", ad_type, hex::encode(data));
    }
}

/// Waits up to `timeout` for `fd` to become readable.
fn wait_readable(fd: RawFd, timeout: Duration) -> std::io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let ret = unsafe { libc::poll(&mut pfd, 1, timeout.as_millis() as libc::c_int) };
    if ret < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(ret > 0)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = ScannerConfig {
        device: std::env::args().nth(1).unwrap_or_default(),
        filter_duplicates: FilterDuplicates::Software,
        scan_type: ScanType::Active,
        retry_on_interrupt: true,
        log_level: LevelFilter::Debug,
        ..ScannerConfig::default()
    };
    let mut scanner = HciScanner::with_config(config)?;
    println!("Scanning on hci{}...", scanner.dev_id());

    let mut idle = 0;
    loop {
        if !wait_readable(scanner.descriptor(), Duration::from_secs(1))? {
            idle += 1;
            println!("No advertisements for {}s", idle);
            continue;
        }
        idle = 0;

        match scanner.get_advertisements() {
            Ok(batch) => batch.iter().for_each(print_response),
            Err(e) if e.is_recoverable() => continue,
            Err(e) => {
                eprintln!("Scan failed: {}", e);
                scanner.stop()?;
                return Err(e.into());
            }
        }
    }
}
