//! LE advertisement scanner
//!
//! [`HciScanner`] owns a raw HCI socket bound to one controller. While it is
//! running, the socket only sees LE meta events and every
//! [`HciScanner::get_advertisements`] call consumes exactly one of them.
//!
//! The scanner never blocks except inside `get_advertisements`. Callers that
//! need a timeout poll [`HciScanner::descriptor`] first:
//!
//! ```no_run
//! use blescan::{HciScanner, ScannerConfig};
//!
//! let mut scanner = HciScanner::with_config(ScannerConfig::default())?;
//! loop {
//!     for rsp in scanner.get_advertisements()? {
//!         println!("{} {:?} {}", rsp.address, rsp.event_type, rsp.rssi);
//!     }
//! }
//! # Ok::<(), blescan::ScanError>(())
//! ```

use crate::advertising::{parse_packet, AdvertisingResponse};
use crate::error::{Result, ScanError};
use crate::filter::{DuplicateFilter, FilterConfig, FilterDuplicates, ScanType};
use crate::hci::constants::*;
use crate::hci::{device, HciCommand, HciEvent, HciFilter, HciSocket};
use crate::reader::{read_with_retry, PacketSource};
use log::{debug, info, trace, warn, Level, LevelFilter};
use std::os::fd::{AsRawFd, RawFd};
use std::time::Duration;

/// Scanner construction options
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Start scanning from the constructor
    pub auto_start: bool,
    pub filter_duplicates: FilterDuplicates,
    pub scan_type: ScanType,
    /// `""` for the first controller that is up, `"hciN"`, `"N"`, or the
    /// controller's own address
    pub device: String,
    /// Retry reads interrupted by a signal instead of returning
    /// [`ScanError::Interrupted`]
    pub retry_on_interrupt: bool,
    /// Most verbose level this scanner logs at
    pub log_level: LevelFilter,
    /// In 0.625 ms units
    pub scan_interval: u16,
    /// In 0.625 ms units
    pub scan_window: u16,
    /// How long to wait for the controller to acknowledge a command
    pub command_timeout: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            auto_start: true,
            filter_duplicates: FilterDuplicates::Software,
            scan_type: ScanType::Active,
            device: String::new(),
            retry_on_interrupt: false,
            log_level: LevelFilter::Warn,
            scan_interval: LE_SCAN_INTERVAL,
            scan_window: LE_SCAN_WINDOW,
            command_timeout: Duration::from_secs(10),
        }
    }
}

impl ScannerConfig {
    fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            scan_interval: self.scan_interval,
            scan_window: self.scan_window,
            ..FilterConfig::new(self.filter_duplicates, self.scan_type)
        }
    }
}

/// Read, decode and deduplicate: the part of `get_advertisements` that does
/// not care where packets come from.
#[derive(Debug)]
pub(crate) struct ReportPipeline {
    software_filtering: bool,
    retry_on_interrupt: bool,
    log_level: LevelFilter,
    duplicates: DuplicateFilter,
}

impl ReportPipeline {
    pub(crate) fn new(config: &ScannerConfig) -> Self {
        ReportPipeline {
            software_filtering: config.filter_duplicates.software(),
            retry_on_interrupt: config.retry_on_interrupt,
            log_level: config.log_level,
            duplicates: DuplicateFilter::new(),
        }
    }

    fn logs(&self, level: Level) -> bool {
        level <= self.log_level
    }

    pub(crate) fn next_batch<S>(&mut self, source: &mut S) -> Result<Vec<AdvertisingResponse>>
    where
        S: PacketSource + ?Sized,
    {
        let packet = read_with_retry(source, self.retry_on_interrupt)?;
        self.handle(&packet)
    }

    pub(crate) fn handle(&mut self, packet: &[u8]) -> Result<Vec<AdvertisingResponse>> {
        // Other LE subevents are legitimate on a shared adapter; skip them.
        let event = HciEvent::from_packet(packet)?;
        if let Some(subevent) = event.le_subevent() {
            if subevent != EVT_LE_ADVERTISING_REPORT {
                if self.logs(Level::Debug) {
                    debug!("ignoring LE subevent 0x{:02X}", subevent);
                }
                return Ok(Vec::new());
            }
        }

        let mut responses = parse_packet(packet)?;
        let decoded = responses.len();
        if self.software_filtering {
            responses.retain(|rsp| self.duplicates.should_emit(rsp));
        }

        if self.logs(Level::Trace) {
            for rsp in &responses {
                trace!(
                    "{} {:?} rssi {} name {:?}",
                    rsp.address,
                    rsp.event_type,
                    rsp.rssi,
                    rsp.local_name.as_ref().map(|n| n.name.as_str())
                );
            }
        }
        if self.logs(Level::Debug) && decoded != responses.len() {
            debug!(
                "dropped {} of {} reports as duplicates ({} devices seen)",
                decoded - responses.len(),
                decoded,
                self.duplicates.len()
            );
        }
        Ok(responses)
    }
}

/// The socket operations a scanner drives: packet reads plus the filter and
/// command calls around `start()`/`stop()`.
pub trait ScanTransport: PacketSource + AsRawFd {
    fn filter(&mut self) -> Result<HciFilter>;
    fn set_filter(&mut self, filter: &HciFilter) -> Result<()>;
    /// Sends `command` and returns its Command Complete parameters.
    fn request(&mut self, command: &HciCommand, timeout: Duration) -> Result<Vec<u8>>;
}

impl ScanTransport for HciSocket {
    fn filter(&mut self) -> Result<HciFilter> {
        HciSocket::filter(self)
    }

    fn set_filter(&mut self, filter: &HciFilter) -> Result<()> {
        HciSocket::set_filter(self, filter)
    }

    fn request(&mut self, command: &HciCommand, timeout: Duration) -> Result<Vec<u8>> {
        HciSocket::request(self, command, timeout)
    }
}

/// Scans for LE advertisements on one controller
#[derive(Debug)]
pub struct HciScanner<T: ScanTransport = HciSocket> {
    transport: T,
    dev_id: u16,
    config: ScannerConfig,
    filter_config: FilterConfig,
    pipeline: ReportPipeline,
    /// Filter installed before `start()`; `Some` while scanning
    saved_filter: Option<HciFilter>,
}

impl HciScanner {
    /// Scanner on the first available controller with default options
    pub fn new() -> Result<Self> {
        Self::with_config(ScannerConfig::default())
    }

    pub fn with_options(
        auto_start: bool,
        filter_duplicates: FilterDuplicates,
        scan_type: ScanType,
        device: &str,
    ) -> Result<Self> {
        Self::with_config(ScannerConfig {
            auto_start,
            filter_duplicates,
            scan_type,
            device: device.to_string(),
            ..ScannerConfig::default()
        })
    }

    pub fn with_config(config: ScannerConfig) -> Result<Self> {
        let dev_id = device::resolve(&config.device)?;
        let socket = HciSocket::open(dev_id)?;
        Self::with_transport(socket, dev_id, config)
    }

    /// Decodes an advertising report packet. See [`parse_packet`].
    pub fn parse_packet(packet: &[u8]) -> Result<Vec<AdvertisingResponse>> {
        Ok(parse_packet(packet)?)
    }
}

impl<T: ScanTransport> HciScanner<T> {
    /// Scanner over an already open transport bound to controller `dev_id`.
    /// `config.device` is not consulted.
    pub fn with_transport(transport: T, dev_id: u16, config: ScannerConfig) -> Result<Self> {
        let mut scanner = HciScanner {
            transport,
            dev_id,
            filter_config: config.filter_config(),
            pipeline: ReportPipeline::new(&config),
            config,
            saved_filter: None,
        };
        if scanner.logs(Level::Debug) {
            debug!("opened hci{} ({:?})", dev_id, scanner.filter_config);
        }

        if scanner.config.auto_start {
            scanner.start()?;
        }
        Ok(scanner)
    }

    fn logs(&self, level: Level) -> bool {
        level <= self.config.log_level
    }

    pub fn is_running(&self) -> bool {
        self.saved_filter.is_some()
    }

    /// Controller index this scanner is bound to
    pub fn dev_id(&self) -> u16 {
        self.dev_id
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Configures and enables scanning, then narrows the socket filter to
    /// LE meta events. Fails with [`ScanError::Misuse`] if already running.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(ScanError::Misuse("start() called while already scanning"));
        }

        let timeout = self.config.command_timeout;
        let saved = self.transport.filter()?;
        self.transport
            .request(&self.filter_config.scan_parameters(), timeout)?;
        self.transport
            .request(&self.filter_config.scan_enable(), timeout)?;

        if let Err(e) = self
            .transport
            .set_filter(&self.filter_config.socket_filter())
        {
            // Leave the controller as we found it.
            if let Err(disable) = self
                .transport
                .request(&self.filter_config.scan_disable(), timeout)
            {
                if self.logs(Level::Warn) {
                    warn!("could not disable scanning after failed start: {}", disable);
                }
            }
            return Err(e);
        }

        self.saved_filter = Some(saved);
        if self.logs(Level::Info) {
            info!("scanning on hci{} ({:?})", self.dev_id, self.config.scan_type);
        }
        Ok(())
    }

    /// Restores the saved socket filter and disables scanning. Does nothing
    /// when not running.
    pub fn stop(&mut self) -> Result<()> {
        let Some(saved) = self.saved_filter.take() else {
            return Ok(());
        };

        let restored = self.transport.set_filter(&saved);
        let disabled = self
            .transport
            .request(&self.filter_config.scan_disable(), self.config.command_timeout)
            .map(|_| ());

        if self.logs(Level::Info) {
            info!("stopped scanning on hci{}", self.dev_id);
        }
        restored.and(disabled)
    }

    /// The socket descriptor, for `poll`/`select`. Valid until the scanner
    /// is dropped. It may be made non-blocking; reads then wait for
    /// readiness instead of spinning.
    pub fn descriptor(&self) -> RawFd {
        self.transport.as_raw_fd()
    }

    /// Blocks for one kernel message and returns the advertisements in it.
    ///
    /// The batch may be empty: every report may have been a duplicate, or
    /// the message may have been an unrelated LE event.
    pub fn get_advertisements(&mut self) -> Result<Vec<AdvertisingResponse>> {
        if !self.is_running() {
            return Err(ScanError::Misuse("get_advertisements() called while stopped"));
        }
        self.pipeline.next_batch(&mut self.transport)
    }
}

impl<T: ScanTransport> AsRawFd for HciScanner<T> {
    fn as_raw_fd(&self) -> RawFd {
        self.descriptor()
    }
}

impl<T: ScanTransport> Drop for HciScanner<T> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            if self.logs(Level::Warn) {
                warn!("failed to stop scanning on hci{}: {}", self.dev_id, e);
            }
        }
    }
}
