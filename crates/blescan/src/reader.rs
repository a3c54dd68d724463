//! Blocking packet reads with signal handling

use crate::error::{Result, ScanError};
use crate::hci::constants::HCI_MAX_EVENT_SIZE;
use crate::hci::HciSocket;
use std::io;

/// Anything that yields one HCI packet per read.
pub trait PacketSource {
    /// Reads one packet into `buf` and returns its length.
    fn read_packet(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Blocks until the next read can make progress. Called after a read
    /// fails with `EAGAIN`, so a non-blocking descriptor does not spin.
    fn wait_readable(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl PacketSource for HciSocket {
    fn read_packet(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        HciSocket::read_packet(self, buf)
    }

    fn wait_readable(&mut self) -> io::Result<()> {
        HciSocket::wait_readable(self, None).map(|_| ())
    }
}

/// Reads exactly one packet from `source`.
///
/// `EAGAIN` waits for readiness and reads again. `EINTR`, from the read or
/// the wait, is retried when `retry_on_interrupt` is set and reported as
/// [`ScanError::Interrupted`] otherwise. Every other failure becomes
/// [`ScanError::Io`] with the OS error attached.
pub fn read_with_retry<S>(source: &mut S, retry_on_interrupt: bool) -> Result<Vec<u8>>
where
    S: PacketSource + ?Sized,
{
    let mut buf = vec![0u8; HCI_MAX_EVENT_SIZE + 1];
    loop {
        let err = match source.read_packet(&mut buf) {
            Ok(0) => {
                return Err(ScanError::io(
                    "reading HCI packet",
                    io::ErrorKind::UnexpectedEof.into(),
                ))
            }
            Ok(len) => {
                buf.truncate(len);
                return Ok(buf);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => match source.wait_readable() {
                Ok(()) => continue,
                Err(e) => e,
            },
            Err(e) => e,
        };

        if err.kind() != io::ErrorKind::Interrupted {
            return Err(ScanError::io("reading HCI packet", err));
        }
        if !retry_on_interrupt {
            return Err(ScanError::Interrupted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{interrupted, ScriptedSource};

    #[test]
    fn test_interrupt_is_retried_when_enabled() {
        let mut source = ScriptedSource::new(vec![
            Err(interrupted()),
            Err(interrupted()),
            Ok(vec![0x04, 0x3E, 0x00]),
        ]);
        let packet = read_with_retry(&mut source, true).unwrap();
        assert_eq!(packet, vec![0x04, 0x3E, 0x00]);
        assert_eq!(source.reads, 3);
    }

    #[test]
    fn test_interrupt_is_surfaced_when_disabled() {
        let mut source = ScriptedSource::new(vec![Err(interrupted()), Ok(vec![0x04])]);
        let err = read_with_retry(&mut source, false).unwrap_err();
        assert!(matches!(err, ScanError::Interrupted));
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());
        assert_eq!(err.os_error(), None);

        // Nothing was consumed; the next call gets the packet.
        assert_eq!(read_with_retry(&mut source, false).unwrap(), vec![0x04]);
    }

    #[test]
    fn test_would_block_waits_then_retries() {
        let mut source = ScriptedSource::new(vec![
            Err(io::Error::from_raw_os_error(libc::EAGAIN)),
            Err(io::Error::from_raw_os_error(libc::EAGAIN)),
            Ok(vec![0x04, 0x0E]),
        ]);
        assert_eq!(read_with_retry(&mut source, false).unwrap(), vec![0x04, 0x0E]);
        assert_eq!(source.reads, 3);
        // One readiness wait per EAGAIN, never a busy loop.
        assert_eq!(source.waits, 2);
    }

    #[test]
    fn test_interrupted_wait_follows_retry_policy() {
        let script = || {
            let mut source = ScriptedSource::new(vec![
                Err(io::Error::from_raw_os_error(libc::EAGAIN)),
                Ok(vec![0x04]),
            ]);
            source.wait_errors.push_back(interrupted());
            source
        };

        let mut source = script();
        assert!(matches!(
            read_with_retry(&mut source, false),
            Err(ScanError::Interrupted)
        ));

        let mut source = script();
        assert_eq!(read_with_retry(&mut source, true).unwrap(), vec![0x04]);
        assert_eq!(source.waits, 1);
    }

    #[test]
    fn test_other_errors_are_fatal_with_os_code() {
        let mut source = ScriptedSource::new(vec![Err(io::Error::from_raw_os_error(libc::ENODEV))]);
        let err = read_with_retry(&mut source, true).unwrap_err();
        assert!(matches!(err, ScanError::Io { .. }));
        assert!(err.is_fatal());
        assert!(!err.is_recoverable());
        assert_eq!(err.os_error(), Some(libc::ENODEV));
    }

    #[test]
    fn test_empty_read_is_an_error() {
        let mut source = ScriptedSource::new(vec![Ok(Vec::new())]);
        match read_with_retry(&mut source, true) {
            Err(ScanError::Io { source, .. }) => {
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof)
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
