//! Line-oriented request/response exchange.
//!
//! The laser speaks a SCPI-like ASCII protocol: one command per line, one
//! reply line per query. Only the framing lives here; the command set belongs
//! to the caller.

use {
    crate::{error::Result, port::Port},
    log::trace,
    std::{
        io::ErrorKind,
        thread,
        time::{Duration, Instant},
    },
};

/// Replies longer than this are cut off; a chatty device must not keep a
/// probe reading forever.
pub const MAX_REPLY_LEN: usize = 1024;

/// Shortest read timeout handed to the port while waiting for a reply.
const MIN_READ_SLICE: Duration = Duration::from_millis(1);

/// Write `command` followed by `terminator`.
pub fn send_line<P: Port + ?Sized>(port: &mut P, command: &str, terminator: &str) -> Result<()> {
    trace!("{} <- {command:?}", port.name());
    let mut frame = Vec::with_capacity(command.len() + terminator.len());
    frame.extend_from_slice(command.as_bytes());
    frame.extend_from_slice(terminator.as_bytes());
    port.write_all_bytes(&frame)
}

/// Read one reply line, waiting until `deadline` at most.
///
/// Returns the text before the terminator, with surrounding whitespace
/// removed. When the deadline passes or [`MAX_REPLY_LEN`] is reached without a
/// terminator, whatever arrived is returned; `None` means nothing arrived.
pub fn read_line<P: Port + ?Sized>(
    port: &mut P,
    terminator: &str,
    deadline: Instant,
) -> Result<Option<String>> {
    let terminator = terminator.as_bytes();
    let mut reply: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 64];

    loop {
        if let Some(end) = find_terminator(&reply, terminator) {
            reply.truncate(end);
            break;
        }
        if reply.len() >= MAX_REPLY_LEN {
            reply.truncate(MAX_REPLY_LEN);
            break;
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        port.set_timeout(remaining.max(MIN_READ_SLICE))?;

        match port.read(&mut chunk) {
            Ok(0) => thread::sleep(MIN_READ_SLICE),
            Ok(n) => reply.extend_from_slice(&chunk[..n]),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted) => {},
            Err(e) => return Err(e.into()),
        }
    }

    let text = String::from_utf8_lossy(&reply)
        .trim()
        .to_string();
    trace!("{} -> {text:?}", port.name());
    Ok((!text.is_empty()).then_some(text))
}

/// Send `command` and read its reply within `timeout`.
pub fn query<P: Port + ?Sized>(
    port: &mut P,
    command: &str,
    terminator: &str,
    timeout: Duration,
) -> Result<Option<String>> {
    send_line(port, command, terminator)?;
    read_line(port, terminator, Instant::now() + timeout)
}

fn find_terminator(buf: &[u8], terminator: &[u8]) -> Option<usize> {
    if terminator.is_empty() {
        return None;
    }
    buf.windows(terminator.len())
        .position(|w| w == terminator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::sim::{SimulatedBus, SimulatedDevice};
    use crate::port::{PortOpener, SerialConfig};

    fn open(device: SimulatedDevice) -> (SimulatedBus, crate::port::sim::SimulatedPort) {
        let bus = SimulatedBus::new().with_port("/dev/ttyS0", device);
        let port = bus
            .open(&SerialConfig::new("/dev/ttyS0", 115_200).with_timeout(Duration::from_millis(5)))
            .unwrap();
        (bus, port)
    }

    #[test]
    fn test_query_reads_one_line() {
        let (bus, mut port) = open(SimulatedDevice::laser("IPS,HPU,1,785nm,1.0"));
        let reply = query(&mut port, "*IDN?", "\n", Duration::from_millis(50)).unwrap();
        assert_eq!(reply.as_deref(), Some("IPS,HPU,1,785nm,1.0"));
        assert_eq!(
            bus.stats().lines,
            [("/dev/ttyS0".to_string(), "*IDN?".to_string())]
        );
    }

    #[test]
    fn test_silent_port_yields_none() {
        let (_bus, mut port) = open(SimulatedDevice::Silent);
        let start = Instant::now();
        let reply = query(&mut port, "*IDN?", "\n", Duration::from_millis(20)).unwrap();
        assert!(reply.is_none());
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_transport_error_propagates() {
        let (_bus, mut port) = open(SimulatedDevice::Faulty);
        assert!(query(&mut port, "*IDN?", "\n", Duration::from_millis(20)).is_err());
    }

    #[test]
    fn test_crlf_terminator() {
        let (_bus, mut port) = open(SimulatedDevice::responder("ready"));
        // The simulated device ends lines with \n only, so a \r\n reader times out
        // and returns the partial text it saw.
        send_line(&mut port, "hello", "\n").unwrap();
        let reply = read_line(&mut port, "\r\n", Instant::now() + Duration::from_millis(20)).unwrap();
        assert_eq!(reply.as_deref(), Some("ready"));
    }

    #[test]
    fn test_find_terminator() {
        assert_eq!(find_terminator(b"abc\r\n", b"\r\n"), Some(3));
        assert_eq!(find_terminator(b"abc", b"\n"), None);
        assert_eq!(find_terminator(b"abc", b""), None);
    }
}
