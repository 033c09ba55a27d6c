pub mod assembler;

pub use assembler::{LineAssembler, DEFAULT_MAX_LINE};
pub use rig_traits::{LineSource, ReadError, ReadOutcome};
use serialport::SerialPort;
use std::io::{self, Read};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Keeps an idle port from starving the rest of the poll loop.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum SerialLineError {
    #[error("failed to open {device} at {baud_rate} baud: {source}")]
    Open {
        device: String,
        baud_rate: u32,
        #[source]
        source: serialport::Error,
    },
    #[error("failed to configure {device}: {source}")]
    Configure {
        device: String,
        #[source]
        source: serialport::Error,
    },
}

/// Reads newline-terminated text from any byte stream.
pub struct LineReader<R> {
    reader: R,
    name: String,
    assembler: LineAssembler,
    buffer: [u8; 1024],
}

pub type SerialLineSource = LineReader<Box<dyn SerialPort>>;

impl<R: Read> LineReader<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        LineReader {
            reader,
            name: name.into(),
            assembler: LineAssembler::new(None),
            buffer: [0u8; 1024],
        }
    }

    pub fn with_max_line(mut self, max_line: usize) -> Self {
        self.assembler = LineAssembler::new(Some(max_line));
        self
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    fn buffered_line(&mut self) -> Option<ReadOutcome> {
        match self.assembler.next_line() {
            Ok(Some(line)) => Some(ReadOutcome::Line(line)),
            Ok(None) => None,
            Err(e) => Some(ReadOutcome::Failed(e)),
        }
    }
}

impl SerialLineSource {
    pub fn open(device: &str, baud_rate: u32) -> Result<Self, SerialLineError> {
        Self::open_with_timeout(device, baud_rate, DEFAULT_TIMEOUT)
    }

    pub fn open_with_timeout(
        device: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Self, SerialLineError> {
        let port = serialport::new(device, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|source| SerialLineError::Open {
                device: device.to_string(),
                baud_rate,
                source,
            })?;

        // Drop whatever queued up before we started listening
        port.clear(serialport::ClearBuffer::Input)
            .map_err(|source| SerialLineError::Configure {
                device: device.to_string(),
                source,
            })?;

        info!("Opened {} at {} baud", device, baud_rate);
        Ok(LineReader::new(port, device))
    }
}

impl<R: Read> LineSource for LineReader<R> {
    fn read_line(&mut self) -> ReadOutcome {
        if let Some(outcome) = self.buffered_line() {
            return outcome;
        }

        match self.reader.read(&mut self.buffer) {
            Ok(0) => ReadOutcome::NoData,
            Ok(n) => {
                self.assembler.push(&self.buffer[..n]);
                self.buffered_line().unwrap_or(ReadOutcome::NoData)
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                ReadOutcome::NoData
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => ReadOutcome::NoData,
            Err(e) => {
                debug!("{}: read failed: {}", self.name, e);
                ReadOutcome::Failed(ReadError::Io(e.to_string()))
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Lists serial devices, sorted by name.
pub fn list_ports() -> Vec<String> {
    let mut names: Vec<String> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(|info| info.port_name)
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays canned read results, one per call.
    struct ScriptedReader {
        reads: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedReader {
        fn new(reads: Vec<io::Result<Vec<u8>>>) -> Self {
            ScriptedReader { reads: reads.into() }
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(Ok(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::new(io::ErrorKind::TimedOut, "idle")),
            }
        }
    }

    #[test]
    fn timeout_is_no_data() {
        let mut src = LineReader::new(ScriptedReader::new(vec![]), "/dev/null");
        assert_eq!(src.read_line(), ReadOutcome::NoData);
    }

    #[test]
    fn partial_line_waits_for_terminator() {
        let mut src = LineReader::new(
            ScriptedReader::new(vec![Ok(b"!ANG:1,".to_vec()), Ok(b"2,3\r\n".to_vec())]),
            "imu",
        );
        assert_eq!(src.read_line(), ReadOutcome::NoData);
        assert_eq!(src.read_line(), ReadOutcome::Line("!ANG:1,2,3".into()));
    }

    #[test]
    fn several_lines_in_one_read_come_out_one_per_call() {
        let mut src = LineReader::new(ScriptedReader::new(vec![Ok(b"a\nb\n".to_vec())]), "gps");
        assert_eq!(src.read_line(), ReadOutcome::Line("a".into()));
        assert_eq!(src.read_line(), ReadOutcome::Line("b".into()));
        assert_eq!(src.read_line(), ReadOutcome::NoData);
    }

    #[test]
    fn hard_errors_are_reported_not_raised() {
        let mut src = LineReader::new(
            ScriptedReader::new(vec![
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged")),
                Ok(b"back\n".to_vec()),
            ]),
            "imu",
        );
        assert!(matches!(src.read_line(), ReadOutcome::Failed(ReadError::Io(_))));
        assert_eq!(src.read_line(), ReadOutcome::Line("back".into()));
    }
}
