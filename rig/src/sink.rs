use rig_traits::{SourceTag, Timestamp};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use strum_macros::{Display, EnumString};

/// How a reading's timestamp is rendered in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TimestampFormat {
    /// `<seconds> <nanoseconds>`, nanoseconds unpadded
    #[default]
    Split,
    /// `<seconds>.<nanoseconds>` with nine fractional digits
    Fractional,
}

impl TimestampFormat {
    pub fn render(&self, ts: Timestamp) -> String {
        match self {
            TimestampFormat::Split => format!("{} {}", ts.seconds, ts.nanoseconds),
            TimestampFormat::Fractional => format!("{}.{:09}", ts.seconds, ts.nanoseconds),
        }
    }
}

/// Append-only record of sensor readings, one line per reading.
pub struct RecordLog {
    writer: Box<dyn Write>,
    format: TimestampFormat,
    path: Option<PathBuf>,
    lines_written: u64,
}

impl RecordLog {
    /// Opens `path` for appending, creating it if needed. Existing content is kept.
    pub fn open(path: &Path, format: TimestampFormat) -> io::Result<Self> {
        let file: File = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(RecordLog {
            writer: Box::new(file),
            format,
            path: Some(path.to_path_buf()),
            lines_written: 0,
        })
    }

    pub fn from_writer(writer: impl Write + 'static, format: TimestampFormat) -> Self {
        RecordLog {
            writer: Box::new(writer),
            format,
            path: None,
            lines_written: 0,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Writes `<tag> <timestamp> <line>` and flushes it straight away.
    pub fn append(&mut self, tag: SourceTag, ts: Timestamp, line: &str) -> io::Result<()> {
        writeln!(self.writer, "{} {} {}", tag, self.format.render(ts), line)?;
        self.writer.flush()?;
        self.lines_written += 1;
        Ok(())
    }
}
