//! Append-only persistence of flush-cycle rows.
//!
//! Every flush cycle produces one `Row` holding the per-channel means in
//! configured channel order. The shipped sink writes a UTF-8 CSV file with
//! a header that is created only when missing or mismatched, so restarts
//! append to the existing log.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::channel::ChannelSpec;

/// One persisted flush cycle: a wall-clock timestamp plus one mean per
/// configured channel, in stable channel order.
///
/// A `None` value marks a channel with no valid readings that cycle and
/// serializes as an empty CSV field, never as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub timestamp: NaiveDateTime,
    pub values: Vec<Option<f64>>,
}

impl Row {
    pub fn new(timestamp: NaiveDateTime, values: Vec<Option<f64>>) -> Self {
        Self { timestamp, values }
    }

    /// Serialize as a CSV data line (no trailing newline).
    ///
    /// Values are rounded to 2 decimals here, at the serialization
    /// boundary, so re-serializing a row is idempotent.
    pub fn to_csv_line(&self) -> String {
        let mut line = self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
        for value in &self.values {
            match value {
                Some(v) => line.push_str(&format!(",{:.2}", v)),
                None => line.push(','),
            }
        }
        line
    }
}

/// Expected CSV header line for the given channel order.
pub fn csv_header(specs: &[ChannelSpec]) -> String {
    let mut header = String::from("Timestamp");
    for (index, spec) in specs.iter().enumerate() {
        header.push_str(&format!(",Sensor_{}_{}_AvgTemp_C", index + 1, spec.pin));
    }
    header
}

/// Capability trait for the append-only row store.
pub trait RecordSink: Send {
    /// Append one row. Failures are the caller's to log; they never abort
    /// the flush cycle.
    fn append_row(&mut self, row: &Row) -> io::Result<()>;
}

/// Append-only CSV file sink.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    /// Open the sink, recreating the file with the expected header when it
    /// is missing, empty, or starts with a different header.
    ///
    /// Only the first line is inspected, so appended data rows never
    /// trigger recreation on a later startup.
    pub fn open(path: impl Into<PathBuf>, specs: &[ChannelSpec]) -> io::Result<Self> {
        let path = path.into();
        let header = csv_header(specs);

        if !Self::header_matches(&path, &header)? {
            let mut file = File::create(&path)?;
            writeln!(file, "{}", header)?;
        }

        Ok(Self { path })
    }

    fn header_matches(path: &Path, expected: &str) -> io::Result<bool> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };

        let mut first_line = String::new();
        BufReader::new(file).read_line(&mut first_line)?;
        Ok(first_line.trim_end() == expected)
    }
}

impl RecordSink for CsvSink {
    fn append_row(&mut self, row: &Row) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;
        writeln!(file, "{}", row.to_csv_line())
    }
}
