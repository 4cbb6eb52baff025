use std::{
    collections::HashSet,
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use super::models::{CsvRow, Reading};
use crate::error::{Error, Result};

/// Append-only CSV table of readings for every motor.
///
/// The header row is written exactly once, together with the first data row.
/// Rows are never rewritten. There is no locking: concurrent writers from
/// other processes interleave at whatever granularity the filesystem's
/// append provides.
#[derive(Debug, Clone)]
pub struct ReadingLog {
    path: PathBuf,
}

impl ReadingLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name offered for downloads, e.g. `data_motor.csv`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "readings.csv".to_owned())
    }

    /// Durably append one row, creating the table (with header) if absent.
    ///
    /// The row is serialized in memory first and handed to the OS in a single
    /// write. If that write or the following sync fails part way, the table is
    /// truncated back to its previous length, so the log is left as it was.
    pub fn append(&self, reading: &Reading) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_error(e))?;

        let prior_len = file.len().map_err(|e| self.write_error(e))?;
        let bytes = encode_row(reading, prior_len == 0).map_err(|e| self.write_error(e))?;

        append_or_rollback(&mut file, prior_len, &bytes).map_err(|e| self.write_error(e))?;

        debug!(path = %self.path.display(), header = prior_len == 0, bytes = bytes.len(), "reading_log: row appended");
        Ok(())
    }

    /// Every reading in insertion order. A missing table is an empty log.
    pub fn read_all(&self) -> Result<Vec<Reading>> {
        let mut reader = match csv::Reader::from_path(&self.path) {
            Ok(reader) => reader,
            Err(e) if is_not_found(&e) => return Ok(Vec::new()),
            Err(e) => return Err(self.read_error(e)),
        };

        reader
            .deserialize::<CsvRow>()
            .enumerate()
            .map(|(i, row)| {
                let row = row.map_err(|e| self.read_error(e))?;
                // Line 1 is the header.
                Reading::try_from(row).map_err(|reason| self.read_error(format!("line {}: {reason}", i + 2)))
            })
            .collect()
    }

    /// Raw table bytes for the download passthrough, or `None` before the
    /// first append.
    pub fn read_raw(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.read_error(e)),
        }
    }

    /// Distinct motor names in order of first appearance.
    pub fn motor_names(&self) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for reading in self.read_all()? {
            if seen.insert(reading.motor_name.clone()) {
                names.push(reading.motor_name);
            }
        }
        Ok(names)
    }

    fn write_error(&self, source: io::Error) -> Error {
        Error::StorageWrite {
            path: self.path.clone(),
            source,
        }
    }

    fn read_error(&self, reason: impl ToString) -> Error {
        Error::StorageRead {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Storage the log appends to. Implemented for `File`; tests substitute a
/// sink that fails part way through a write.
trait AppendTarget: Write {
    fn len(&self) -> io::Result<u64>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl AppendTarget for File {
    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Write `bytes` in full or restore the target to `prior_len`. The original
/// write error is returned; the rollback is best effort.
fn append_or_rollback(target: &mut impl AppendTarget, prior_len: u64, bytes: &[u8]) -> io::Result<()> {
    let written = target.write_all(bytes).and_then(|()| target.sync());
    if let Err(e) = written {
        if let Err(rollback) = target.truncate(prior_len).and_then(|()| target.sync()) {
            warn!(error = %rollback, "reading_log: failed to roll back partial row");
        }
        return Err(e);
    }
    Ok(())
}

fn encode_row(reading: &Reading, with_header: bool) -> io::Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(with_header)
        .from_writer(Vec::new());
    writer.serialize(CsvRow::from(reading))?;
    writer.into_inner().map_err(|e| e.into_error())
}

fn is_not_found(e: &csv::Error) -> bool {
    matches!(e.kind(), csv::ErrorKind::Io(err) if err.kind() == io::ErrorKind::NotFound)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use tempfile::TempDir;

    use super::*;
    use crate::readings::models::Status;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn reading(motor: &str, amps: f64, ts: NaiveDateTime) -> Reading {
        Reading {
            timestamp: ts,
            motor_name: motor.to_owned(),
            current_amperes: amps,
            status: Status::classify(amps, 100.0),
        }
    }

    fn temp_log() -> (TempDir, ReadingLog) {
        let dir = TempDir::new().unwrap();
        let log = ReadingLog::new(dir.path().join("data_motor.csv"));
        (dir, log)
    }

    #[test]
    fn missing_table_reads_as_empty() {
        let (_dir, log) = temp_log();
        assert!(log.read_all().unwrap().is_empty());
        assert!(log.read_raw().unwrap().is_none());
        assert!(log.motor_names().unwrap().is_empty());
    }

    #[test]
    fn first_append_writes_header_once() {
        let (_dir, log) = temp_log();
        log.append(&reading("MotorA", 12.5, at(12, 0, 0))).unwrap();
        log.append(&reading("MotorA", 150.0, at(12, 5, 0))).unwrap();

        let raw = String::from_utf8(log.read_raw().unwrap().unwrap()).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Waktu,Nama Motor,Arus (Ampere),Status",
                "2025-01-01 12:00:00,MotorA,12.5,Normal current.",
                "2025-01-01 12:05:00,MotorA,150.0,Warning: current too high!",
            ]
        );
    }

    #[test]
    fn appends_leave_prior_bytes_untouched() {
        let (_dir, log) = temp_log();
        log.append(&reading("MotorA", 1.0, at(8, 0, 0))).unwrap();
        let before = log.read_raw().unwrap().unwrap();

        for i in 0..3 {
            log.append(&reading("MotorB", f64::from(i), at(9, i, 0))).unwrap();
        }

        let after = log.read_raw().unwrap().unwrap();
        assert!(after.starts_with(&before));
        assert_eq!(log.read_all().unwrap().len(), 4);
    }

    #[test]
    fn round_trip_preserves_fields() {
        let (_dir, log) = temp_log();
        let written = reading("Pump, north \"A\"", 99.95, at(23, 59, 59));
        log.append(&written).unwrap();

        let read = log.read_all().unwrap();
        assert_eq!(read, vec![written]);
    }

    #[test]
    fn motor_names_are_distinct_in_first_seen_order() {
        let (_dir, log) = temp_log();
        log.append(&reading("Fan", 10.0, at(1, 0, 0))).unwrap();
        log.append(&reading("DriveMotor", 45.0, at(2, 0, 0))).unwrap();
        log.append(&reading("Fan", 11.0, at(3, 0, 0))).unwrap();

        assert_eq!(log.motor_names().unwrap(), vec!["Fan", "DriveMotor"]);
    }

    #[test]
    fn corrupt_row_is_a_read_error() {
        let (_dir, log) = temp_log();
        fs::write(
            log.path(),
            "Waktu,Nama Motor,Arus (Ampere),Status\nnot-a-time,MotorA,1.0,Normal current.\n",
        )
        .unwrap();

        let err = log.read_all().unwrap_err();
        assert!(matches!(err, Error::StorageRead { .. }));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn unwritable_location_is_a_write_error() {
        let (dir, _) = temp_log();
        let log = ReadingLog::new(dir.path().join("missing-dir").join("data_motor.csv"));

        let err = log.append(&reading("MotorA", 1.0, at(0, 0, 0))).unwrap_err();
        assert!(matches!(err, Error::StorageWrite { .. }));
    }

    /// Accepts at most `capacity` bytes in total, then reports a full device.
    struct ShortSink {
        data: Vec<u8>,
        capacity: usize,
    }

    impl Write for ShortSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.capacity.saturating_sub(self.data.len()));
            if n == 0 && !buf.is_empty() {
                return Err(io::Error::new(io::ErrorKind::Other, "no space left on device"));
            }
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl AppendTarget for ShortSink {
        fn len(&self) -> io::Result<u64> {
            Ok(self.data.len() as u64)
        }

        fn truncate(&mut self, len: u64) -> io::Result<()> {
            self.data.truncate(len as usize);
            Ok(())
        }

        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn short_write_is_rolled_back() {
        let existing = encode_row(&reading("MotorA", 12.5, at(12, 0, 0)), true).unwrap();
        let row = encode_row(&reading(&"X".repeat(200), 150.0, at(12, 5, 0)), false).unwrap();
        let mut sink = ShortSink {
            data: existing.clone(),
            capacity: existing.len() + row.len() / 2,
        };

        let prior_len = sink.len().unwrap();
        let err = append_or_rollback(&mut sink, prior_len, &row).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert_eq!(sink.data, existing);
    }

    #[test]
    fn complete_write_is_kept() {
        let row = encode_row(&reading("MotorA", 1.0, at(0, 0, 0)), true).unwrap();
        let mut sink = ShortSink {
            data: Vec::new(),
            capacity: usize::MAX,
        };

        append_or_rollback(&mut sink, 0, &row).unwrap();
        assert_eq!(sink.data, row);
    }

    #[test]
    fn log_stays_readable_after_a_rolled_back_row() {
        let (_dir, log) = temp_log();
        log.append(&reading("MotorA", 12.5, at(12, 0, 0))).unwrap();
        let before = log.read_raw().unwrap().unwrap();

        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        let row = encode_row(&reading("MotorB", 20.0, at(12, 1, 0)), false).unwrap();
        // Simulate a torn write, then the rollback append performs on failure.
        file.write_all(&row[..row.len() / 2]).unwrap();
        file.truncate(before.len() as u64).unwrap();

        assert_eq!(log.read_raw().unwrap().unwrap(), before);
        log.append(&reading("MotorB", 20.0, at(12, 1, 0))).unwrap();
        assert_eq!(log.read_all().unwrap().len(), 2);
    }

    #[test]
    fn file_name_comes_from_path() {
        let (_dir, log) = temp_log();
        assert_eq!(log.file_name(), "data_motor.csv");
    }
}
