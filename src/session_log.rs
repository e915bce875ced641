//! Append-only CSV log of every reading set received.
//!
//! Rows have no header and no fixed width: the first column is the local
//! timestamp, followed by one `KEY:VALUE` column per field the parser accepted
//! from that line. Each row is flushed and synced before `append` returns.

use crate::error::{MonitorError, Result};
use crate::protocol::SensorReading;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;

/// Timestamp format of the first column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the session log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRow {
    /// Local time, formatted with [`TIMESTAMP_FORMAT`]
    pub timestamp: String,
    /// `KEY:VALUE` fields in line order
    pub fields: Vec<String>,
}

impl LogRow {
    pub fn new<Tz: TimeZone>(timestamp: &DateTime<Tz>, readings: &[SensorReading]) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            timestamp: timestamp.format(TIMESTAMP_FORMAT).to_string(),
            fields: crate::protocol::to_fields(readings),
        }
    }

    /// Parse one CSV line of the log. Rows are independent; widths vary.
    pub fn parse(line: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(line.as_bytes());

        let record = reader
            .records()
            .next()
            .ok_or_else(|| MonitorError::log_write_error("empty log row"))??;

        let mut columns = record.iter();
        let timestamp = columns
            .next()
            .ok_or_else(|| MonitorError::log_write_error("log row has no timestamp"))?
            .to_string();

        Ok(Self {
            timestamp,
            fields: columns.map(str::to_string).collect(),
        })
    }

    /// The timestamp column as a local time.
    pub fn local_time(&self) -> Option<DateTime<Local>> {
        NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT)
            .ok()
            .and_then(|naive| Local.from_local_datetime(&naive).earliest())
    }
}

/// Handle to the log file, held for the life of the dashboard.
///
/// Dropping the log releases the file; [`SessionLog::close`] does the same
/// but reports a failing final flush.
pub struct SessionLog {
    writer: csv::Writer<File>,
    path: PathBuf,
    rows_written: u64,
}

impl SessionLog {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                MonitorError::log_write_error(format!("cannot open {}: {}", path.display(), e))
            })?;

        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);

        info!("Appending session log to {}", path.display());
        Ok(Self {
            writer,
            path,
            rows_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended since the log was opened.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Write one row and push it to disk.
    pub fn append<Tz: TimeZone>(
        &mut self,
        timestamp: &DateTime<Tz>,
        readings: &[SensorReading],
    ) -> Result<LogRow>
    where
        Tz::Offset: std::fmt::Display,
    {
        let row = LogRow::new(timestamp, readings);
        self.write_row(&row)?;
        Ok(row)
    }

    /// Write a prepared row and push it to disk.
    pub fn write_row(&mut self, row: &LogRow) -> Result<()> {
        self.writer.write_field(&row.timestamp)?;
        for field in &row.fields {
            self.writer.write_field(field)?;
        }
        self.writer.write_record(None::<&[u8]>)?;

        self.writer
            .flush()
            .and_then(|_| self.writer.get_ref().sync_data())
            .map_err(|e| MonitorError::log_write_error(e.to_string()))?;
        self.rows_written += 1;
        Ok(())
    }

    /// Flush and release the file.
    pub fn close(mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| MonitorError::log_write_error(e.to_string()))?;
        info!(
            "Closed session log {} ({} rows this session)",
            self.path.display(),
            self.rows_written
        );
        Ok(())
    }
}

impl std::fmt::Debug for SessionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLog")
            .field("path", &self.path)
            .field("rows_written", &self.rows_written)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse_line;
    use chrono::FixedOffset;

    fn at(h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 9, h, m, s)
            .unwrap()
    }

    #[test]
    fn test_append_writes_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vital_log.csv");

        let mut log = SessionLog::open(&path).unwrap();
        let row = log
            .append(&at(14, 5, 9), &parse_line("TEMP:36.5,HUM:40,FLAME:none"))
            .unwrap();
        assert_eq!(row.timestamp, "2024-03-09 14:05:09");
        assert_eq!(log.rows_written(), 1);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "2024-03-09 14:05:09,TEMP:36.5,HUM:40,FLAME:none\n");
    }

    #[test]
    fn test_rows_are_appended_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vital_log.csv");

        let mut log = SessionLog::open(&path).unwrap();
        log.append(&at(1, 0, 0), &parse_line("TEMP:20")).unwrap();
        log.close().unwrap();

        let mut log = SessionLog::open(&path).unwrap();
        log.append(&at(1, 0, 1), &parse_line("SHOCK:Impact,REED:Open"))
            .unwrap();
        drop(log);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(LogRow::parse(lines[0]).unwrap().fields, vec!["TEMP:20"]);
        assert_eq!(
            LogRow::parse(lines[1]).unwrap().fields,
            vec!["SHOCK:Impact", "REED:Open"]
        );
    }

    #[test]
    fn test_row_round_trip_with_quoting() {
        let row = LogRow::new(&at(9, 30, 0), &parse_line("NOTE:say \"hi\",TEMP:21°C"));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quoted.csv");

        let mut log = SessionLog::open(&path).unwrap();
        log.write_row(&row).unwrap();
        log.close().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed = LogRow::parse(content.trim_end()).unwrap();
        assert_eq!(parsed, row);
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(LogRow::parse("").is_err());
    }

    #[test]
    fn test_local_time() {
        let row = LogRow {
            timestamp: "2024-03-09 14:05:09".to_string(),
            fields: vec![],
        };
        let local = row.local_time().unwrap();
        assert_eq!(local.format(TIMESTAMP_FORMAT).to_string(), row.timestamp);
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = SessionLog::open(dir.path().join("nope").join("log.csv")).unwrap_err();
        assert!(matches!(err, MonitorError::LogWrite(_)));
    }
}
