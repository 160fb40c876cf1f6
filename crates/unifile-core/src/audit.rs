// SPDX-License-Identifier: AGPL-3.0-or-later
//! Conversion audit log
//!
//! The dispatcher hands one [`AuditRecord`] per attempt to a
//! [`ConversionLog`]. Implementations decide where records go: a delimited
//! file ([`CsvAuditLog`]), a bounded in-memory buffer ([`MemoryAuditLog`]) or
//! nowhere ([`NullLog`]).

use crate::converters::delimited::{join_record, parse_records};
use crate::dispatch::ConversionStatus;
use crate::traits::Result;
use chrono::{Local, NaiveDateTime, Timelike};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Timestamp layout used in the log file
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fixed header row of the log file
pub const LOG_HEADER: [&str; 7] = [
    "Date",
    "Input File",
    "Output File",
    "From Format",
    "To Format",
    "Status",
    "Error Message",
];

/// Rows with fewer fields are ignored when reading back
const MIN_FIELDS: usize = 6;

/// One logged conversion attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub timestamp: NaiveDateTime,
    pub input: String,
    pub output: String,
    pub from: String,
    pub to: String,
    pub status: ConversionStatus,
    /// Failure reason, empty on success
    pub message: String,
}

impl AuditRecord {
    /// Record stamped with the current local time (second precision)
    pub fn now(
        input: impl Into<String>,
        output: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        status: ConversionStatus,
        message: impl Into<String>,
    ) -> Self {
        let now = Local::now().naive_local();
        Self {
            timestamp: now.with_nanosecond(0).unwrap_or(now),
            input: input.into(),
            output: output.into(),
            from: from.into(),
            to: to.into(),
            status,
            message: message.into(),
        }
    }

    fn to_row(&self) -> String {
        let timestamp = self.timestamp.format(TIMESTAMP_FORMAT).to_string();
        join_record(
            [
                timestamp.as_str(),
                self.input.as_str(),
                self.output.as_str(),
                self.from.as_str(),
                self.to.as_str(),
                self.status.label(),
                self.message.as_str(),
            ],
            ',',
        )
    }

    fn from_row(fields: &[String]) -> Option<Self> {
        if fields.len() < MIN_FIELDS {
            return None;
        }
        Some(Self {
            timestamp: NaiveDateTime::parse_from_str(&fields[0], TIMESTAMP_FORMAT).ok()?,
            input: fields[1].clone(),
            output: fields[2].clone(),
            from: fields[3].clone(),
            to: fields[4].clone(),
            status: fields[5].parse().ok()?,
            message: fields.get(6).cloned().unwrap_or_default(),
        })
    }
}

/// Sink for conversion records
pub trait ConversionLog: Send + Sync {
    /// Append one record
    fn record(&self, record: &AuditRecord) -> Result<()>;

    /// Up to `limit` most recent records, oldest first
    fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>>;
}

/// Append-only delimited log file with a fixed header row
#[derive(Debug)]
pub struct CsvAuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConversionLog for CsvAuditLog {
    fn record(&self, record: &AuditRecord) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut buf = String::new();
        if file.metadata()?.len() == 0 {
            buf.push_str(&join_record(LOG_HEADER, ','));
            buf.push('\n');
        }
        buf.push_str(&record.to_row());
        buf.push('\n');
        file.write_all(buf.as_bytes())?;
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let records: Vec<AuditRecord> = parse_records(&text, ',')
            .iter()
            .skip(1)
            .filter_map(|fields| AuditRecord::from_row(fields))
            .collect();
        let skip = records.len().saturating_sub(limit);
        Ok(records.into_iter().skip(skip).collect())
    }
}

/// Bounded in-memory log keeping the newest records
#[derive(Debug)]
pub struct MemoryAuditLog {
    capacity: usize,
    records: Mutex<VecDeque<AuditRecord>>,
}

impl MemoryAuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: Mutex::new(VecDeque::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl ConversionLog for MemoryAuditLog {
    fn record(&self, record: &AuditRecord) -> Result<()> {
        let mut records = self.records.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record.clone());
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        let records = self.records.lock();
        let skip = records.len().saturating_sub(limit);
        Ok(records.iter().skip(skip).cloned().collect())
    }
}

/// Log that drops every record
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLog;

impl ConversionLog for NullLog {
    fn record(&self, _record: &AuditRecord) -> Result<()> {
        Ok(())
    }

    fn recent(&self, _limit: usize) -> Result<Vec<AuditRecord>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample(n: usize, status: ConversionStatus, message: &str) -> AuditRecord {
        AuditRecord::now(
            format!("/data/in{n}.csv"),
            format!("/data/out{n}.json"),
            "CSV",
            "JSON",
            status,
            message,
        )
    }

    #[test]
    fn test_csv_log_writes_header_once() {
        let dir = TempDir::new().unwrap();
        let log = CsvAuditLog::new(dir.path().join("log.csv"));
        log.record(&sample(1, ConversionStatus::Success, "")).unwrap();
        log.record(&sample(2, ConversionStatus::Failed, "boom")).unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "Date,Input File,Output File,From Format,To Format,Status,Error Message"
        );
        assert!(lines[2].ends_with(",CSV,JSON,FAILED,boom"));
    }

    #[test]
    fn test_csv_log_reads_back_escaped_messages() {
        let dir = TempDir::new().unwrap();
        let log = CsvAuditLog::new(dir.path().join("log.csv"));
        let record = sample(1, ConversionStatus::Failed, "bad \"quote\", line\nbreak");
        log.record(&record).unwrap();

        assert_eq!(log.recent(10).unwrap(), vec![record]);
    }

    #[test]
    fn test_csv_log_recent_returns_newest() {
        let dir = TempDir::new().unwrap();
        let log = CsvAuditLog::new(dir.path().join("log.csv"));
        for n in 0..5 {
            log.record(&sample(n, ConversionStatus::Success, "")).unwrap();
        }

        let recent = log.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].input, "/data/in3.csv");
        assert_eq!(recent[1].input, "/data/in4.csv");
    }

    #[test]
    fn test_csv_log_skips_malformed_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        std::fs::write(
            &path,
            "Date,Input File,Output File,From Format,To Format,Status,Error Message\n\
             garbage,row\n\
             2024-05-01 10:00:00,a.csv,a.json,CSV,JSON,SUCCESS,\n",
        )
        .unwrap();

        let recent = CsvAuditLog::new(path).recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].status, ConversionStatus::Success);
    }

    #[test]
    fn test_missing_log_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let log = CsvAuditLog::new(dir.path().join("absent.csv"));
        assert!(log.recent(5).unwrap().is_empty());
    }

    #[test]
    fn test_memory_log_is_bounded() {
        let log = MemoryAuditLog::new(3);
        for n in 0..5 {
            log.record(&sample(n, ConversionStatus::Success, "")).unwrap();
        }
        assert_eq!(log.len(), 3);

        let inputs: Vec<String> = log.recent(10).unwrap().into_iter().map(|r| r.input).collect();
        assert_eq!(inputs, vec!["/data/in2.csv", "/data/in3.csv", "/data/in4.csv"]);
        assert_eq!(log.recent(1).unwrap()[0].input, "/data/in4.csv");
    }
}
