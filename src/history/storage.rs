//! Persistent storage for request history.
//!
//! Records are stored in JSONL (JSON Lines) format: one record per line,
//! appended as they are produced. A corrupted line only loses that record; the
//! loader skips it with a warning. Evicted records stay in the file until the
//! log compacts it; loading only keeps the newest lines, so stale lines are
//! harmless in the meantime.

use super::models::HistoryRecord;
use crate::error::Result;
use crate::persistence::{ensure_parent_dir, write_atomic};
use log::warn;
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// A JSONL history file.
#[derive(Debug, Clone)]
pub struct HistoryFile {
    path: PathBuf,
    sanitize_sensitive_headers: bool,
}

impl HistoryFile {
    /// Creates a handle for the file at `path`. Nothing is read or written yet.
    pub fn new(path: impl Into<PathBuf>, sanitize_sensitive_headers: bool) -> Self {
        Self {
            path: path.into(),
            sanitize_sensitive_headers,
        }
    }

    /// The file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record as a single JSON line.
    pub fn append(&self, record: &HistoryRecord) -> Result<()> {
        ensure_parent_dir(&self.path)?;

        let line = self.encode(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        file.flush()?;

        Ok(())
    }

    /// Loads the newest `capacity` valid records, oldest first.
    ///
    /// Returns an empty list when the file does not exist. Lines that fail to
    /// parse are skipped and logged.
    pub fn load(&self, capacity: usize) -> Result<Vec<HistoryRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut records: VecDeque<HistoryRecord> = VecDeque::with_capacity(capacity.min(1024));
        let mut corrupted_lines = 0;

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = match line_result {
                Ok(line) => line,
                Err(e) => {
                    corrupted_lines += 1;
                    warn!("Error reading history line {}: {}", line_num + 1, e);
                    continue;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<HistoryRecord>(&line) {
                Ok(record) => {
                    if records.len() == capacity {
                        records.pop_front();
                    }
                    records.push_back(record);
                }
                Err(e) => {
                    corrupted_lines += 1;
                    warn!(
                        "Skipping corrupted history record at line {}: {}",
                        line_num + 1,
                        e
                    );
                }
            }
        }

        if corrupted_lines > 0 && corrupted_lines > records.len() {
            warn!(
                "History file has significant corruption ({} corrupted lines, {} valid records)",
                corrupted_lines,
                records.len()
            );
        }

        Ok(records.into_iter().collect())
    }

    /// Counts non-empty lines, valid or not. Zero when the file is missing.
    pub fn count_entries(&self) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut count = 0;
        for line in reader.lines() {
            if !line?.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Replaces the file contents with `records`, atomically.
    pub fn rewrite<'a, I>(&self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a HistoryRecord>,
    {
        let mut contents = Vec::new();
        for record in records {
            contents.extend_from_slice(self.encode(record)?.as_bytes());
            contents.push(b'\n');
        }
        write_atomic(&self.path, &contents)
    }

    /// Empties the file.
    pub fn truncate(&self) -> Result<()> {
        if self.path.exists() {
            File::create(&self.path)?;
        }
        Ok(())
    }

    fn encode(&self, record: &HistoryRecord) -> Result<String> {
        let json = if self.sanitize_sensitive_headers {
            serde_json::to_string(&record.sanitized())?
        } else {
            serde_json::to_string(record)?
        };
        Ok(json)
    }
}
