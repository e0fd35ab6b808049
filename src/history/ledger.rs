//! The in-memory history ring.

use super::filter::HistoryFilter;
use super::models::HistoryRecord;
use super::storage::HistoryFile;
use crate::error::{ApiError, EntityKind, Result};
use log::{debug, info, warn};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// The backing file is compacted once it holds this many times `capacity` lines.
const COMPACT_FACTOR: usize = 2;

#[derive(Debug)]
struct HistoryState {
    records: VecDeque<HistoryRecord>,
    capacity: usize,
    file: Option<HistoryFile>,
    /// Lines currently in the backing file, evicted ones included.
    file_lines: usize,
}

/// Bounded, append-only history of executed requests.
///
/// Holds at most `capacity` records; appending to a full log evicts the
/// oldest record first. Clones share state. When backed by a
/// [`HistoryFile`], each record is appended to the file before the in-memory
/// ring changes, so a failed write leaves the log unchanged. Evicted lines are
/// dropped from the file in batches, once it grows past twice the capacity.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    state: Arc<RwLock<HistoryState>>,
}

impl HistoryLog {
    /// Creates an empty in-memory log. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self::from_parts(VecDeque::new(), capacity, None)
    }

    /// Opens a log backed by `file`, loading its newest `capacity` records.
    pub fn open(file: HistoryFile, capacity: usize) -> Result<Self> {
        let records: VecDeque<HistoryRecord> = file.load(capacity.max(1))?.into();
        let file_lines = file.count_entries()?;
        info!(
            "History opened with {} record(s) from {}",
            records.len(),
            file.path().display()
        );

        let log = Self::from_parts(records, capacity, Some(file));
        log.write().file_lines = file_lines;
        Ok(log)
    }

    fn from_parts(
        records: VecDeque<HistoryRecord>,
        capacity: usize,
        file: Option<HistoryFile>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(HistoryState {
                records,
                capacity: capacity.max(1),
                file,
                file_lines: 0,
            })),
        }
    }

    /// Appends a record and returns the evicted one, if the log was full.
    pub fn append(&self, record: HistoryRecord) -> Result<Option<HistoryRecord>> {
        let mut state = self.write();
        let full = state.records.len() >= state.capacity;

        if let Some(file) = &state.file {
            file.append(&record)?;
            state.file_lines += 1;
        }

        let evicted = if full {
            state.records.pop_front()
        } else {
            None
        };
        if let Some(old) = &evicted {
            debug!("History full, evicted record {}", old.id);
        }

        state.records.push_back(record);
        Self::compact_if_needed(&mut state);
        Ok(evicted)
    }

    /// Gets a record by id.
    pub fn get(&self, id: &Uuid) -> Result<HistoryRecord> {
        self.read()
            .records
            .iter()
            .find(|r| &r.id == id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(EntityKind::HistoryRecord, id.to_string()))
    }

    /// Lists records matching `filter`, newest first unless it asks otherwise.
    pub fn list(&self, filter: &HistoryFilter) -> Vec<HistoryRecord> {
        filter.apply(self.read().records.iter())
    }

    /// The most recent record.
    pub fn latest(&self) -> Option<HistoryRecord> {
        self.read().records.back().cloned()
    }

    /// Removes every record and returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let mut state = self.write();
        if let Some(file) = &state.file {
            file.truncate()?;
        }

        let removed = state.records.len();
        state.records.clear();
        state.file_lines = 0;
        info!("Cleared {} history record(s)", removed);
        Ok(removed)
    }

    /// Merges `imported` into the log.
    ///
    /// Records whose id is already present are skipped. The result is ordered
    /// by timestamp and cut to the newest `capacity` records. Returns the
    /// number of records added and still present afterwards.
    pub fn import(&self, imported: Vec<HistoryRecord>) -> Result<usize> {
        let mut state = self.write();
        let existing: HashSet<Uuid> = state.records.iter().map(|r| r.id).collect();

        let mut merged: Vec<HistoryRecord> = state.records.iter().cloned().collect();
        let mut added_ids = HashSet::new();
        for record in imported {
            if !existing.contains(&record.id) && added_ids.insert(record.id) {
                merged.push(record);
            }
        }

        merged.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        let overflow = merged.len().saturating_sub(state.capacity);
        let merged: VecDeque<HistoryRecord> = merged.into_iter().skip(overflow).collect();

        if let Some(file) = &state.file {
            file.rewrite(merged.iter())?;
        }

        let added = merged.iter().filter(|r| added_ids.contains(&r.id)).count();
        state.file_lines = merged.len();
        state.records = merged;
        debug!("Imported {} history record(s)", added);
        Ok(added)
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }

    /// Maximum number of records held.
    pub fn capacity(&self) -> usize {
        self.read().capacity
    }

    /// Every record, oldest first.
    pub fn snapshot(&self) -> Vec<HistoryRecord> {
        self.read().records.iter().cloned().collect()
    }

    /// Rewrites the file with the live records once stale lines pile up.
    ///
    /// The record is already durable at this point, so a failed compaction is
    /// logged and retried on the next append.
    fn compact_if_needed(state: &mut HistoryState) {
        if state.file_lines <= state.capacity * COMPACT_FACTOR {
            return;
        }
        let Some(file) = &state.file else {
            return;
        };

        match file.rewrite(state.records.iter()) {
            Ok(()) => {
                debug!(
                    "Compacted history file from {} to {} line(s)",
                    state.file_lines,
                    state.records.len()
                );
                state.file_lines = state.records.len();
            }
            Err(e) => warn!("Failed to compact history file: {}", e),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HistoryState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HistoryState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
