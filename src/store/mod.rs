//! Durable store of named request configurations.
//!
//! Names are case-sensitive. Saving an existing name replaces its
//! configuration (last write wins). When a snapshot file is configured, every
//! mutation rewrites it atomically under the write lock, and the in-memory map
//! is only updated after the write succeeded. Reads never touch disk.

pub mod models;

pub use models::{RequestSummary, SavedRequest};

use crate::error::{ApiError, EntityKind, Result};
use crate::models::{RequestConfig, RequestOverrides};
use crate::persistence::{read_json, write_json_atomic};
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Entries = BTreeMap<String, SavedRequest>;

/// Thread-safe saved request store. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct RequestStore {
    entries: Arc<RwLock<Entries>>,
    path: Option<PathBuf>,
}

impl RequestStore {
    /// Creates an empty, in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a store persisted at `path`, loading it if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries: Entries = read_json(&path)?.unwrap_or_default();

        for name in entries.keys() {
            validate_name(name)?;
        }
        info!("Request store opened with {} saved request(s)", entries.len());

        Ok(Self {
            entries: Arc::new(RwLock::new(entries)),
            path: Some(path),
        })
    }

    /// Snapshot file path, when persistence is enabled.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Saves `config` under `name`, replacing any existing entry.
    pub fn save(&self, name: &str, config: RequestConfig) -> Result<()> {
        validate_name(name)?;
        config.validate()?;

        self.mutate(|entries| {
            match entries.get_mut(name) {
                Some(existing) => existing.replace(config),
                None => {
                    entries.insert(name.to_string(), SavedRequest::new(config));
                }
            }
            Ok(())
        })?;
        debug!("Saved request '{}'", name);
        Ok(())
    }

    /// Loads the configuration saved under `name`.
    pub fn load(&self, name: &str) -> Result<RequestConfig> {
        self.read()
            .get(name)
            .map(|saved| saved.config.clone())
            .ok_or_else(|| ApiError::not_found(EntityKind::Request, name))
    }

    /// Loads the full entry, including timestamps.
    pub fn get(&self, name: &str) -> Result<SavedRequest> {
        self.read()
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::not_found(EntityKind::Request, name))
    }

    /// Applies `overrides` to an existing entry and returns the new configuration.
    pub fn update(&self, name: &str, overrides: &RequestOverrides) -> Result<RequestConfig> {
        let updated = self.mutate(|entries| {
            let existing = entries
                .get_mut(name)
                .ok_or_else(|| ApiError::not_found(EntityKind::Request, name))?;

            let config = overrides.apply_to(&existing.config);
            config.validate()?;
            existing.replace(config);
            Ok(existing.config.clone())
        })?;
        debug!("Updated request '{}'", name);
        Ok(updated)
    }

    /// Deletes the entry saved under `name`.
    pub fn delete(&self, name: &str) -> Result<()> {
        self.mutate(|entries| {
            entries
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| ApiError::not_found(EntityKind::Request, name))
        })?;
        debug!("Deleted request '{}'", name);
        Ok(())
    }

    /// Saved names in lexicographic order.
    pub fn list(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Listing view of every entry, ordered by name.
    pub fn summaries(&self) -> Vec<RequestSummary> {
        self.read()
            .iter()
            .map(|(name, saved)| saved.summary(name))
            .collect()
    }

    /// A copy of every entry.
    pub fn entries(&self) -> BTreeMap<String, SavedRequest> {
        self.read().clone()
    }

    /// Inserts or replaces many entries in a single write.
    pub fn import(&self, imported: BTreeMap<String, SavedRequest>) -> Result<usize> {
        for (name, saved) in &imported {
            validate_name(name)?;
            saved.config.validate()?;
        }

        let count = imported.len();
        self.mutate(|entries| {
            for (name, saved) in imported {
                entries.insert(name, saved);
            }
            Ok(())
        })?;
        Ok(count)
    }

    /// Number of saved requests.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut Entries) -> Result<T>) -> Result<T> {
        let mut guard = self.write();
        let mut next = guard.clone();
        let output = f(&mut next)?;

        if let Some(path) = &self.path {
            write_json_atomic(path, &next)?;
        }

        *guard = next;
        Ok(output)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ApiError::InvalidConfig(
            "request name must not be empty".to_string(),
        ));
    }
    Ok(())
}
