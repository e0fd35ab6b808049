//! The `ApiTester` facade.
//!
//! `ApiTester` owns one of each component (environment registry, request
//! store, history log, executor and analysis engine) and exposes the
//! operations an assistant or CLI needs as plain methods. It is cheap to
//! clone: clones share the same underlying state.

use crate::analysis::{AnalysisEngine, AnalysisReport, ComparisonReport, LoadTestPlan, StatsReport};
use crate::config::ApiTesterConfig;
use crate::environment::{Environment, EnvironmentRegistry};
use crate::error::{ApiError, Result};
use crate::executor::Executor;
use crate::history::{HistoryFile, HistoryFilter, HistoryLog, HistoryRecord};
use crate::models::{RequestConfig, RequestOverrides};
use crate::store::{RequestStore, RequestSummary, SavedRequest};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Portable export of saved requests and history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_snapshot_version")]
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub requests: BTreeMap<String, SavedRequest>,
    /// Records oldest first.
    #[serde(default)]
    pub history: Vec<HistoryRecord>,
}

fn default_snapshot_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Counts from [`ApiTester::import_snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Saved requests written, including replacements.
    pub requests: usize,
    /// History records added and retained after capacity trimming.
    pub history: usize,
}

/// Facade over every API tester component.
#[derive(Debug, Clone)]
pub struct ApiTester {
    settings: Arc<ApiTesterConfig>,
    environments: EnvironmentRegistry,
    store: RequestStore,
    history: HistoryLog,
    executor: Executor,
    analysis: AnalysisEngine,
}

impl ApiTester {
    /// Creates a tester from `settings`.
    ///
    /// When `save_requests_to_file` is set, saved requests and environments
    /// are loaded from and written to their configured files. When
    /// `persist_history` is set, history is reloaded from its JSONL file.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for invalid settings, `Storage`/`Serialization` when a
    /// persisted snapshot cannot be read, `Client` when the HTTP client cannot
    /// be built.
    pub fn new(settings: ApiTesterConfig) -> Result<Self> {
        settings.validate().map_err(ApiError::InvalidConfig)?;

        let (environments, store) = if settings.save_requests_to_file {
            (
                EnvironmentRegistry::open(&settings.environments_file_path)?,
                RequestStore::open(&settings.requests_file_path)?,
            )
        } else {
            (EnvironmentRegistry::new(), RequestStore::new())
        };

        let history = if settings.persist_history {
            HistoryLog::open(
                HistoryFile::new(
                    &settings.history_file_path,
                    settings.sanitize_sensitive_headers,
                ),
                settings.max_history,
            )?
        } else {
            HistoryLog::new(settings.max_history)
        };

        let settings = Arc::new(settings);
        let executor = Executor::new(settings.clone(), environments.clone(), history.clone())?;
        let analysis = AnalysisEngine::new(history.clone());

        info!(
            "API tester ready: {} saved request(s), {} environment(s), {} history record(s)",
            store.len(),
            environments.list().len(),
            history.len()
        );

        Ok(Self {
            settings,
            environments,
            store,
            history,
            executor,
            analysis,
        })
    }

    /// Creates a tester with default settings and no disk persistence.
    pub fn in_memory() -> Result<Self> {
        Self::new(ApiTesterConfig::in_memory())
    }

    /// The active settings.
    pub fn settings(&self) -> &ApiTesterConfig {
        &self.settings
    }

    // Execution

    /// Executes an ad hoc request.
    pub async fn execute_request(
        &self,
        config: &RequestConfig,
        overrides: &RequestOverrides,
    ) -> Result<HistoryRecord> {
        self.executor.execute(config, overrides).await
    }

    /// Loads a saved request and executes it with `overrides` applied.
    pub async fn execute_saved_request(
        &self,
        name: &str,
        overrides: &RequestOverrides,
    ) -> Result<HistoryRecord> {
        let mut config = self.store.load(name)?;
        // History records of saved requests carry the saved name.
        config.name.get_or_insert_with(|| name.to_string());
        self.executor.execute(&config, overrides).await
    }

    // Saved requests

    pub fn save_request(&self, name: &str, config: RequestConfig) -> Result<()> {
        self.store.save(name, config)
    }

    pub fn load_request(&self, name: &str) -> Result<RequestConfig> {
        self.store.load(name)
    }

    /// Applies `overrides` to a saved request and stores the result.
    pub fn update_request(&self, name: &str, overrides: &RequestOverrides) -> Result<RequestConfig> {
        self.store.update(name, overrides)
    }

    pub fn delete_request(&self, name: &str) -> Result<()> {
        self.store.delete(name)
    }

    /// Saved request names, sorted.
    pub fn list_requests(&self) -> Vec<String> {
        self.store.list()
    }

    pub fn request_summaries(&self) -> Vec<RequestSummary> {
        self.store.summaries()
    }

    // History

    /// Lists history records matching `filter`, newest first by default.
    pub fn get_history(&self, filter: &HistoryFilter) -> Vec<HistoryRecord> {
        self.history.list(filter)
    }

    pub fn get_history_record(&self, id: &Uuid) -> Result<HistoryRecord> {
        self.history.get(id)
    }

    /// Removes every history record and returns how many were removed.
    pub fn clear_history(&self) -> Result<usize> {
        self.history.clear()
    }

    // Analysis

    pub fn compare_responses(&self, a: &Uuid, b: &Uuid) -> Result<ComparisonReport> {
        self.analysis.compare(a, b)
    }

    pub fn analyze_response(&self, id: &Uuid, extract: Option<&str>) -> Result<AnalysisReport> {
        self.analysis.analyze(id, extract)
    }

    pub fn analyze_latest(&self, extract: Option<&str>) -> Result<AnalysisReport> {
        self.analysis.analyze_latest(extract)
    }

    pub fn get_stats(&self, filter: &HistoryFilter) -> StatsReport {
        self.analysis.stats(filter)
    }

    /// Suggests a staged load test for `endpoint`. Never sends requests.
    pub fn plan_load_test(&self, endpoint: &str, expected_rps: Option<f64>) -> Result<LoadTestPlan> {
        self.analysis.plan_load_test(endpoint, expected_rps)
    }

    // Environments

    /// Makes `name` the active environment.
    pub fn set_environment(&self, name: &str) -> Result<()> {
        self.environments.set_active(name)
    }

    pub fn register_environment(&self, env: Environment, overwrite: bool) -> Result<()> {
        self.environments.register(env, overwrite)
    }

    pub fn remove_environment(&self, name: &str) -> Result<Environment> {
        self.environments.remove(name)
    }

    /// Registered environment names, sorted.
    pub fn list_environments(&self) -> Vec<String> {
        self.environments.list()
    }

    /// The active environment, if one is selected.
    pub fn active_environment(&self) -> Option<Environment> {
        self.environments
            .active_name()
            .and_then(|name| self.environments.get(&name).ok())
    }

    // Snapshots

    /// Exports saved requests and history.
    pub fn export_snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            exported_at: Utc::now(),
            requests: self.store.entries(),
            history: self.history.snapshot(),
        }
    }

    /// Imports a snapshot.
    ///
    /// Saved requests overwrite entries with the same name. History is merged
    /// by record id and cut to the newest `max_history` records.
    pub fn import_snapshot(&self, snapshot: Snapshot) -> Result<ImportSummary> {
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(ApiError::InvalidConfig(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        let requests = self.store.import(snapshot.requests)?;
        let history = self.history.import(snapshot.history)?;
        info!(
            "Imported snapshot: {} request(s), {} history record(s)",
            requests, history
        );

        Ok(ImportSummary { requests, history })
    }
}
