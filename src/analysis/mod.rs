//! Response analysis over the history log.
//!
//! The [`AnalysisEngine`] is read-only: it compares, inspects and aggregates
//! records already in the [`HistoryLog`] and never issues requests.
//!
//! # Example
//!
//! ```
//! use api_tester::analysis::AnalysisEngine;
//! use api_tester::history::{HistoryFilter, HistoryLog};
//!
//! let engine = AnalysisEngine::new(HistoryLog::new(10));
//! let stats = engine.stats(&HistoryFilter::default());
//! assert_eq!(stats.count, 0);
//! assert_eq!(stats.success_rate, 0.0);
//! ```

pub mod compare;
pub mod content_type;
pub mod extract;
pub mod inspect;
pub mod planning;
pub mod stats;

pub use compare::{compare_records, BodyDiff, ChangeKind, ComparisonReport, JsonChange};
pub use content_type::{detect_content_type, ContentType};
pub use extract::extract_path;
pub use inspect::{analyze_record, AnalysisReport, Anomaly, Extraction, JsonShape, Pattern};
pub use planning::{plan_load_test, Baseline, LoadStage, LoadTestPlan};
pub use stats::{compute_stats, DomainCount, StatsReport};

use crate::error::{ApiError, EntityKind, Result};
use crate::history::{HistoryFilter, HistoryLog, HistoryRecord};
use uuid::Uuid;

/// Number of recent records used as the slow-response baseline.
pub const RECENT_WINDOW: usize = 20;

/// Read-only analysis over a shared history log.
#[derive(Debug, Clone)]
pub struct AnalysisEngine {
    history: HistoryLog,
}

impl AnalysisEngine {
    pub fn new(history: HistoryLog) -> Self {
        Self { history }
    }

    /// Compares record `a` with record `b`.
    ///
    /// # Errors
    ///
    /// `NotFound` if either record is unknown or has been evicted.
    pub fn compare(&self, a: &Uuid, b: &Uuid) -> Result<ComparisonReport> {
        let record_a = self.history.get(a)?;
        let record_b = self.history.get(b)?;
        Ok(compare_records(&record_a, &record_b))
    }

    /// Analyzes one record, optionally extracting a value from its JSON body.
    pub fn analyze(&self, id: &Uuid, extract: Option<&str>) -> Result<AnalysisReport> {
        let record = self.history.get(id)?;
        Ok(self.analyze_with_baseline(&record, extract))
    }

    /// Analyzes the most recent record.
    pub fn analyze_latest(&self, extract: Option<&str>) -> Result<AnalysisReport> {
        let record = self
            .history
            .latest()
            .ok_or_else(|| ApiError::not_found(EntityKind::HistoryRecord, "latest"))?;
        Ok(self.analyze_with_baseline(&record, extract))
    }

    /// Aggregates statistics over the records matching `filter`.
    pub fn stats(&self, filter: &HistoryFilter) -> StatsReport {
        compute_stats(&self.history.list(filter))
    }

    /// Suggests a load test for `endpoint` from the recorded history.
    pub fn plan_load_test(&self, endpoint: &str, expected_rps: Option<f64>) -> Result<LoadTestPlan> {
        plan_load_test(&self.history.snapshot(), endpoint, expected_rps)
    }

    fn analyze_with_baseline(&self, record: &HistoryRecord, extract: Option<&str>) -> AnalysisReport {
        let recent = self
            .history
            .list(&HistoryFilter::new().limit(RECENT_WINDOW + 1));
        analyze_record(record, &recent, extract)
    }
}
