//! Filtering for history listings and statistics.

use super::models::{HistoryRecord, OutcomeKind};
use crate::models::{HttpMethod, StatusClass};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Criteria for selecting history records.
///
/// Every set field must match. The default filter selects every record,
/// newest first, without a limit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryFilter {
    /// Only records sent with this method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,

    /// Only records whose response falls in this class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_class: Option<StatusClass>,

    /// Only records sent at or after this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,

    /// Only records whose URL contains this text, ignoring case.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_contains: Option<String>,

    /// Only records with this outcome kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OutcomeKind>,

    /// Maximum number of records returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    /// Return the oldest records first instead of the newest.
    #[serde(default)]
    pub oldest_first: bool,
}

impl HistoryFilter {
    /// A filter that selects everything.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn status_class(mut self, class: StatusClass) -> Self {
        self.status_class = Some(class);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn url_contains(mut self, text: impl Into<String>) -> Self {
        self.url_contains = Some(text.into());
        self
    }

    pub fn outcome(mut self, outcome: OutcomeKind) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn oldest_first(mut self) -> Self {
        self.oldest_first = true;
        self
    }

    /// Checks a single record against every criterion except `limit`.
    pub fn matches(&self, record: &HistoryRecord) -> bool {
        if let Some(method) = self.method {
            if record.request.method != method {
                return false;
            }
        }

        if let Some(class) = self.status_class {
            if record.status_class() != Some(class) {
                return false;
            }
        }

        if let Some(since) = self.since {
            if record.timestamp < since {
                return false;
            }
        }

        if let Some(text) = &self.url_contains {
            if !record
                .request
                .url
                .to_lowercase()
                .contains(&text.to_lowercase())
            {
                return false;
            }
        }

        if let Some(kind) = self.outcome {
            if record.outcome.kind() != kind {
                return false;
            }
        }

        true
    }

    /// Selects matching records from `oldest_to_newest`, honouring order and limit.
    pub fn apply<'a, I>(&self, oldest_to_newest: I) -> Vec<HistoryRecord>
    where
        I: DoubleEndedIterator<Item = &'a HistoryRecord>,
    {
        let limit = self.limit.unwrap_or(usize::MAX);

        if self.oldest_first {
            oldest_to_newest
                .filter(|r| self.matches(r))
                .take(limit)
                .cloned()
                .collect()
        } else {
            oldest_to_newest
                .rev()
                .filter(|r| self.matches(r))
                .take(limit)
                .cloned()
                .collect()
        }
    }
}
