//! Saved request data models.

use crate::models::{HttpMethod, RequestConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A request configuration saved under a name, with bookkeeping timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRequest {
    /// The configuration exactly as saved.
    pub config: RequestConfig,

    /// When the name was first saved.
    pub saved_at: DateTime<Utc>,

    /// When the entry was last written.
    pub updated_at: DateTime<Utc>,
}

impl SavedRequest {
    /// Wraps a configuration saved now.
    pub fn new(config: RequestConfig) -> Self {
        let now = Utc::now();
        Self {
            config,
            saved_at: now,
            updated_at: now,
        }
    }

    /// Replaces the configuration, keeping `saved_at`.
    pub fn replace(&mut self, config: RequestConfig) {
        self.config = config;
        self.updated_at = Utc::now();
    }

    /// One-line listing view of this entry.
    pub fn summary(&self, name: &str) -> RequestSummary {
        RequestSummary {
            name: name.to_string(),
            method: self.config.method,
            url: self.config.url.clone(),
            description: self.config.description.clone(),
            saved_at: self.saved_at,
            updated_at: self.updated_at,
        }
    }
}

/// Listing view of a saved request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSummary {
    pub name: String,
    pub method: HttpMethod,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub saved_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
