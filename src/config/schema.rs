//! Configuration schema for the API tester.
//!
//! This module defines the configuration structure and validation logic for all
//! settings consumed by the core: history capacity, timeouts, persistence paths,
//! body capture limits, client behaviour and the URL domain policy.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for the API tester.
///
/// Every field has a default, so a partial JSON object (or none at all) yields
/// a usable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTesterConfig {
    /// Maximum number of records kept in the history log.
    ///
    /// Inserting beyond this evicts the oldest record. Defaults to 100.
    ///
    /// Must be > 0.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Engine default request timeout in milliseconds.
    ///
    /// Applies when neither the call, the request configuration nor the active
    /// environment sets a timeout. Defaults to 30000ms (30 seconds).
    ///
    /// Must be greater than 0.
    #[serde(default = "default_timeout")]
    pub default_timeout: u64,

    /// Whether saved requests and environments are written to disk.
    #[serde(default = "default_save_requests_to_file")]
    pub save_requests_to_file: bool,

    /// Path of the saved request snapshot file.
    #[serde(default = "default_requests_file_path")]
    pub requests_file_path: String,

    /// Path of the environment registry snapshot file.
    #[serde(default = "default_environments_file_path")]
    pub environments_file_path: String,

    /// Whether history records are also appended to a JSONL file.
    ///
    /// History is an in-memory ledger unless this is enabled. Defaults to false.
    #[serde(default)]
    pub persist_history: bool,

    /// Path of the JSONL history file, used when `persist_history` is set.
    #[serde(default = "default_history_file_path")]
    pub history_file_path: String,

    /// Whether to redact sensitive headers in the persisted history file.
    #[serde(default = "default_sanitize_sensitive_headers")]
    pub sanitize_sensitive_headers: bool,

    /// Maximum number of response body bytes captured per record.
    ///
    /// Larger bodies are cut at this size and flagged `truncated`. Defaults to 1MB.
    ///
    /// Must be > 0.
    #[serde(default = "default_max_body_capture_bytes")]
    pub max_body_capture_bytes: usize,

    /// Whether to automatically follow HTTP redirects.
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,

    /// Maximum number of redirects to follow when `follow_redirects` is true.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,

    /// Whether to validate SSL/TLS certificates.
    ///
    /// **Warning:** Disabling SSL validation can expose you to security risks.
    #[serde(default = "default_validate_ssl")]
    pub validate_ssl: bool,

    /// Headers sent with every request unless overridden.
    ///
    /// These sit below environment, request and override headers.
    #[serde(default = "default_headers")]
    pub default_headers: BTreeMap<String, String>,

    /// Hosts that requests may target. Empty means any host.
    ///
    /// An entry matches the host itself and any of its subdomains.
    #[serde(default)]
    pub allowed_domains: Vec<String>,

    /// Hosts that requests may never target. Checked before `allowed_domains`.
    #[serde(default)]
    pub blocked_domains: Vec<String>,
}

impl Default for ApiTesterConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            default_timeout: default_timeout(),
            save_requests_to_file: default_save_requests_to_file(),
            requests_file_path: default_requests_file_path(),
            environments_file_path: default_environments_file_path(),
            persist_history: false,
            history_file_path: default_history_file_path(),
            sanitize_sensitive_headers: default_sanitize_sensitive_headers(),
            max_body_capture_bytes: default_max_body_capture_bytes(),
            follow_redirects: default_follow_redirects(),
            max_redirects: default_max_redirects(),
            validate_ssl: default_validate_ssl(),
            default_headers: default_headers(),
            allowed_domains: Vec::new(),
            blocked_domains: Vec::new(),
        }
    }
}

impl ApiTesterConfig {
    /// Validates the configuration and returns errors if any settings are invalid.
    ///
    /// # Returns
    ///
    /// `Ok(())` if all settings are valid, or `Err` with a descriptive error message.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_timeout == 0 {
            return Err("defaultTimeout must be greater than 0".to_string());
        }

        if self.max_history == 0 {
            return Err("maxHistory must be greater than 0".to_string());
        }

        if self.max_body_capture_bytes == 0 {
            return Err("maxBodyCaptureBytes must be greater than 0".to_string());
        }

        if self.save_requests_to_file
            && (self.requests_file_path.trim().is_empty()
                || self.environments_file_path.trim().is_empty())
        {
            return Err("persistence file paths must not be empty".to_string());
        }

        if self.persist_history && self.history_file_path.trim().is_empty() {
            return Err("historyFilePath must not be empty".to_string());
        }

        Ok(())
    }

    /// Returns the engine default timeout as a `Duration`.
    pub fn default_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.default_timeout)
    }

    /// Checks a host against the blocked and allowed domain lists.
    ///
    /// Blocked entries win. When the allow list is non-empty the host must match
    /// one of its entries. Matching is case-insensitive and covers subdomains, so
    /// `example.com` matches `api.example.com` but not `badexample.com`.
    pub fn is_host_allowed(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();

        if self
            .blocked_domains
            .iter()
            .any(|pattern| domain_matches(&host, pattern))
        {
            return false;
        }

        let allowed: Vec<&String> = self
            .allowed_domains
            .iter()
            .filter(|d| !d.trim().is_empty())
            .collect();

        allowed.is_empty() || allowed.iter().any(|pattern| domain_matches(&host, pattern))
    }

    /// Checks an absolute URL's host against the domain policy.
    ///
    /// URLs without a host are never allowed.
    pub fn is_url_allowed(&self, url: &url::Url) -> bool {
        url.host_str().map_or(false, |host| self.is_host_allowed(host))
    }

    /// Layers a partial settings object over this configuration.
    ///
    /// Only the keys present in `overrides` change; every other field keeps
    /// its current value. Keys use the camelCase names of the settings file.
    pub fn merge(&self, overrides: &Value) -> Result<Self, String> {
        let overrides = overrides
            .as_object()
            .ok_or_else(|| "settings must be a JSON object".to_string())?;

        let mut merged = serde_json::to_value(self).map_err(|e| e.to_string())?;
        if let Value::Object(fields) = &mut merged {
            for (key, value) in overrides {
                fields.insert(key.clone(), value.clone());
            }
        }

        serde_json::from_value(merged).map_err(|e| format!("failed to parse settings: {}", e))
    }

    /// A configuration with all disk persistence switched off.
    ///
    /// Handy for tests and for embedding the engine in short-lived processes.
    pub fn in_memory() -> Self {
        Self {
            save_requests_to_file: false,
            persist_history: false,
            ..Self::default()
        }
    }
}

fn domain_matches(host: &str, pattern: &str) -> bool {
    let pattern = pattern.trim().trim_start_matches("*.").to_ascii_lowercase();
    if pattern.is_empty() {
        return false;
    }
    host == pattern || host.ends_with(&format!(".{}", pattern))
}

// Default value functions for serde

fn default_max_history() -> usize {
    100
}

fn default_timeout() -> u64 {
    30000 // 30 seconds in milliseconds
}

fn default_save_requests_to_file() -> bool {
    true
}

fn default_requests_file_path() -> String {
    "saved_requests.json".to_string()
}

fn default_environments_file_path() -> String {
    "environments.json".to_string()
}

fn default_history_file_path() -> String {
    "request_history.jsonl".to_string()
}

fn default_sanitize_sensitive_headers() -> bool {
    true
}

fn default_max_body_capture_bytes() -> usize {
    1_048_576
}

fn default_follow_redirects() -> bool {
    true
}

fn default_max_redirects() -> u32 {
    10
}

fn default_validate_ssl() -> bool {
    true
}

fn default_headers() -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert(
        "User-Agent".to_string(),
        format!("api-tester/{}", env!("CARGO_PKG_VERSION")),
    );
    headers.insert(
        "Accept".to_string(),
        "application/json, text/plain, */*".to_string(),
    );
    headers
}
