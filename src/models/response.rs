//! HTTP response data models.
//!
//! This module defines the captured form of an HTTP response as stored in
//! history: status information, headers and a size-capped copy of the body.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Coarse classification of an HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusClass {
    /// 1xx
    #[serde(rename = "1xx")]
    Informational,
    /// 2xx
    #[serde(rename = "2xx")]
    Success,
    /// 3xx
    #[serde(rename = "3xx")]
    Redirection,
    /// 4xx
    #[serde(rename = "4xx")]
    ClientError,
    /// 5xx
    #[serde(rename = "5xx")]
    ServerError,
}

impl StatusClass {
    /// Classifies a status code. Codes outside 100..=599 have no class.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            100..=199 => Some(StatusClass::Informational),
            200..=299 => Some(StatusClass::Success),
            300..=399 => Some(StatusClass::Redirection),
            400..=499 => Some(StatusClass::ClientError),
            500..=599 => Some(StatusClass::ServerError),
            _ => None,
        }
    }

    /// Returns the `Nxx` label.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusClass::Informational => "1xx",
            StatusClass::Success => "2xx",
            StatusClass::Redirection => "3xx",
            StatusClass::ClientError => "4xx",
            StatusClass::ServerError => "5xx",
        }
    }
}

impl std::fmt::Display for StatusClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A captured HTTP response.
///
/// The body is capped at the configured capture limit; `size` always reports
/// the full number of body bytes received and `truncated` says whether the
/// stored body is shorter than that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    /// HTTP status code (e.g., 200, 404, 500).
    pub status_code: u16,

    /// Canonical reason phrase (e.g., "OK", "Not Found").
    pub status_text: String,

    /// Response headers with lower-case names.
    pub headers: BTreeMap<String, String>,

    /// Captured body bytes, at most the capture limit.
    pub body: Vec<u8>,

    /// Total body bytes received from the server.
    pub size: usize,

    /// Whether `body` was cut at the capture limit.
    pub truncated: bool,
}

impl ResponseSnapshot {
    /// Creates a snapshot with no headers and an empty body.
    pub fn new(status_code: u16, status_text: impl Into<String>) -> Self {
        Self {
            status_code,
            status_text: status_text.into(),
            headers: BTreeMap::new(),
            body: Vec::new(),
            size: 0,
            truncated: false,
        }
    }

    /// Stores a body, applying the capture limit.
    pub fn with_body(mut self, body: Vec<u8>, capture_limit: usize) -> Self {
        self.size = body.len();
        self.truncated = body.len() > capture_limit;
        let mut body = body;
        body.truncate(capture_limit);
        self.body = body;
        self
    }

    /// Adds a header; the name is stored lower-cased.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// The status class of this response.
    pub fn status_class(&self) -> Option<StatusClass> {
        StatusClass::from_status(self.status_code)
    }

    /// Checks if the response status indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Gets a header value, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets the Content-Type header value if present.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Returns the captured body as text when it is valid UTF-8.
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Parses the captured body as JSON.
    ///
    /// Truncated bodies are never parsed, since a prefix of a JSON document
    /// is not a faithful representation of it.
    pub fn body_json(&self) -> Option<serde_json::Value> {
        if self.truncated || self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }
}
