//! Data models for request history.
//!
//! This module defines the record written for every request that reached the
//! wire, and the outcome classification attached to it.

use crate::models::{RequestConfig, ResponseSnapshot, StatusClass};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Sensitive header names that are redacted before a record is persisted.
///
/// These headers contain authentication tokens, cookies, and other
/// sensitive information that should not be written to disk by default.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "api-key",
    "auth-token",
    "x-auth-token",
    "access-token",
    "x-access-token",
    "bearer",
    "proxy-authorization",
];

/// Replacement value for redacted headers.
pub const REDACTED: &str = "[REDACTED]";

/// Checks whether a header name is in [`SENSITIVE_HEADERS`].
pub fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE_HEADERS
        .iter()
        .any(|sensitive| name.eq_ignore_ascii_case(sensitive))
}

/// How an execution ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// A 2xx response.
    Success,
    /// Any non-2xx response.
    HttpError { status: u16 },
    /// The transport failed before a response was received.
    NetworkError { reason: String },
    /// The request did not complete within its timeout.
    Timeout,
}

impl Outcome {
    /// Classifies a received status code.
    pub fn from_status(status: u16) -> Self {
        if (200..300).contains(&status) {
            Outcome::Success
        } else {
            Outcome::HttpError { status }
        }
    }

    /// The fieldless kind of this outcome.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success => OutcomeKind::Success,
            Outcome::HttpError { .. } => OutcomeKind::HttpError,
            Outcome::NetworkError { .. } => OutcomeKind::NetworkError,
            Outcome::Timeout => OutcomeKind::Timeout,
        }
    }

    /// Whether this is [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::HttpError { status } => write!(f, "HTTP error {}", status),
            Outcome::NetworkError { reason } => write!(f, "network error: {}", reason),
            Outcome::Timeout => write!(f, "timeout"),
        }
    }
}

/// Outcome without its payload, used for filtering and counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    HttpError,
    NetworkError,
    Timeout,
}

/// A single entry in the request history.
///
/// Records are immutable once written. `request` is the effective
/// configuration actually sent, and `response` is absent when the transport
/// failed or timed out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Unique identifier (UUID v4).
    pub id: Uuid,

    /// When the request was sent, in UTC.
    pub timestamp: DateTime<Utc>,

    /// The fully merged request.
    pub request: RequestConfig,

    /// The captured response, if one was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseSnapshot>,

    /// Wall-clock time from just before sending to the end of the body read.
    pub duration: Duration,

    /// Outcome classification.
    pub outcome: Outcome,
}

impl HistoryRecord {
    /// Creates a record with a fresh id and the current time.
    pub fn new(
        request: RequestConfig,
        response: Option<ResponseSnapshot>,
        duration: Duration,
        outcome: Outcome,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            request,
            response,
            duration,
            outcome,
        }
    }

    /// Response status code, if a response was received.
    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status_code)
    }

    /// Response status class, if a response was received.
    pub fn status_class(&self) -> Option<StatusClass> {
        self.response.as_ref().and_then(|r| r.status_class())
    }

    /// Total response body bytes received, zero without a response.
    pub fn response_size(&self) -> usize {
        self.response.as_ref().map_or(0, |r| r.size)
    }

    /// Duration in whole milliseconds.
    pub fn duration_ms(&self) -> u128 {
        self.duration.as_millis()
    }

    /// Host part of the request URL, lower-cased.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.request.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
    }

    /// Returns a copy with sensitive header values and auth secrets removed.
    ///
    /// Headers derived from the request's auth are redacted whatever their
    /// name, so a custom API key header never reaches disk.
    pub fn sanitized(&self) -> Self {
        let mut sanitized = self.clone();

        let auth_headers: Vec<String> = sanitized
            .request
            .auth
            .take()
            .map(|auth| auth.headers().into_iter().map(|(name, _)| name).collect())
            .unwrap_or_default();
        for (name, value) in sanitized.request.headers.iter_mut() {
            let from_auth = auth_headers.iter().any(|h| h.eq_ignore_ascii_case(name));
            if from_auth || is_sensitive_header(name) {
                *value = REDACTED.to_string();
            }
        }

        if let Some(response) = sanitized.response.as_mut() {
            for (name, value) in response.headers.iter_mut() {
                if is_sensitive_header(name) {
                    *value = REDACTED.to_string();
                }
            }
        }

        sanitized
    }
}
