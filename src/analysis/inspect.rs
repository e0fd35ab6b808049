//! Single-response analysis: shape, patterns and anomalies.

use super::content_type::{detect_content_type, ContentType};
use super::extract::{extract_path, json_type_name};
use super::stats::median;
use crate::history::{HistoryRecord, Outcome};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

/// Fewest comparable records needed before a response can be called slow.
pub const MIN_SLOW_SAMPLES: usize = 3;

/// A response slower than this multiple of the recent median is flagged.
pub const SLOW_FACTOR: u32 = 2;

const PAGINATION_FIELDS: &[&str] = &[
    "page",
    "per_page",
    "page_size",
    "pageSize",
    "next",
    "next_page",
    "nextPage",
    "prev",
    "previous",
    "cursor",
    "next_cursor",
    "nextCursor",
    "total",
    "total_count",
    "totalCount",
    "total_pages",
    "totalPages",
    "offset",
    "limit",
    "has_more",
    "hasMore",
];

const PAGINATION_CONTAINERS: &[&str] = &["meta", "pagination", "links", "page_info", "pageInfo"];

const ERROR_FIELDS: &[&str] = &["error", "errors"];

const MESSAGE_FIELDS: &[&str] = &["message", "detail", "error_description", "title"];

const RATE_LIMIT_PREFIXES: &[&str] = &["x-ratelimit-", "ratelimit-", "x-rate-limit-"];

static LINK_NEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<([^>]+)>\s*;[^,]*rel="?next"?"#).expect("Failed to compile Link header regex")
});

/// Structure of a JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonShape {
    /// Type of the root value (`object`, `array`, ...).
    pub root: String,
    /// Top-level keys of an object root.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
    /// Length of an array root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_len: Option<usize>,
    /// Nesting depth; scalars have depth 0.
    pub depth: usize,
}

impl JsonShape {
    fn of(value: &Value) -> Self {
        Self {
            root: json_type_name(value).to_string(),
            keys: match value {
                Value::Object(map) => map.keys().cloned().collect(),
                _ => Vec::new(),
            },
            array_len: value.as_array().map(Vec::len),
            depth: depth(value),
        }
    }
}

fn depth(value: &Value) -> usize {
    match value {
        Value::Object(map) => 1 + map.values().map(depth).max().unwrap_or(0),
        Value::Array(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}

/// A recognized convention in the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Pattern {
    /// Pagination fields in the JSON body.
    Pagination { fields: Vec<String> },
    /// A `Link` header with `rel="next"`.
    LinkNext { url: String },
    /// An error envelope in the JSON body.
    ErrorEnvelope {
        fields: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Rate-limit headers.
    RateLimit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remaining: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reset: Option<String>,
    },
}

/// Something unusual about the execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Anomaly {
    HttpError { status: u16 },
    NetworkError { reason: String },
    Timeout,
    TruncatedBody { captured: usize, size: usize },
    EmptyBody { status: u16 },
    SlowResponse { duration_ms: u64, median_ms: u64 },
}

/// Result of a path extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Analysis of one history record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub id: Uuid,
    pub status: Option<u16>,
    pub outcome: Outcome,
    /// Detected body type, absent without a response.
    pub content_type: Option<ContentType>,
    /// The Content-Type header as sent by the server.
    pub declared_content_type: Option<String>,
    pub size: usize,
    pub duration: Duration,
    pub json_shape: Option<JsonShape>,
    pub patterns: Vec<Pattern>,
    pub anomalies: Vec<Anomaly>,
    pub extracted: Option<Extraction>,
}

/// Analyzes `record`.
///
/// `recent` supplies the baseline for slow-response detection; records with
/// the same id and records that timed out or failed in transport are ignored.
pub fn analyze_record(
    record: &HistoryRecord,
    recent: &[HistoryRecord],
    extract: Option<&str>,
) -> AnalysisReport {
    let response = record.response.as_ref();
    let json = response.and_then(|r| r.body_json());

    let mut patterns = Vec::new();
    if let Some(response) = response {
        if let Some(body) = &json {
            patterns.extend(body_patterns(body, response.status_code));
        }
        patterns.extend(header_patterns(&response.headers));
    }

    let extracted = extract.map(|path| match &json {
        Some(body) => match extract_path(body, path) {
            Ok(value) => Extraction {
                path: path.to_string(),
                value: Some(value),
                error: None,
            },
            Err(e) => Extraction {
                path: path.to_string(),
                value: None,
                error: Some(e),
            },
        },
        None => Extraction {
            path: path.to_string(),
            value: None,
            error: Some("response body is not JSON".to_string()),
        },
    });

    AnalysisReport {
        id: record.id,
        status: record.status(),
        outcome: record.outcome.clone(),
        content_type: response.map(|r| detect_content_type(&r.headers, &r.body)),
        declared_content_type: response.and_then(|r| r.content_type().map(str::to_string)),
        size: record.response_size(),
        duration: record.duration,
        json_shape: json.as_ref().map(JsonShape::of),
        patterns,
        anomalies: anomalies(record, recent),
        extracted,
    }
}

fn body_patterns(body: &Value, status: u16) -> Vec<Pattern> {
    let mut patterns = Vec::new();
    let map = match body {
        Value::Object(map) => map,
        _ => return patterns,
    };

    let mut fields = pagination_fields(map, "");
    for container in PAGINATION_CONTAINERS {
        if let Some(Value::Object(inner)) = map.get(*container) {
            fields.extend(pagination_fields(inner, &format!("{}.", container)));
        }
    }
    if !fields.is_empty() {
        patterns.push(Pattern::Pagination { fields });
    }

    let mut error_fields: Vec<String> = ERROR_FIELDS
        .iter()
        .filter(|f| map.contains_key(**f))
        .map(|f| f.to_string())
        .collect();
    let message_fields: Vec<&str> = MESSAGE_FIELDS
        .iter()
        .copied()
        .filter(|f| map.contains_key(*f))
        .collect();
    if !error_fields.is_empty() || (status >= 400 && !message_fields.is_empty()) {
        error_fields.extend(message_fields.iter().map(|f| f.to_string()));
        patterns.push(Pattern::ErrorEnvelope {
            fields: error_fields,
            message: error_message(map),
        });
    }

    patterns
}

fn pagination_fields(map: &Map<String, Value>, prefix: &str) -> Vec<String> {
    PAGINATION_FIELDS
        .iter()
        .filter(|f| map.contains_key(**f))
        .map(|f| format!("{}{}", prefix, f))
        .collect()
}

/// Best human-readable message from an error envelope.
fn error_message(map: &Map<String, Value>) -> Option<String> {
    for field in MESSAGE_FIELDS {
        if let Some(Value::String(s)) = map.get(*field) {
            return Some(s.clone());
        }
    }
    match map.get("error") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(inner)) => inner
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn header_patterns(headers: &BTreeMap<String, String>) -> Vec<Pattern> {
    let mut patterns = Vec::new();
    let get = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    };

    if let Some(link) = get("link") {
        if let Some(caps) = LINK_NEXT.captures(&link) {
            patterns.push(Pattern::LinkNext {
                url: caps[1].to_string(),
            });
        }
    }

    let rate = |suffix: &str| {
        RATE_LIMIT_PREFIXES
            .iter()
            .find_map(|prefix| get(&format!("{}{}", prefix, suffix)))
    };
    let limit = rate("limit");
    let remaining = rate("remaining");
    let reset = rate("reset").or_else(|| get("retry-after"));
    if limit.is_some() || remaining.is_some() || reset.is_some() {
        patterns.push(Pattern::RateLimit {
            limit,
            remaining,
            reset,
        });
    }

    patterns
}

fn anomalies(record: &HistoryRecord, recent: &[HistoryRecord]) -> Vec<Anomaly> {
    let mut found = Vec::new();

    match &record.outcome {
        Outcome::Success => {}
        Outcome::HttpError { status } => found.push(Anomaly::HttpError { status: *status }),
        Outcome::NetworkError { reason } => found.push(Anomaly::NetworkError {
            reason: reason.clone(),
        }),
        Outcome::Timeout => found.push(Anomaly::Timeout),
    }

    if let Some(response) = &record.response {
        if response.truncated {
            found.push(Anomaly::TruncatedBody {
                captured: response.body.len(),
                size: response.size,
            });
        }
        if response.is_success() && response.status_code != 204 && response.size == 0 {
            found.push(Anomaly::EmptyBody {
                status: response.status_code,
            });
        }
    }

    if record.response.is_some() {
        let baseline: Vec<Duration> = recent
            .iter()
            .filter(|r| r.id != record.id && r.response.is_some())
            .map(|r| r.duration)
            .collect();
        if baseline.len() >= MIN_SLOW_SAMPLES {
            if let Some(median) = median(&baseline) {
                if record.duration > median * SLOW_FACTOR {
                    found.push(Anomaly::SlowResponse {
                        duration_ms: record.duration.as_millis() as u64,
                        median_ms: median.as_millis() as u64,
                    });
                }
            }
        }
    }

    found
}
