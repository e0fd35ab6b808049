//! Side-by-side comparison of two history records.

use crate::history::HistoryRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Maximum number of JSON changes reported before the list is cut.
pub const MAX_JSON_CHANGES: usize = 200;

/// What happened to a JSON path between the two bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Present only in B.
    Added,
    /// Present only in A.
    Removed,
    /// Present in both with a different value.
    Changed,
}

/// One difference between two JSON documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonChange {
    /// Location, e.g. `$.data.items[2].id`.
    pub path: String,
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<Value>,
}

/// Body difference, structural when both bodies are JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodyDiff {
    Json {
        changes: Vec<JsonChange>,
        /// More than [`MAX_JSON_CHANGES`] differences were found.
        #[serde(default)]
        truncated: bool,
    },
    Bytes {
        len_a: usize,
        len_b: usize,
        delta: i64,
        identical: bool,
    },
}

impl BodyDiff {
    /// Whether the bodies are equal.
    pub fn is_empty(&self) -> bool {
        match self {
            BodyDiff::Json { changes, .. } => changes.is_empty(),
            BodyDiff::Bytes { identical, .. } => *identical,
        }
    }
}

/// Result of comparing record A with record B.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub status_match: bool,
    pub status_a: Option<u16>,
    pub status_b: Option<u16>,
    pub outcome_match: bool,
    /// Headers whose values differ, with `None` for the side lacking them.
    pub header_diff: BTreeMap<String, (Option<String>, Option<String>)>,
    pub body_diff: BodyDiff,
    /// B's duration minus A's, in milliseconds.
    pub timing_delta_ms: i64,
}

/// Compares two records.
pub fn compare_records(a: &HistoryRecord, b: &HistoryRecord) -> ComparisonReport {
    let status_a = a.status();
    let status_b = b.status();

    let empty = BTreeMap::new();
    let headers_a = a.response.as_ref().map_or(&empty, |r| &r.headers);
    let headers_b = b.response.as_ref().map_or(&empty, |r| &r.headers);

    let body_a: &[u8] = a
        .response
        .as_ref()
        .map(|r| r.body.as_slice())
        .unwrap_or_default();
    let body_b: &[u8] = b
        .response
        .as_ref()
        .map(|r| r.body.as_slice())
        .unwrap_or_default();

    let json_a = a.response.as_ref().and_then(|r| r.body_json());
    let json_b = b.response.as_ref().and_then(|r| r.body_json());

    let body_diff = match (json_a, json_b) {
        (Some(ja), Some(jb)) => {
            let mut changes = Vec::new();
            diff_json("$", &ja, &jb, &mut changes);
            let truncated = changes.len() > MAX_JSON_CHANGES;
            changes.truncate(MAX_JSON_CHANGES);
            BodyDiff::Json { changes, truncated }
        }
        _ => BodyDiff::Bytes {
            len_a: body_a.len(),
            len_b: body_b.len(),
            delta: body_b.len() as i64 - body_a.len() as i64,
            identical: body_a == body_b && a.response_size() == b.response_size(),
        },
    };

    ComparisonReport {
        status_match: status_a == status_b,
        status_a,
        status_b,
        outcome_match: a.outcome == b.outcome,
        header_diff: diff_headers(headers_a, headers_b),
        body_diff,
        timing_delta_ms: b.duration.as_millis() as i64 - a.duration.as_millis() as i64,
    }
}

/// Headers present on one side only or with different values.
pub fn diff_headers(
    a: &BTreeMap<String, String>,
    b: &BTreeMap<String, String>,
) -> BTreeMap<String, (Option<String>, Option<String>)> {
    let lower = |m: &BTreeMap<String, String>| -> BTreeMap<String, String> {
        m.iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect()
    };
    let a = lower(a);
    let b = lower(b);

    let names: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    names
        .into_iter()
        .filter_map(|name| {
            let va = a.get(name);
            let vb = b.get(name);
            if va == vb {
                None
            } else {
                Some((name.clone(), (va.cloned(), vb.cloned())))
            }
        })
        .collect()
}

/// Collects structural differences between two JSON values.
///
/// Objects are compared key by key and arrays index by index; any other
/// mismatch, including a change of type, is reported as `Changed` at the
/// current path.
pub fn diff_json(path: &str, a: &Value, b: &Value, changes: &mut Vec<JsonChange>) {
    if changes.len() > MAX_JSON_CHANGES {
        return;
    }

    match (a, b) {
        (Value::Object(ma), Value::Object(mb)) => {
            let keys: BTreeSet<&String> = ma.keys().chain(mb.keys()).collect();
            for key in keys {
                let child = format!("{}.{}", path, key);
                match (ma.get(key), mb.get(key)) {
                    (Some(va), Some(vb)) => diff_json(&child, va, vb, changes),
                    (Some(va), None) => changes.push(JsonChange {
                        path: child,
                        kind: ChangeKind::Removed,
                        a: Some(va.clone()),
                        b: None,
                    }),
                    (None, Some(vb)) => changes.push(JsonChange {
                        path: child,
                        kind: ChangeKind::Added,
                        a: None,
                        b: Some(vb.clone()),
                    }),
                    (None, None) => {}
                }
            }
        }
        (Value::Array(va), Value::Array(vb)) => {
            for index in 0..va.len().max(vb.len()) {
                let child = format!("{}[{}]", path, index);
                match (va.get(index), vb.get(index)) {
                    (Some(x), Some(y)) => diff_json(&child, x, y, changes),
                    (Some(x), None) => changes.push(JsonChange {
                        path: child,
                        kind: ChangeKind::Removed,
                        a: Some(x.clone()),
                        b: None,
                    }),
                    (None, Some(y)) => changes.push(JsonChange {
                        path: child,
                        kind: ChangeKind::Added,
                        a: None,
                        b: Some(y.clone()),
                    }),
                    (None, None) => {}
                }
            }
        }
        _ if a != b => changes.push(JsonChange {
            path: path.to_string(),
            kind: ChangeKind::Changed,
            a: Some(a.clone()),
            b: Some(b.clone()),
        }),
        _ => {}
    }
}
