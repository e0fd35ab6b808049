//! Value extraction from JSON bodies with dotted paths.
//!
//! Paths use dot notation for object keys and brackets for array indices,
//! e.g. `data.users[0].name`, `items[2][1]` or `[0].id`. A leading `$` or `$.`
//! is accepted and ignored.

use serde_json::Value;
use std::fmt;

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, ".{}", key),
            PathSegment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// Parses a path into segments.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, String> {
    let path = path.trim();
    let path = path
        .strip_prefix("$.")
        .or_else(|| path.strip_prefix('$'))
        .unwrap_or(path);

    if path.is_empty() {
        return Err("path is empty".to_string());
    }

    let mut segments = Vec::new();
    for part in path.split('.') {
        let (key, mut rest) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };

        if key.is_empty() && rest.is_empty() {
            return Err(format!("empty segment in path '{}'", path));
        }
        if !key.is_empty() {
            segments.push(PathSegment::Key(key.to_string()));
        }

        while !rest.is_empty() {
            let close = rest
                .find(']')
                .ok_or_else(|| format!("unclosed '[' in path '{}'", path))?;
            let index_text = rest[1..close].trim();
            let index = index_text
                .parse::<usize>()
                .map_err(|_| format!("invalid array index '{}'", index_text))?;
            segments.push(PathSegment::Index(index));

            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return Err(format!("unexpected '{}' after index in path '{}'", rest, path));
            }
        }
    }

    Ok(segments)
}

/// Follows `path` through `value`.
///
/// # Examples
///
/// ```
/// use api_tester::analysis::extract::extract_path;
/// use serde_json::json;
///
/// let body = json!({"data": {"users": [{"name": "Ada"}]}});
/// assert_eq!(extract_path(&body, "data.users[0].name").unwrap(), json!("Ada"));
/// assert!(extract_path(&body, "data.users[3]").is_err());
/// ```
pub fn extract_path(value: &Value, path: &str) -> Result<Value, String> {
    let segments = parse_path(path)?;
    let mut current = value;
    let mut walked = String::from("$");

    for segment in &segments {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map
                .get(key)
                .ok_or_else(|| format!("key '{}' not found at {}", key, walked))?,
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index).ok_or_else(|| {
                format!(
                    "index {} out of bounds at {} (length {})",
                    index,
                    walked,
                    items.len()
                )
            })?,
            (PathSegment::Key(key), other) => {
                return Err(format!(
                    "cannot read key '{}' from {} at {}",
                    key,
                    json_type_name(other),
                    walked
                ))
            }
            (PathSegment::Index(index), other) => {
                return Err(format!(
                    "cannot index [{}] into {} at {}",
                    index,
                    json_type_name(other),
                    walked
                ))
            }
        };
        walked.push_str(&segment.to_string());
    }

    Ok(current.clone())
}

/// Lower-case JSON type name of a value.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
