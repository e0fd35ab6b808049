//! Body type detection for captured responses.
//!
//! The declared `Content-Type` wins when it maps to a known family. Otherwise
//! the captured bytes are sniffed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Broad family of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Json,
    Xml,
    Html,
    PlainText,
    Image,
    /// Anything else that is not valid UTF-8.
    Binary,
}

/// Leading bytes of common image formats.
const IMAGE_MAGIC: &[&[u8]] = &[
    b"\x89PNG",
    b"\xFF\xD8\xFF",
    b"GIF87a",
    b"GIF89a",
    b"BM",
];

/// MIME subtypes or suffixes treated as opaque binary.
const BINARY_MARKERS: &[&str] = &["octet-stream", "pdf", "zip", "gzip", "x-tar", "protobuf", "wasm"];

impl ContentType {
    /// Maps a MIME type (parameters allowed) to a family.
    ///
    /// Structured suffixes count, so `application/problem+json` is JSON and
    /// `application/atom+xml` is XML.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let (kind, subtype) = essence.split_once('/')?;

        let family = match (kind, subtype) {
            (_, s) if s == "json" || s.ends_with("+json") => Self::Json,
            (_, "html") | (_, "xhtml+xml") => Self::Html,
            (_, s) if s == "xml" || s.ends_with("+xml") => Self::Xml,
            ("image", _) => Self::Image,
            ("text", _) => Self::PlainText,
            (_, s) if BINARY_MARKERS.iter().any(|m| s.contains(m)) => Self::Binary,
            ("audio", _) | ("video", _) | ("font", _) => Self::Binary,
            _ => return None,
        };
        Some(family)
    }

    /// Guesses the family from the body bytes.
    pub fn sniff(body: &[u8]) -> Self {
        let text = match std::str::from_utf8(body) {
            Ok(text) => text.trim_start(),
            Err(_) if is_image(body) => return Self::Image,
            Err(_) => return Self::Binary,
        };

        match text.as_bytes().first() {
            Some(b'{') | Some(b'[') if serde_json::from_str::<serde_json::Value>(text).is_ok() => {
                Self::Json
            }
            Some(b'<') => {
                let head: String = text.chars().take(16).collect::<String>().to_ascii_lowercase();
                if head.starts_with("<!doctype html") || head.starts_with("<html") {
                    Self::Html
                } else {
                    Self::Xml
                }
            }
            _ => Self::PlainText,
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Xml => "XML",
            Self::Html => "HTML",
            Self::PlainText => "text",
            Self::Image => "image",
            Self::Binary => "binary",
        }
    }

    /// Whether the body can be shown as text.
    pub fn is_textual(&self) -> bool {
        !matches!(self, Self::Image | Self::Binary)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Detects the family of a captured response body.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use api_tester::analysis::content_type::{detect_content_type, ContentType};
///
/// let mut headers = BTreeMap::new();
/// headers.insert("content-type".to_string(), "application/json; charset=utf-8".to_string());
///
/// assert_eq!(detect_content_type(&headers, br#"{"key": "value"}"#), ContentType::Json);
/// assert_eq!(detect_content_type(&BTreeMap::new(), b"hello"), ContentType::PlainText);
/// ```
pub fn detect_content_type(headers: &BTreeMap<String, String>, body: &[u8]) -> ContentType {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        .and_then(|(_, value)| ContentType::from_mime(value))
        .unwrap_or_else(|| ContentType::sniff(body))
}

fn is_image(body: &[u8]) -> bool {
    IMAGE_MAGIC.iter().any(|magic| body.starts_with(magic))
        || (body.len() >= 12 && body.starts_with(b"RIFF") && &body[8..12] == b"WEBP")
}
