//! Request configuration data models.
//!
//! This module defines the data structures describing an HTTP request before it
//! is executed: the method, URL, headers, query parameters, body, authentication
//! and timeout, plus the partial overrides a caller can apply per execution.

use crate::auth::AuthSpec;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

/// HTTP request method.
///
/// Represents all standard HTTP methods as defined in RFC 7231 and RFC 5789.
/// Serialized upper-case; deserialized case-insensitively through [`FromStr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum HttpMethod {
    /// HTTP GET method - retrieve a resource
    GET,
    /// HTTP POST method - submit data to create a resource
    POST,
    /// HTTP PUT method - replace a resource
    PUT,
    /// HTTP DELETE method - remove a resource
    DELETE,
    /// HTTP PATCH method - partially modify a resource
    PATCH,
    /// HTTP OPTIONS method - describe communication options
    OPTIONS,
    /// HTTP HEAD method - retrieve headers only
    HEAD,
    /// HTTP TRACE method - perform a message loop-back test
    TRACE,
    /// HTTP CONNECT method - establish a tunnel to the server
    CONNECT,
}

impl HttpMethod {
    /// Returns the string representation of the HTTP method.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::OPTIONS => "OPTIONS",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::TRACE => "TRACE",
            HttpMethod::CONNECT => "CONNECT",
        }
    }

    /// Converts to the `reqwest` method type.
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::GET => reqwest::Method::GET,
            HttpMethod::POST => reqwest::Method::POST,
            HttpMethod::PUT => reqwest::Method::PUT,
            HttpMethod::DELETE => reqwest::Method::DELETE,
            HttpMethod::PATCH => reqwest::Method::PATCH,
            HttpMethod::HEAD => reqwest::Method::HEAD,
            HttpMethod::OPTIONS => reqwest::Method::OPTIONS,
            HttpMethod::TRACE => reqwest::Method::TRACE,
            HttpMethod::CONNECT => reqwest::Method::CONNECT,
        }
    }
}

impl Default for HttpMethod {
    fn default() -> Self {
        HttpMethod::GET
    }
}

impl FromStr for HttpMethod {
    type Err = ApiError;

    /// Parses a method name case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::GET),
            "POST" => Ok(HttpMethod::POST),
            "PUT" => Ok(HttpMethod::PUT),
            "DELETE" => Ok(HttpMethod::DELETE),
            "PATCH" => Ok(HttpMethod::PATCH),
            "OPTIONS" => Ok(HttpMethod::OPTIONS),
            "HEAD" => Ok(HttpMethod::HEAD),
            "TRACE" => Ok(HttpMethod::TRACE),
            "CONNECT" => Ok(HttpMethod::CONNECT),
            other => Err(ApiError::InvalidConfig(format!(
                "unknown HTTP method '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = ApiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request body: raw text or structured JSON.
///
/// Serialized as `{"kind": "text" | "json", "value": ...}` so that a JSON
/// string body stays JSON after a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RequestBody {
    /// Raw text sent as-is.
    Text(String),
    /// Structured JSON, serialized compactly on the wire.
    Json(serde_json::Value),
}

impl RequestBody {
    /// Returns the bytes sent on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            RequestBody::Text(text) => text.as_bytes().to_vec(),
            RequestBody::Json(value) => value.to_string().into_bytes(),
        }
    }

    /// Whether the body is JSON, either structured or as parseable text.
    pub fn is_json(&self) -> bool {
        match self {
            RequestBody::Json(_) => true,
            RequestBody::Text(text) => serde_json::from_str::<serde_json::Value>(text).is_ok(),
        }
    }

    /// Size of the body on the wire in bytes.
    pub fn len(&self) -> usize {
        match self {
            RequestBody::Text(text) => text.len(),
            RequestBody::Json(value) => value.to_string().len(),
        }
    }

    /// Whether the body is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A request configuration, either ad hoc or saved under a name.
///
/// After execution the same type describes the *effective* request: the URL
/// is absolute, headers include every default and auth-derived value, and the
/// timeout is set. That form can be replayed without any environment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Name under which the request is saved, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// HTTP method. Defaults to GET.
    #[serde(default)]
    pub method: HttpMethod,

    /// Absolute URL, or a path relative to the active environment's base URL.
    #[serde(default)]
    pub url: String,

    /// Request headers. Names are matched case-insensitively when merging.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Query parameters appended to the URL in key order.
    #[serde(default)]
    pub query_params: BTreeMap<String, String>,

    /// Optional request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,

    /// Optional authentication, injected as headers at execution time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthSpec>,

    /// Optional timeout; falls back to the environment, then the engine default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Free-form description of what the request does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RequestConfig {
    /// Creates a new request configuration with the given method and URL.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets a header, replacing any existing header with the same name
    /// (compared case-insensitively).
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name.into(), value.into());
        self
    }

    /// Adds a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(name.into(), value.into());
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the authentication spec.
    pub fn with_auth(mut self, auth: AuthSpec) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Checks if the request has a non-empty body.
    pub fn has_body(&self) -> bool {
        self.body.as_ref().map_or(false, |b| !b.is_empty())
    }

    /// Gets the Content-Type header value if present.
    pub fn content_type(&self) -> Option<&str> {
        find_header(&self.headers, "content-type").map(|(_, v)| v.as_str())
    }

    /// Validates boundary data: header names and values must be legal HTTP
    /// tokens, and a zero timeout is rejected.
    pub fn validate(&self) -> Result<(), ApiError> {
        for (name, value) in &self.headers {
            validate_header(name, value)?;
        }

        if self.timeout == Some(Duration::ZERO) {
            return Err(ApiError::InvalidConfig(
                "timeout must be greater than 0".to_string(),
            ));
        }

        if let Some(auth) = &self.auth {
            auth.validate()?;
        }

        Ok(())
    }
}

/// Per-call partial overrides applied on top of a request configuration.
///
/// Scalar fields replace the base value when set. Header and query parameter
/// maps are merged key by key over the base.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequestOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub query_params: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RequestOverrides {
    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        *self == RequestOverrides::default()
    }

    /// Returns `base` with these overrides applied.
    pub fn apply_to(&self, base: &RequestConfig) -> RequestConfig {
        let mut merged = base.clone();

        if let Some(method) = self.method {
            merged.method = method;
        }
        if let Some(url) = &self.url {
            merged.url = url.clone();
        }
        for (name, value) in &self.headers {
            set_header(&mut merged.headers, name.clone(), value.clone());
        }
        for (name, value) in &self.query_params {
            merged.query_params.insert(name.clone(), value.clone());
        }
        if let Some(body) = &self.body {
            merged.body = Some(body.clone());
        }
        if let Some(auth) = &self.auth {
            merged.auth = Some(auth.clone());
        }
        if let Some(timeout) = self.timeout {
            merged.timeout = Some(timeout);
        }
        if let Some(description) = &self.description {
            merged.description = Some(description.clone());
        }

        merged
    }
}

/// Finds a header by name, ignoring ASCII case.
pub fn find_header<'a>(
    headers: &'a BTreeMap<String, String>,
    name: &str,
) -> Option<(&'a String, &'a String)> {
    headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name))
}

/// Inserts a header, removing any existing header whose name differs only
/// in case.
pub fn set_header(headers: &mut BTreeMap<String, String>, name: String, value: String) {
    headers.retain(|k, _| !k.eq_ignore_ascii_case(&name));
    headers.insert(name, value);
}

fn validate_header(name: &str, value: &str) -> Result<(), ApiError> {
    reqwest::header::HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ApiError::InvalidConfig(format!("invalid header name '{}'", name)))?;
    reqwest::header::HeaderValue::from_str(value).map_err(|_| {
        ApiError::InvalidConfig(format!("invalid value for header '{}'", name))
    })?;
    Ok(())
}
