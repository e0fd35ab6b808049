//! Building the effective request.
//!
//! Precedence, lowest to highest: engine defaults, active environment, request
//! configuration, per-call overrides. Auth-derived headers are checked against
//! the caller-set layers only; engine default headers then fill in whatever is
//! still missing.
//! Every check in here runs before anything is sent, so a failure writes no
//! history record.

use crate::auth::inject_auth_headers;
use crate::config::ApiTesterConfig;
use crate::environment::Environment;
use crate::error::{ApiError, Result};
use crate::models::{find_header, set_header, RequestConfig, RequestOverrides};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// A request ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    /// The effective configuration stored on the history record.
    pub effective: RequestConfig,

    /// The URL put on the wire, query parameters included.
    pub wire_url: Url,

    /// The resolved timeout.
    pub timeout: Duration,
}

/// Merges all layers into a [`PreparedRequest`].
pub fn prepare_request(
    config: &RequestConfig,
    overrides: &RequestOverrides,
    environment: &Environment,
    settings: &ApiTesterConfig,
) -> Result<PreparedRequest> {
    let merged = overrides.apply_to(config);
    merged.validate()?;

    let base_url = resolve_url(&merged.url, environment.base_url.as_ref())?;
    if !settings.is_url_allowed(&base_url) {
        return Err(ApiError::BlockedUrl(base_url.to_string()));
    }
    let wire_url = append_query(&base_url, &merged.query_params);

    let mut headers = merge_headers(&[&environment.default_headers, &merged.headers]);

    if let Some(auth) = &merged.auth {
        inject_auth_headers(&mut headers, auth)?;
    }

    for (name, value) in &settings.default_headers {
        if find_header(&headers, name).is_none() {
            headers.insert(name.clone(), value.clone());
        }
    }

    if let Some(body) = &merged.body {
        if body.is_json() && find_header(&headers, "content-type").is_none() {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }
    }

    let timeout = merged
        .timeout
        .or(environment.default_timeout)
        .unwrap_or_else(|| settings.default_timeout_duration());

    let effective = RequestConfig {
        url: base_url.to_string(),
        headers,
        timeout: Some(timeout),
        ..merged
    };

    Ok(PreparedRequest {
        effective,
        wire_url,
        timeout,
    })
}

/// Resolves a request URL against an optional base URL.
///
/// A URL containing `://` is absolute and must use http or https. Anything
/// else is a path joined to the base with exactly one `/` between them; the
/// base path is kept, never replaced.
///
/// # Examples
///
/// ```
/// use api_tester::executor::merge::resolve_url;
/// use url::Url;
///
/// let base = Url::parse("http://localhost:3000/api").unwrap();
/// let url = resolve_url("/posts/1", Some(&base)).unwrap();
/// assert_eq!(url.as_str(), "http://localhost:3000/api/posts/1");
/// ```
pub fn resolve_url(url: &str, base_url: Option<&Url>) -> Result<Url> {
    let url = url.trim();

    if url.contains("://") {
        let parsed = Url::parse(url)?;
        return check_scheme(parsed);
    }

    let base = base_url.ok_or_else(|| {
        ApiError::InvalidUrl(format!(
            "relative URL '{}' needs an active environment with a base URL",
            url
        ))
    })?;

    if url.is_empty() {
        return check_scheme(base.clone());
    }

    let (url, fragment) = match url.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (url, None),
    };
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    };

    let mut joined = base.clone();
    joined.set_path(&format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    ));
    let query = match (base.query(), query) {
        (Some(base_query), Some(query)) => Some(format!("{}&{}", base_query, query)),
        (base_query, query) => base_query.or(query).map(str::to_string),
    };
    joined.set_query(query.as_deref());
    joined.set_fragment(fragment);
    check_scheme(joined)
}

fn check_scheme(url: Url) -> Result<Url> {
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ApiError::UnsupportedProtocol(other.to_string())),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ApiError::InvalidUrl(format!("URL '{}' has no host", url)));
    }
    Ok(url)
}

/// Appends query parameters in key order.
pub fn append_query(url: &Url, params: &BTreeMap<String, String>) -> Url {
    let mut url = url.clone();
    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    url
}

/// Merges header layers, later layers replacing earlier ones by
/// case-insensitive name.
pub fn merge_headers(layers: &[&BTreeMap<String, String>]) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();
    for layer in layers {
        for (name, value) in layer.iter() {
            set_header(&mut merged, name.clone(), value.clone());
        }
    }
    merged
}
