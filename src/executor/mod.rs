//! HTTP request executor.
//!
//! The executor merges the active environment, the request configuration and
//! per-call overrides into an effective request, sends it with `reqwest`,
//! captures the response, and appends one [`HistoryRecord`] to the history
//! log for every request that reaches the wire.
//!
//! Validation problems (bad URL, blocked host, auth conflict, malformed
//! headers) are returned as errors and write no record. Transport problems are
//! not errors: they are recorded as `NetworkError` or `Timeout` outcomes.
//! There are no automatic retries.

pub mod error;
pub mod merge;

pub use error::{classify, TransportFailure};
pub use merge::{prepare_request, resolve_url, PreparedRequest};

use crate::config::ApiTesterConfig;
use crate::environment::EnvironmentRegistry;
use crate::error::{ApiError, Result};
use crate::history::{HistoryLog, HistoryRecord, Outcome};
use crate::models::{RequestConfig, RequestOverrides, ResponseSnapshot};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Executes requests and records them.
///
/// Cheap to clone; clones share the HTTP connection pool, the environment
/// registry and the history log.
#[derive(Debug, Clone)]
pub struct Executor {
    client: reqwest::Client,
    settings: Arc<ApiTesterConfig>,
    environments: EnvironmentRegistry,
    history: HistoryLog,
}

impl Executor {
    /// Creates an executor with a client configured from `settings`.
    pub fn new(
        settings: Arc<ApiTesterConfig>,
        environments: EnvironmentRegistry,
        history: HistoryLog,
    ) -> Result<Self> {
        let client = build_client(&settings)?;
        Ok(Self {
            client,
            settings,
            environments,
            history,
        })
    }

    /// The settings this executor was built with.
    pub fn settings(&self) -> &ApiTesterConfig {
        &self.settings
    }

    /// Executes `config` with `overrides` applied and returns the stored record.
    ///
    /// # Errors
    ///
    /// * `InvalidUrl` / `UnsupportedProtocol` - the URL cannot be resolved
    /// * `BlockedUrl` - the host is rejected by the domain policy
    /// * `ConfigConflict` - an explicit header contradicts the auth spec
    /// * `InvalidConfig` - malformed headers, auth or timeout
    /// * `Storage` - the history file could not be written
    pub async fn execute(
        &self,
        config: &RequestConfig,
        overrides: &RequestOverrides,
    ) -> Result<HistoryRecord> {
        let environment = self.environments.resolve_defaults();
        let prepared = prepare_request(config, overrides, &environment, &self.settings)?;

        info!(
            "Executing {} {}",
            prepared.effective.method, prepared.wire_url
        );

        let (response, outcome, duration) = self.send(&prepared).await;
        match &outcome {
            Outcome::Success | Outcome::HttpError { .. } => debug!(
                "{} {} finished in {:?}: {}",
                prepared.effective.method, prepared.wire_url, duration, outcome
            ),
            Outcome::NetworkError { .. } | Outcome::Timeout => warn!(
                "{} {} failed after {:?}: {}",
                prepared.effective.method, prepared.wire_url, duration, outcome
            ),
        }

        let record = HistoryRecord::new(prepared.effective, response, duration, outcome);
        self.history.append(record.clone())?;

        Ok(record)
    }

    /// Sends a prepared request and captures the result.
    ///
    /// Timing covers the span from just before sending until the body has
    /// been read completely.
    async fn send(
        &self,
        prepared: &PreparedRequest,
    ) -> (Option<ResponseSnapshot>, Outcome, Duration) {
        let request = &prepared.effective;
        let mut builder = self
            .client
            .request(request.method.to_reqwest(), prepared.wire_url.clone())
            .timeout(prepared.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            builder = builder.body(body.to_bytes());
        }

        let start_time = Instant::now();

        let mut response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return (None, classify(&e), start_time.elapsed()),
        };

        let status = response.status();
        let headers = collect_headers(response.headers());

        let limit = self.settings.max_body_capture_bytes;
        let mut body = Vec::new();
        let mut size = 0usize;
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    size += chunk.len();
                    let room = limit.saturating_sub(body.len());
                    body.extend_from_slice(&chunk[..chunk.len().min(room)]);
                }
                Ok(None) => break,
                Err(e) => return (None, classify(&e), start_time.elapsed()),
            }
        }

        let duration = start_time.elapsed();

        let snapshot = ResponseSnapshot {
            status_code: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            headers,
            truncated: size > body.len(),
            body,
            size,
        };

        if snapshot.truncated {
            debug!(
                "Response body truncated to {} of {} bytes",
                snapshot.body.len(),
                snapshot.size
            );
        }

        (
            Some(snapshot),
            Outcome::from_status(status.as_u16()),
            duration,
        )
    }
}

/// Builds the shared HTTP client.
fn build_client(settings: &ApiTesterConfig) -> Result<reqwest::Client> {
    let redirect = if settings.follow_redirects {
        reqwest::redirect::Policy::limited(settings.max_redirects as usize)
    } else {
        reqwest::redirect::Policy::none()
    };

    if !settings.validate_ssl {
        warn!("TLS certificate validation is disabled");
    }

    reqwest::Client::builder()
        .redirect(redirect)
        .danger_accept_invalid_certs(!settings.validate_ssl)
        .build()
        .map_err(|e| ApiError::Client(e.to_string()))
}

/// Lower-cases header names and joins repeated headers with `, `.
fn collect_headers(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    let mut collected: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        collected
            .entry(name.as_str().to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    collected
}
