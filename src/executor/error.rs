//! Transport failure classification.
//!
//! Failures after a request has been handed to the transport are not errors of
//! the engine: they become [`Outcome::Timeout`] or [`Outcome::NetworkError`]
//! on the history record.

use crate::history::Outcome;
use std::error::Error as _;

/// Broad category of a transport failure, used to prefix the reason text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    Timeout,
    Connect,
    Tls,
    Redirect,
    Body,
    Other,
}

impl TransportFailure {
    /// Categorizes a `reqwest` error.
    pub fn of(err: &reqwest::Error) -> Self {
        let text = full_message(err);
        if err.is_timeout() || text.contains("timed out") {
            TransportFailure::Timeout
        } else if text.contains("certificate") || text.contains("TLS") || text.contains("SSL") {
            TransportFailure::Tls
        } else if err.is_connect() {
            TransportFailure::Connect
        } else if err.is_redirect() {
            TransportFailure::Redirect
        } else if err.is_body() || err.is_decode() {
            TransportFailure::Body
        } else {
            TransportFailure::Other
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TransportFailure::Timeout => "timed out",
            TransportFailure::Connect => "connection failed",
            TransportFailure::Tls => "TLS/SSL error",
            TransportFailure::Redirect => "redirect error",
            TransportFailure::Body => "response body error",
            TransportFailure::Other => "request failed",
        }
    }
}

/// Maps a transport error to the outcome recorded in history.
pub fn classify(err: &reqwest::Error) -> Outcome {
    match TransportFailure::of(err) {
        TransportFailure::Timeout => Outcome::Timeout,
        failure => Outcome::NetworkError {
            reason: format_reason(failure, &full_message(err)),
        },
    }
}

fn format_reason(failure: TransportFailure, message: &str) -> String {
    format!("{}: {}", failure.label(), message)
}

/// The error message followed by every source in its chain.
fn full_message(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
