//! HTTP authentication.
//!
//! Authentication is described by the closed [`AuthSpec`] variant and turned
//! into headers when a request is executed. Auth-derived headers are injected
//! after all explicit headers have been merged and never silently replace an
//! explicit header that says something different: that case is reported as
//! [`ApiError::ConfigConflict`].

pub mod basic;
pub mod bearer;

use crate::error::ApiError;
use crate::models::request::{find_header, set_header};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header used by the Bearer and Basic schemes.
pub const AUTHORIZATION: &str = "Authorization";

/// Authentication scheme attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthSpec {
    /// `Authorization: Bearer <token>`
    Bearer { token: String },
    /// `<header_name>: <value>`
    ApiKey { header_name: String, value: String },
    /// `Authorization: Basic base64(username:password)`
    Basic { username: String, password: String },
    /// Raw headers injected as-is.
    Custom { headers: BTreeMap<String, String> },
}

impl AuthSpec {
    /// Short scheme label, safe to log.
    pub fn scheme(&self) -> &'static str {
        match self {
            AuthSpec::Bearer { .. } => "bearer",
            AuthSpec::ApiKey { .. } => "api_key",
            AuthSpec::Basic { .. } => "basic",
            AuthSpec::Custom { .. } => "custom",
        }
    }

    /// Returns the headers this spec injects, in injection order.
    pub fn headers(&self) -> Vec<(String, String)> {
        match self {
            AuthSpec::Bearer { token } => {
                vec![(AUTHORIZATION.to_string(), bearer::header_value(token))]
            }
            AuthSpec::ApiKey { header_name, value } => {
                vec![(header_name.clone(), value.clone())]
            }
            AuthSpec::Basic { username, password } => vec![(
                AUTHORIZATION.to_string(),
                basic::header_value(username, password),
            )],
            AuthSpec::Custom { headers } => headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Recognizes a Bearer or Basic `Authorization` header value.
    pub fn from_authorization_header(value: &str) -> Option<AuthSpec> {
        if let Some(token) = bearer::decode(value) {
            return Some(AuthSpec::Bearer { token });
        }
        basic::decode(value).map(|(username, password)| AuthSpec::Basic { username, password })
    }

    /// Validates the spec at the boundary.
    pub fn validate(&self) -> Result<(), ApiError> {
        match self {
            AuthSpec::Bearer { token } if token.trim().is_empty() => Err(
                ApiError::InvalidConfig("bearer token must not be empty".to_string()),
            ),
            AuthSpec::ApiKey { header_name, .. } if header_name.trim().is_empty() => Err(
                ApiError::InvalidConfig("api key header name must not be empty".to_string()),
            ),
            AuthSpec::Custom { headers } if headers.is_empty() => Err(ApiError::InvalidConfig(
                "custom auth must define at least one header".to_string(),
            )),
            _ => {
                for (name, _) in self.headers() {
                    reqwest::header::HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                        ApiError::InvalidConfig(format!("invalid auth header name '{}'", name))
                    })?;
                }
                Ok(())
            }
        }
    }
}

/// Injects auth-derived headers into an already merged header map.
///
/// An explicit header with the same name (compared case-insensitively) is
/// accepted only when it expresses the same thing. For `Authorization` the
/// comparison is on the decoded scheme and credentials, so `bearer abc` and
/// `Bearer abc` agree; other headers must match exactly.
///
/// # Errors
///
/// Returns [`ApiError::ConfigConflict`] naming the first conflicting header.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use api_tester::auth::{inject_auth_headers, AuthSpec};
///
/// let mut headers = BTreeMap::new();
/// let auth = AuthSpec::Bearer { token: "abc".to_string() };
/// inject_auth_headers(&mut headers, &auth).unwrap();
/// assert_eq!(headers.get("Authorization"), Some(&"Bearer abc".to_string()));
/// ```
pub fn inject_auth_headers(
    headers: &mut BTreeMap<String, String>,
    auth: &AuthSpec,
) -> Result<(), ApiError> {
    let derived = auth.headers();

    for (name, value) in &derived {
        if let Some((existing_name, existing_value)) = find_header(headers, name) {
            if !same_intent(name, existing_value, value) {
                return Err(ApiError::ConfigConflict {
                    header: existing_name.clone(),
                    explicit: existing_value.clone(),
                    derived: value.clone(),
                });
            }
        }
    }

    for (name, value) in derived {
        set_header(headers, name, value);
    }

    Ok(())
}

fn same_intent(name: &str, explicit: &str, derived: &str) -> bool {
    if explicit.trim() == derived.trim() {
        return true;
    }

    if name.eq_ignore_ascii_case(AUTHORIZATION) {
        if let (Some(a), Some(b)) = (
            AuthSpec::from_authorization_header(explicit),
            AuthSpec::from_authorization_header(derived),
        ) {
            return a == b;
        }
    }

    false
}
