//! HTTP Basic authentication (RFC 7617).

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Encodes credentials into an `Authorization` header value.
///
/// # Examples
///
/// ```
/// use api_tester::auth::basic::header_value;
///
/// assert_eq!(header_value("user", "pass123"), "Basic dXNlcjpwYXNzMTIz");
/// ```
pub fn header_value(username: &str, password: &str) -> String {
    let encoded = STANDARD.encode(format!("{}:{}", username, password).as_bytes());
    format!("Basic {}", encoded)
}

/// Decodes a Basic `Authorization` header value into `(username, password)`.
///
/// The scheme name is matched case-insensitively. Returns `None` for any other
/// scheme, invalid base64, non-UTF-8 credentials or a missing colon.
pub fn decode(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = String::from_utf8(STANDARD.decode(encoded.trim()).ok()?).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some((username.to_string(), password.to_string()))
}
