//! Bearer token authentication (RFC 6750).

/// Formats a token into an `Authorization` header value.
///
/// # Examples
///
/// ```
/// use api_tester::auth::bearer::header_value;
///
/// assert_eq!(header_value("abc"), "Bearer abc");
/// ```
pub fn header_value(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Extracts the token from a Bearer `Authorization` header value.
///
/// The scheme name is matched case-insensitively; an empty token yields `None`.
pub fn decode(header: &str) -> Option<String> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    Some(token.to_string())
}
