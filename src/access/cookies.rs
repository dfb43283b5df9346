//! Session and verification-hint cookie handling.
//!
//! `admin-session` carries the opaque signed token (HttpOnly, Secure in
//! production). `admin-email-verified` is a non-authoritative hint used only
//! as a fast path for redirect decisions; the authoritative state always
//! comes from the verified descriptor.

use axum::http::{HeaderMap, HeaderValue, header::COOKIE, header::InvalidHeaderValue};

pub const SESSION_COOKIE_NAME: &str = "admin-session";
pub const VERIFIED_COOKIE_NAME: &str = "admin-email-verified";

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name {
            return Some(val.to_string());
        }
    }
    None
}

/// Extract the raw session token; no other request input is trusted.
#[must_use]
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, SESSION_COOKIE_NAME).filter(|token| !token.is_empty())
}

/// Non-authoritative "client believes it is verified" hint.
#[must_use]
pub fn verified_hint(headers: &HeaderMap) -> bool {
    cookie_value(headers, VERIFIED_COOKIE_NAME).is_some_and(|value| value == "true")
}

/// Build the HttpOnly session cookie.
///
/// # Errors
/// Returns an error if the token contains bytes invalid in a header value.
pub fn session_cookie(
    token: &str,
    ttl_seconds: i64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// The hint cookie is readable by the client on purpose; no HttpOnly.
///
/// # Errors
/// Returns an error if the value cannot be encoded as a header value.
pub fn verified_cookie(
    verified: bool,
    ttl_seconds: i64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{VERIFIED_COOKIE_NAME}={verified}; Path=/; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Expire both cookies, used on logout.
#[must_use]
pub fn clear_cookies(secure: bool) -> Vec<HeaderValue> {
    let suffix = if secure { "; Secure" } else { "" };
    [
        format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{suffix}"),
        format!("{VERIFIED_COOKIE_NAME}=; Path=/; SameSite=Lax; Max-Age=0{suffix}"),
    ]
    .iter()
    .filter_map(|cookie| HeaderValue::from_str(cookie).ok())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_cookie(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn session_token_parses_among_other_cookies() {
        let headers =
            headers_with_cookie("theme=dark; admin-session=tok123; admin-email-verified=true");
        assert_eq!(session_token(&headers), Some("tok123".to_string()));
        assert!(verified_hint(&headers));
    }

    #[test]
    fn missing_or_empty_cookie_is_none() {
        assert_eq!(session_token(&HeaderMap::new()), None);
        let headers = headers_with_cookie("admin-session=");
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn verified_hint_requires_exact_true() {
        assert!(!verified_hint(&headers_with_cookie("admin-email-verified=1")));
        assert!(!verified_hint(&headers_with_cookie("admin-email-verified=false")));
        assert!(!verified_hint(&HeaderMap::new()));
    }

    #[test]
    fn session_cookie_attributes() -> anyhow::Result<()> {
        let cookie = session_cookie("tok", 3600, true)?;
        let value = cookie.to_str()?;
        assert!(value.starts_with("admin-session=tok;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Max-Age=3600"));
        assert!(value.ends_with("Secure"));

        let cookie = session_cookie("tok", 3600, false)?;
        assert!(!cookie.to_str()?.contains("Secure"));
        Ok(())
    }

    #[test]
    fn hint_cookie_is_not_http_only() -> anyhow::Result<()> {
        let cookie = verified_cookie(true, 3600, false)?;
        let value = cookie.to_str()?;
        assert!(value.starts_with("admin-email-verified=true;"));
        assert!(!value.contains("HttpOnly"));
        Ok(())
    }

    #[test]
    fn clear_cookies_expire_both() {
        let cleared = clear_cookies(false);
        assert_eq!(cleared.len(), 2);
        for cookie in cleared {
            assert!(cookie.to_str().is_ok_and(|v| v.contains("Max-Age=0")));
        }
    }
}
