//! Access-control configuration, resolved once at startup.
//!
//! Every enforcement flag lives here so "auth disabled" and "verification
//! required" are each evaluated in exactly one place instead of scattered
//! truthiness checks at call sites.

use secrecy::{ExposeSecret, SecretString};
use url::Url;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;
const DEFAULT_RESET_FLOOR_MS: u64 = 400;

#[derive(Clone, Debug)]
pub struct AccessConfig {
    frontend_base_url: String,
    session_secret: SecretString,
    session_ttl_seconds: i64,
    auth_disabled: bool,
    require_email_verification: bool,
    protected_prefixes: Vec<String>,
    allowed_redirect_origins: Vec<String>,
    password_reset_floor_ms: u64,
}

impl AccessConfig {
    #[must_use]
    pub fn new(frontend_base_url: String, session_secret: SecretString) -> Self {
        let origin = origin_of(&frontend_base_url);
        Self {
            frontend_base_url,
            session_secret,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            auth_disabled: false,
            require_email_verification: true,
            protected_prefixes: Vec::new(),
            allowed_redirect_origins: origin.into_iter().collect(),
            password_reset_floor_ms: DEFAULT_RESET_FLOOR_MS,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    /// Disable enforcement entirely. Test/CI only; the guard logs loudly.
    #[must_use]
    pub fn with_auth_disabled(mut self, disabled: bool) -> Self {
        self.auth_disabled = disabled;
        self
    }

    #[must_use]
    pub fn with_require_email_verification(mut self, required: bool) -> Self {
        self.require_email_verification = required;
        self
    }

    #[must_use]
    pub fn with_protected_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.protected_prefixes = prefixes;
        self
    }

    #[must_use]
    pub fn with_allowed_redirect_origin(mut self, origin: String) -> Self {
        self.allowed_redirect_origins.push(origin);
        self
    }

    #[must_use]
    pub fn with_password_reset_floor_ms(mut self, floor_ms: u64) -> Self {
        self.password_reset_floor_ms = floor_ms;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn session_secret(&self) -> &SecretString {
        &self.session_secret
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn auth_disabled(&self) -> bool {
        self.auth_disabled
    }

    #[must_use]
    pub fn require_email_verification(&self) -> bool {
        self.require_email_verification
    }

    #[must_use]
    pub fn protected_prefixes(&self) -> &[String] {
        &self.protected_prefixes
    }

    #[must_use]
    pub fn password_reset_floor_ms(&self) -> u64 {
        self.password_reset_floor_ms
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }

    #[must_use]
    pub fn has_session_secret(&self) -> bool {
        !self.session_secret.expose_secret().is_empty()
    }

    /// Validate a user-supplied redirect target against the origin
    /// allow-list. Anything else is rejected to prevent open redirects;
    /// relative paths are accepted since they cannot leave the origin.
    #[must_use]
    pub fn redirect_target_allowed(&self, target: &str) -> bool {
        let trimmed = target.trim();
        if trimmed.is_empty() {
            return false;
        }
        if trimmed.starts_with('/') && !trimmed.starts_with("//") {
            return true;
        }
        match origin_of(trimmed) {
            Some(origin) => self
                .allowed_redirect_origins
                .iter()
                .any(|allowed| allowed == &origin),
            // Not parseable as an absolute URL: fail closed.
            None => false,
        }
    }
}

fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    Some(format!("{}://{}{}", parsed.scheme(), host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AccessConfig {
        AccessConfig::new(
            "https://press.example.com".to_string(),
            SecretString::from("secret"),
        )
    }

    #[test]
    fn defaults() {
        let config = config();
        assert!(!config.auth_disabled());
        assert!(config.require_email_verification());
        assert!(config.session_cookie_secure());
        assert!(config.has_session_secret());
        assert_eq!(config.session_ttl_seconds(), DEFAULT_SESSION_TTL_SECONDS);
    }

    #[test]
    fn builders_override_defaults() {
        let config = config()
            .with_session_ttl_seconds(60)
            .with_auth_disabled(true)
            .with_require_email_verification(false)
            .with_password_reset_floor_ms(10);
        assert_eq!(config.session_ttl_seconds(), 60);
        assert!(config.auth_disabled());
        assert!(!config.require_email_verification());
        assert_eq!(config.password_reset_floor_ms(), 10);
    }

    #[test]
    fn plain_http_frontend_means_insecure_cookies() {
        let config = AccessConfig::new(
            "http://localhost:3000".to_string(),
            SecretString::from("secret"),
        );
        assert!(!config.session_cookie_secure());
    }

    #[test]
    fn redirect_allow_list_accepts_same_origin_and_relative() {
        let config = config();
        assert!(config.redirect_target_allowed("/admin/dashboard"));
        assert!(config.redirect_target_allowed("https://press.example.com/admin/reset"));
    }

    #[test]
    fn redirect_allow_list_rejects_foreign_and_ambiguous_targets() {
        let config = config();
        assert!(!config.redirect_target_allowed("https://evil.example.net/phish"));
        // Scheme and port are part of the origin.
        assert!(!config.redirect_target_allowed("http://press.example.com/admin"));
        assert!(!config.redirect_target_allowed("https://press.example.com:8443/admin"));
        // Protocol-relative URLs escape the origin; fail closed.
        assert!(!config.redirect_target_allowed("//evil.example.net/phish"));
        assert!(!config.redirect_target_allowed(""));
        assert!(!config.redirect_target_allowed("javascript:alert(1)"));
    }

    #[test]
    fn extra_allowed_origin_is_honored() {
        let config =
            config().with_allowed_redirect_origin("https://staging.example.com".to_string());
        assert!(config.redirect_target_allowed("https://staging.example.com/reset"));
    }

    #[test]
    fn empty_secret_is_detectable() {
        let config = AccessConfig::new(
            "https://press.example.com".to_string(),
            SecretString::from(""),
        );
        assert!(!config.has_session_secret());
    }
}
