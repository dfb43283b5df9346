//! Static route policy table and path classification.
//!
//! The table is built once at process start and never mutated. Lookup is a
//! longest-prefix match on segment boundaries; unmatched paths default to
//! `Public`.

use serde::Serialize;

/// Policy label attached to a URL path prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteClass {
    Public,
    AuthOnly,
    VerifiedOnly,
    SensitiveAuthEndpoint,
}

impl RouteClass {
    /// Marker value for the `X-Route-Class` response header.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::AuthOnly => "auth-only",
            Self::VerifiedOnly => "verified-only",
            Self::SensitiveAuthEndpoint => "sensitive-auth",
        }
    }
}

/// Well-known admin surface paths.
pub const LOGIN_PATH: &str = "/admin/login";
pub const VERIFY_EMAIL_PATH: &str = "/admin/verify-email";
pub const DASHBOARD_PATH: &str = "/admin/dashboard";

#[derive(Clone, Debug)]
struct PolicyEntry {
    prefix: String,
    class: RouteClass,
}

/// Immutable route policy table.
#[derive(Clone, Debug)]
pub struct RoutePolicy {
    entries: Vec<PolicyEntry>,
}

impl RoutePolicy {
    /// Built-in table covering the admin surface and its API.
    #[must_use]
    pub fn defaults() -> Self {
        let mut policy = Self {
            entries: Vec::new(),
        };
        policy.insert(LOGIN_PATH, RouteClass::SensitiveAuthEndpoint);
        // The verification page must stay reachable for unverified sessions,
        // otherwise the guard would redirect it onto itself.
        policy.insert(VERIFY_EMAIL_PATH, RouteClass::AuthOnly);
        policy.insert("/admin", RouteClass::VerifiedOnly);
        policy.insert("/api/auth/login", RouteClass::SensitiveAuthEndpoint);
        policy.insert("/api/auth/password-reset", RouteClass::SensitiveAuthEndpoint);
        policy.insert("/api/auth", RouteClass::Public);
        policy.insert("/api/media", RouteClass::SensitiveAuthEndpoint);
        policy.insert("/api/admin", RouteClass::VerifiedOnly);
        policy
    }

    /// Add a prefix to the table. Later inserts win ties on equal length.
    pub fn insert(&mut self, prefix: &str, class: RouteClass) {
        let prefix = prefix.trim_end_matches('/').to_string();
        self.entries.retain(|entry| entry.prefix != prefix);
        self.entries.push(PolicyEntry { prefix, class });
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: &str, class: RouteClass) -> Self {
        self.insert(prefix, class);
        self
    }

    /// Classify a request path. Longest matching prefix wins; no match means
    /// `Public`.
    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClass {
        let path = path.trim_end_matches('/');
        let path = if path.is_empty() { "/" } else { path };
        self.entries
            .iter()
            .filter(|entry| prefix_matches(&entry.prefix, path))
            .max_by_key(|entry| entry.prefix.len())
            .map_or(RouteClass::Public, |entry| entry.class)
    }
}

/// Prefix match on path segment boundaries: `/admin` matches `/admin` and
/// `/admin/posts`, but not `/administrator`.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    if !path.starts_with(prefix) {
        return false;
    }
    path.len() == prefix.len() || path.as_bytes()[prefix.len()] == b'/'
}

/// API-style paths get JSON rejections instead of login redirects.
#[must_use]
pub fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_paths_are_public() {
        let policy = RoutePolicy::defaults();
        assert_eq!(policy.classify("/"), RouteClass::Public);
        assert_eq!(policy.classify("/blog/some-post"), RouteClass::Public);
        assert_eq!(policy.classify("/sitemap.xml"), RouteClass::Public);
    }

    #[test]
    fn admin_pages_are_verified_only() {
        let policy = RoutePolicy::defaults();
        assert_eq!(policy.classify("/admin"), RouteClass::VerifiedOnly);
        assert_eq!(policy.classify("/admin/dashboard"), RouteClass::VerifiedOnly);
        assert_eq!(policy.classify("/admin/posts/42"), RouteClass::VerifiedOnly);
    }

    #[test]
    fn longest_prefix_wins() {
        let policy = RoutePolicy::defaults();
        // /admin/login is more specific than /admin.
        assert_eq!(
            policy.classify("/admin/login"),
            RouteClass::SensitiveAuthEndpoint
        );
        assert_eq!(policy.classify("/admin/verify-email"), RouteClass::AuthOnly);
        // /api/auth/login is more specific than /api/auth.
        assert_eq!(
            policy.classify("/api/auth/login"),
            RouteClass::SensitiveAuthEndpoint
        );
        assert_eq!(policy.classify("/api/auth/session"), RouteClass::Public);
    }

    #[test]
    fn prefix_match_respects_segment_boundaries() {
        let policy = RoutePolicy::defaults();
        assert_eq!(policy.classify("/administrator"), RouteClass::Public);
        assert_eq!(policy.classify("/admining"), RouteClass::Public);
    }

    #[test]
    fn trailing_slash_is_ignored() {
        let policy = RoutePolicy::defaults();
        assert_eq!(policy.classify("/admin/"), RouteClass::VerifiedOnly);
        assert_eq!(
            policy.classify("/admin/login/"),
            RouteClass::SensitiveAuthEndpoint
        );
    }

    #[test]
    fn custom_prefixes_extend_the_table() {
        let policy = RoutePolicy::defaults().with_prefix("/studio", RouteClass::AuthOnly);
        assert_eq!(policy.classify("/studio/editor"), RouteClass::AuthOnly);
    }

    #[test]
    fn media_mutations_are_sensitive() {
        let policy = RoutePolicy::defaults();
        assert_eq!(
            policy.classify("/api/media/upload"),
            RouteClass::SensitiveAuthEndpoint
        );
    }

    #[test]
    fn api_path_detection() {
        assert!(is_api_path("/api/media/upload"));
        assert!(is_api_path("/api"));
        assert!(!is_api_path("/admin/dashboard"));
        assert!(!is_api_path("/apiary"));
    }
}
