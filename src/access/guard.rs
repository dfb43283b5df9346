//! Request interception: allow, redirect, or reject.
//!
//! The guard runs once per inbound request and holds no state of its own
//! beyond references to the verifier and the rate limiter. Decision order
//! for sensitive endpoints puts the rate limiter first: a 429 wins over a
//! login redirect because it is the cheaper and more security-relevant
//! check, and it must fire before any token work.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION},
    },
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::config::AccessConfig;
use super::cookies;
use super::rate_limit::{RateLimiter, RateScope};
use super::routes::{
    DASHBOARD_PATH, LOGIN_PATH, RouteClass, RoutePolicy, VERIFY_EMAIL_PATH, is_api_path,
};
use super::session::{SessionVerifier, VerifyError};

/// Marker header carrying the route classification for observability.
pub const ROUTE_CLASS_HEADER: &str = "x-route-class";

const UNAUTHORIZED_BODY: &str = r#"{"error":"Unauthorized"}"#;
const RATE_LIMITED_BODY: &str = "Rate limited";
const SERVER_ERROR_BODY: &str = "Internal Server Error";

/// Outcome of one guard pass. Redirects are always 307 so the method and
/// body survive the hop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect { location: String },
    Reject { status: StatusCode, body: &'static str, json: bool },
}

impl Decision {
    const fn reject(status: StatusCode, body: &'static str, json: bool) -> Self {
        Self::Reject { status, body, json }
    }

    fn redirect(location: &str) -> Self {
        Self::Redirect {
            location: location.to_string(),
        }
    }
}

/// Decision plus the classification that produced it, for response markers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub class: RouteClass,
    pub decision: Decision,
}

pub struct RouteGuard {
    config: Arc<AccessConfig>,
    verifier: Arc<SessionVerifier>,
    limiter: Arc<dyn RateLimiter>,
    policy: RoutePolicy,
}

impl RouteGuard {
    #[must_use]
    pub fn new(
        config: Arc<AccessConfig>,
        verifier: Arc<SessionVerifier>,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        let mut policy = RoutePolicy::defaults();
        for prefix in config.protected_prefixes() {
            policy.insert(prefix, RouteClass::VerifiedOnly);
        }
        if config.auth_disabled() {
            warn!("Auth enforcement is DISABLED; all routes are open");
        }
        Self {
            config,
            verifier,
            limiter,
            policy,
        }
    }

    /// Decide the fate of one request from its path and headers alone.
    pub async fn decide(&self, path: &str, headers: &HeaderMap) -> Verdict {
        let class = self.policy.classify(path);
        let decision = self.decide_for_class(class, path, headers).await;
        Verdict { class, decision }
    }

    async fn decide_for_class(
        &self,
        class: RouteClass,
        path: &str,
        headers: &HeaderMap,
    ) -> Decision {
        // The kill switch is evaluated here and nowhere else.
        if self.config.auth_disabled() {
            return Decision::Allow;
        }
        if class == RouteClass::Public {
            return Decision::Allow;
        }

        let ip = client_ip(headers).unwrap_or_else(|| "unknown".to_string());

        if class == RouteClass::SensitiveAuthEndpoint {
            let scope = sensitive_scope(path);
            // Cheapest check first; a limited key never reaches the verifier.
            if self.limiter.is_limited(scope, &ip) {
                return Decision::reject(
                    StatusCode::TOO_MANY_REQUESTS,
                    RATE_LIMITED_BODY,
                    false,
                );
            }
            // Media mutations have no handler of their own, so their window
            // is fed here; auth endpoints record in their handlers instead.
            if scope == RateScope::MediaMutation {
                self.limiter.record_attempt(scope, &ip);
            }
            if is_auth_entry_point(path) {
                return self.decide_auth_entry(path, headers).await;
            }
        }

        let Some(token) = cookies::session_token(headers) else {
            return self.unauthenticated(path, &ip);
        };

        // State-changing sensitive endpoints take the slower path that can
        // also see revocation; plain reads settle for the local signature.
        let check_revocation = class == RouteClass::SensitiveAuthEndpoint;
        match self.verifier.verify(&token, check_revocation).await {
            Err(VerifyError::Misconfigured) => {
                error!("Session verifier misconfigured; refusing request");
                Decision::reject(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_BODY, false)
            }
            Err(err) => {
                // Kind stays server-side; the client sees a generic answer.
                debug!("Session verification failed: {err}");
                self.unauthenticated(path, &ip)
            }
            Ok(descriptor) => {
                let needs_verified = class == RouteClass::VerifiedOnly
                    || class == RouteClass::SensitiveAuthEndpoint;
                if needs_verified
                    && self.config.require_email_verification()
                    && !descriptor.email_verified
                {
                    // Never redirect the verification page onto itself.
                    if path.starts_with(VERIFY_EMAIL_PATH) {
                        return Decision::Allow;
                    }
                    if is_api_path(path) {
                        return Decision::reject(
                            StatusCode::UNAUTHORIZED,
                            UNAUTHORIZED_BODY,
                            true,
                        );
                    }
                    return Decision::redirect(VERIFY_EMAIL_PATH);
                }
                Decision::Allow
            }
        }
    }

    /// Login and password-reset endpoints are reachable anonymously; the
    /// only session question is whether to bounce an already-valid session
    /// off the login page.
    async fn decide_auth_entry(&self, path: &str, headers: &HeaderMap) -> Decision {
        let Some(token) = cookies::session_token(headers) else {
            return Decision::Allow;
        };
        // Fast path off the login page: a session cookie plus the client
        // hint skips verification entirely. The landing page re-verifies
        // authoritatively, so a forged hint only buys an extra redirect,
        // never access.
        if path.starts_with(LOGIN_PATH) && cookies::verified_hint(headers) {
            return Decision::redirect(DASHBOARD_PATH);
        }
        match self.verifier.verify(&token, false).await {
            Err(VerifyError::Misconfigured) => {
                error!("Session verifier misconfigured; refusing request");
                Decision::reject(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_BODY, false)
            }
            // A dud cookie on the login page is just an anonymous visitor.
            Err(_) => Decision::Allow,
            Ok(descriptor) => {
                if path.starts_with(LOGIN_PATH) {
                    // The session is valid, so re-authentication is
                    // pointless; send it where it belongs.
                    if descriptor.email_verified {
                        return Decision::redirect(DASHBOARD_PATH);
                    }
                    return Decision::redirect(VERIFY_EMAIL_PATH);
                }
                Decision::Allow
            }
        }
    }

    fn unauthenticated(&self, path: &str, ip: &str) -> Decision {
        if is_api_path(path) {
            // Generic body; the failure kind must not aid enumeration.
            return Decision::reject(StatusCode::UNAUTHORIZED, UNAUTHORIZED_BODY, true);
        }
        self.limiter.record_attempt(RateScope::Login, ip);
        Decision::redirect(LOGIN_PATH)
    }
}

fn sensitive_scope(path: &str) -> RateScope {
    if path.starts_with("/api/media") {
        return RateScope::MediaMutation;
    }
    if path.starts_with("/api/auth/password-reset") {
        return RateScope::PasswordResetIp;
    }
    RateScope::Login
}

/// Extract a client IP for rate limiting from common proxy headers.
#[must_use]
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Sensitive endpoints that must stay reachable without a session.
fn is_auth_entry_point(path: &str) -> bool {
    path.starts_with(LOGIN_PATH) || path.starts_with("/api/auth/")
}

/// Axum middleware wrapping [`RouteGuard::decide`].
///
/// Every response carries the classification marker; protected paths are
/// additionally marked `no-store`.
pub async fn enforce(
    State(guard): State<Arc<RouteGuard>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let verdict = guard.decide(&path, request.headers()).await;

    let mut response = match verdict.decision {
        Decision::Allow => next.run(request).await,
        Decision::Redirect { location } => {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::TEMPORARY_REDIRECT;
            if let Ok(value) = HeaderValue::from_str(&location) {
                response.headers_mut().insert(LOCATION, value);
            }
            response
        }
        Decision::Reject { status, body, json } => {
            let mut response = Response::new(Body::from(body));
            *response.status_mut() = status;
            let content_type = if json {
                "application/json"
            } else {
                "text/plain; charset=utf-8"
            };
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            response
        }
    };

    let headers = response.headers_mut();
    headers.insert(
        ROUTE_CLASS_HEADER,
        HeaderValue::from_static(verdict.class.as_str()),
    );
    if verdict.class != RouteClass::Public {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::rate_limit::{InMemoryRateLimiter, NoopRateLimiter, RateLimitPolicy};
    use crate::access::roles::Role;
    use crate::access::session::{SessionDescriptor, unix_now};
    use axum::http::header::COOKIE;
    use secrecy::SecretString;
    use std::time::Duration;
    use uuid::Uuid;

    const SECRET: &str = "test-signing-secret";

    fn config() -> AccessConfig {
        AccessConfig::new(
            "https://press.example.com".to_string(),
            SecretString::from(SECRET),
        )
    }

    fn guard_with(config: AccessConfig, limiter: Arc<dyn RateLimiter>) -> RouteGuard {
        let verifier = Arc::new(SessionVerifier::new(SecretString::from(SECRET)));
        RouteGuard::new(Arc::new(config), verifier, limiter)
    }

    fn guard() -> RouteGuard {
        guard_with(config(), Arc::new(NoopRateLimiter))
    }

    fn descriptor(verified: bool) -> SessionDescriptor {
        let now = unix_now();
        SessionDescriptor {
            subject_id: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
            role: Role::Administrator,
            email_verified: verified,
            issued_at: now,
            expires_at: now + 3600,
        }
    }

    fn session_headers(guard: &RouteGuard, verified: bool, hint: Option<bool>) -> HeaderMap {
        let token = guard
            .verifier
            .issue(&descriptor(verified))
            .unwrap_or_default();
        let mut cookie = format!("admin-session={token}");
        if let Some(hint) = hint {
            cookie.push_str(&format!("; admin-email-verified={hint}"));
        }
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            headers.insert(COOKIE, value);
        }
        headers
    }

    #[tokio::test]
    async fn public_paths_allow_anonymously() {
        let guard = guard();
        let verdict = guard.decide("/blog/hello-world", &HeaderMap::new()).await;
        assert_eq!(verdict.class, RouteClass::Public);
        assert_eq!(verdict.decision, Decision::Allow);
    }

    #[tokio::test]
    async fn anonymous_admin_page_redirects_to_login() {
        let guard = guard();
        let verdict = guard.decide("/admin/dashboard", &HeaderMap::new()).await;
        assert_eq!(verdict.decision, Decision::redirect(LOGIN_PATH));
    }

    #[tokio::test]
    async fn anonymous_api_call_gets_generic_401() {
        let guard = guard();
        let verdict = guard.decide("/api/media/upload", &HeaderMap::new()).await;
        assert_eq!(
            verdict.decision,
            Decision::reject(StatusCode::UNAUTHORIZED, UNAUTHORIZED_BODY, true)
        );
    }

    #[tokio::test]
    async fn garbage_token_never_allows_protected_paths() {
        let guard = guard();
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("admin-session=garbage"));
        for path in ["/admin/dashboard", "/api/admin/posts"] {
            let verdict = guard.decide(path, &headers).await;
            assert_ne!(verdict.decision, Decision::Allow, "path {path}");
        }
    }

    #[tokio::test]
    async fn expired_token_never_allows_protected_paths() {
        let guard = guard();
        let mut expired = descriptor(true);
        expired.expires_at = unix_now() - 10;
        let token = guard.verifier.issue(&expired).unwrap_or_default();
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&format!("admin-session={token}")) {
            headers.insert(COOKIE, value);
        }
        let verdict = guard.decide("/admin/dashboard", &headers).await;
        assert_eq!(verdict.decision, Decision::redirect(LOGIN_PATH));
    }

    #[tokio::test]
    async fn verified_session_allows_admin_pages() {
        let guard = guard();
        let headers = session_headers(&guard, true, None);
        let verdict = guard.decide("/admin/dashboard", &headers).await;
        assert_eq!(verdict.decision, Decision::Allow);
    }

    #[tokio::test]
    async fn unverified_session_redirects_to_verification_page() {
        let guard = guard();
        let headers = session_headers(&guard, false, None);
        let verdict = guard.decide("/admin/dashboard", &headers).await;
        assert_eq!(verdict.decision, Decision::redirect(VERIFY_EMAIL_PATH));
    }

    #[tokio::test]
    async fn unverified_session_on_verification_page_is_allowed() {
        // No redirect loop: the verification page always renders.
        let guard = guard();
        let headers = session_headers(&guard, false, None);
        let verdict = guard.decide(VERIFY_EMAIL_PATH, &headers).await;
        assert_eq!(verdict.class, RouteClass::AuthOnly);
        assert_eq!(verdict.decision, Decision::Allow);
    }

    #[tokio::test]
    async fn unverified_session_on_api_path_gets_401() {
        let guard = guard();
        let headers = session_headers(&guard, false, None);
        let verdict = guard.decide("/api/admin/posts", &headers).await;
        assert_eq!(
            verdict.decision,
            Decision::reject(StatusCode::UNAUTHORIZED, UNAUTHORIZED_BODY, true)
        );
    }

    #[tokio::test]
    async fn verification_not_required_when_flag_is_off() {
        let guard = guard_with(
            config().with_require_email_verification(false),
            Arc::new(NoopRateLimiter),
        );
        let headers = session_headers(&guard, false, None);
        let verdict = guard.decide("/admin/dashboard", &headers).await;
        assert_eq!(verdict.decision, Decision::Allow);
    }

    #[tokio::test]
    async fn valid_session_on_login_page_redirects_to_dashboard() {
        let guard = guard();
        // With the hint and without it; the outcome is the same.
        let headers = session_headers(&guard, true, Some(true));
        let verdict = guard.decide(LOGIN_PATH, &headers).await;
        assert_eq!(verdict.decision, Decision::redirect(DASHBOARD_PATH));

        let headers = session_headers(&guard, true, None);
        let verdict = guard.decide(LOGIN_PATH, &headers).await;
        assert_eq!(verdict.decision, Decision::redirect(DASHBOARD_PATH));
    }

    #[tokio::test]
    async fn hint_cookie_is_enough_to_bounce_off_the_login_page() {
        // The hint fast path fires without verifying the token; the target
        // page re-verifies, so nothing is granted here.
        let guard = guard();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("admin-session=test; admin-email-verified=true"),
        );
        let verdict = guard.decide(LOGIN_PATH, &headers).await;
        assert_eq!(verdict.decision, Decision::redirect(DASHBOARD_PATH));

        // The same cookies never open a protected page.
        let verdict = guard.decide("/admin/dashboard", &headers).await;
        assert_eq!(verdict.decision, Decision::redirect(LOGIN_PATH));
    }

    #[tokio::test]
    async fn unverified_session_on_login_page_redirects_to_verification() {
        let guard = guard();
        let headers = session_headers(&guard, false, None);
        let verdict = guard.decide(LOGIN_PATH, &headers).await;
        assert_eq!(verdict.decision, Decision::redirect(VERIFY_EMAIL_PATH));
    }

    #[tokio::test]
    async fn anonymous_login_page_is_allowed() {
        let guard = guard();
        let verdict = guard.decide(LOGIN_PATH, &HeaderMap::new()).await;
        assert_eq!(verdict.class, RouteClass::SensitiveAuthEndpoint);
        assert_eq!(verdict.decision, Decision::Allow);
    }

    #[tokio::test]
    async fn sixth_failed_login_is_rejected_before_anything_else() {
        let limiter = Arc::new(InMemoryRateLimiter::new().with_policy(
            RateScope::Login,
            RateLimitPolicy {
                window: Duration::from_secs(60),
                threshold: 5,
            },
        ));
        let guard = guard_with(config(), limiter.clone());
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("9.9.9.9"));
        for _ in 0..5 {
            limiter.record_attempt(RateScope::Login, "9.9.9.9");
        }
        let verdict = guard.decide("/api/auth/login", &headers).await;
        assert_eq!(
            verdict.decision,
            Decision::reject(StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED_BODY, false)
        );
    }

    #[tokio::test]
    async fn rate_limit_wins_over_login_redirect() {
        // Tie-break: a limited key sees 429 even though the session cookie
        // is valid and would otherwise redirect off the login page.
        let limiter = Arc::new(InMemoryRateLimiter::new().with_policy(
            RateScope::Login,
            RateLimitPolicy {
                window: Duration::from_secs(60),
                threshold: 1,
            },
        ));
        let guard = guard_with(config(), limiter.clone());
        let mut headers = session_headers(&guard, true, Some(true));
        headers.insert("x-forwarded-for", HeaderValue::from_static("9.9.9.9"));
        limiter.record_attempt(RateScope::Login, "9.9.9.9");
        let verdict = guard.decide(LOGIN_PATH, &headers).await;
        assert_eq!(
            verdict.decision,
            Decision::reject(StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED_BODY, false)
        );
    }

    #[tokio::test]
    async fn thirty_first_media_request_in_a_window_is_limited() {
        // Default media policy: 30 per 60s window, counted per request by
        // the guard itself since no media handler exists to do it.
        let limiter = Arc::new(InMemoryRateLimiter::new());
        let guard = guard_with(config(), limiter.clone());
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("7.7.7.7"));
        for _ in 0..30 {
            let verdict = guard.decide("/api/media/upload", &headers).await;
            assert_ne!(
                verdict.decision,
                Decision::reject(StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED_BODY, false)
            );
        }
        let verdict = guard.decide("/api/media/upload", &headers).await;
        assert_eq!(
            verdict.decision,
            Decision::reject(StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED_BODY, false)
        );
        // A different address keeps its own window.
        let mut other = HeaderMap::new();
        other.insert("x-forwarded-for", HeaderValue::from_static("8.8.8.8"));
        let verdict = guard.decide("/api/media/upload", &other).await;
        assert_ne!(
            verdict.decision,
            Decision::reject(StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED_BODY, false)
        );
    }

    #[tokio::test]
    async fn failed_page_redirects_record_an_attempt() {
        let limiter = Arc::new(InMemoryRateLimiter::new().with_policy(
            RateScope::Login,
            RateLimitPolicy {
                window: Duration::from_secs(60),
                threshold: 2,
            },
        ));
        let guard = guard_with(config(), limiter.clone());
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("4.4.4.4"));
        let _ = guard.decide("/admin/dashboard", &headers).await;
        let _ = guard.decide("/admin/dashboard", &headers).await;
        assert!(limiter.is_limited(RateScope::Login, "4.4.4.4"));
    }

    #[tokio::test]
    async fn auth_disabled_opens_everything() {
        let guard = guard_with(config().with_auth_disabled(true), Arc::new(NoopRateLimiter));
        for path in ["/admin/dashboard", "/api/admin/posts", "/api/media/upload"] {
            let verdict = guard.decide(path, &HeaderMap::new()).await;
            assert_eq!(verdict.decision, Decision::Allow, "path {path}");
        }
    }

    #[tokio::test]
    async fn missing_secret_is_a_loud_500_not_an_allow() {
        let verifier = Arc::new(SessionVerifier::new(SecretString::from("")));
        let guard = RouteGuard::new(
            Arc::new(config()),
            verifier,
            Arc::new(NoopRateLimiter),
        );
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("admin-session=anything"));
        let verdict = guard.decide("/admin/dashboard", &headers).await;
        assert_eq!(
            verdict.decision,
            Decision::reject(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_BODY, false)
        );
    }

    #[tokio::test]
    async fn extra_protected_prefixes_are_enforced() {
        let guard = guard_with(
            config().with_protected_prefixes(vec!["/studio".to_string()]),
            Arc::new(NoopRateLimiter),
        );
        let verdict = guard.decide("/studio/drafts", &HeaderMap::new()).await;
        assert_eq!(verdict.decision, Decision::redirect(LOGIN_PATH));
    }

    #[test]
    fn client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.2.3.4, 5.6.7.8"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(client_ip(&headers), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn client_ip_falls_back_to_real_ip_then_none() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(client_ip(&headers), Some("9.9.9.9".to_string()));
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
