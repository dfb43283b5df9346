//! Credential login endpoint.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{error, info};

use super::types::{LoginRequest, SessionResponse, UnauthorizedResponse};
use crate::access::config::AccessConfig;
use crate::access::cookies;
use crate::access::guard::client_ip;
use crate::access::rate_limit::{RateLimiter, RateScope};
use crate::access::session::{SessionDescriptor, SessionVerifier, unix_now};
use crate::store::AdminDirectory;

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session established", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = UnauthorizedResponse),
        (status = 429, description = "Too many attempts for this account")
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    config: Extension<Arc<AccessConfig>>,
    verifier: Extension<Arc<SessionVerifier>>,
    limiter: Extension<Arc<dyn RateLimiter>>,
    directory: Extension<Arc<dyn AdminDirectory>>,
    Json(request): Json<LoginRequest>,
) -> impl IntoResponse {
    let ip = client_ip(&headers).unwrap_or_else(|| "unknown".to_string());
    let email_key = request.email.trim().to_lowercase();

    // The guard already throttled by IP; the per-account window catches
    // attacks spread across addresses.
    if limiter.is_limited(RateScope::Login, &email_key) {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited").into_response();
    }

    let Some(record) = directory.verify_credentials(&request.email, &request.password) else {
        limiter.record_attempt(RateScope::Login, &ip);
        limiter.record_attempt(RateScope::Login, &email_key);
        // Same body for unknown account and wrong password.
        return (
            StatusCode::UNAUTHORIZED,
            Json(UnauthorizedResponse::new()),
        )
            .into_response();
    };

    limiter.reset(RateScope::Login, &ip);
    limiter.reset(RateScope::Login, &email_key);

    let now = unix_now();
    let descriptor = SessionDescriptor {
        subject_id: record.id,
        email: record.email.clone(),
        role: record.role.clone(),
        email_verified: record.email_verified,
        issued_at: now,
        expires_at: now + config.session_ttl_seconds(),
    };

    let token = match verifier.issue(&descriptor) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to issue session token: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let ttl = config.session_ttl_seconds();
    let secure = config.session_cookie_secure();
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = cookies::session_cookie(&token, ttl, secure) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    if let Ok(cookie) = cookies::verified_cookie(record.email_verified, ttl, secure) {
        response_headers.append(SET_COOKIE, cookie);
    }

    info!(user_id = %record.id, "Admin signed in");
    let response = SessionResponse {
        user_id: record.id.to_string(),
        email: record.email,
        role: record.role.as_str().to_string(),
        email_verified: record.email_verified,
    };
    (StatusCode::OK, response_headers, Json(response)).into_response()
}
