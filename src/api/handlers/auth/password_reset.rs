//! Password reset request endpoint.
//!
//! Account enumeration resistance is the whole design here: the endpoint
//! answers 204 whether or not the account exists, mail delivery happens off
//! the request path, and a response-time floor hides the lookup cost
//! difference between the two cases.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::error;

use super::types::PasswordResetRequest;
use crate::access::config::AccessConfig;
use crate::access::guard::client_ip;
use crate::access::rate_limit::{RateLimiter, RateScope};
use crate::api::email::{MailSender, ResetMail};
use crate::store::AdminDirectory;

#[utoipa::path(
    post,
    path = "/api/auth/password-reset",
    request_body = PasswordResetRequest,
    responses(
        (status = 204, description = "Reset mail queued if the account exists"),
        (status = 400, description = "Continue URL not on the allow-list"),
        (status = 429, description = "Too many reset requests")
    ),
    tag = "auth"
)]
pub async fn password_reset(
    headers: HeaderMap,
    config: Extension<Arc<AccessConfig>>,
    limiter: Extension<Arc<dyn RateLimiter>>,
    directory: Extension<Arc<dyn AdminDirectory>>,
    mail: Extension<Arc<dyn MailSender>>,
    Json(request): Json<PasswordResetRequest>,
) -> impl IntoResponse {
    let started = Instant::now();
    let email_key = request.email.trim().to_lowercase();

    // Reject bad redirect targets outright; this depends only on request
    // content, never on whether the account exists.
    let continue_url = match request.continue_url.as_deref() {
        Some(target) => {
            if !config.redirect_target_allowed(target) {
                return StatusCode::BAD_REQUEST.into_response();
            }
            target.to_string()
        }
        None => crate::access::routes::LOGIN_PATH.to_string(),
    };

    // The guard throttles by IP; the per-email window throttles distributed
    // attempts against one account. The key is the requested address, so a
    // 429 reveals nothing about account existence.
    if limiter.is_limited(RateScope::PasswordResetEmail, &email_key) {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited").into_response();
    }
    if let Some(ip) = client_ip(&headers) {
        limiter.record_attempt(RateScope::PasswordResetIp, &ip);
    }
    limiter.record_attempt(RateScope::PasswordResetEmail, &email_key);

    if let Some(record) = directory.find_by_email(&email_key) {
        let mail = mail.0.clone();
        let message = ResetMail {
            to_email: record.email,
            continue_url,
        };
        // Delivery is fire-and-forget; the response must not wait on it.
        tokio::task::spawn_blocking(move || {
            if let Err(err) = mail.send(&message) {
                error!("Failed to send password reset mail: {err}");
            }
        });
    }

    // Pad the accept path up to the floor so existing and unknown accounts
    // answer in the same time.
    let floor = Duration::from_millis(config.password_reset_floor_ms());
    if let Some(remaining) = floor.checked_sub(started.elapsed()) {
        tokio::time::sleep(remaining).await;
    }
    StatusCode::NO_CONTENT.into_response()
}
