//! Session introspection and logout endpoints for cookie auth.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, SET_COOKIE},
    },
    response::IntoResponse,
};
use std::sync::Arc;

use super::types::SessionResponse;
use crate::access::config::AccessConfig;
use crate::access::cookies;
use crate::access::session::SessionVerifier;

#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    verifier: Extension<Arc<SessionVerifier>>,
) -> impl IntoResponse {
    // The 200 body names the caller, and the endpoint sits under the public
    // /api/auth prefix, so the no-store marker has to come from here.
    let mut no_store = HeaderMap::new();
    no_store.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    // Missing and invalid cookies get the same answer to avoid leaking auth
    // state to anonymous callers.
    let Some(token) = cookies::session_token(&headers) else {
        return (StatusCode::NO_CONTENT, no_store).into_response();
    };
    match verifier.verify(&token, false).await {
        Ok(descriptor) => {
            let response = SessionResponse {
                user_id: descriptor.subject_id.to_string(),
                email: descriptor.email,
                role: descriptor.role.as_str().to_string(),
                email_verified: descriptor.email_verified,
            };
            (StatusCode::OK, no_store, Json(response)).into_response()
        }
        Err(_) => (StatusCode::NO_CONTENT, no_store).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(config: Extension<Arc<AccessConfig>>) -> impl IntoResponse {
    // Tokens are self-contained, so logout is purely cookie expiry. Always
    // clear both cookies, even when no session was presented.
    let mut response_headers = HeaderMap::new();
    for cookie in cookies::clear_cookies(config.session_cookie_secure()) {
        response_headers.append(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}
