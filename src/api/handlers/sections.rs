//! Admin navigation sections, derived from the caller's role.

use axum::{
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CONTENT_TYPE, ETAG, IF_NONE_MATCH},
    },
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::access::cookies;
use crate::access::roles::RolePermissionResolver;
use crate::access::session::SessionVerifier;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SectionsResponse {
    pub sections: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/api/admin/sections",
    responses(
        (status = 200, description = "Sections visible to the caller's role", body = SectionsResponse),
        (status = 304, description = "Client copy is current"),
        (status = 401, description = "No valid session")
    ),
    tag = "admin"
)]
pub async fn sections(
    headers: HeaderMap,
    verifier: Extension<Arc<SessionVerifier>>,
    resolver: Extension<Arc<RolePermissionResolver>>,
) -> impl IntoResponse {
    // The guard already vetted the session; the descriptor is re-derived
    // here because the role has to come from the token, not from the guard.
    let Some(token) = cookies::session_token(&headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let Ok(descriptor) = verifier.verify(&token, false).await else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let sections: Vec<String> = resolver
        .accessible_sections(&descriptor.role)
        .into_iter()
        .map(|section| section.as_str().to_string())
        .collect();
    let body = match serde_json::to_string(&SectionsResponse { sections }) {
        Ok(body) => body,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    // Sections only change on redeploy or override reload, so a strong ETag
    // over the body lets the sidebar poll cheaply.
    let etag = format!("\"{}\"", hex_digest(&body));
    if if_none_match_hits(&headers, &etag) {
        let mut response_headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&etag) {
            response_headers.insert(ETAG, value);
        }
        return (StatusCode::NOT_MODIFIED, response_headers).into_response();
    }

    let mut response_headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&etag) {
        response_headers.insert(ETAG, value);
    }
    response_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    (StatusCode::OK, response_headers, body).into_response()
}

fn hex_digest(body: &str) -> String {
    Sha256::digest(body.as_bytes())
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

fn if_none_match_hits(headers: &HeaderMap, etag: &str) -> bool {
    let Some(header) = headers.get(IF_NONE_MATCH).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    header
        .split(',')
        .map(|candidate| candidate.trim().trim_start_matches("W/"))
        .any(|candidate| candidate == etag || candidate == "*")
}
