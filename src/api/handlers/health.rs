use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::GIT_COMMIT_HASH;
use crate::access::config::AccessConfig;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    enforcement: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Guard is configured and enforcing", body = Health),
        (status = 503, description = "Guard cannot enforce (missing signing secret)", body = Health)
    ),
    tag = "health"
)]
pub async fn health(method: Method, config: Extension<Arc<AccessConfig>>) -> impl IntoResponse {
    // A guard without a signing secret rejects every protected request, so
    // surface that as unhealthy instead of letting it look like an outage.
    let healthy = config.auth_disabled() || config.has_session_secret();
    let enforcement = if config.auth_disabled() {
        "disabled"
    } else if config.has_session_secret() {
        "active"
    } else {
        "misconfigured"
    };

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        enforcement: enforcement.to_string(),
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();

            headers.insert("X-App", x_app_header_value);

            headers
        })
        .map_err(|err| {
            error!("Failed to parse X-App header: {}", err);
        });

    let headers = headers.unwrap_or_else(|()| HeaderMap::new());

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, headers, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use secrecy::SecretString;

    fn config(secret: &str) -> Arc<AccessConfig> {
        Arc::new(AccessConfig::new(
            "https://press.example.com".to_string(),
            SecretString::from(secret.to_string()),
        ))
    }

    #[tokio::test]
    async fn healthy_when_secret_is_present() {
        let response = health(Method::GET, Extension(config("secret")))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("X-App"));
    }

    #[tokio::test]
    async fn unhealthy_without_secret_unless_auth_disabled() {
        let response = health(Method::GET, Extension(config("")))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let disabled = AccessConfig::new(
            "https://press.example.com".to_string(),
            SecretString::from(""),
        )
        .with_auth_disabled(true);
        let response = health(Method::GET, Extension(Arc::new(disabled)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn preflight_gets_headers_without_a_body() {
        let response = health(Method::OPTIONS, Extension(config("secret")))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("X-App"));
    }
}
