//! HTTP surface: router assembly, middleware stack, and server startup.

use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use url::Url;

use crate::access::config::AccessConfig;
use crate::access::guard::{self, RouteGuard};
use crate::access::rate_limit::RateLimiter;
use crate::access::roles::RolePermissionResolver;
use crate::access::session::SessionVerifier;
use crate::store::AdminDirectory;

pub mod email;
pub mod handlers;
mod openapi;

pub use openapi::openapi;

/// Everything the router needs, assembled once by the server action.
#[derive(Clone)]
pub struct ApiContext {
    pub config: Arc<AccessConfig>,
    pub verifier: Arc<SessionVerifier>,
    pub limiter: Arc<dyn RateLimiter>,
    pub resolver: Arc<RolePermissionResolver>,
    pub directory: Arc<dyn AdminDirectory>,
    pub mail: Arc<dyn email::MailSender>,
}

/// Build the full application router with the guard and middleware stack.
///
/// # Errors
/// Returns an error when the frontend base URL cannot be parsed into a CORS
/// origin.
pub fn router(context: &ApiContext) -> Result<Router> {
    let guard = Arc::new(RouteGuard::new(
        context.config.clone(),
        context.verifier.clone(),
        context.limiter.clone(),
    ));

    let frontend_origin = frontend_origin(context.config.frontend_base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let app = Router::new()
        // OPTIONS serves CORS preflight with headers only.
        .route(
            "/health",
            get(handlers::health::health).options(handlers::health::health),
        )
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/session", get(handlers::auth::session))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route(
            "/api/auth/password-reset",
            post(handlers::auth::password_reset),
        )
        .route("/api/admin/sections", get(handlers::sections::sections))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                // The guard wraps every route and the fallback, so even
                // unrouted paths under a protected prefix are enforced.
                .layer(middleware::from_fn_with_state(guard, guard::enforce))
                .layer(Extension(context.config.clone()))
                .layer(Extension(context.verifier.clone()))
                .layer(Extension(context.limiter.clone()))
                .layer(Extension(context.resolver.clone()))
                .layer(Extension(context.directory.clone()))
                .layer(Extension(context.mail.clone())),
        );

    Ok(app)
}

/// Bind and serve until interrupted.
///
/// # Errors
/// Returns an error if binding or serving fails.
pub async fn serve(port: u16, context: ApiContext) -> Result<()> {
    let app = router(&context)?;

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
