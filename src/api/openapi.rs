//! OpenAPI document assembly for the admin API.

use utoipa::OpenApi;

use super::handlers::{auth, health, sections};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "gardisto",
        description = "Admin access control for content publishing"
    ),
    paths(
        health::health,
        auth::login::login,
        auth::session::session,
        auth::session::logout,
        auth::password_reset::password_reset,
        sections::sections,
    ),
    components(schemas(
        health::Health,
        auth::types::LoginRequest,
        auth::types::SessionResponse,
        auth::types::PasswordResetRequest,
        auth::types::UnauthorizedResponse,
        sections::SectionsResponse,
    )),
    tags(
        (name = "auth", description = "Session and credential endpoints"),
        (name = "admin", description = "Admin surface metadata"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

/// The assembled OpenAPI document.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
