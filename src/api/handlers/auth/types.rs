//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub user_id: String,
    pub email: String,
    pub role: String,
    pub email_verified: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PasswordResetRequest {
    pub email: String,
    /// Where the reset mail should send the user back to. Validated against
    /// the redirect origin allow-list.
    #[serde(default)]
    pub continue_url: Option<String>,
}

/// Single generic body for all unauthorized answers.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UnauthorizedResponse {
    pub error: String,
}

impl UnauthorizedResponse {
    #[must_use]
    pub fn new() -> Self {
        Self {
            error: "Unauthorized".to_string(),
        }
    }
}

impl Default for UnauthorizedResponse {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn login_request_round_trips() -> Result<()> {
        let request = LoginRequest {
            email: "alice@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let email = value
            .get("email")
            .and_then(serde_json::Value::as_str)
            .context("missing email")?;
        assert_eq!(email, "alice@example.com");
        let decoded: LoginRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.password, "hunter2");
        Ok(())
    }

    #[test]
    fn continue_url_is_optional() -> Result<()> {
        let decoded: PasswordResetRequest =
            serde_json::from_str(r#"{"email": "alice@example.com"}"#)?;
        assert!(decoded.continue_url.is_none());
        Ok(())
    }

    #[test]
    fn unauthorized_body_is_generic() -> Result<()> {
        let body = serde_json::to_string(&UnauthorizedResponse::new())?;
        assert_eq!(body, r#"{"error":"Unauthorized"}"#);
        Ok(())
    }
}
