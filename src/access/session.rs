//! Session token verification.
//!
//! Two strategies produce the same [`SessionDescriptor`]:
//!
//! - **Local**: HMAC-SHA256 signature plus expiry check against a shared
//!   secret. No I/O; used for self-issued tokens (the fast path on GETs).
//! - **Delegated**: one call to the identity service, which can also detect
//!   revocation. Opt-in per verification; any transport failure or timeout
//!   fails closed as `ExpiredSession`.
//!
//! Verification has no side effects. A descriptor is derived fresh from the
//! raw token on every request and never constructed anywhere else.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::warn;
use uuid::Uuid;

use super::roles::Role;

type HmacSha256 = Hmac<Sha256>;

/// Proof of a prior authentication, derived from a verified token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub subject_id: Uuid,
    pub email: String,
    pub role: Role,
    pub email_verified: bool,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// Typed verification failures. The boundary collapses all of these into a
/// single generic unauthorized response; the kind is only logged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("invalid session")]
    InvalidSession,
    #[error("expired session")]
    ExpiredSession,
    #[error("revoked session")]
    RevokedSession,
    #[error("malformed token")]
    MalformedToken,
    #[error("verifier misconfigured: missing signing secret")]
    Misconfigured,
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(0))
}

/// Verdict returned by the identity service for a delegated check.
#[derive(Debug, Serialize, Deserialize)]
struct RemoteVerdict {
    active: bool,
    #[serde(default)]
    revoked: bool,
    descriptor: Option<SessionDescriptor>,
}

#[derive(Debug, Serialize)]
struct RemoteVerifyRequest<'a> {
    token: &'a str,
    check_revocation: bool,
}

/// Client for the identity service's verification endpoint.
#[derive(Clone, Debug)]
pub struct DelegatedVerifier {
    client: reqwest::Client,
    verify_url: String,
}

impl DelegatedVerifier {
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(timeout)
            .build()?;
        let base = base_url.trim_end_matches('/');
        Ok(Self {
            client,
            verify_url: format!("{base}/v1/sessions/verify"),
        })
    }

    /// Ask the identity service for a verdict, including revocation state.
    ///
    /// Fail closed: anything short of an affirmative, well-formed answer is
    /// an error, and transport failures count as expiry rather than being
    /// assumed valid.
    async fn verify(&self, raw_token: &str) -> Result<SessionDescriptor, VerifyError> {
        let response = self
            .client
            .post(&self.verify_url)
            .json(&RemoteVerifyRequest {
                token: raw_token,
                check_revocation: true,
            })
            .send()
            .await
            .map_err(|err| {
                warn!("Delegated session verification unreachable: {err}");
                VerifyError::ExpiredSession
            })?;

        if !response.status().is_success() {
            return Err(VerifyError::InvalidSession);
        }

        let verdict: RemoteVerdict = response.json().await.map_err(|err| {
            warn!("Delegated session verification returned garbage: {err}");
            VerifyError::ExpiredSession
        })?;

        if verdict.revoked {
            return Err(VerifyError::RevokedSession);
        }
        if !verdict.active {
            return Err(VerifyError::InvalidSession);
        }
        let descriptor = verdict.descriptor.ok_or(VerifyError::InvalidSession)?;
        check_expiry(&descriptor, unix_now())?;
        Ok(descriptor)
    }
}

/// No positive leeway: a token whose expiry equals "now" is already expired.
fn check_expiry(descriptor: &SessionDescriptor, now: i64) -> Result<(), VerifyError> {
    if descriptor.expires_at <= now {
        return Err(VerifyError::ExpiredSession);
    }
    Ok(())
}

/// Validates opaque signed session tokens into descriptors.
pub struct SessionVerifier {
    secret: SecretString,
    delegate: Option<DelegatedVerifier>,
}

impl SessionVerifier {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            delegate: None,
        }
    }

    /// Enable delegated verification against the identity service.
    #[must_use]
    pub fn with_delegate(mut self, delegate: DelegatedVerifier) -> Self {
        self.delegate = Some(delegate);
        self
    }

    fn mac(&self) -> Result<HmacSha256, VerifyError> {
        let secret = self.secret.expose_secret();
        if secret.is_empty() {
            // Never degrade to "allow" on a missing secret.
            return Err(VerifyError::Misconfigured);
        }
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| VerifyError::Misconfigured)
    }

    /// Sign a descriptor into a cookie-sized token.
    ///
    /// # Errors
    /// Returns `Misconfigured` when no signing secret is available.
    pub fn issue(&self, descriptor: &SessionDescriptor) -> Result<String, VerifyError> {
        let payload =
            serde_json::to_vec(descriptor).map_err(|_| VerifyError::MalformedToken)?;
        let mut mac = self.mac()?;
        mac.update(&payload);
        let tag = mac.finalize().into_bytes();
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload),
            URL_SAFE_NO_PAD.encode(tag)
        ))
    }

    /// Local strategy: signature plus expiry check, no I/O.
    ///
    /// # Errors
    /// Returns a [`VerifyError`] describing why the token was not accepted.
    pub fn verify_local(&self, raw_token: &str) -> Result<SessionDescriptor, VerifyError> {
        self.verify_local_at(raw_token, unix_now())
    }

    fn verify_local_at(&self, raw_token: &str, now: i64) -> Result<SessionDescriptor, VerifyError> {
        let trimmed = raw_token.trim();
        if trimmed.is_empty() {
            return Err(VerifyError::MalformedToken);
        }
        let (payload_b64, tag_b64) = trimmed
            .split_once('.')
            .ok_or(VerifyError::MalformedToken)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| VerifyError::MalformedToken)?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag_b64)
            .map_err(|_| VerifyError::MalformedToken)?;

        // Constant-time comparison via the Mac verifier; a forged payload and
        // a forged tag are indistinguishable to the caller.
        let mut mac = self.mac()?;
        mac.update(&payload);
        mac.verify_slice(&tag)
            .map_err(|_| VerifyError::InvalidSession)?;

        let descriptor: SessionDescriptor =
            serde_json::from_slice(&payload).map_err(|_| VerifyError::MalformedToken)?;
        check_expiry(&descriptor, now)?;
        Ok(descriptor)
    }

    /// Verify a raw token. The revocation check is opt-in per call and only
    /// available when a delegate is configured; without one the local
    /// strategy answers.
    ///
    /// # Errors
    /// Returns a [`VerifyError`] describing why the token was not accepted.
    pub async fn verify(
        &self,
        raw_token: &str,
        check_revocation: bool,
    ) -> Result<SessionDescriptor, VerifyError> {
        if check_revocation {
            if let Some(delegate) = &self.delegate {
                return delegate.verify(raw_token).await;
            }
        }
        self.verify_local(raw_token)
    }
}
