use crate::access::{
    config::AccessConfig,
    rate_limit::{InMemoryRateLimiter, RateLimiter},
    roles::RolePermissionResolver,
    session::{DelegatedVerifier, SessionVerifier},
};
use crate::api::{self, ApiContext, email::LogMailSender};
use crate::store::{AdminDirectory, InMemoryDirectory};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{fs, sync::Arc, time::Duration};
use tracing::warn;

const DELEGATE_TIMEOUT: Duration = Duration::from_secs(3);
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub frontend_base_url: String,
    pub session_secret: Option<String>,
    pub session_ttl_seconds: i64,
    pub disable_auth: bool,
    pub require_email_verification: bool,
    pub protected_prefixes: Vec<String>,
    pub allowed_redirect_origins: Vec<String>,
    pub role_overrides: Option<String>,
    pub identity_service_url: Option<String>,
    pub admins_file: Option<String>,
    pub password_reset_floor_ms: u64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let secret = SecretString::from(args.session_secret.unwrap_or_default());
    let mut config = AccessConfig::new(args.frontend_base_url, secret)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_auth_disabled(args.disable_auth)
        .with_require_email_verification(args.require_email_verification)
        .with_protected_prefixes(args.protected_prefixes)
        .with_password_reset_floor_ms(args.password_reset_floor_ms);
    for origin in args.allowed_redirect_origins {
        config = config.with_allowed_redirect_origin(origin);
    }
    if !config.auth_disabled() && !config.has_session_secret() {
        // Fail closed: the guard will answer 500 on every protected route.
        warn!("No session secret configured; all protected requests will be rejected");
    }

    let mut verifier = SessionVerifier::new(config.session_secret().clone());
    if let Some(url) = &args.identity_service_url {
        let delegate = DelegatedVerifier::new(url, DELEGATE_TIMEOUT)
            .context("Failed to build identity service client")?;
        verifier = verifier.with_delegate(delegate);
    }

    let limiter = Arc::new(InMemoryRateLimiter::new());
    let sweeper = Arc::clone(&limiter);
    tokio::spawn(async move {
        // Expired windows already count as zero; this only reclaims memory.
        loop {
            tokio::time::sleep(SWEEP_INTERVAL).await;
            sweeper.sweep();
        }
    });

    let resolver = match &args.role_overrides {
        Some(json) => RolePermissionResolver::from_overrides_json(json)
            .context("Invalid role override table")?,
        None => RolePermissionResolver::new(),
    };

    let directory: Arc<dyn AdminDirectory> = match &args.admins_file {
        Some(path) => {
            let seed = fs::read_to_string(path)
                .with_context(|| format!("Failed to read admins file: {path}"))?;
            Arc::new(
                InMemoryDirectory::from_json_str(&seed)
                    .with_context(|| format!("Invalid admins file: {path}"))?,
            )
        }
        None => {
            warn!("No admins file configured; credential login will reject everyone");
            Arc::new(InMemoryDirectory::empty())
        }
    };

    let limiter: Arc<dyn RateLimiter> = limiter;
    let context = ApiContext {
        config: Arc::new(config),
        verifier: Arc::new(verifier),
        limiter,
        resolver: Arc::new(resolver),
        directory,
        mail: Arc::new(LogMailSender),
    };

    api::serve(args.port, context).await
}
