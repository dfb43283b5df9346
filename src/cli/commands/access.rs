//! Access-control arguments: enforcement flags, secrets, and stores.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_DISABLE_AUTH: &str = "disable-auth";
pub const ARG_REQUIRE_EMAIL_VERIFICATION: &str = "require-email-verification";
pub const ARG_PROTECTED_PREFIX: &str = "protected-prefix";
pub const ARG_ALLOWED_REDIRECT_ORIGIN: &str = "allowed-redirect-origin";
pub const ARG_ROLE_OVERRIDES: &str = "role-overrides";
pub const ARG_IDENTITY_SERVICE_URL: &str = "identity-service-url";
pub const ARG_ADMINS_FILE: &str = "admins-file";
pub const ARG_PASSWORD_RESET_FLOOR_MS: &str = "password-reset-floor-ms";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Base URL of the admin frontend, used for CORS and the redirect allow-list")
                .env("GARDISTO_FRONTEND_BASE_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("HMAC secret for session tokens; without it every protected request is rejected")
                .env("GARDISTO_SESSION_SECRET"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session lifetime in seconds")
                .default_value("43200")
                .env("GARDISTO_SESSION_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_DISABLE_AUTH)
                .long(ARG_DISABLE_AUTH)
                .help("Disable all enforcement (test environments only)")
                .env("GARDISTO_DISABLE_AUTH")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_REQUIRE_EMAIL_VERIFICATION)
                .long(ARG_REQUIRE_EMAIL_VERIFICATION)
                .help("Require a verified email before granting the admin surface")
                .default_value("true")
                .env("GARDISTO_REQUIRE_EMAIL_VERIFICATION")
                .action(ArgAction::Set)
                .value_parser(clap::value_parser!(bool)),
        )
        .arg(
            Arg::new(ARG_PROTECTED_PREFIX)
                .long(ARG_PROTECTED_PREFIX)
                .help("Extra path prefix to protect as verified-only (repeatable)")
                .env("GARDISTO_PROTECTED_PREFIX")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new(ARG_ALLOWED_REDIRECT_ORIGIN)
                .long(ARG_ALLOWED_REDIRECT_ORIGIN)
                .help("Extra origin allowed as a redirect target (repeatable)")
                .env("GARDISTO_ALLOWED_REDIRECT_ORIGIN")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new(ARG_ROLE_OVERRIDES)
                .long(ARG_ROLE_OVERRIDES)
                .help("JSON object replacing built-in role capabilities, keyed by role name")
                .env("GARDISTO_ROLE_OVERRIDES"),
        )
        .arg(
            Arg::new(ARG_IDENTITY_SERVICE_URL)
                .long(ARG_IDENTITY_SERVICE_URL)
                .help("Identity service base URL for delegated verification with revocation")
                .env("GARDISTO_IDENTITY_SERVICE_URL"),
        )
        .arg(
            Arg::new(ARG_ADMINS_FILE)
                .long(ARG_ADMINS_FILE)
                .help("Path to the JSON admin directory seed")
                .env("GARDISTO_ADMINS_FILE"),
        )
        .arg(
            Arg::new(ARG_PASSWORD_RESET_FLOOR_MS)
                .long(ARG_PASSWORD_RESET_FLOOR_MS)
                .help("Minimum password reset response time in milliseconds")
                .default_value("400")
                .env("GARDISTO_PASSWORD_RESET_FLOOR_MS")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct Options {
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

impl Options {
    /// Extract the access options from parsed matches.
    ///
    /// # Errors
    /// Returns an error when a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let many = |name: &str| -> Vec<String> {
            matches
                .get_many::<String>(name)
                .map(|values| values.cloned().collect())
                .unwrap_or_default()
        };
        Ok(Self {
            frontend_base_url: matches
                .get_one::<String>(ARG_FRONTEND_BASE_URL)
                .cloned()
                .context("missing required argument: --frontend-base-url")?,
            session_secret: matches.get_one::<String>(ARG_SESSION_SECRET).cloned(),
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(43200),
            disable_auth: matches.get_flag(ARG_DISABLE_AUTH),
            require_email_verification: matches
                .get_one::<bool>(ARG_REQUIRE_EMAIL_VERIFICATION)
                .copied()
                .unwrap_or(true),
            protected_prefixes: many(ARG_PROTECTED_PREFIX),
            allowed_redirect_origins: many(ARG_ALLOWED_REDIRECT_ORIGIN),
            role_overrides: matches.get_one::<String>(ARG_ROLE_OVERRIDES).cloned(),
            identity_service_url: matches.get_one::<String>(ARG_IDENTITY_SERVICE_URL).cloned(),
            admins_file: matches.get_one::<String>(ARG_ADMINS_FILE).cloned(),
            password_reset_floor_ms: matches
                .get_one::<u64>(ARG_PASSWORD_RESET_FLOOR_MS)
                .copied()
                .unwrap_or(400),
        })
    }
}
