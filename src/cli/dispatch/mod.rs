//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the
//! appropriate action, such as starting the guard server with its full
//! configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::access;
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let access = access::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        frontend_base_url: access.frontend_base_url,
        session_secret: access.session_secret,
        session_ttl_seconds: access.session_ttl_seconds,
        disable_auth: access.disable_auth,
        require_email_verification: access.require_email_verification,
        protected_prefixes: access.protected_prefixes,
        allowed_redirect_origins: access.allowed_redirect_origins,
        role_overrides: access.role_overrides,
        identity_service_url: access.identity_service_url,
        admins_file: access.admins_file,
        password_reset_floor_ms: access.password_reset_floor_ms,
    }))
}
