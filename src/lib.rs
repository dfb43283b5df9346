//! # Gardisto (Admin Access Control)
//!
//! `gardisto` is the access-control authority sitting in front of a content
//! publishing admin surface (posts, videos, comments, media library). Every
//! inbound request is intercepted by a [`access::guard::RouteGuard`] that
//! decides, in constant time, whether to allow, redirect, or reject.
//!
//! ## Route classification
//!
//! Paths are matched against a static policy table (longest prefix wins):
//!
//! - **Public** — allowed without any checks.
//! - **AuthOnly** — requires a valid session; unverified emails are fine.
//! - **VerifiedOnly** — requires a valid session with a verified email.
//! - **SensitiveAuthEndpoint** — rate-limited before anything else (login,
//!   password reset, media mutation).
//!
//! ## Fail closed
//!
//! Any ambiguity during a security check denies access: malformed, expired,
//! and revoked tokens never reach a protected handler; a missing signing
//! secret yields a loud 500, never a silent allow; delegated verification
//! timeouts count as expiry.
//!
//! ## Rate limiting
//!
//! Authentication endpoints are guarded by fixed-window counters keyed by IP
//! and, where applicable, normalized email. Limits are enforced before
//! credential or token work to keep abuse cheap to reject.

pub mod access;
pub mod api;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
