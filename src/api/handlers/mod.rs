//! HTTP handlers for the admin API surface.

pub mod auth;
pub mod health;
pub mod sections;
