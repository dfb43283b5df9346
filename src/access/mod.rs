//! Access-control core: route classification, session verification, rate
//! limiting, role capabilities, and the request guard tying them together.

pub mod config;
pub mod cookies;
pub mod guard;
pub mod rate_limit;
pub mod roles;
pub mod routes;
pub mod session;
pub mod state_machine;

pub use config::AccessConfig;
pub use guard::{Decision, RouteGuard, Verdict};
pub use rate_limit::{InMemoryRateLimiter, RateLimiter, RateScope};
pub use roles::{Capabilities, Capability, Role, RolePermissionResolver, Section};
pub use routes::{RouteClass, RoutePolicy};
pub use session::{SessionDescriptor, SessionVerifier, VerifyError};
pub use state_machine::{AccessEvent, AccessState, AccessStateMachine};
