//! Auth endpoint handlers: login, session introspection, logout, and
//! password reset.

pub mod login;
pub mod password_reset;
pub mod session;
pub mod types;

pub use login::login;
pub use password_reset::password_reset;
pub use session::{logout, session};
