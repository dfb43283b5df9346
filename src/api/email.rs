//! Password-reset mail delivery abstraction.
//!
//! The reset handler enqueues a message and answers the client without
//! waiting for delivery; response timing must not depend on whether the
//! account exists or the mail went out. The trait keeps delivery pluggable
//! (SMTP, API, broker); the default for local dev is `LogMailSender`, which
//! logs and returns `Ok(())`.

use anyhow::Result;
use tracing::info;

/// One password-reset message ready for delivery.
#[derive(Clone, Debug)]
pub struct ResetMail {
    pub to_email: String,
    /// Validated continue URL the mail template links back to.
    pub continue_url: String,
}

/// Mail delivery abstraction.
pub trait MailSender: Send + Sync {
    /// Deliver a message or return an error to mark it as failed.
    fn send(&self, message: &ResetMail) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real mail.
#[derive(Clone, Debug)]
pub struct LogMailSender;

impl MailSender for LogMailSender {
    fn send(&self, message: &ResetMail) -> Result<()> {
        info!(
            to_email = %message.to_email,
            continue_url = %message.continue_url,
            "password reset mail send stub"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_sender_always_succeeds() {
        let sender = LogMailSender;
        let result = sender.send(&ResetMail {
            to_email: "admin@example.com".to_string(),
            continue_url: "/admin/reset".to_string(),
        });
        assert!(result.is_ok());
    }
}
