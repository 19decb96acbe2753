//! Mailer de développement: écrit les emails dans les logs

use super::Mailer;

pub struct ConsoleMailer;

impl ConsoleMailer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleMailer {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailer for ConsoleMailer {
    fn send_mail(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        tracing::info!(to = %to, subject = %subject, body = %body, "[DEV] email not sent (no SMTP configured)");
        Ok(())
    }
}
