//! Envoi d'emails transactionnels (reset password, mot de passe temporaire,
//! notifications de tickets). Les routes n'appellent jamais un Mailer
//! directement: elles écrivent dans l'outbox, le worker appelle le Mailer.

pub mod console;
pub mod smtp;
pub mod templates;

use std::sync::Arc;

pub use console::ConsoleMailer;
pub use smtp::SmtpMailer;
pub use templates::OutgoingEmail;

use crate::config::AppConfig;

/// Capacité minimale attendue d'un transport email.
/// Bloquant: le worker l'appelle depuis `spawn_blocking`.
pub trait Mailer: Send + Sync {
    fn send_mail(&self, to: &str, subject: &str, body: &str) -> Result<(), String>;
}

/// SMTP si EMAIL_SERVER est défini, sinon emails affichés dans les logs
pub fn build_mailer(config: &AppConfig) -> Result<Arc<dyn Mailer>, String> {
    match &config.email_server {
        Some(url) => {
            let mailer = SmtpMailer::new(url, &config.email_from)?;
            Ok(Arc::new(mailer))
        }
        None => {
            tracing::warn!("EMAIL_SERVER not set; emails will be printed to the log");
            Ok(Arc::new(ConsoleMailer::new()))
        }
    }
}
