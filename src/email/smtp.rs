//! Mailer SMTP pour la production

use lettre::{
    message::{header::ContentType, Mailbox},
    Message, SmtpTransport, Transport,
};

use super::Mailer;

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    /// `url` au format smtp(s)://user:password@host:port
    pub fn new(url: &str, from: &str) -> Result<Self, String> {
        let transport = SmtpTransport::from_url(url)
            .map_err(|e| format!("Failed to create SMTP transport: {}", e))?
            .build();

        let from = from
            .parse::<Mailbox>()
            .map_err(|e| format!("Invalid from address: {}", e))?;

        Ok(Self { transport, from })
    }
}

impl Mailer for SmtpMailer {
    fn send_mail(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        let to_addr = to
            .parse::<Mailbox>()
            .map_err(|e| format!("Invalid to address: {}", e))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to_addr)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| format!("Failed to build email: {}", e))?;

        self.transport
            .send(&email)
            .map_err(|e| format!("Failed to send email: {}", e))?;

        tracing::info!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}
