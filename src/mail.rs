use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::SmtpConfig;

/// Outbound mail seam. Handlers only ever see this trait; the concrete
/// transport is chosen at startup.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, to: &str, code: &str) -> anyhow::Result<()>;
    async fn send_password_reset(&self, to: &str, code: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());
        let transport = SmtpTransport::relay(&config.host)
            .map_err(|e| anyhow::anyhow!(e.to_string()))?
            .credentials(creds)
            .port(587)
            .timeout(Some(Duration::from_secs(10)))
            .build();
        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }

    async fn send(&self, to: &str, subject: &str, plain: String, html: String) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )?;

        // SmtpTransport is blocking; keep it off the async runtime.
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&email)).await??;
        info!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification(&self, to: &str, code: &str) -> anyhow::Result<()> {
        let plain = format!(
            "Welcome to FreightLink!\n\nYour verification code is: {code}\n\n\
             The code expires in 1 hour. If you did not sign up, ignore this email.",
        );
        let html = format!(
            "<html><body style=\"font-family: Arial, sans-serif;\">\
             <h2>Verify your email</h2>\
             <p>Your verification code is:</p>\
             <p style=\"font-size: 24px; letter-spacing: 4px;\"><b>{code}</b></p>\
             <p style=\"color: #666; font-size: 12px;\">The code expires in 1 hour. \
             If you did not sign up, ignore this email.</p>\
             </body></html>",
        );
        self.send(to, "Verify your email address", plain, html).await
    }

    async fn send_password_reset(&self, to: &str, code: &str) -> anyhow::Result<()> {
        let plain = format!(
            "Password reset requested.\n\nYour reset code is: {code}\n\n\
             The code expires in 1 hour. If you did not request this, ignore this email.",
        );
        let html = format!(
            "<html><body style=\"font-family: Arial, sans-serif;\">\
             <h2>Password reset</h2>\
             <p>Your reset code is:</p>\
             <p style=\"font-size: 24px; letter-spacing: 4px;\"><b>{code}</b></p>\
             <p style=\"color: #666; font-size: 12px;\">The code expires in 1 hour. \
             If you did not request this, ignore this email.</p>\
             </body></html>",
        );
        self.send(to, "Reset your password", plain, html).await
    }
}

/// Used when SMTP is not configured and in tests. Logs instead of sending.
#[derive(Clone)]
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send_verification(&self, to: &str, _code: &str) -> anyhow::Result<()> {
        warn!(to = %to, "mail not configured; verification email dropped");
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, _code: &str) -> anyhow::Result<()> {
        warn!(to = %to, "mail not configured; reset email dropped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smtp_mailer_builds_from_config() {
        let config = SmtpConfig {
            host: "smtp.example.com".into(),
            user: "mailer@example.com".into(),
            password: "app-password".into(),
            from: "noreply@example.com".into(),
        };
        assert!(SmtpMailer::new(&config).is_ok());
    }

    #[tokio::test]
    async fn noop_mailer_always_succeeds() {
        let mailer = NoopMailer;
        assert!(mailer.send_verification("a@x.com", "123456").await.is_ok());
        assert!(mailer.send_password_reset("a@x.com", "123456").await.is_ok());
    }
}
