//! Email sending abstraction.
//!
//! Uses Resend when an API key is configured, SMTP (lettre) otherwise.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Duration;
use lettre::{
    Message, SmtpTransport, Transport,
    message::{Mailbox, header::ContentType},
};
use resend_rs::types::CreateEmailBaseOptions;

const OTP_SUBJECT: &str = "Your Memora authentication code";

fn otp_body(code: &str, valid_for: Duration) -> String {
    format!(
        "Your verification code is: {code}\n\nThis code expires in {}.",
        describe(valid_for)
    )
}

/// "5 minutes", "1 hour", "90 seconds".
fn describe(duration: Duration) -> String {
    let secs = duration.num_seconds();
    let (count, unit) = if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };

    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Sends transactional email.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send a one-time passcode email. `valid_for` is quoted in the message.
    async fn send_otp_code(&self, to: &str, code: &str, valid_for: Duration) -> Result<()>;
}

/// Concrete sender chosen from config.
pub enum EmailSenderImpl {
    /// SMTP-based sender using lettre
    Smtp(SmtpSender),
    /// Resend API sender
    Resend(ResendSender),
}

impl EmailSenderImpl {
    /// Uses Resend if api key is provided, otherwise falls back to SMTP.
    pub fn new(
        resend_api_key: Option<String>,
        smtp_url: Option<String>,
        from: String,
    ) -> Result<Self> {
        if let Some(api_key) = resend_api_key.filter(|k| !k.is_empty()) {
            Ok(Self::Resend(ResendSender::new(api_key, from)))
        } else if let Some(url) = smtp_url.filter(|u| !u.is_empty()) {
            Ok(Self::Smtp(SmtpSender::new(&url, &from)?))
        } else {
            anyhow::bail!("Either MEMORA_RESEND_API_KEY or MEMORA_SMTP_URL must be configured")
        }
    }
}

#[async_trait]
impl EmailSender for EmailSenderImpl {
    async fn send_otp_code(&self, to: &str, code: &str, valid_for: Duration) -> Result<()> {
        match self {
            Self::Resend(sender) => sender.send_otp_code(to, code, valid_for).await,
            Self::Smtp(sender) => sender.send_otp_code(to, code, valid_for).await,
        }
    }
}

/// SMTP sender using lettre.
pub struct SmtpSender {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpSender {
    pub fn new(smtp_url: &str, from: &str) -> Result<Self> {
        let transport = SmtpTransport::from_url(smtp_url)?.build();

        Ok(Self {
            transport,
            from: from.parse()?,
        })
    }

    pub async fn send_otp_code(&self, to: &str, code: &str, valid_for: Duration) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(None, to.parse()?))
            .subject(OTP_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(otp_body(code, valid_for))?;

        // lettre's SmtpTransport blocks on network I/O
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&email)).await??;

        Ok(())
    }
}

/// Resend API sender.
pub struct ResendSender {
    client: resend_rs::Resend,
    from: String,
}

impl ResendSender {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: resend_rs::Resend::new(&api_key),
            from,
        }
    }

    pub async fn send_otp_code(&self, to: &str, code: &str, valid_for: Duration) -> Result<()> {
        let email = CreateEmailBaseOptions::new(&self.from, [to], OTP_SUBJECT)
            .with_text(&otp_body(code, valid_for));

        self.client.emails.send(email).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_body_contains_code_with_leading_zeros() {
        let body = otp_body("004211", Duration::minutes(5));

        assert!(body.contains("004211"));
        assert!(body.contains("expires in 5 minutes."));
    }

    #[test]
    fn otp_body_quotes_configured_lifetime() {
        assert!(otp_body("123456", Duration::seconds(90)).contains("expires in 90 seconds."));
        assert!(otp_body("123456", Duration::hours(1)).contains("expires in 1 hour."));
        assert!(otp_body("123456", Duration::minutes(10)).contains("expires in 10 minutes."));
    }

    #[test]
    fn requires_some_transport() {
        let result = EmailSenderImpl::new(None, Some(String::new()), "a@b.c".into());

        assert!(result.is_err());
    }

    #[test]
    fn prefers_resend_when_key_present() {
        let sender = EmailSenderImpl::new(
            Some("re_test".into()),
            Some("smtp://localhost:1025".into()),
            "Memora <noreply@memora.app>".into(),
        )
        .unwrap();

        assert!(matches!(sender, EmailSenderImpl::Resend(_)));
    }

    #[test]
    fn builds_smtp_sender_from_url() {
        let sender = EmailSenderImpl::new(
            None,
            Some("smtp://localhost:1025".into()),
            "Memora <noreply@memora.app>".into(),
        )
        .unwrap();

        assert!(matches!(sender, EmailSenderImpl::Smtp(_)));
    }
}
