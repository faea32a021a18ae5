//! SMTP delivery through lettre.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use skymail_core::integrations::{MailTransport, Result, UpstreamError};
use skymail_core::subscription::MailMessage;

/// Connection settings for [`SmtpMailer`].
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

/// Sends HTML emails over an authenticated TLS relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let from = parse_mailbox(&settings.from)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|e| UpstreamError::Mail(e.to_string()))?
            .port(settings.port);

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|_| UpstreamError::InvalidAddress(address.to_string()))
}

/// Builds the lettre message for `message`, one `To` header per recipient.
fn build_message(from: &Mailbox, message: &MailMessage) -> Result<Message> {
    let mut builder = Message::builder()
        .from(from.clone())
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_HTML);

    for recipient in &message.to {
        builder = builder.to(parse_mailbox(recipient)?);
    }

    builder
        .body(message.body.clone())
        .map_err(|e| UpstreamError::Mail(e.to_string()))
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        let email = build_message(&self.from, message)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| UpstreamError::Mail(e.to_string()))?;

        tracing::debug!(to = ?message.to, subject = %message.subject, "Email sent");
        Ok(())
    }
}
