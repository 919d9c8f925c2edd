use super::MailSender;
use crate::error::{BridgeError, BridgeResult};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// SMTPS (usually port 465) instead of STARTTLS
    pub implicit_tls: bool,
}

/// Outbound mail through an authenticated SMTP relay.
/// The login name doubles as the `From` address.
pub struct SmtpMailSender {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailSender {
    pub fn new(config: &SmtpConfig) -> BridgeResult<Self> {
        let from: Mailbox = config.username.parse().map_err(|e| {
            BridgeError::Config(format!("invalid from address '{}': {}", config.username, e))
        })?;

        let creds = Credentials::new(config.username.clone(), config.password.clone());

        let relay = if config.implicit_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        };
        let builder = relay.map_err(|e| BridgeError::transport("smtp", e))?;

        let transport = builder.port(config.port).credentials(creds).build();

        Ok(Self { from, transport })
    }

    async fn deliver(
        &self,
        to: &str,
        subject: &str,
        in_reply_to: Option<&str>,
        body: &str,
    ) -> BridgeResult<()> {
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| BridgeError::transport("smtp", format!("invalid to address '{}': {}", to, e)))?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);

        if let Some(reference) = in_reply_to.filter(|r| !r.is_empty()) {
            builder = builder
                .in_reply_to(reference.to_string())
                .references(reference.to_string());
        }

        let email = builder
            .body(body.to_string())
            .map_err(|e| BridgeError::transport("smtp", format!("failed to build email: {}", e)))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| BridgeError::transport("smtp", e))?;

        tracing::info!("Sent mail to {} ({})", to, subject);
        Ok(())
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> BridgeResult<()> {
        self.deliver(to, subject, None, body).await
    }

    async fn reply(
        &self,
        to: &str,
        subject: &str,
        in_reply_to: &str,
        body: &str,
    ) -> BridgeResult<()> {
        self.deliver(to, subject, Some(in_reply_to), body).await
    }
}
