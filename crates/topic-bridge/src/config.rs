use crate::error::{BridgeError, BridgeResult};
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration, loaded once at process start
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub telegram_token: String,
    /// Forum-enabled chat that holds one topic per correspondent
    pub chat_id: i64,
    pub database_url: String,
    pub database_tls: bool,
    pub imap_host: String,
    pub imap_port: u16,
    pub mailbox: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    /// SMTPS on connect instead of STARTTLS
    pub smtp_implicit_tls: bool,
    pub mail_username: String,
    pub mail_password: String,
    pub poll_interval: Duration,
    pub max_concurrent_handlers: usize,
    pub chat_long_poll: Duration,
}

impl BridgeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> BridgeResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> BridgeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| BridgeError::missing_env(key));

        Ok(Self {
            telegram_token: required("TELEGRAM_BOT_TOKEN")?,
            chat_id: parse_var(&lookup, "TELEGRAM_CHAT_ID", None)?,
            database_url: required("DATABASE_URL")?,
            database_tls: parse_var(&lookup, "DATABASE_TLS", Some(true))?,
            imap_host: required("IMAP_HOST")?,
            imap_port: parse_var(&lookup, "IMAP_PORT", Some(993))?,
            mailbox: lookup("IMAP_MAILBOX").unwrap_or_else(|| "INBOX".to_string()),
            smtp_host: required("SMTP_HOST")?,
            smtp_port: parse_var(&lookup, "SMTP_PORT", Some(587))?,
            smtp_implicit_tls: parse_var(&lookup, "SMTP_IMPLICIT_TLS", Some(false))?,
            mail_username: required("MAIL_USERNAME")?,
            mail_password: required("MAIL_PASSWORD")?,
            poll_interval: Duration::from_secs(parse_var(
                &lookup,
                "MAIL_POLL_INTERVAL_SECS",
                Some(30),
            )?),
            max_concurrent_handlers: parse_var(&lookup, "MAX_CONCURRENT_HANDLERS", Some(16))?,
            chat_long_poll: Duration::from_secs(parse_var(
                &lookup,
                "CHAT_LONG_POLL_SECS",
                Some(30),
            )?),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: Option<T>) -> BridgeResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| BridgeError::Config(format!("{} must be a valid value, got {:?}", key, raw))),
        None => default.ok_or_else(|| BridgeError::missing_env(key)),
    }
}
