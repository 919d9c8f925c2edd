use super::{MailMessage, MailboxService};
use crate::error::{BridgeError, BridgeResult};
use async_imap::Session;
use async_native_tls::TlsStream;
use async_trait::async_trait;
use futures::TryStreamExt;
use std::collections::BTreeMap;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

type ImapSession = Session<TlsStream<Compat<TcpStream>>>;

#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub mailbox: String,
}

/// IMAP mailbox over implicit TLS.
///
/// One session is shared behind a lock. Any failed command drops the session
/// and the next call reconnects.
pub struct ImapMailbox {
    config: ImapConfig,
    session: Mutex<Option<ImapSession>>,
}

impl ImapMailbox {
    /// Connect and log in eagerly so bad credentials fail at startup
    pub async fn connect(config: ImapConfig) -> BridgeResult<Self> {
        let session = open_session(&config).await?;

        Ok(Self {
            config,
            session: Mutex::new(Some(session)),
        })
    }

    pub async fn logout(&self) {
        if let Some(mut session) = self.session.lock().await.take() {
            if let Err(e) = session.logout().await {
                tracing::debug!("IMAP logout failed: {}", e);
            }
        }
    }
}

async fn open_session(config: &ImapConfig) -> BridgeResult<ImapSession> {
    let tcp = TcpStream::connect((config.host.as_str(), config.port))
        .await
        .map_err(|e| BridgeError::transport("imap", format!("connect failed: {}", e)))?;

    let tls = async_native_tls::TlsConnector::new();
    let tls_stream = tls
        .connect(config.host.as_str(), tcp.compat())
        .await
        .map_err(|e| BridgeError::transport("imap", format!("TLS handshake failed: {}", e)))?;

    let client = async_imap::Client::new(tls_stream);

    let session = client
        .login(&config.username, &config.password)
        .await
        .map_err(|e| BridgeError::transport("imap", format!("login failed: {}", e.0)))?;

    tracing::info!("Logged in to IMAP server {}:{}", config.host, config.port);

    Ok(session)
}

async fn ensure_session<'a>(
    config: &ImapConfig,
    slot: &'a mut Option<ImapSession>,
) -> BridgeResult<&'a mut ImapSession> {
    if slot.is_none() {
        tracing::debug!("Reconnecting to IMAP server {}", config.host);
        *slot = Some(open_session(config).await?);
    }

    slot.as_mut()
        .ok_or_else(|| BridgeError::transport("imap", "session unavailable"))
}

#[async_trait]
impl MailboxService for ImapMailbox {
    async fn count(&self) -> BridgeResult<u32> {
        let mut slot = self.session.lock().await;
        let session = ensure_session(&self.config, &mut slot).await?;

        // SELECT again on every call so EXISTS reflects the live mailbox
        match session.select(&self.config.mailbox).await {
            Ok(mailbox) => Ok(mailbox.exists),
            Err(e) => {
                *slot = None;
                Err(BridgeError::transport(
                    "imap",
                    format!("failed to select {}: {}", self.config.mailbox, e),
                ))
            }
        }
    }

    async fn fetch_range(&self, from: u32, to: u32) -> BridgeResult<Vec<MailMessage>> {
        let mut slot = self.session.lock().await;
        let session = ensure_session(&self.config, &mut slot).await?;

        let range = format!("{}:{}", from, to);
        let fetched: Result<Vec<_>, _> = match session.fetch(&range, "(UID RFC822)").await {
            Ok(stream) => stream.try_collect().await,
            Err(e) => Err(e),
        };

        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                *slot = None;
                return Err(BridgeError::transport(
                    "imap",
                    format!("failed to fetch {}: {}", range, e),
                ));
            }
        };

        // Unsolicited FETCH responses (flag changes) can arrive for any
        // sequence number and carry no body; keep one entry per requested
        // message, preferring the one with content.
        let mut messages: BTreeMap<u32, MailMessage> = BTreeMap::new();
        for fetch in &fetched {
            let seq = fetch.message;
            if seq < from || seq > to {
                continue;
            }

            match fetch.body() {
                Some(body) => {
                    messages.insert(seq, MailMessage::from_raw(seq, body.to_vec()));
                }
                None => {
                    messages
                        .entry(seq)
                        .or_insert_with(|| MailMessage::without_body(seq, None, "", ""));
                }
            }
        }

        Ok(messages.into_values().collect())
    }
}
