//! Mail side of the bridge: the message type handed out by the mailbox,
//! the collaborator traits, and their IMAP/SMTP implementations.

pub mod body;
mod imap_client;
mod smtp;
pub mod subject;

pub use body::{extract_body, strip_quoted};
pub use imap_client::{ImapConfig, ImapMailbox};
pub use smtp::{SmtpConfig, SmtpMailSender};
pub use subject::build_reply_subject;

use crate::error::BridgeResult;
use async_trait::async_trait;
use mailparse::{MailAddr, MailHeaderMap};

/// Who a message came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    /// Display name, or the local part of the address when none was given
    pub name: String,
    /// Lowercased address, the identity threads are keyed on
    pub address: String,
}

/// One message fetched from the watched mailbox
#[derive(Debug, Clone)]
pub struct MailMessage {
    /// Sequence number within the mailbox at fetch time
    pub seq: u32,
    pub sender: Option<Sender>,
    pub subject: String,
    pub message_id: String,
    raw: Option<Vec<u8>>,
}

impl MailMessage {
    /// Build a message from its full RFC 822 source. Only the header block
    /// is parsed here; the body is parsed on demand by `extract_body`.
    pub fn from_raw(seq: u32, raw: Vec<u8>) -> Self {
        let (sender, subject, message_id) = match mailparse::parse_headers(&raw) {
            Ok((headers, _)) => {
                let sender = headers
                    .get_first_header("From")
                    .and_then(|h| mailparse::addrparse_header(h).ok())
                    .and_then(|list| list.iter().find_map(first_single_sender));
                let subject = headers.get_first_value("Subject").unwrap_or_default();
                let message_id = headers
                    .get_first_value("Message-ID")
                    .map(|v| v.trim().to_string())
                    .unwrap_or_default();
                (sender, subject, message_id)
            }
            Err(e) => {
                tracing::warn!("Failed to parse headers of message {}: {}", seq, e);
                (None, String::new(), String::new())
            }
        };

        Self {
            seq,
            sender,
            subject,
            message_id,
            raw: Some(raw),
        }
    }

    /// A message the server returned without any body section
    pub fn without_body(seq: u32, sender: Option<Sender>, subject: &str, message_id: &str) -> Self {
        Self {
            seq,
            sender,
            subject: subject.to_string(),
            message_id: message_id.to_string(),
            raw: None,
        }
    }

    /// Full message source, if the fetch returned one
    pub fn body_section(&self) -> Option<&[u8]> {
        self.raw.as_deref()
    }
}

fn first_single_sender(addr: &MailAddr) -> Option<Sender> {
    match addr {
        MailAddr::Single(info) => Some(sender_from_parts(info.display_name.as_deref(), &info.addr)),
        MailAddr::Group(group) => group
            .addrs
            .first()
            .map(|info| sender_from_parts(info.display_name.as_deref(), &info.addr)),
    }
}

fn sender_from_parts(display_name: Option<&str>, addr: &str) -> Sender {
    let address = addr.trim().to_lowercase();
    let name = match display_name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => address.split('@').next().unwrap_or_default().to_string(),
    };
    Sender { name, address }
}

/// The watched mailbox
#[async_trait]
pub trait MailboxService: Send + Sync {
    /// Current total number of messages
    async fn count(&self) -> BridgeResult<u32>;

    /// Messages with sequence numbers `from..=to`
    async fn fetch_range(&self, from: u32, to: u32) -> BridgeResult<Vec<MailMessage>>;
}

/// Outbound mail. No retries are performed by callers.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> BridgeResult<()>;

    /// Send with `In-Reply-To`/`References` set to `in_reply_to`
    async fn reply(&self, to: &str, subject: &str, in_reply_to: &str, body: &str)
        -> BridgeResult<()>;
}
