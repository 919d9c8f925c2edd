//! In-memory stand-ins for the mailbox, the chat platform and the outbound
//! mail transport.

use crate::chat::ChatPlatform;
use crate::error::{BridgeError, BridgeResult};
use crate::mail::{MailMessage, MailSender, MailboxService};
use crate::poller::MessageHandler;
use async_trait::async_trait;
use shared_types::ThreadHandle;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Plain-text RFC 822 message
pub fn raw_message(from: &str, subject: &str, message_id: &str, body: &str) -> Vec<u8> {
    format!(
        "From: {}\r\nTo: bridge@example.com\r\nSubject: {}\r\nMessage-ID: {}\r\n\
Content-Type: text/plain; charset=utf-8\r\n\r\n{}\r\n",
        from, subject, message_id, body
    )
    .into_bytes()
}

#[derive(Default)]
pub struct FakeMailbox {
    count: Mutex<u32>,
    messages: Mutex<BTreeMap<u32, MailMessage>>,
    fetches: Mutex<Vec<(u32, u32)>>,
    fail_count: AtomicBool,
    fail_fetch: AtomicBool,
}

impl FakeMailbox {
    /// Mailbox already holding `count` messages, none of which matter
    pub fn with_messages(count: u32) -> Self {
        let mailbox = Self::default();
        mailbox.set_count(count);
        mailbox
    }

    pub fn set_count(&self, count: u32) {
        *self.count.lock().unwrap() = count;
    }

    /// Place a message at `seq` and grow the count to include it
    pub fn deliver(&self, seq: u32, from: &str, subject: &str) {
        let raw = raw_message(
            from,
            subject,
            &format!("<msg{}@example.com>", seq),
            &format!("Body of {}", subject),
        );
        self.deliver_message(MailMessage::from_raw(seq, raw));
    }

    pub fn deliver_message(&self, message: MailMessage) {
        let seq = message.seq;
        self.messages.lock().unwrap().insert(seq, message);
        let mut count = self.count.lock().unwrap();
        *count = (*count).max(seq);
    }

    pub fn fail_next_count(&self) {
        self.fail_count.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_fetch(&self) {
        self.fail_fetch.store(true, Ordering::SeqCst);
    }

    /// Every `fetch_range` call so far, failed ones included
    pub fn fetches(&self) -> Vec<(u32, u32)> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailboxService for FakeMailbox {
    async fn count(&self) -> BridgeResult<u32> {
        if self.fail_count.swap(false, Ordering::SeqCst) {
            return Err(BridgeError::transport("imap", "connection reset"));
        }
        Ok(*self.count.lock().unwrap())
    }

    async fn fetch_range(&self, from: u32, to: u32) -> BridgeResult<Vec<MailMessage>> {
        self.fetches.lock().unwrap().push((from, to));
        if self.fail_fetch.swap(false, Ordering::SeqCst) {
            return Err(BridgeError::transport("imap", "fetch timed out"));
        }
        Ok(self
            .messages
            .lock()
            .unwrap()
            .range(from..=to)
            .map(|(_, m)| m.clone())
            .collect())
    }
}

/// Forwards every handled message to a channel
pub struct RecordingHandler {
    tx: mpsc::UnboundedSender<MailMessage>,
}

impl RecordingHandler {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MailMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn handle_message(&self, message: MailMessage) {
        let _ = self.tx.send(message);
    }
}

/// Chat platform that hands out increasing handles and records every call
pub struct FakeChat {
    next_handle: AtomicI64,
    created: Mutex<Vec<(i64, String, ThreadHandle)>>,
    posts: Mutex<Vec<(ThreadHandle, String)>>,
    deleted: Mutex<Vec<ThreadHandle>>,
    fail_create: AtomicBool,
}

impl FakeChat {
    pub fn new() -> Self {
        Self {
            next_handle: AtomicI64::new(100),
            created: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            fail_create: AtomicBool::new(false),
        }
    }

    pub fn fail_next_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<(i64, String, ThreadHandle)> {
        self.created.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<(ThreadHandle, String)> {
        self.posts.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<ThreadHandle> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatPlatform for FakeChat {
    async fn create_thread(&self, space_id: i64, title: &str) -> BridgeResult<ThreadHandle> {
        // Suspend once so concurrent callers interleave here
        tokio::task::yield_now().await;

        if self.fail_create.swap(false, Ordering::SeqCst) {
            return Err(BridgeError::transport("telegram", "Too Many Requests"));
        }

        let handle = ThreadHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.created
            .lock()
            .unwrap()
            .push((space_id, title.to_string(), handle));
        Ok(handle)
    }

    async fn post_message(
        &self,
        _space_id: i64,
        handle: ThreadHandle,
        text: &str,
    ) -> BridgeResult<()> {
        self.posts.lock().unwrap().push((handle, text.to_string()));
        Ok(())
    }

    async fn delete_thread(&self, _space_id: i64, handle: ThreadHandle) -> BridgeResult<()> {
        self.deleted.lock().unwrap().push(handle);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub in_reply_to: Option<String>,
    pub body: String,
}

#[derive(Default)]
pub struct FakeSender {
    sent: Mutex<Vec<SentMail>>,
}

impl FakeSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailSender for FakeSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> BridgeResult<()> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            in_reply_to: None,
            body: body.to_string(),
        });
        Ok(())
    }

    async fn reply(
        &self,
        to: &str,
        subject: &str,
        in_reply_to: &str,
        body: &str,
    ) -> BridgeResult<()> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            in_reply_to: Some(in_reply_to.to_string()),
            body: body.to_string(),
        });
        Ok(())
    }
}
