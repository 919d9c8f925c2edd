//! The two event paths of the bridge.
//!
//! Inbound: a new mail is posted into its sender's thread, creating the
//! thread on first contact. Outbound: a person typing in an email thread
//! sends a reply to the correspondent.

use crate::chat::{ChatPlatform, ChatUpdate, UpdateHandler};
use crate::error::{BridgeError, BridgeResult};
use crate::mail::{build_reply_subject, extract_body, strip_quoted, MailMessage, MailSender};
use crate::poller::MessageHandler;
use crate::reconciler::ThreadReconciler;
use async_trait::async_trait;
use shared_types::{ThreadHandle, ThreadKind};
use std::sync::Arc;

pub struct Bridge {
    reconciler: ThreadReconciler,
    chat: Arc<dyn ChatPlatform>,
    sender: Arc<dyn MailSender>,
    space_id: i64,
}

impl Bridge {
    pub fn new(
        reconciler: ThreadReconciler,
        chat: Arc<dyn ChatPlatform>,
        sender: Arc<dyn MailSender>,
        space_id: i64,
    ) -> Self {
        Self {
            reconciler,
            chat,
            sender,
            space_id,
        }
    }

    /// Post a newly arrived mail into its sender's thread.
    ///
    /// Returns `Ok(None)` when the message has no usable sender and was
    /// skipped. The thread metadata is refreshed before the body is parsed,
    /// so replies target the latest message even if its body is unreadable.
    pub async fn handle_inbound_mail(
        &self,
        message: &MailMessage,
    ) -> BridgeResult<Option<ThreadHandle>> {
        let Some(sender) = message.sender.as_ref().filter(|s| !s.address.is_empty()) else {
            tracing::warn!("Message {} has no sender address; skipping", message.seq);
            return Ok(None);
        };

        let title = format!("{} ({})", sender.name, sender.address);
        let handle = self
            .reconciler
            .resolve_or_create(ThreadKind::Email, &sender.address, &title)
            .await?;

        self.reconciler
            .refresh_metadata(handle, &message.subject, &message.message_id)
            .await?;

        let body = extract_body(message)?;
        let text = format!("{}\n\n{}", message.subject, strip_quoted(&body));
        self.chat.post_message(self.space_id, handle, &text).await?;

        tracing::info!(
            "Forwarded message {} from {} to thread {}",
            message.seq,
            sender.address,
            handle
        );
        Ok(Some(handle))
    }

    /// Turn a chat message typed into an email thread into a reply mail.
    ///
    /// Updates from other chats, bot accounts, outside any thread, or in
    /// threads of another kind are ignored. A thread this bridge does not
    /// know fails with `ThreadNotFound`.
    pub async fn handle_chat_update(&self, update: &ChatUpdate) -> BridgeResult<()> {
        if update.space_id != self.space_id || update.from_bot {
            return Ok(());
        }
        let Some(handle) = update.thread_handle else {
            return Ok(());
        };
        if update.text.trim().is_empty() {
            tracing::debug!("Ignoring empty message in thread {}", handle);
            return Ok(());
        }

        let thread = self.reconciler.resolve_by_handle(handle).await?;

        if thread.kind != ThreadKind::Email {
            tracing::debug!("Ignoring message in {} thread {}", thread.kind, handle);
            return Ok(());
        }

        let subject = build_reply_subject(thread.last_subject.as_deref().unwrap_or_default());
        let body = format!("{}\n\nSent from {}", update.text, update.sender_name);

        match thread.last_message_ref.as_deref().filter(|r| !r.is_empty()) {
            Some(reference) => {
                self.sender
                    .reply(&thread.target, &subject, reference, &body)
                    .await?
            }
            None => self.sender.send(&thread.target, &subject, &body).await?,
        }

        tracing::info!("Sent reply from thread {} to {}", handle, thread.target);
        Ok(())
    }
}

fn log_failure(context: &str, err: &BridgeError) {
    match err {
        e if e.is_not_found() => tracing::debug!("{}: {}", context, e),
        BridgeError::NoReadableBody(_) => tracing::warn!("{}: {}", context, err),
        _ => tracing::error!("{}: {}", context, err),
    }
}

#[async_trait]
impl MessageHandler for Bridge {
    async fn handle_message(&self, message: MailMessage) {
        if let Err(e) = self.handle_inbound_mail(&message).await {
            log_failure(&format!("Dropping message {}", message.seq), &e);
        }
    }
}

#[async_trait]
impl UpdateHandler for Bridge {
    async fn handle_update(&self, update: ChatUpdate) {
        if let Err(e) = self.handle_chat_update(&update).await {
            log_failure("Chat message not forwarded", &e);
        }
    }
}
