use super::{display_name, ChatPlatform, ChatUpdate};
use crate::error::{BridgeError, BridgeResult};
use async_trait::async_trait;
use shared_types::ThreadHandle;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ThreadId};

/// Telegram caps forum topic names at 128 UTF-16 code units
const MAX_TOPIC_NAME: usize = 128;
/// and message text at 4096
const MAX_MESSAGE_TEXT: usize = 4096;

/// Telegram chat platform. Threads are forum topics in a supergroup.
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }

    /// Bot handle shared with the update listener
    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }
}

#[async_trait]
impl ChatPlatform for TelegramClient {
    async fn create_thread(&self, space_id: i64, title: &str) -> BridgeResult<ThreadHandle> {
        let name = clip(title, MAX_TOPIC_NAME);
        let topic = self
            .bot
            .create_forum_topic(ChatId(space_id), name)
            .await
            .map_err(|e| BridgeError::transport("telegram", format!("createForumTopic: {}", e)))?;

        let handle = ThreadHandle(i64::from(topic.thread_id.0 .0));
        tracing::info!("Created topic {} ({})", handle, name);
        Ok(handle)
    }

    async fn post_message(
        &self,
        space_id: i64,
        handle: ThreadHandle,
        text: &str,
    ) -> BridgeResult<()> {
        self.bot
            .send_message(ChatId(space_id), clip(text, MAX_MESSAGE_TEXT))
            .message_thread_id(thread_id(handle)?)
            .await
            .map_err(|e| BridgeError::transport("telegram", format!("sendMessage: {}", e)))?;

        Ok(())
    }

    async fn delete_thread(&self, space_id: i64, handle: ThreadHandle) -> BridgeResult<()> {
        self.bot
            .delete_forum_topic(ChatId(space_id), thread_id(handle)?)
            .await
            .map_err(|e| BridgeError::transport("telegram", format!("deleteForumTopic: {}", e)))?;

        Ok(())
    }
}

/// Topic id as the Bot API types it
fn thread_id(handle: ThreadHandle) -> BridgeResult<ThreadId> {
    let id = i32::try_from(handle.get()).map_err(|_| {
        BridgeError::transport("telegram", format!("thread handle {} out of range", handle))
    })?;
    Ok(ThreadId(MessageId(id)))
}

/// Bridge view of a chat message. `None` for messages with neither text nor
/// caption (stickers, service messages).
pub(crate) fn chat_update_from(msg: &Message) -> Option<ChatUpdate> {
    let text = msg.text().or_else(|| msg.caption())?;

    let (sender_name, from_bot) = match &msg.from {
        Some(user) => (
            display_name(&user.first_name, user.last_name.as_deref()),
            user.is_bot,
        ),
        None => (String::new(), false),
    };

    // Replies outside a topic still carry a thread id; only topic messages map
    // to a bridged thread
    let thread_handle = if msg.is_topic_message {
        msg.thread_id.map(|id| ThreadHandle(i64::from(id.0 .0)))
    } else {
        None
    };

    Some(ChatUpdate {
        space_id: msg.chat.id.0,
        thread_handle,
        text: text.to_string(),
        sender_name,
        from_bot,
    })
}

/// Longest prefix of `text` within `max_units` UTF-16 code units, the unit
/// Telegram measures lengths in.
fn clip(text: &str, max_units: usize) -> &str {
    let mut units = 0;
    for (idx, ch) in text.char_indices() {
        units += ch.len_utf16();
        if units > max_units {
            return &text[..idx];
        }
    }
    text
}
