//! Chat side of the bridge: creating and posting into per-correspondent
//! threads, and receiving messages typed into them.

mod listener;
mod telegram;

pub use listener::{ChatListener, UpdateHandler};
pub use telegram::TelegramClient;

use crate::error::BridgeResult;
use async_trait::async_trait;
use shared_types::ThreadHandle;

/// A message typed by someone in the chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUpdate {
    /// Chat the message was posted in
    pub space_id: i64,
    /// Set only for messages posted inside a topic
    pub thread_handle: Option<ThreadHandle>,
    pub text: String,
    pub sender_name: String,
    pub from_bot: bool,
}

/// Thread operations on the chat platform
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn create_thread(&self, space_id: i64, title: &str) -> BridgeResult<ThreadHandle>;

    async fn post_message(&self, space_id: i64, handle: ThreadHandle, text: &str)
        -> BridgeResult<()>;

    async fn delete_thread(&self, space_id: i64, handle: ThreadHandle) -> BridgeResult<()>;
}

/// "First Last", or just the first name
pub fn display_name(first_name: &str, last_name: Option<&str>) -> String {
    match last_name.map(str::trim).filter(|l| !l.is_empty()) {
        Some(last) => format!("{} {}", first_name.trim(), last),
        None => first_name.trim().to_string(),
    }
}
