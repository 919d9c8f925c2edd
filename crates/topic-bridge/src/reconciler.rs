//! Maps correspondents to chat threads.
//!
//! Every `(kind, target)` pair owns at most one thread. The first message
//! from a new correspondent creates a chat thread and records it; later
//! messages reuse the stored handle.

use crate::chat::ChatPlatform;
use crate::error::{BridgeError, BridgeResult};
use crate::store::{InsertOutcome, ThreadStore};
use shared_types::{NewThread, Thread, ThreadHandle, ThreadKind};
use std::sync::Arc;

pub struct ThreadReconciler {
    store: Arc<dyn ThreadStore>,
    chat: Arc<dyn ChatPlatform>,
    space_id: i64,
}

impl ThreadReconciler {
    pub fn new(store: Arc<dyn ThreadStore>, chat: Arc<dyn ChatPlatform>, space_id: i64) -> Self {
        Self {
            store,
            chat,
            space_id,
        }
    }

    /// Handle of the thread for `(kind, target)`, creating it if needed.
    ///
    /// Two callers racing on the same new target both create a chat thread,
    /// but only one insert wins. The loser deletes its own chat thread and
    /// returns the winner's handle.
    pub async fn resolve_or_create(
        &self,
        kind: ThreadKind,
        target: &str,
        display_hint: &str,
    ) -> BridgeResult<ThreadHandle> {
        if let Some(thread) = self.store.find_by_target(kind, target).await? {
            return Ok(thread.thread_handle);
        }

        let handle = self.chat.create_thread(self.space_id, display_hint).await?;

        match self
            .store
            .insert_if_absent(NewThread::new(kind, target, handle))
            .await
        {
            Ok(InsertOutcome::Inserted(thread)) => {
                tracing::info!(
                    "Created {} thread {} for {}",
                    thread.kind,
                    thread.thread_handle,
                    thread.target
                );
                Ok(thread.thread_handle)
            }
            Ok(InsertOutcome::Existing(existing)) => {
                tracing::warn!(
                    "Thread for {} was created concurrently; discarding duplicate {}",
                    target,
                    handle
                );
                self.discard_thread(handle).await;
                Ok(existing.thread_handle)
            }
            // The write may have landed before the error surfaced; only a
            // thread no row points at is safe to delete.
            Err(e) => match self.store.find_by_target(kind, target).await {
                Ok(Some(thread)) if thread.thread_handle == handle => {
                    tracing::warn!(
                        "Insert for {} reported an error but thread {} was recorded: {}",
                        target,
                        handle,
                        e
                    );
                    Ok(handle)
                }
                Ok(_) => {
                    self.discard_thread(handle).await;
                    Err(e)
                }
                Err(lookup) => {
                    tracing::warn!(
                        "Keeping thread {} for {}, could not confirm it is unreferenced: {}",
                        handle,
                        target,
                        lookup
                    );
                    Err(e)
                }
            },
        }
    }

    /// Record the subject and message reference of the latest inbound message
    pub async fn refresh_metadata(
        &self,
        handle: ThreadHandle,
        subject: &str,
        message_ref: &str,
    ) -> BridgeResult<()> {
        self.store.update_metadata(handle, subject, message_ref).await
    }

    pub async fn resolve_by_handle(&self, handle: ThreadHandle) -> BridgeResult<Thread> {
        self.store
            .find_by_handle(handle)
            .await?
            .ok_or(BridgeError::ThreadNotFound(handle))
    }

    async fn discard_thread(&self, handle: ThreadHandle) {
        if let Err(e) = self.chat.delete_thread(self.space_id, handle).await {
            tracing::warn!("Failed to delete orphaned thread {}: {}", handle, e);
        }
    }
}
