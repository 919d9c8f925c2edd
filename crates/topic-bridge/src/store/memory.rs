use super::{InsertOutcome, ThreadStore};
use crate::error::{BridgeError, BridgeResult};
use async_trait::async_trait;
use chrono::Utc;
use shared_types::{NewThread, Thread, ThreadHandle, ThreadKind};
use std::sync::Mutex;
use uuid::Uuid;

/// In-process thread store with the same uniqueness rules as the database
#[derive(Debug, Default)]
pub struct MemoryThreadStore {
    threads: Mutex<Vec<Thread>>,
}

impl MemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored thread, in insertion order
    pub fn all(&self) -> Vec<Thread> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Thread>> {
        // A poisoned lock still holds consistent rows: every mutation below
        // is a single push or field assignment.
        self.threads.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ThreadStore for MemoryThreadStore {
    async fn find_by_target(&self, kind: ThreadKind, target: &str) -> BridgeResult<Option<Thread>> {
        Ok(self
            .lock()
            .iter()
            .find(|t| t.kind == kind && t.target == target)
            .cloned())
    }

    async fn find_by_handle(&self, handle: ThreadHandle) -> BridgeResult<Option<Thread>> {
        Ok(self
            .lock()
            .iter()
            .find(|t| t.thread_handle == handle)
            .cloned())
    }

    async fn insert_if_absent(&self, new: NewThread) -> BridgeResult<InsertOutcome> {
        let mut threads = self.lock();

        if let Some(existing) = threads
            .iter()
            .find(|t| t.kind == new.kind && t.target == new.target)
        {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }

        if threads.iter().any(|t| t.thread_handle == new.thread_handle) {
            return Err(BridgeError::Store(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                Box::new(format!("thread_handle {} already assigned", new.thread_handle)),
            )));
        }

        let thread = Thread {
            id: Uuid::new_v4(),
            kind: new.kind,
            target: new.target,
            thread_handle: new.thread_handle,
            last_subject: new.last_subject,
            last_message_ref: new.last_message_ref,
            created_at: Utc::now(),
        };
        threads.push(thread.clone());

        Ok(InsertOutcome::Inserted(thread))
    }

    async fn update_metadata(
        &self,
        handle: ThreadHandle,
        subject: &str,
        message_ref: &str,
    ) -> BridgeResult<()> {
        let mut threads = self.lock();

        let thread = threads
            .iter_mut()
            .find(|t| t.thread_handle == handle)
            .ok_or_else(|| BridgeError::not_found(format!("thread {}", handle)))?;

        thread.last_subject = Some(subject.to_string());
        thread.last_message_ref = Some(message_ref.to_string());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_then_find_both_ways() {
        let store = MemoryThreadStore::new();
        let outcome = store
            .insert_if_absent(NewThread::new(ThreadKind::Email, "a@x.com", ThreadHandle(10)))
            .await
            .unwrap();
        assert!(matches!(outcome, InsertOutcome::Inserted(_)));

        let by_target = store
            .find_by_target(ThreadKind::Email, "a@x.com")
            .await
            .unwrap()
            .expect("stored");
        let by_handle = store.find_by_handle(ThreadHandle(10)).await.unwrap().expect("stored");
        assert_eq!(by_target, by_handle);
    }

    #[tokio::test]
    async fn test_same_target_returns_existing_row() {
        let store = MemoryThreadStore::new();
        store
            .insert_if_absent(NewThread::new(ThreadKind::Email, "a@x.com", ThreadHandle(10)))
            .await
            .unwrap();

        let second = store
            .insert_if_absent(NewThread::new(ThreadKind::Email, "a@x.com", ThreadHandle(11)))
            .await
            .unwrap();

        match second {
            InsertOutcome::Existing(thread) => assert_eq!(thread.thread_handle, ThreadHandle(10)),
            other => panic!("expected existing row, got {:?}", other),
        }
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_same_target_different_kind_is_distinct() {
        let store = MemoryThreadStore::new();
        store
            .insert_if_absent(NewThread::new(ThreadKind::Email, "a@x.com", ThreadHandle(10)))
            .await
            .unwrap();
        let other = store
            .insert_if_absent(NewThread::new(ThreadKind::Account, "a@x.com", ThreadHandle(11)))
            .await
            .unwrap();

        assert!(matches!(other, InsertOutcome::Inserted(_)));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_handle_rejected() {
        let store = MemoryThreadStore::new();
        store
            .insert_if_absent(NewThread::new(ThreadKind::Email, "a@x.com", ThreadHandle(10)))
            .await
            .unwrap();

        let result = store
            .insert_if_absent(NewThread::new(ThreadKind::Email, "b@x.com", ThreadHandle(10)))
            .await;

        assert!(matches!(result, Err(BridgeError::Store(_))));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_handle_is_not_found() {
        let store = MemoryThreadStore::new();
        let err = store
            .update_metadata(ThreadHandle(99), "hi", "<m@x>")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
