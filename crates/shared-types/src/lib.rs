use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Thread Types
// ============================================================================

/// Origin of the external identity a thread is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadKind {
    Email,
    Account,
    Telegram,
}

impl ThreadKind {
    pub fn as_str(&self) -> &str {
        match self {
            ThreadKind::Email => "email",
            ThreadKind::Account => "account",
            ThreadKind::Telegram => "telegram",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "email" => Some(ThreadKind::Email),
            "account" => Some(ThreadKind::Account),
            "telegram" => Some(ThreadKind::Telegram),
            _ => None,
        }
    }
}

impl fmt::Display for ThreadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform-assigned id of a chat conversation (a forum topic on Telegram)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadHandle(pub i64);

impl ThreadHandle {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ThreadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted correlation between one external identity and one chat thread.
///
/// `(kind, target)` and `thread_handle` are both unique. The handle never
/// changes once assigned; `last_subject` and `last_message_ref` follow the
/// most recent inbound message and are never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub kind: ThreadKind,
    pub target: String,
    pub thread_handle: ThreadHandle,
    pub last_subject: Option<String>,
    pub last_message_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new thread row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewThread {
    pub kind: ThreadKind,
    pub target: String,
    pub thread_handle: ThreadHandle,
    pub last_subject: Option<String>,
    pub last_message_ref: Option<String>,
}

impl NewThread {
    pub fn new(kind: ThreadKind, target: impl Into<String>, thread_handle: ThreadHandle) -> Self {
        Self {
            kind,
            target: target.into(),
            thread_handle,
            last_subject: None,
            last_message_ref: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in [ThreadKind::Email, ThreadKind::Account, ThreadKind::Telegram] {
            assert_eq!(ThreadKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(ThreadKind::from_str("sms"), None);
    }

    #[test]
    fn test_handle_serializes_as_bare_number() {
        let json = serde_json::to_string(&ThreadHandle(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_new_thread_starts_without_metadata() {
        let new = NewThread::new(ThreadKind::Email, "a@x.com", ThreadHandle(7));
        assert_eq!(new.target, "a@x.com");
        assert!(new.last_subject.is_none());
        assert!(new.last_message_ref.is_none());
    }
}
