// Database models for Diesel
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use shared_types::{NewThread, Thread, ThreadHandle, ThreadKind};
use uuid::Uuid;

/// Database representation of threads
/// `kind` is stored as VARCHAR: "email", "account", "telegram"
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::threads)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ThreadRow {
    pub id: Uuid,
    pub kind: String,
    pub target: String,
    pub thread_handle: i64,
    pub last_subject: Option<String>,
    pub last_message_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ThreadRow> for Thread {
    type Error = crate::error::BridgeError;

    fn try_from(row: ThreadRow) -> Result<Self, Self::Error> {
        let kind = ThreadKind::from_str(&row.kind).ok_or_else(|| {
            diesel::result::Error::DeserializationError(
                format!("thread {} has unknown kind {:?}", row.id, row.kind).into(),
            )
        })?;

        Ok(Thread {
            id: row.id,
            kind,
            target: row.target,
            thread_handle: ThreadHandle(row.thread_handle),
            last_subject: row.last_subject,
            last_message_ref: row.last_message_ref,
            created_at: row.created_at,
        })
    }
}

/// Insertable struct for new threads
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::threads)]
pub struct NewThreadRow<'a> {
    pub kind: &'a str,
    pub target: &'a str,
    pub thread_handle: i64,
    pub last_subject: Option<&'a str>,
    pub last_message_ref: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a NewThread> for NewThreadRow<'a> {
    fn from(new: &'a NewThread) -> Self {
        NewThreadRow {
            kind: new.kind.as_str(),
            target: &new.target,
            thread_handle: new.thread_handle.get(),
            last_subject: new.last_subject.as_deref(),
            last_message_ref: new.last_message_ref.as_deref(),
            created_at: Utc::now(),
        }
    }
}
