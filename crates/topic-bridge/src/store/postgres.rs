use super::{InsertOutcome, ThreadStore};
use crate::db::DbPool;
use crate::error::{BridgeError, BridgeResult};
use crate::models::{NewThreadRow, ThreadRow};
use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use shared_types::{NewThread, Thread, ThreadHandle, ThreadKind};

/// Thread store backed by the `threads` table.
///
/// Uniqueness of `(kind, target)` and of `thread_handle` is enforced by the
/// database's unique indexes; see `migrations/`.
#[derive(Clone)]
pub struct PgThreadStore {
    pool: DbPool,
}

impl PgThreadStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

async fn get_by_target(
    conn: &mut AsyncPgConnection,
    thread_kind: ThreadKind,
    target_addr: &str,
) -> BridgeResult<Option<Thread>> {
    use crate::schema::threads::dsl::*;

    let row = threads
        .filter(kind.eq(thread_kind.as_str()))
        .filter(target.eq(target_addr))
        .select(ThreadRow::as_select())
        .first::<ThreadRow>(conn)
        .await
        .optional()?;

    row.map(Thread::try_from).transpose()
}

#[async_trait]
impl ThreadStore for PgThreadStore {
    async fn find_by_target(
        &self,
        thread_kind: ThreadKind,
        target_addr: &str,
    ) -> BridgeResult<Option<Thread>> {
        let mut conn = self.pool.get().await?;
        get_by_target(&mut conn, thread_kind, target_addr).await
    }

    async fn find_by_handle(&self, handle: ThreadHandle) -> BridgeResult<Option<Thread>> {
        use crate::schema::threads::dsl::*;

        let mut conn = self.pool.get().await?;

        let row = threads
            .filter(thread_handle.eq(handle.get()))
            .select(ThreadRow::as_select())
            .first::<ThreadRow>(&mut conn)
            .await
            .optional()?;

        row.map(Thread::try_from).transpose()
    }

    async fn insert_if_absent(&self, new: NewThread) -> BridgeResult<InsertOutcome> {
        use crate::schema::threads::dsl::*;

        let mut conn = self.pool.get().await?;

        let inserted = diesel::insert_into(threads)
            .values(NewThreadRow::from(&new))
            .on_conflict((kind, target))
            .do_nothing()
            .returning(ThreadRow::as_returning())
            .get_result::<ThreadRow>(&mut conn)
            .await
            .optional()?;

        if let Some(row) = inserted {
            return Ok(InsertOutcome::Inserted(row.try_into()?));
        }

        // ON CONFLICT DO NOTHING returns no row; read the winner back.
        match get_by_target(&mut conn, new.kind, &new.target).await? {
            Some(existing) => Ok(InsertOutcome::Existing(existing)),
            None => Err(BridgeError::not_found(format!(
                "thread for {} {}",
                new.kind, new.target
            ))),
        }
    }

    async fn update_metadata(
        &self,
        handle: ThreadHandle,
        subject: &str,
        message_ref: &str,
    ) -> BridgeResult<()> {
        use crate::schema::threads::dsl::*;

        let mut conn = self.pool.get().await?;

        let updated = diesel::update(threads.filter(thread_handle.eq(handle.get())))
            .set((
                last_subject.eq(Some(subject)),
                last_message_ref.eq(Some(message_ref)),
            ))
            .execute(&mut conn)
            .await?;

        if updated == 0 {
            return Err(BridgeError::not_found(format!("thread {}", handle)));
        }

        Ok(())
    }
}
