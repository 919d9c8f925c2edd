//! Mailbox polling background task.
//!
//! Watches the message count of one mailbox and hands every message that
//! appears after startup to a `MessageHandler`. Handlers run on their own
//! tasks, bounded by a semaphore; the polling loop never waits for them.

use crate::error::{BridgeError, BridgeResult};
use crate::mail::{MailMessage, MailboxService};
use async_trait::async_trait;
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Consumer of newly arrived mail
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle_message(&self, message: MailMessage);
}

/// Highest message count the poller has already dispatched up to.
///
/// Only ever moves forward. If the mailbox shrinks (expunge) the cursor stays
/// put, and messages arriving afterwards are picked up once the count climbs
/// past it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollCursor {
    last_known_count: u32,
}

impl PollCursor {
    pub fn new(count: u32) -> Self {
        Self {
            last_known_count: count,
        }
    }

    pub fn last_known_count(&self) -> u32 {
        self.last_known_count
    }

    /// Sequence numbers that are new at `current`, if any
    pub fn pending(&self, current: u32) -> Option<RangeInclusive<u32>> {
        (current > self.last_known_count).then(|| self.last_known_count + 1..=current)
    }

    pub fn advance_to(&mut self, current: u32) {
        if current > self.last_known_count {
            self.last_known_count = current;
        }
    }
}

/// Polls a mailbox on a fixed interval.
///
/// `start` may be called once per running period; `stop` is idempotent and
/// guarantees no handler invocation begins after it returns. Invocations
/// already running are left to finish.
pub struct MailboxPoller {
    mailbox: Arc<dyn MailboxService>,
    interval: Duration,
    permits: Arc<Semaphore>,
    running: Mutex<Option<CancellationToken>>,
}

impl MailboxPoller {
    pub fn new(mailbox: Arc<dyn MailboxService>, interval: Duration, max_concurrent: usize) -> Self {
        Self {
            mailbox,
            interval,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            running: Mutex::new(None),
        }
    }

    /// Record the current count as the baseline and spawn the polling loop.
    /// Messages already in the mailbox are never dispatched.
    pub async fn start(&self, handler: Arc<dyn MessageHandler>) -> BridgeResult<()> {
        let cancel = {
            let mut running = self.lock();
            if running.is_some() {
                return Err(BridgeError::AlreadyRunning);
            }
            let token = CancellationToken::new();
            *running = Some(token.clone());
            token
        };

        let initial = match self.mailbox.count().await {
            Ok(count) => count,
            Err(e) => {
                // A concurrent stop() already took and cancelled our token
                if !cancel.is_cancelled() {
                    self.lock().take();
                    cancel.cancel();
                }
                return Err(e);
            }
        };

        tracing::info!(
            "Mailbox poller started (interval: {:?}, initial count: {})",
            self.interval,
            initial
        );

        let worker = PollWorker {
            mailbox: Arc::clone(&self.mailbox),
            handler,
            permits: Arc::clone(&self.permits),
            cancel,
            cursor: PollCursor::new(initial),
        };
        tokio::spawn(worker.run(self.interval));

        Ok(())
    }

    pub fn stop(&self) {
        if let Some(token) = self.lock().take() {
            token.cancel();
            tracing::info!("Mailbox poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.running.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct PollWorker {
    mailbox: Arc<dyn MailboxService>,
    handler: Arc<dyn MessageHandler>,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
    cursor: PollCursor,
}

impl PollWorker {
    async fn run(mut self, period: Duration) {
        // First check happens one full interval after start
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            self.check_for_new_mail().await;
        }

        tracing::debug!(
            "Mailbox polling loop exited at count {}",
            self.cursor.last_known_count()
        );
    }

    /// One poll cycle. Returns the number of messages dispatched.
    async fn check_for_new_mail(&mut self) -> usize {
        let current = match self.mailbox.count().await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("Failed to read mailbox count: {}", e);
                return 0;
            }
        };

        let Some(range) = self.cursor.pending(current) else {
            if current < self.cursor.last_known_count() {
                tracing::debug!(
                    "Mailbox shrank from {} to {}; waiting for it to grow again",
                    self.cursor.last_known_count(),
                    current
                );
            }
            return 0;
        };

        tracing::info!(
            "New mail: count {} -> {}",
            self.cursor.last_known_count(),
            current
        );

        let messages = match self.mailbox.fetch_range(*range.start(), *range.end()).await {
            Ok(messages) => messages,
            Err(e) => {
                // Cursor untouched, so the next cycle fetches the same range
                tracing::error!(
                    "Failed to fetch messages {}..={}: {}",
                    range.start(),
                    range.end(),
                    e
                );
                return 0;
            }
        };

        self.cursor.advance_to(current);

        let dispatched = messages.len();
        for message in messages {
            self.dispatch(message);
        }
        dispatched
    }

    fn dispatch(&self, message: MailMessage) {
        let handler = Arc::clone(&self.handler);
        let permits = Arc::clone(&self.permits);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            if cancel.is_cancelled() {
                tracing::warn!(
                    "Poller stopped before message {} was handled; dropping it",
                    message.seq
                );
                return;
            }

            handler.handle_message(message).await;
        });
    }
}
