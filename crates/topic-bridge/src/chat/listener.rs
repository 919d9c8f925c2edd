use super::telegram::chat_update_from;
use super::ChatUpdate;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::AllowedUpdate;
use teloxide::update_listeners::Polling;
use tokio_util::sync::CancellationToken;

/// Consumer of chat updates; one invocation per update, run concurrently
#[async_trait]
pub trait UpdateHandler: Send + Sync + 'static {
    async fn handle_update(&self, update: ChatUpdate);
}

/// Long-polling receive loop for chat messages.
///
/// Each message is handed to the handler on its own task. Cancelling the
/// token stops polling but leaves already spawned handlers running.
pub struct ChatListener {
    bot: Bot,
    handler: Arc<dyn UpdateHandler>,
    long_poll: Duration,
    cancel: CancellationToken,
}

impl ChatListener {
    pub fn new(
        bot: Bot,
        handler: Arc<dyn UpdateHandler>,
        long_poll: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            bot,
            handler,
            long_poll,
            cancel,
        }
    }

    pub async fn run(self) {
        tracing::info!("Chat listener started (long poll: {:?})", self.long_poll);

        let listener = Polling::builder(self.bot.clone())
            .timeout(self.long_poll)
            .allowed_updates(vec![AllowedUpdate::Message])
            .build();

        let mut dispatcher = Dispatcher::builder(
            self.bot,
            Update::filter_message().endpoint(forward_message),
        )
        .dependencies(dptree::deps![self.handler])
        .default_handler(|_upd| async {})
        .build();

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {}
            _ = dispatcher.dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("Failed to poll chat updates"),
            ) => {}
        }

        tracing::info!("Chat listener stopped");
    }
}

async fn forward_message(
    msg: Message,
    handler: Arc<dyn UpdateHandler>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let Some(update) = chat_update_from(&msg) else {
        tracing::debug!("Ignoring message {} without text", msg.id.0);
        return Ok(());
    };

    tokio::spawn(async move {
        handler.handle_update(update).await;
    });
    Ok(())
}
