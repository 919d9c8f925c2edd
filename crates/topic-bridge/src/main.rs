use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use topic_bridge::chat::{ChatListener, TelegramClient};
use topic_bridge::config::BridgeConfig;
use topic_bridge::db;
use topic_bridge::dispatch::Bridge;
use topic_bridge::mail::{ImapConfig, ImapMailbox, SmtpConfig, SmtpMailSender};
use topic_bridge::poller::MailboxPoller;
use topic_bridge::reconciler::ThreadReconciler;
use topic_bridge::store::PgThreadStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "topic_bridge=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    tracing::info!("Starting topic bridge");

    let config = BridgeConfig::from_env().context("Failed to load configuration")?;

    let pool = db::establish_connection_pool(&config.database_url, config.database_tls)?;
    let store = Arc::new(PgThreadStore::new(pool));

    let telegram = Arc::new(TelegramClient::new(config.telegram_token.clone()));

    let mailbox = Arc::new(
        ImapMailbox::connect(ImapConfig {
            host: config.imap_host.clone(),
            port: config.imap_port,
            username: config.mail_username.clone(),
            password: config.mail_password.clone(),
            mailbox: config.mailbox.clone(),
        })
        .await
        .context("Failed to connect to IMAP server")?,
    );

    let sender = Arc::new(
        SmtpMailSender::new(&SmtpConfig {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            username: config.mail_username.clone(),
            password: config.mail_password.clone(),
            implicit_tls: config.smtp_implicit_tls,
        })
        .context("Failed to configure SMTP transport")?,
    );

    let reconciler = ThreadReconciler::new(store, telegram.clone(), config.chat_id);
    let bridge = Arc::new(Bridge::new(
        reconciler,
        telegram.clone(),
        sender,
        config.chat_id,
    ));

    let poller = MailboxPoller::new(
        mailbox.clone(),
        config.poll_interval,
        config.max_concurrent_handlers,
    );
    poller
        .start(bridge.clone())
        .await
        .context("Failed to start mailbox poller")?;

    let cancel = CancellationToken::new();
    let listener = ChatListener::new(
        telegram.bot(),
        bridge,
        config.chat_long_poll,
        cancel.clone(),
    );
    let listener_task = tokio::spawn(listener.run());

    tracing::info!("Bridging {} to chat {}", config.mailbox, config.chat_id);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutting down");

    poller.stop();
    cancel.cancel();
    if let Err(e) = listener_task.await {
        tracing::error!("Chat listener task failed: {}", e);
    }
    mailbox.logout().await;

    Ok(())
}
