//! The long-running bridge: poller and chat bot side by side.

use bridge_config_and_utils::Config;
use bridge_core::MappingStore;
use bridge_database::SqliteMappingStore;
use hypothesis_client::{AnnotationClientFactory, HypothesisClientFactory};
use std::path::Path;
use std::sync::Arc;
use sync_engine::{shutdown_channel, ChatSender, Poller, PollerConfig, ReplyHandler};
use telegram_bot::{BotRunner, TelegramClient};
use tracing::{error, info};

/// Run until Ctrl-C, or until the bot token is rejected.
pub async fn run_bridge(
    config: &Config,
    db_path: &Path,
    telegram_token: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting hypogram");
    info!(
        hypothesis_api_url = %config.hypothesis_api_url,
        telegram_api_url = %config.telegram_api_url,
        poll_interval_secs = config.poll_interval_secs,
        max_ancestor_depth = config.max_ancestor_depth,
        "Configuration loaded"
    );

    let store = SqliteMappingStore::open(db_path)
        .await
        .map_err(|e| format!("Failed to open database {}: {}", db_path.display(), e))?;
    info!(path = %db_path.display(), "Mapping store opened");
    let store: Arc<dyn MappingStore> = Arc::new(store);

    let annotations: Arc<dyn AnnotationClientFactory> = Arc::new(HypothesisClientFactory::new(
        config.hypothesis_api_url()?.as_str(),
    )?);
    let telegram = TelegramClient::new(config.telegram_api_url()?.as_str(), telegram_token)?;
    let chat: Arc<dyn ChatSender> = Arc::new(telegram.clone());

    let poller = Poller::new(
        annotations.clone(),
        store.clone(),
        chat,
        PollerConfig {
            interval: config.poll_interval(),
            max_ancestor_depth: config.max_ancestor_depth,
            link_base: config.annotation_link_base.clone(),
        },
    );
    let handler = Arc::new(ReplyHandler::new(annotations, store));
    let bot = BotRunner::new(telegram, handler, config.telegram_long_poll());

    let (trigger, shutdown) = shutdown_channel();

    let (_, stopped, bot_result) = tokio::join!(
        async {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    match result {
                        Ok(()) => info!("Interrupt received; shutting down"),
                        Err(e) => error!(error = %e, "Failed to listen for Ctrl-C; shutting down"),
                    }
                    trigger.trigger();
                }
                _ = shutdown.wait() => {}
            }
        },
        poller.run(&shutdown),
        async {
            let result = bot.run(&shutdown).await;
            if let Err(e) = &result {
                error!(error = %e, "Chat bot stopped");
                trigger.trigger();
            }
            result
        },
    );

    info!(reason = %stopped, "Poller finished");
    bot_result?;
    info!("hypogram stopped");
    Ok(())
}
