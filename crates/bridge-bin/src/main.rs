//! hypogram - bridges annotation threads into group chats and chat replies back.

mod app;

use std::path::PathBuf;

use bridge_config_and_utils::{init_logging, Config, Paths};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

/// hypogram command-line interface.
#[derive(Parser, Debug)]
#[command(name = "hypogram")]
#[command(about = "Bridge Hypothesis annotation threads and Telegram chats")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Overrides the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, database, and logs. Defaults to ~/.hypogram
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Database file. Defaults to <base-dir>/hypogram.sqlite
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the poller and the chat bot until interrupted
    Run {
        /// Telegram bot token
        #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
        telegram_token: String,
    },
    /// Start forwarding a group's annotations to a chat
    Subscribe {
        /// Hypothesis API token
        #[arg(long, env = "HYPOTHESIS_TOKEN", hide_env_values = true)]
        token: String,
        /// Hypothesis group id
        #[arg(long)]
        group: String,
        /// Telegram chat id
        #[arg(long, allow_hyphen_values = true)]
        chat: i64,
        /// Only forward annotations updated after this instant (RFC 3339). Defaults to now
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },
    /// Stop forwarding a group's annotations to a chat
    Unsubscribe {
        /// Hypothesis group id
        #[arg(long)]
        group: String,
        /// Telegram chat id
        #[arg(long, allow_hyphen_values = true)]
        chat: i64,
    },
    /// List subscriptions
    Subscriptions,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    // Only the long-running command writes the JSONL log file.
    let log_file = matches!(cli.command, Commands::Run { .. }).then(|| paths.log_file());
    init_logging(log_level(cli.log_level.as_deref(), &config), log_file);
    let db_path = cli.db.unwrap_or_else(|| paths.database_file());

    match cli.command {
        Commands::Run { telegram_token } => {
            app::run_bridge(&config, &db_path, &telegram_token).await?;
        }
        Commands::Subscribe {
            token,
            group,
            chat,
            since,
        } => {
            let watermark = since.unwrap_or_else(Utc::now);
            let subscription = app::subscribe(&db_path, token, group, chat, watermark).await?;
            println!(
                "Subscribed chat {} to group {} (after {})",
                subscription.chat_id,
                subscription.group,
                subscription.watermark.to_rfc3339()
            );
        }
        Commands::Unsubscribe { group, chat } => {
            if app::unsubscribe(&db_path, &group, chat).await? {
                println!("Unsubscribed chat {} from group {}", chat, group);
            } else {
                println!("No subscription for chat {} and group {}", chat, group);
            }
        }
        Commands::Subscriptions => {
            let subscriptions = app::list_subscriptions(&db_path).await?;
            if subscriptions.is_empty() {
                println!("No subscriptions");
            }
            for subscription in &subscriptions {
                println!("{}", app::describe_subscription(subscription));
            }
        }
    }

    Ok(())
}

/// The `--log-level` flag wins over the config file and `HYPOGRAM_LOG_LEVEL`.
fn log_level<'a>(flag: Option<&'a str>, config: &'a Config) -> &'a str {
    flag.unwrap_or(&config.log_level)
}
