use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use quotebot_config::QuoteBotConfig;
use quotebot_core::{Credentials, QuotaRetry, QuoteBot};
use quotebot_gemini::GeminiClient;
use quotebot_telegram::TelegramChannel;
use quotebot_telegram::api::TelegramApi;
use quotebot_types::{ContentType, LogStatus};

#[derive(Parser)]
#[command(name = "quotebot", about = "AI quote bot for Telegram")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run both schedulers until interrupted
    Run {
        /// Arm the interval countdown at startup
        #[arg(long)]
        armed: bool,

        /// Interval in minutes (overrides config, 1-1440)
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Generate and deliver one quote now
    Send {
        /// Deliver as a photo with a generated illustration
        #[arg(long)]
        image: bool,
    },
    /// Deliver your own quote with a generated illustration
    Custom {
        /// The quote text to illustrate and send
        quote: String,
    },
    /// Discover the destination chat ID from the bot's latest inbound message
    ChatId,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Run { armed, interval } => {
            let mut config = quotebot_config::load_config()?;
            if let Some(minutes) = interval {
                config.interval_minutes = minutes;
                config.validate()?;
            }
            rt.block_on(run_bot(config, armed))?;
        }
        Commands::Send { image } => {
            let config = quotebot_config::load_config()?;
            let bot = build_bot(&config);
            let content_type = if image {
                ContentType::Image
            } else {
                ContentType::Text
            };
            rt.block_on(bot.trigger(content_type));
            check_outcome(&bot)?;
        }
        Commands::Custom { quote } => {
            let config = quotebot_config::load_config()?;
            let bot = build_bot(&config);
            rt.block_on(bot.send_custom(&quote));
            check_outcome(&bot)?;
        }
        Commands::ChatId => {
            let config = quotebot_config::load_config()?;
            rt.block_on(async {
                match quotebot_telegram::discover_chat_id(&config.bot_token).await? {
                    Some(id) => println!("Chat ID found: {id}"),
                    None => println!(
                        "No chat ID found. Send the bot a message (or post in its channel) and try again."
                    ),
                }
                anyhow::Ok(())
            })?;
        }
    }

    Ok(())
}

/// Wire the Gemini provider (with quota retry) and the Telegram channel into
/// a coordinator, registering any schedules declared in the config.
fn build_bot(config: &QuoteBotConfig) -> QuoteBot {
    let provider = Arc::new(QuotaRetry::new(GeminiClient::new()));
    let channel = Arc::new(TelegramChannel::new());
    let credentials = Credentials {
        gemini_api_key: config.gemini_api_key.clone(),
        bot_token: config.bot_token.clone(),
        chat_id: config.chat_id.clone(),
    };

    let bot = QuoteBot::new(provider, channel, credentials, config.interval_minutes);
    for spec in &config.schedules {
        // Rejections (duplicate or malformed times) are already logged
        let _ = bot.add_schedule(&spec.time, spec.content_type);
    }
    bot
}

async fn run_bot(config: QuoteBotConfig, armed: bool) -> anyhow::Result<()> {
    let bot = build_bot(&config);

    if !config.bot_token.is_empty() {
        match TelegramApi::new(&config.bot_token).get_me().await {
            Ok(me) => info!(
                bot_username = me.username.as_deref().unwrap_or("unknown"),
                "Telegram bot authenticated"
            ),
            Err(e) => warn!("Telegram token verification failed: {e}"),
        }
    }

    if armed && !bot.arm() {
        bail!("cannot arm the interval countdown: credentials are incomplete");
    }

    let cancel = CancellationToken::new();
    let (interval_handle, daily_handle) = bot.spawn_schedulers(cancel.clone());

    info!(
        interval_minutes = config.interval_minutes,
        schedules = bot.schedules().len(),
        armed = bot.armed(),
        "quotebot running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    cancel.cancel();
    let _ = interval_handle.await;
    let _ = daily_handle.await;
    Ok(())
}

/// Fail the process when a one-shot command ended with an error entry.
fn check_outcome(bot: &QuoteBot) -> anyhow::Result<()> {
    let logs = bot.logs();
    if let Some(entry) = logs.first() {
        if entry.status == LogStatus::Error {
            match &entry.details {
                Some(details) => bail!("{} ({details})", entry.message),
                None => bail!("{}", entry.message),
            }
        }
    }
    Ok(())
}
