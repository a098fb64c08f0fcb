//! tricast-bot - Telegram front end for the Tricast relay
//!
//! Receives text and photo messages, feeds them into the debounce manager,
//! and replies with the aggregated publish status.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use futures::StreamExt;
use teloxide::net::Download;
use teloxide::prelude::*;
use tracing::{error, info, warn};

use libtricast::logging::{LogFormat, LoggingConfig};
use libtricast::platforms::bluesky::BlueskyPublisher;
use libtricast::platforms::farcaster::FarcasterPublisher;
use libtricast::platforms::twitter::TwitterPublisher;
use libtricast::{
    pending, Config, PendingPosts, Publisher, ReplySink, Result, SocialFanout, TricastError,
};

#[derive(Parser, Debug)]
#[command(name = "tricast-bot")]
#[command(version)]
#[command(about = "Telegram relay that cross-posts to X, Farcaster, and Bluesky")]
#[command(long_about = "\
tricast-bot - Telegram relay that cross-posts to X, Farcaster, and Bluesky

DESCRIPTION:
    tricast-bot is a long-running daemon. A text message opens a short
    per-user window during which a photo may still be attached to the same
    post; when the window closes (or the photo arrives), the post is
    published to all three platforms independently and a status summary is
    sent back on the originating chat.

USAGE:
    # Run with the default config (~/.config/tricast/config.toml)
    tricast-bot

    # Run with an explicit config file
    tricast-bot --config ./tricast.toml

    # Enable verbose logging
    tricast-bot --verbose

CONFIGURATION:
    Configuration file: ~/.config/tricast/config.toml (or TRICAST_CONFIG)
    Logging: TRICAST_LOG_FORMAT (text|json|pretty), TRICAST_LOG_LEVEL
")]
struct Cli {
    /// Path to the config file (overrides TRICAST_CONFIG and the default)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Sends status replies back through the Telegram bot.
struct TelegramReplies {
    bot: Bot,
}

#[async_trait]
impl ReplySink for TelegramReplies {
    async fn send_reply(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map_err(|e| TricastError::Transport(e.to_string()))?;
        Ok(())
    }
}

fn build_fanout(config: &Config) -> SocialFanout {
    let publishers: Vec<Box<dyn Publisher>> = vec![
        Box::new(TwitterPublisher::new(&config.twitter)),
        Box::new(FarcasterPublisher::new(&config.farcaster, &config.imgur)),
        Box::new(BlueskyPublisher::new(&config.bluesky)),
    ];
    SocialFanout::new(publishers, config.relay.max_attempts)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        LoggingConfig::new(LogFormat::Text, "debug".to_string(), true).init();
    } else {
        libtricast::logging::init_default();
    }

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    let bot = Bot::new(&config.telegram.bot_token);
    let replies = Arc::new(TelegramReplies { bot: bot.clone() });
    let fanout = Arc::new(build_fanout(&config));
    let pending_posts = PendingPosts::new(
        fanout,
        replies,
        Duration::from_secs(config.relay.debounce_secs),
    );

    info!(
        debounce_secs = config.relay.debounce_secs,
        "tricast-bot starting"
    );

    let allowed_user_ids = config.telegram.allowed_user_ids.clone();
    let handler = Update::filter_message()
        .filter_map(move |msg: Message| {
            let user = msg.from.as_ref()?;
            if allowed_user_ids.is_empty() || allowed_user_ids.contains(&user.id.0) {
                Some(msg)
            } else {
                None
            }
        })
        .endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![pending_posts])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    info!("tricast-bot stopped");
    Ok(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    pending_posts: PendingPosts,
) -> ResponseResult<()> {
    let user_id = match msg.from.as_ref() {
        Some(user) => user.id.0 as i64,
        None => return Ok(()),
    };
    let chat_id = msg.chat.id.0;

    if let Some(text) = msg.text() {
        info!(user_id, "text message received");
        pending_posts
            .handle_text(user_id, chat_id, text.to_string())
            .await;
        return Ok(());
    }

    if let Some(photos) = msg.photo() {
        // Sizes are ordered smallest to largest; take the full resolution.
        let Some(photo) = photos.last() else {
            return Ok(());
        };

        info!(user_id, "photo received, downloading");
        let image = match download_photo(&bot, photo).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(user_id, error = %e, "failed to download photo");
                pending_posts.discard(user_id);
                bot.send_message(msg.chat.id, pending::FAILURE_REPLY).await?;
                return Ok(());
            }
        };

        pending_posts.handle_photo(user_id, chat_id, image).await;
    }

    Ok(())
}

async fn download_photo(
    bot: &Bot,
    photo: &teloxide::types::PhotoSize,
) -> anyhow::Result<Vec<u8>> {
    let file = bot.get_file(photo.file.id.clone()).await?;

    let mut stream = bot.download_file_stream(&file.path);
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf)
}
