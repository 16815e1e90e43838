//! Bot initialization and command definitions

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use teloxide::utils::command::BotCommands;

use crate::core::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "greeting and usage")]
    Start,
    #[command(description = "how to use the bot")]
    Help,
}

/// Greeting sent on /start
pub const START_TEXT: &str = "Hi! Send me a TikTok, Instagram Reel or Facebook Reel link and I'll reply with the video.\n\nYou can also open the Mini App to pick a format and quality.";

/// Usage sent on /help
pub const HELP_TEXT: &str = "Supported links:\n\
• vt.tiktok.com/… or vm.tiktok.com/…\n\
• tiktok.com/@user/video/123…\n\
• instagram.com/reel/…\n\
• facebook.com/reel/… or facebook.com/reels/…\n\n\
Just paste the link into the chat.";

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Missing token, invalid BOT_API_URL, or client build failure
pub fn create_bot() -> anyhow::Result<Bot> {
    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!("BOT_TOKEN (or TELOXIDE_TOKEN) is not set");
    }
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(config::BOT_TOKEN.as_str(), client);

    // Check if local Bot API server is configured
    let bot = match config::BOT_API_URL.as_deref() {
        Some(bot_api_url) => {
            log::info!("Using custom Bot API URL: {}", bot_api_url);
            let url = url::Url::parse(bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
            bot.set_api_url(url)
        }
        None => bot,
    };

    Ok(bot)
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(vec![
        BotCommand::new("start", "greeting and usage"),
        BotCommand::new("help", "how to use the bot"),
    ])
    .await?;

    Ok(())
}
