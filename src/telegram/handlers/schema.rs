//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::commands::{handle_command, handle_text_message, handle_web_app_data};
use super::types::{HandlerDeps, HandlerError};
use crate::telegram::bot::Command;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// Order matters: commands first, then Mini App payloads, then plain text.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_webapp = deps.clone();
    let deps_messages = deps;

    dptree::entry()
        .branch(command_handler())
        .branch(webapp_handler(deps_webapp))
        .branch(message_handler(deps_messages))
}

fn command_handler() -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        |bot: Bot, msg: Message, cmd: Command| async move {
            log::info!("🎯 Received command: {:?} from chat {}", cmd, msg.chat.id);
            handle_command(&bot, msg.chat.id, cmd).await?;
            Ok(())
        },
    ))
}

/// Handler for `web_app_data` service messages sent by the Mini App
fn webapp_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.web_app_data().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                log::info!("Received web_app_data message from chat {}", msg.chat.id);
                if let Some(web_app_data) = msg.web_app_data() {
                    if let Err(e) = handle_web_app_data(&bot, &deps, msg.chat.id, msg.id, &web_app_data.data).await {
                        log::debug!("Mini App request for chat {} ended with {}", msg.chat.id, e.category());
                    }
                }
                Ok(())
            }
        })
}

/// Handler for plain text messages that may carry a video link
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let text = msg.text().unwrap_or_default();
                if let Err(e) = handle_text_message(&bot, &deps, msg.chat.id, text, msg.chat.is_private()).await {
                    log::debug!("Message from chat {} ended with {}", msg.chat.id, e.category());
                }
                Ok(())
            }
        })
}
