//! Handler bodies, written against [`ChatTransport`] so tests can drive them

use teloxide::types::{ChatId, MessageId};

use super::types::HandlerDeps;
use crate::core::error::{AppError, AppResult};
use crate::download::{extract_video_url, FetchRequest, VideoReference};
use crate::telegram::bot::{Command, HELP_TEXT, START_TEXT};
use crate::telegram::transport::ChatTransport;
use crate::telegram::videos::{deliver_video, request_dir};
use crate::telegram::webapp::{WebAppRequest, REJECTION_TEXT};

/// Reply for private messages without a supported link
pub const NO_LINK_TEXT: &str = "Send me a TikTok, Instagram Reel or Facebook Reel link.";

/// What to do with a plain text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextAction {
    Deliver(VideoReference),
    Reject,
    Ignore,
}

/// Routes a text message: a link is delivered anywhere, chatter only gets a
/// reply in private chats.
pub fn route_text(text: &str, is_private: bool) -> TextAction {
    match extract_video_url(text) {
        Some(video) => TextAction::Deliver(video),
        None if is_private => TextAction::Reject,
        None => TextAction::Ignore,
    }
}

pub async fn handle_command<T>(transport: &T, chat_id: ChatId, cmd: Command) -> AppResult<()>
where
    T: ChatTransport + ?Sized,
{
    let text = match cmd {
        Command::Start => START_TEXT,
        Command::Help => HELP_TEXT,
    };
    transport.send_text(chat_id, text).await?;
    Ok(())
}

pub async fn handle_text_message<T>(
    transport: &T,
    deps: &HandlerDeps,
    chat_id: ChatId,
    text: &str,
    is_private: bool,
) -> AppResult<()>
where
    T: ChatTransport + ?Sized,
{
    match route_text(text, is_private) {
        TextAction::Deliver(video) => {
            log::info!("🎯 {} link from chat {}: {}", video.platform(), chat_id, video);
            run_delivery(transport, deps, chat_id, FetchRequest::stream(video)).await
        }
        TextAction::Reject => {
            transport.send_text(chat_id, NO_LINK_TEXT).await?;
            Ok(())
        }
        TextAction::Ignore => Ok(()),
    }
}

/// Handles a `web_app_data` payload.
///
/// Invalid payloads get an immediate rejection reply and come back as
/// [`AppError::Validation`] without spawning anything.
pub async fn handle_web_app_data<T>(
    transport: &T,
    deps: &HandlerDeps,
    chat_id: ChatId,
    message_id: MessageId,
    data: &str,
) -> AppResult<()>
where
    T: ChatTransport + ?Sized,
{
    log::debug!("Web App Data: {}", data);
    let file_dir = request_dir(&deps.download_dir, chat_id, message_id);
    let request = match WebAppRequest::parse(data).and_then(|req| req.into_fetch_request(&file_dir)) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("Rejected Mini App payload from chat {}: {}", chat_id, e);
            transport.send_text(chat_id, REJECTION_TEXT).await?;
            return Err(AppError::Validation(e.to_string()));
        }
    };
    log::info!(
        "🎯 Mini App request from chat {}: {} ({}, quality {}, watermark {})",
        chat_id,
        request.video,
        request.options.container,
        request.options.quality,
        request.options.with_watermark
    );
    run_delivery(transport, deps, chat_id, request).await
}

/// Runs a delivery under a child of the shutdown token, cancelled at the deadline.
pub async fn run_delivery<T>(transport: &T, deps: &HandlerDeps, chat_id: ChatId, request: FetchRequest) -> AppResult<()>
where
    T: ChatTransport + ?Sized,
{
    let cancel = deps.shutdown.child_token();
    let deadline = tokio::spawn({
        let cancel = cancel.clone();
        let timeout = deps.fetch_timeout;
        async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    log::warn!("⏱️ Fetch for chat {} exceeded {}s, cancelling", chat_id, timeout.as_secs());
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        }
    });

    let result = deliver_video(transport, deps.fetcher.as_ref(), chat_id, request, cancel).await;
    deadline.abort();
    result
}
