//! Video delivery: placeholder, probe, fetch, upload, cleanup.

use std::path::{Path, PathBuf};
use teloxide::types::{ChatId, MessageId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::error::{AppError, AppResult};
use crate::core::utils::media_filename;
use crate::download::{FetchContext, FetchOutput, FetchRequest, OutputMode, VideoFetcher};
use crate::telegram::progress::report_progress;
use crate::telegram::transport::{ChatTransport, VideoPayload};

/// Placeholder reply shown while the video is being fetched
pub const PLACEHOLDER_TEXT: &str = "Downloading your video...";

/// Caption attached to every delivered video
pub const VIDEO_CAPTION: &str = "Thanks for using our bot! 😄";

/// The only failure message users ever see
pub const FAILURE_TEXT: &str = "Download failed, please try again later.";

/// Runs one fetch request end to end for a chat.
///
/// A file-mode request owns its `dest_dir`; the directory is removed once the
/// request settles, whatever the outcome.
///
/// Failures are logged with their kind and exit code, the placeholder is
/// removed, and the user gets [`FAILURE_TEXT`]. The error is still returned so
/// the caller can account for it.
pub async fn deliver_video<T, F>(
    transport: &T,
    fetcher: &F,
    chat_id: ChatId,
    request: FetchRequest,
    cancel: CancellationToken,
) -> AppResult<()>
where
    T: ChatTransport + ?Sized,
    F: VideoFetcher + ?Sized,
{
    let placeholder = transport.send_text(chat_id, PLACEHOLDER_TEXT).await?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let ctx = FetchContext::new().with_cancel(cancel).with_events(events_tx);

    // The reporter ends once every event sender is gone, i.e. after the fetch
    let (result, ()) = tokio::join!(
        fetch_and_send(transport, fetcher, chat_id, &request, ctx),
        report_progress(transport, chat_id, placeholder, PLACEHOLDER_TEXT, events_rx),
    );

    // The process has exited by now, so nothing is still writing into dest_dir
    if let OutputMode::File { dest_dir } = &request.mode {
        remove_request_dir(dest_dir).await;
    }

    if let Err(e) = transport.delete_message(chat_id, placeholder).await {
        log::warn!("Failed to delete placeholder in chat {}: {}", chat_id, e);
    }

    match result {
        Ok(()) => {
            log::info!("✅ Delivered {} to chat {}", request.video, chat_id);
            Ok(())
        }
        Err(e) => {
            log_delivery_failure(chat_id, &request, &e);
            if let Err(send_err) = transport.send_text(chat_id, FAILURE_TEXT).await {
                log::error!("Failed to send failure message to chat {}: {}", chat_id, send_err);
            }
            Err(e)
        }
    }
}

async fn fetch_and_send<T, F>(
    transport: &T,
    fetcher: &F,
    chat_id: ChatId,
    request: &FetchRequest,
    ctx: FetchContext,
) -> AppResult<()>
where
    T: ChatTransport + ?Sized,
    F: VideoFetcher + ?Sized,
{
    let metadata = fetcher.probe(&request.video, &ctx).await?;
    log::info!(
        "Fetching {:?} ({}, {}s) for chat {}",
        metadata.title,
        request.video.platform(),
        metadata.duration_secs,
        chat_id
    );

    let output = fetcher.fetch(request, &ctx).await?;
    // Drop our sender so the progress reporter can finish with the process
    drop(ctx);

    match output {
        FetchOutput::Stream(stream) => {
            let payload = VideoPayload::Stream {
                stream,
                filename: media_filename(&metadata.title, "mp4"),
            };
            transport.send_video(chat_id, payload, VIDEO_CAPTION).await
        }
        FetchOutput::File(path) => {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or(request.options.container.extension())
                .to_string();
            let payload = VideoPayload::File {
                path,
                filename: media_filename(&metadata.title, &ext),
            };
            transport.send_video(chat_id, payload, VIDEO_CAPTION).await
        }
    }
}

/// Removes a file-mode request's directory with whatever the downloader left
/// in it: the delivered file, or `.part` fragments of a failed fetch.
async fn remove_request_dir(dest_dir: &Path) {
    match tokio::fs::remove_dir_all(dest_dir).await {
        Ok(()) => log::debug!("Removed {}", dest_dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove {}: {}", dest_dir.display(), e),
    }
}

fn log_delivery_failure(chat_id: ChatId, request: &FetchRequest, err: &AppError) {
    match err.as_fetch() {
        Some(fetch) => log::error!(
            "❌ Fetch failed for chat {} url={} kind={} exit_code={:?}: {}",
            chat_id,
            request.video,
            fetch.kind(),
            fetch.exit_code(),
            fetch
        ),
        None => log::error!(
            "❌ Delivery failed for chat {} url={} category={}: {}",
            chat_id,
            request.video,
            err.category(),
            err
        ),
    }
}

/// Per-request directory for file-mode fetches under `base`
pub fn request_dir(base: &Path, chat_id: ChatId, message_id: MessageId) -> PathBuf {
    base.join(format!("{}-{}", chat_id.0, message_id.0))
}
