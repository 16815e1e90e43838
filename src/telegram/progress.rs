//! Placeholder progress edits driven by fetch events

use std::time::{Duration, Instant};
use teloxide::types::{ChatId, MessageId};
use tokio::sync::mpsc;

use crate::core::config;
use crate::download::FetchEvent;
use crate::telegram::transport::ChatTransport;

/// Decides which progress updates are worth a message edit.
///
/// Telegram rate-limits edits, so an update must be at least `min_interval`
/// after the previous edit and move the percentage by `min_step` or more.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    min_interval: Duration,
    min_step: u8,
    last_edit: Instant,
    last_percent: u8,
}

impl ProgressThrottle {
    pub fn new(min_interval: Duration, min_step: u8, started: Instant) -> Self {
        Self {
            min_interval,
            min_step,
            last_edit: started,
            last_percent: 0,
        }
    }

    /// Throttle with the intervals from `config::progress`
    pub fn from_config(started: Instant) -> Self {
        Self::new(
            config::progress::update_interval(),
            config::progress::MIN_PERCENT_STEP,
            started,
        )
    }

    /// Returns true and records the edit when `percent` should be shown at `now`.
    pub fn should_update(&mut self, percent: u8, now: Instant) -> bool {
        if percent < self.last_percent.saturating_add(self.min_step) {
            return false;
        }
        if now.saturating_duration_since(self.last_edit) < self.min_interval {
            return false;
        }
        self.last_edit = now;
        self.last_percent = percent;
        true
    }
}

pub fn progress_text(base: &str, percent: u8) -> String {
    format!("{} {}%", base, percent)
}

/// Consumes events until the channel closes, editing the placeholder as allowed.
pub async fn report_progress<T>(
    transport: &T,
    chat_id: ChatId,
    placeholder: MessageId,
    base_text: &str,
    mut events: mpsc::UnboundedReceiver<FetchEvent>,
) where
    T: ChatTransport + ?Sized,
{
    let mut throttle = ProgressThrottle::from_config(Instant::now());
    while let Some(event) = events.recv().await {
        match event {
            FetchEvent::Progress(info) => {
                if !throttle.should_update(info.percent, Instant::now()) {
                    continue;
                }
                if let Err(e) = transport
                    .edit_text(chat_id, placeholder, &progress_text(base_text, info.percent))
                    .await
                {
                    log::debug!("Progress edit failed for chat {}: {}", chat_id, e);
                }
            }
            FetchEvent::Error(cause) => log::warn!("Downloader error for chat {}: {}", chat_id, cause),
            FetchEvent::LogLine(line) => log::debug!("yt-dlp: {}", line),
            FetchEvent::Exit(code) => log::debug!("Downloader exited for chat {}: {:?}", chat_id, code),
        }
    }
}
