//! `ChatTransport` that records calls instead of talking to Telegram

use async_trait::async_trait;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;
use teloxide::types::{ChatId, MessageId};
use tokio::io::AsyncReadExt;

use reeldrop::core::error::AppResult;
use reeldrop::telegram::{upload_error, ChatTransport, VideoPayload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SendText {
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
    },
    EditText {
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
    },
    SendVideo {
        chat_id: ChatId,
        filename: String,
        caption: String,
        bytes: Vec<u8>,
    },
    DeleteMessage {
        chat_id: ChatId,
        message_id: MessageId,
    },
}

/// Records successful calls; a failed upload is not recorded.
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI32,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Texts sent with `send_text`, in order
    pub fn texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SendText { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn videos(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::SendVideo { .. }))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> AppResult<MessageId> {
        let message_id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.record(Call::SendText {
            chat_id,
            message_id,
            text: text.to_string(),
        });
        Ok(message_id)
    }

    async fn edit_text(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> AppResult<()> {
        self.record(Call::EditText {
            chat_id,
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_video(&self, chat_id: ChatId, video: VideoPayload, caption: &str) -> AppResult<()> {
        let filename = video.filename().to_string();
        let outcome = video.stream_outcome();
        let bytes = match video {
            VideoPayload::Stream { mut stream, .. } => {
                let mut bytes = Vec::new();
                // Like an HTTP body, the read error is flattened before mapping
                stream
                    .read_to_end(&mut bytes)
                    .await
                    .map_err(|e| upload_error(outcome.as_ref(), std::io::Error::other(e.to_string())))?;
                bytes
            }
            VideoPayload::File { path, .. } => tokio::fs::read(&path).await?,
        };
        self.record(Call::SendVideo {
            chat_id,
            filename,
            caption: caption.to_string(),
            bytes,
        });
        Ok(())
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> AppResult<()> {
        self.record(Call::DeleteMessage { chat_id, message_id });
        Ok(())
    }
}
