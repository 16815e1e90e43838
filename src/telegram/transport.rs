//! Chat transport seam used by the delivery flow.
//!
//! The production implementation is [`teloxide::Bot`]; tests record calls instead.

use async_trait::async_trait;
use std::path::PathBuf;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId};

use crate::core::error::{AppError, AppResult};
use crate::download::{StreamOutcome, VideoStream};

/// Video bytes to upload, with the filename shown in the chat
#[derive(Debug)]
pub enum VideoPayload {
    Stream { stream: VideoStream, filename: String },
    File { path: PathBuf, filename: String },
}

impl VideoPayload {
    pub fn filename(&self) -> &str {
        match self {
            VideoPayload::Stream { filename, .. } | VideoPayload::File { filename, .. } => filename,
        }
    }

    /// Outcome handle of a stream payload; take it before the stream is consumed.
    pub fn stream_outcome(&self) -> Option<StreamOutcome> {
        match self {
            VideoPayload::Stream { stream, .. } => Some(stream.outcome()),
            VideoPayload::File { .. } => None,
        }
    }
}

/// Maps a failed upload to the error worth logging.
///
/// When the stream behind the upload settled with a fetch failure, the
/// upload error is only its echo, so the [`FetchError`](crate::download::FetchError)
/// is returned instead.
pub fn upload_error(outcome: Option<&StreamOutcome>, err: impl Into<AppError>) -> AppError {
    match outcome.and_then(StreamOutcome::failure) {
        Some(fetch) => AppError::Fetch(fetch),
        None => err.into(),
    }
}

/// Operations the delivery flow needs from a chat.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> AppResult<MessageId>;

    async fn edit_text(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> AppResult<()>;

    /// Uploads a video; a stream payload is forwarded while it is still downloading.
    async fn send_video(&self, chat_id: ChatId, video: VideoPayload, caption: &str) -> AppResult<()>;

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> AppResult<()>;
}

#[async_trait]
impl ChatTransport for Bot {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> AppResult<MessageId> {
        let msg = self.send_message(chat_id, text).await?;
        Ok(msg.id)
    }

    async fn edit_text(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> AppResult<()> {
        self.edit_message_text(chat_id, message_id, text).await?;
        Ok(())
    }

    async fn send_video(&self, chat_id: ChatId, video: VideoPayload, caption: &str) -> AppResult<()> {
        let outcome = video.stream_outcome();
        let file = match video {
            VideoPayload::Stream { stream, filename } => InputFile::read(stream).file_name(filename),
            VideoPayload::File { path, filename } => InputFile::file(path).file_name(filename),
        };
        Requester::send_video(self, chat_id, file)
            .caption(caption)
            .supports_streaming(true)
            .await
            .map_err(|e| upload_error(outcome.as_ref(), e))?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> AppResult<()> {
        Requester::delete_message(self, chat_id, message_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::{FetchError, FetchErrorKind};
    use tokio::io::AsyncReadExt;
    use tokio::sync::oneshot;

    fn broken_pipe() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::BrokenPipe, "error sending request")
    }

    #[tokio::test]
    async fn test_upload_error_prefers_settled_fetch_failure() {
        let (tx, rx) = oneshot::channel();
        let payload = VideoPayload::Stream {
            stream: VideoStream::from_parts(&b"PARTIAL"[..], rx),
            filename: "clip.mp4".into(),
        };
        let outcome = payload.stream_outcome();
        tx.send(Err(FetchError::Cancelled)).unwrap();

        if let VideoPayload::Stream { mut stream, .. } = payload {
            let mut sink = Vec::new();
            assert!(stream.read_to_end(&mut sink).await.is_err());
        }

        let err = upload_error(outcome.as_ref(), broken_pipe());
        assert_eq!(err.as_fetch().map(FetchError::kind), Some(FetchErrorKind::Cancelled));
    }

    #[test]
    fn test_upload_error_keeps_transport_failure() {
        let (_tx, rx) = oneshot::channel();
        let payload = VideoPayload::Stream {
            stream: VideoStream::from_parts(&b""[..], rx),
            filename: "clip.mp4".into(),
        };
        let err = upload_error(payload.stream_outcome().as_ref(), broken_pipe());
        assert_eq!(err.category(), "io");

        let file = VideoPayload::File {
            path: "/tmp/clip.mp4".into(),
            filename: "clip.mp4".into(),
        };
        assert!(file.stream_outcome().is_none());
        assert_eq!(upload_error(None, broken_pipe()).category(), "io");
    }
}
