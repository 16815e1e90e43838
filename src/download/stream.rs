//! Byte stream over the downloader's stdout.
//!
//! The stream only reaches EOF once the process has exited successfully. A
//! non-zero exit or a cancellation surfaces as a terminal read error carrying
//! the [`FetchError`], recoverable with [`FetchError::from_io`]. Bytes read
//! before such an error must be discarded by the caller.
//!
//! Consumers that wrap the stream (an HTTP upload body, for instance) lose
//! that error inside their own. A [`StreamOutcome`] taken before handing the
//! stream over still reports it.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use once_cell::sync::OnceCell;

use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::oneshot;
use tokio_util::sync::DropGuard;

use crate::download::error::FetchError;

type BoxedReader = Box<dyn AsyncRead + Send + Sync + Unpin>;

enum Settlement {
    Pending(oneshot::Receiver<Result<(), FetchError>>),
    Succeeded,
    Failed,
}

/// Failure a [`VideoStream`] settled with, readable after the stream moved on.
#[derive(Debug, Clone, Default)]
pub struct StreamOutcome(Arc<OnceCell<FetchError>>);

impl StreamOutcome {
    /// The fetch failure, once the stream has reported one to its reader
    pub fn failure(&self) -> Option<FetchError> {
        self.0.get().cloned()
    }

    fn record(&self, err: &FetchError) {
        // First failure wins; a stream fails at most once
        let _ = self.0.set(err.clone());
    }
}

/// Stdout of a running fetch plus the channel its outcome arrives on.
pub struct VideoStream {
    reader: BoxedReader,
    settlement: Settlement,
    outcome: StreamOutcome,
    // Dropping the stream kills the process
    _guard: Option<DropGuard>,
}

impl VideoStream {
    pub(crate) fn new(
        reader: BoxedReader,
        completion: oneshot::Receiver<Result<(), FetchError>>,
        guard: DropGuard,
    ) -> Self {
        Self {
            reader,
            settlement: Settlement::Pending(completion),
            outcome: StreamOutcome::default(),
            _guard: Some(guard),
        }
    }

    /// Builds a stream from any reader and an outcome channel.
    pub fn from_parts<R>(reader: R, completion: oneshot::Receiver<Result<(), FetchError>>) -> Self
    where
        R: AsyncRead + Send + Sync + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            settlement: Settlement::Pending(completion),
            outcome: StreamOutcome::default(),
            _guard: None,
        }
    }

    /// Handle that reports the settled failure after the stream is moved.
    pub fn outcome(&self) -> StreamOutcome {
        self.outcome.clone()
    }

    /// Drains the remaining bytes and returns the settled outcome.
    pub async fn finish(mut self) -> Result<(), FetchError> {
        tokio::io::copy(&mut self, &mut tokio::io::sink())
            .await
            .map(|_| ())
            .map_err(FetchError::from_io)
    }

    /// Checks the outcome without blocking; a failure is returned at most once.
    fn poll_settlement(&mut self, cx: &mut Context<'_>) -> io::Result<()> {
        let Settlement::Pending(rx) = &mut self.settlement else {
            return Ok(());
        };
        let outcome = match Pin::new(rx).poll(cx) {
            Poll::Pending => return Ok(()),
            Poll::Ready(Ok(outcome)) => outcome,
            // The supervisor is gone without reporting; treat the process as lost
            Poll::Ready(Err(_)) => Err(FetchError::ProcessFailed { exit_code: None }),
        };
        match outcome {
            Ok(()) => {
                self.settlement = Settlement::Succeeded;
                Ok(())
            }
            Err(e) => {
                self.settlement = Settlement::Failed;
                self.outcome.record(&e);
                Err(e.into_io())
            }
        }
    }
}

impl AsyncRead for VideoStream {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }
        let this = &mut *self;
        if let Err(e) = this.poll_settlement(cx) {
            return Poll::Ready(Err(e));
        }
        if matches!(this.settlement, Settlement::Failed) {
            return Poll::Ready(Ok(()));
        }

        let before = buf.filled().len();
        match Pin::new(&mut this.reader).poll_read(cx, buf) {
            // EOF on stdout is held back until the exit status is known; the
            // pending receiver was polled above, so its waker is registered
            Poll::Ready(Ok(())) if buf.filled().len() == before => match this.settlement {
                Settlement::Pending(_) => Poll::Pending,
                _ => Poll::Ready(Ok(())),
            },
            other => other,
        }
    }
}

impl std::fmt::Debug for VideoStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.settlement {
            Settlement::Pending(_) => "pending",
            Settlement::Succeeded => "succeeded",
            Settlement::Failed => "failed",
        };
        f.debug_struct("VideoStream").field("settlement", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::error::FetchErrorKind;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_clean_exit_reads_to_eof() {
        let (tx, rx) = oneshot::channel();
        let mut stream = VideoStream::from_parts(&b"video-bytes"[..], rx);
        tx.send(Ok(())).unwrap();

        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"video-bytes");
    }

    #[tokio::test]
    async fn test_failure_after_partial_bytes() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let (tx, rx) = oneshot::channel();
        let mut stream = VideoStream::from_parts(reader, rx);

        writer.write_all(b"partial").await.unwrap();
        let mut head = [0u8; 7];
        stream.read_exact(&mut head).await.unwrap();
        assert_eq!(&head, b"partial");

        tx.send(Err(FetchError::ProcessFailed { exit_code: Some(1) })).unwrap();
        drop(writer);

        let err = FetchError::from_io(stream.read(&mut head).await.unwrap_err());
        assert_eq!(err.kind(), FetchErrorKind::ProcessFailed);
        assert_eq!(err.exit_code(), Some(1));
    }

    #[tokio::test]
    async fn test_outcome_survives_moving_the_stream() {
        let (tx, rx) = oneshot::channel();
        let stream = VideoStream::from_parts(&b"PARTIAL"[..], rx);
        let outcome = stream.outcome();
        assert!(outcome.failure().is_none());

        tx.send(Err(FetchError::ProcessFailed { exit_code: Some(1) })).unwrap();
        // A consumer that flattens the read error into its own type
        let consumer = tokio::spawn(async move {
            let mut stream = stream;
            let mut sink = Vec::new();
            stream.read_to_end(&mut sink).await.map_err(|e| e.to_string())
        });
        assert!(consumer.await.unwrap().is_err());

        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind(), FetchErrorKind::ProcessFailed);
        assert_eq!(failure.exit_code(), Some(1));
    }

    #[tokio::test]
    async fn test_outcome_stays_empty_on_success() {
        let (tx, rx) = oneshot::channel();
        let stream = VideoStream::from_parts(&b"ok"[..], rx);
        let outcome = stream.outcome();
        tx.send(Ok(())).unwrap();
        stream.finish().await.unwrap();
        assert!(outcome.failure().is_none());
    }

    #[tokio::test]
    async fn test_failure_wins_over_open_pipe() {
        // The writer stays open, as with an orphaned child still holding stdout
        let (_writer, reader) = tokio::io::duplex(64);
        let (tx, rx) = oneshot::channel();
        let stream = VideoStream::from_parts(reader, rx);
        let handle = tokio::spawn(stream.finish());

        tx.send(Err(FetchError::Cancelled)).unwrap();
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), FetchErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_eof_waits_for_outcome() {
        let (tx, rx) = oneshot::channel();
        let stream = VideoStream::from_parts(tokio::io::empty(), rx);
        let handle = tokio::spawn(stream.finish());

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        tx.send(Ok(())).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_dropped_supervisor_is_a_failure() {
        let (tx, rx) = oneshot::channel::<Result<(), FetchError>>();
        drop(tx);
        let stream = VideoStream::from_parts(tokio::io::empty(), rx);
        assert_eq!(stream.finish().await.unwrap_err().kind(), FetchErrorKind::ProcessFailed);
    }
}
