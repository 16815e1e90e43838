//! Video fetch abstraction layer.
//!
//! `VideoFetcher` is the seam between the bot and the external downloader.
//! The built-in backend is [`ytdlp::YtDlpFetcher`]; tests plug in their own.

pub mod ytdlp;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::download::error::FetchError;
use crate::download::events::FetchEvent;
use crate::download::format::FetchOptions;
use crate::download::metadata::VideoMetadata;
use crate::download::stream::VideoStream;
use crate::download::url::VideoReference;

/// Where the fetched bytes go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Bytes are piped from the downloader's stdout
    Stream,
    /// The downloader writes `<dest_dir>/<title>.<ext>`
    File { dest_dir: PathBuf },
}

/// One unit of work; maps to exactly one external process.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub video: VideoReference,
    pub mode: OutputMode,
    pub options: FetchOptions,
}

impl FetchRequest {
    pub fn stream(video: VideoReference) -> Self {
        Self {
            video,
            mode: OutputMode::Stream,
            options: FetchOptions::default(),
        }
    }

    pub fn to_file(video: VideoReference, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            video,
            mode: OutputMode::File {
                dest_dir: dest_dir.into(),
            },
            options: FetchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }
}

/// Per-call collaborators: cancellation and an optional event sink.
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    cancel: CancellationToken,
    events: Option<mpsc::UnboundedSender<FetchEvent>>,
}

impl FetchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<FetchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn events(&self) -> Option<mpsc::UnboundedSender<FetchEvent>> {
        self.events.clone()
    }
}

/// Result of [`VideoFetcher::fetch`], shaped by the request's output mode
#[derive(Debug)]
pub enum FetchOutput {
    Stream(VideoStream),
    File(PathBuf),
}

/// Typed operations over an external video downloader.
///
/// Each call spawns at most one process and settles exactly once. Cancelling
/// the context's token kills the process and yields [`FetchError::Cancelled`].
#[async_trait]
pub trait VideoFetcher: Send + Sync {
    /// Metadata only; never returns partially populated metadata.
    async fn probe(&self, video: &VideoReference, ctx: &FetchContext) -> Result<VideoMetadata, FetchError>;

    /// Returns as soon as the process is running; the stream settles with it.
    async fn stream(
        &self,
        video: &VideoReference,
        opts: &FetchOptions,
        ctx: &FetchContext,
    ) -> Result<VideoStream, FetchError>;

    /// Downloads into `dest_dir` and returns the path the downloader reported.
    async fn download_to_file(
        &self,
        video: &VideoReference,
        opts: &FetchOptions,
        dest_dir: &Path,
        ctx: &FetchContext,
    ) -> Result<PathBuf, FetchError>;

    /// Runs a request in its output mode.
    async fn fetch(&self, request: &FetchRequest, ctx: &FetchContext) -> Result<FetchOutput, FetchError> {
        match &request.mode {
            OutputMode::Stream => self
                .stream(&request.video, &request.options, ctx)
                .await
                .map(FetchOutput::Stream),
            OutputMode::File { dest_dir } => self
                .download_to_file(&request.video, &request.options, dest_dir, ctx)
                .await
                .map(FetchOutput::File),
        }
    }
}
