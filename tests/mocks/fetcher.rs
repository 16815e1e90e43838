//! Scripted `VideoFetcher` that never spawns a process

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;
use url::Url;

use reeldrop::download::{
    FetchContext, FetchError, FetchOptions, VideoFetcher, VideoMetadata, VideoReference, VideoStream,
};

pub const STUB_TITLE: &str = "cat vs cucumber";
pub const STUB_BYTES: &[u8] = b"STUBVIDEO";

/// How the stub behaves once probed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubBehavior {
    Succeed,
    ProbeFails,
    /// Stream writes some bytes, then the process "exits" with this code
    StreamFails(i32),
    /// Stream stalls until the context is cancelled
    Hang,
}

pub struct StubFetcher {
    behavior: StubBehavior,
    probes: AtomicUsize,
    fetches: AtomicUsize,
}

impl StubFetcher {
    pub fn new(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            probes: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

pub fn stub_metadata(video: &VideoReference) -> VideoMetadata {
    VideoMetadata {
        title: STUB_TITLE.to_string(),
        duration_secs: 15,
        uploader: "catlover".to_string(),
        thumbnail: Url::parse("https://cdn.example.com/thumb.jpg").ok(),
        url: video.url().clone(),
    }
}

#[async_trait]
impl VideoFetcher for StubFetcher {
    async fn probe(&self, video: &VideoReference, _ctx: &FetchContext) -> Result<VideoMetadata, FetchError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            StubBehavior::ProbeFails => Err(FetchError::probe_failed("exit code 1 (Video unavailable)")),
            _ => Ok(stub_metadata(video)),
        }
    }

    async fn stream(
        &self,
        _video: &VideoReference,
        _opts: &FetchOptions,
        ctx: &FetchContext,
    ) -> Result<VideoStream, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        match self.behavior {
            StubBehavior::Succeed | StubBehavior::ProbeFails => {
                tx.send(Ok(())).ok();
                Ok(VideoStream::from_parts(STUB_BYTES, rx))
            }
            StubBehavior::StreamFails(code) => {
                tx.send(Err(FetchError::ProcessFailed { exit_code: Some(code) })).ok();
                Ok(VideoStream::from_parts(&b"PARTIAL"[..], rx))
            }
            StubBehavior::Hang => {
                let (mut writer, reader) = tokio::io::duplex(64);
                let cancel = ctx.cancel_token().clone();
                tokio::spawn(async move {
                    writer.write_all(b"HEAD").await.ok();
                    cancel.cancelled().await;
                    tx.send(Err(FetchError::Cancelled)).ok();
                    drop(writer);
                });
                Ok(VideoStream::from_parts(reader, rx))
            }
        }
    }

    async fn download_to_file(
        &self,
        _video: &VideoReference,
        opts: &FetchOptions,
        dest_dir: &Path,
        _ctx: &FetchContext,
    ) -> Result<PathBuf, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let StubBehavior::StreamFails(code) = self.behavior {
            return Err(FetchError::ProcessFailed { exit_code: Some(code) });
        }
        tokio::fs::create_dir_all(dest_dir).await?;
        let path = dest_dir.join(format!("{}.{}", STUB_TITLE, opts.container.extension()));
        tokio::fs::write(&path, STUB_BYTES).await?;
        Ok(path)
    }
}
