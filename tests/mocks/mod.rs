//! Test doubles for the fetch wrapper and the chat transport
//!
//! - `fake_downloader`: shell scripts standing in for yt-dlp
//! - `transport`: a `ChatTransport` that records every call
//! - `fetcher`: a scripted `VideoFetcher` with no external process

#![allow(dead_code)]

pub mod fake_downloader;
pub mod fetcher;
pub mod transport;

pub use fake_downloader::FakeDownloader;
pub use fetcher::{StubBehavior, StubFetcher};
pub use transport::{Call, RecordingTransport};
