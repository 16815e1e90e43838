//! Reeldrop - Telegram bot that replies to short-video links with the video
//!
//! This library provides the core functionality of the bot: link matching,
//! the yt-dlp fetch wrapper with its typed events, and the Telegram layer
//! that delivers the result to a chat.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging, and common utilities
//! - `download`: URL matching, format selection, and the downloader wrapper
//! - `telegram`: Bot setup, handlers, delivery, and the Mini App bridge
//! - `cli`: Command-line interface of the binary

pub mod cli;
pub mod core;
pub mod download;
pub mod telegram;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use download::{FetchError, VideoFetcher, YtDlpFetcher};
pub use telegram::{deliver_video, ChatTransport};
