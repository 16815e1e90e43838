//! Video fetching: URL matching, downloader invocation and its typed output

pub mod error;
pub mod events;
pub mod format;
pub mod metadata;
pub mod source;
pub mod stream;
pub mod url;

// Re-exports for convenience
pub use error::{FetchError, FetchErrorKind};
pub use events::{FetchEvent, FetchState, ProgressInfo};
pub use format::{build_format_selector, Container, FetchOptions, Quality};
pub use metadata::VideoMetadata;
pub use source::ytdlp::YtDlpFetcher;
pub use source::{FetchContext, FetchOutput, FetchRequest, OutputMode, VideoFetcher};
pub use stream::{StreamOutcome, VideoStream};
pub use url::{extract_video_url, parse_video_url, Platform, VideoReference};
