use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

// Configuration constants for the bot

/// Downloader command, read once at startup from YTDL_BIN or defaults to "yt-dlp".
///
/// May carry leading arguments, e.g. `python3 -m yt_dlp`; they are split on
/// whitespace by [`ytdl_command`].
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env::var("YTDL_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// Path to the Netscape cookies file passed to every downloader invocation.
/// Read from YTDL_COOKIES_FILE environment variable
/// Default: cookies.txt (relative to the working directory)
pub static YTDL_COOKIES_FILE: Lazy<String> =
    Lazy::new(|| env::var("YTDL_COOKIES_FILE").unwrap_or_else(|_| "cookies.txt".to_string()));

/// Folder for `download` CLI output and non-MP4 Mini App requests.
/// Supports tilde (~) expansion for home directory
pub static DOWNLOAD_FOLDER: Lazy<String> =
    Lazy::new(|| env::var("DOWNLOAD_FOLDER").unwrap_or_else(|_| "./downloads".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: app.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "app.log".to_string()));

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Custom Bot API server (local telegram-bot-api), if any
pub static BOT_API_URL: Lazy<Option<String>> = Lazy::new(|| env::var("BOT_API_URL").ok());

/// Public webhook URL for Telegram updates
/// Read from WEBHOOK_URL environment variable
pub static WEBHOOK_URL: Lazy<Option<String>> = Lazy::new(|| env::var("WEBHOOK_URL").ok());

/// Local address the webhook listener binds to
/// Default: 0.0.0.0:8443
pub static WEBHOOK_ADDR: Lazy<String> =
    Lazy::new(|| env::var("WEBHOOK_ADDR").unwrap_or_else(|_| "0.0.0.0:8443".to_string()));

/// Splits [`YTDL_BIN`] into the program and its leading arguments.
pub fn ytdl_command() -> (String, Vec<String>) {
    split_command(&YTDL_BIN)
}

/// Resolves the cookies path, expanding `~` when present.
pub fn cookies_path() -> String {
    expand_path(&YTDL_COOKIES_FILE)
}

/// Resolves the download folder, expanding `~` when present.
pub fn download_folder() -> String {
    expand_path(&DOWNLOAD_FOLDER)
}

pub fn expand_path(path: &str) -> String {
    shellexpand::tilde(path).to_string()
}

pub(crate) fn split_command(raw: &str) -> (String, Vec<String>) {
    let mut parts = raw.split_whitespace().map(str::to_string);
    let program = parts.next().unwrap_or_else(|| "yt-dlp".to_string());
    (program, parts.collect())
}

/// Download configuration
pub mod download {
    use super::Duration;
    use once_cell::sync::Lazy;

    /// Default deadline for a single fetch, enforced by the bot via cancellation
    pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 240; // 4 minutes, slow reels can take a while

    /// Number of stderr lines kept for operator logs when the downloader fails
    pub const STDERR_TAIL_LINES: usize = 50;

    /// Fetch deadline, overridable with FETCH_TIMEOUT_SECS
    pub static FETCH_TIMEOUT_SECS: Lazy<u64> = Lazy::new(|| {
        std::env::var("FETCH_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS)
    });

    /// Fetch deadline duration
    pub fn fetch_timeout() -> Duration {
        Duration::from_secs(*FETCH_TIMEOUT_SECS)
    }
}

/// Progress message configuration
pub mod progress {
    use super::Duration;

    /// Minimum interval between placeholder edits (Telegram rate-limits edits)
    pub const UPDATE_INTERVAL_MS: u64 = 3000;

    /// Minimum percentage change worth an edit
    pub const MIN_PERCENT_STEP: u8 = 5;

    pub fn update_interval() -> Duration {
        Duration::from_millis(UPDATE_INTERVAL_MS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API calls (in seconds)
    /// Large enough for video uploads streamed straight from the downloader
    pub const REQUEST_TIMEOUT_SECS: u64 = 600; // 10 minutes

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Dispatcher restart configuration
pub mod retry {
    use super::Duration;

    /// How many times the dispatcher is restarted after a panic
    pub const MAX_DISPATCHER_RETRIES: u32 = 5;

    /// Delay between dispatcher restarts (in seconds)
    pub const DISPATCHER_DELAY_SECS: u64 = 2;

    /// Base for exponential backoff between restarts after a panic
    pub const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

    pub fn dispatcher_delay() -> Duration {
        Duration::from_secs(DISPATCHER_DELAY_SECS)
    }
}
