use thiserror::Error;

use crate::download::FetchError;

/// Centralized error type for the bot process
///
/// Wrapper failures stay typed inside [`AppError::Fetch`] so handlers can log
/// the exact kind while showing users a single generic message.
///
/// # Example
///
/// ```no_run
/// use reeldrop::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Video-fetch wrapper errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Rejected user input, e.g. an invalid Mini App payload
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Returns the wrapper error when this failure came from the downloader.
    pub fn as_fetch(&self) -> Option<&FetchError> {
        match self {
            AppError::Fetch(e) => Some(e),
            _ => None,
        }
    }

    /// Short category used in operator logs
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Fetch(e) => e.subcategory(),
            AppError::Telegram(_) => "telegram",
            AppError::Io(_) => "io",
            AppError::Validation(_) => "validation",
        }
    }
}
