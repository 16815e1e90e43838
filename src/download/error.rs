use std::fmt;
use thiserror::Error;

/// Structured error type for video-fetch operations.
///
/// Every variant carries enough context (exit code, unmatched input, parse
/// reason) for the caller to decide on retry or user messaging. The wrapper
/// itself never retries.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Input did not match any supported video URL shape
    #[error("unsupported or invalid video URL: {input:?}")]
    InvalidUrl { input: String },

    /// Metadata probe failed (non-zero exit, missing binary, unparseable output)
    #[error("metadata probe failed: {reason}")]
    ProbeFailed { reason: String },

    /// Downloader exited unsuccessfully during stream or file download.
    /// `exit_code` is `None` when the process was terminated by a signal.
    #[error("downloader failed ({})", describe_exit(*exit_code))]
    ProcessFailed { exit_code: Option<i32> },

    /// Downloader exited 0 without announcing a destination path
    #[error("downloader finished without reporting a destination path")]
    PathUnresolved,

    /// Caller-initiated abort
    #[error("fetch cancelled")]
    Cancelled,

    /// Downloader could not be started at all
    #[error("failed to start downloader {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Local IO failure (destination directory, pipes)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Discriminant of [`FetchError`] without payload, handy for matching in logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    InvalidUrl,
    ProbeFailed,
    ProcessFailed,
    PathUnresolved,
    Cancelled,
    Spawn,
    Io,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchErrorKind::InvalidUrl => "InvalidUrl",
            FetchErrorKind::ProbeFailed => "ProbeFailed",
            FetchErrorKind::ProcessFailed => "ProcessFailed",
            FetchErrorKind::PathUnresolved => "PathUnresolved",
            FetchErrorKind::Cancelled => "Cancelled",
            FetchErrorKind::Spawn => "Spawn",
            FetchErrorKind::Io => "Io",
        };
        f.write_str(name)
    }
}

impl FetchError {
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        FetchError::ProbeFailed { reason: reason.into() }
    }

    pub fn invalid_url(input: impl Into<String>) -> Self {
        FetchError::InvalidUrl { input: input.into() }
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::InvalidUrl { .. } => FetchErrorKind::InvalidUrl,
            FetchError::ProbeFailed { .. } => FetchErrorKind::ProbeFailed,
            FetchError::ProcessFailed { .. } => FetchErrorKind::ProcessFailed,
            FetchError::PathUnresolved => FetchErrorKind::PathUnresolved,
            FetchError::Cancelled => FetchErrorKind::Cancelled,
            FetchError::Spawn { .. } => FetchErrorKind::Spawn,
            FetchError::Io(_) => FetchErrorKind::Io,
        }
    }

    /// Returns subcategory for logs
    pub fn subcategory(&self) -> &'static str {
        match self {
            FetchError::InvalidUrl { .. } => "invalid_url",
            FetchError::ProbeFailed { .. } => "probe_failed",
            FetchError::ProcessFailed { .. } => "process_failed",
            FetchError::PathUnresolved => "path_unresolved",
            FetchError::Cancelled => "cancelled",
            FetchError::Spawn { .. } => "spawn",
            FetchError::Io(_) => "io",
        }
    }

    /// Exit code of the downloader, when the failure carries one
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            FetchError::ProcessFailed { exit_code } => *exit_code,
            _ => None,
        }
    }

    /// Converts into an `io::Error` so the failure can travel through `AsyncRead`.
    pub(crate) fn into_io(self) -> std::io::Error {
        std::io::Error::other(self)
    }

    /// Recovers a `FetchError` that was wrapped by [`FetchError::into_io`].
    pub fn from_io(err: std::io::Error) -> Self {
        match err.downcast::<FetchError>() {
            Ok(fetch) => fetch,
            Err(err) => FetchError::Io(err),
        }
    }
}

impl Clone for FetchError {
    /// `io::Error` is not `Clone`; copies keep its kind and message.
    fn clone(&self) -> Self {
        match self {
            FetchError::InvalidUrl { input } => FetchError::InvalidUrl { input: input.clone() },
            FetchError::ProbeFailed { reason } => FetchError::ProbeFailed { reason: reason.clone() },
            FetchError::ProcessFailed { exit_code } => FetchError::ProcessFailed { exit_code: *exit_code },
            FetchError::PathUnresolved => FetchError::PathUnresolved,
            FetchError::Cancelled => FetchError::Cancelled,
            FetchError::Spawn { program, source } => FetchError::Spawn {
                program: program.clone(),
                source: copy_io(source),
            },
            FetchError::Io(e) => FetchError::Io(copy_io(e)),
        }
    }
}

fn copy_io(err: &std::io::Error) -> std::io::Error {
    std::io::Error::new(err.kind(), err.to_string())
}

fn describe_exit(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}
