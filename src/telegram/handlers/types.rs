//! Handler types and dependencies

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::config;
use crate::download::{VideoFetcher, YtDlpFetcher};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub fetcher: Arc<dyn VideoFetcher>,
    /// Cancelled on shutdown; every request runs under a child of it
    pub shutdown: CancellationToken,
    /// Base folder for per-request directories of non-MP4 Mini App downloads
    pub download_dir: PathBuf,
    pub fetch_timeout: Duration,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(fetcher: Arc<dyn VideoFetcher>, shutdown: CancellationToken, download_dir: PathBuf) -> Self {
        Self {
            fetcher,
            shutdown,
            download_dir,
            fetch_timeout: config::download::fetch_timeout(),
        }
    }

    /// Dependencies wired from the environment configuration
    pub fn from_env(shutdown: CancellationToken) -> Self {
        Self::new(
            Arc::new(YtDlpFetcher::from_env()),
            shutdown,
            PathBuf::from(config::download_folder()),
        )
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}
