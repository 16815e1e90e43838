//! Logging initialization and configuration checking
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - Cookies configuration validation at startup

use anyhow::Result;
use simplelog::*;
use std::fs::File;
use std::path::Path;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
/// * `terminal_mode` - Console stream; subcommands that print results use
///   [`TerminalMode::Stderr`] so stdout carries only their output
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the file or a logger was already set
pub fn init_logger(log_file_path: &str, terminal_mode: TerminalMode) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            terminal_mode,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Outcome of the startup cookie check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookiesStatus {
    /// File exists; carries the canonical path when it could be resolved
    Present(String),
    Missing(String),
}

/// Inspects the cookies file without reading it.
pub fn check_cookies_file(path: &str) -> CookiesStatus {
    let path_buf = Path::new(path);
    if path_buf.exists() {
        let shown = path_buf
            .canonicalize()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| path.to_string());
        CookiesStatus::Present(shown)
    } else {
        CookiesStatus::Missing(path.to_string())
    }
}

/// Logs cookies configuration at application startup
///
/// A missing file is not fatal: the downloader fails on its own and the bot
/// reports a generic error to users, so operators need this line in the log.
pub fn log_cookies_configuration() {
    match check_cookies_file(&config::cookies_path()) {
        CookiesStatus::Present(path) => {
            log::info!("✅ YTDL_COOKIES_FILE: {}", path);
        }
        CookiesStatus::Missing(path) => {
            log::error!("❌ YTDL_COOKIES_FILE: {} (FILE NOT FOUND!)", path);
            log::error!("   Current directory: {:?}", std::env::current_dir());
            log::error!("   TikTok/Instagram/Facebook downloads will likely FAIL without cookies");
        }
    }
}
