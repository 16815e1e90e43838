use anyhow::{Context, Result};
use dotenvy::dotenv;
use simplelog::TerminalMode;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use reeldrop::cli::{Cli, Commands};
use reeldrop::core::utils::format_duration;
use reeldrop::core::{config, init_logger, log_cookies_configuration};
use reeldrop::download::{
    parse_video_url, Container, FetchContext, FetchEvent, FetchOptions, Quality, VideoFetcher, YtDlpFetcher,
};
use reeldrop::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, HandlerError};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, bot creation) or a CLI
/// subcommand fails.
#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    dotenv().ok();

    // Initialize logger (console + file); one-shot commands keep stdout for their output
    let terminal_mode = if cli.prints_to_stdout() {
        TerminalMode::Stderr
    } else {
        TerminalMode::Mixed
    };
    init_logger(&config::LOG_FILE_PATH, terminal_mode)?;

    // Dispatch to appropriate command
    match cli.command {
        Some(Commands::Run { webhook }) => {
            log::info!("Running bot in normal mode (webhook: {})", webhook);
            run_bot(webhook).await
        }
        Some(Commands::Info { url, json }) => run_info(&url, json).await,
        Some(Commands::Download {
            url,
            output,
            quality,
            watermark,
            format,
        }) => run_download(&url, output, &quality, watermark, &format).await,
        None => {
            // Default: run the bot in normal mode
            log::info!("No command specified, running bot in normal mode");
            run_bot(false).await
        }
    }
}

async fn run_bot(use_webhook: bool) -> Result<()> {
    let bot_init_start = std::time::Instant::now();
    log::info!("Starting bot...");

    // Log cookies configuration at startup
    log_cookies_configuration();

    let bot = create_bot()?;
    match bot.get_me().await {
        Ok(me) => log::info!("Authorized as @{}", me.username()),
        Err(e) => log::warn!("get_me failed: {}. Continuing anyway.", e),
    }
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    // Cancelled on Ctrl-C so in-flight fetches kill their downloader
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if signal::ctrl_c().await.is_ok() {
                log::info!("Shutting down gracefully, cancelling in-flight fetches...");
                shutdown.cancel();
            }
        }
    });

    let handler = schema(HandlerDeps::from_env(shutdown.clone()));

    // Check if webhook mode is enabled
    let webhook_url = if use_webhook { config::WEBHOOK_URL.clone() } else { None };
    if use_webhook && webhook_url.is_none() {
        log::warn!("--webhook given but WEBHOOK_URL is not set, falling back to long polling");
    }

    log::info!("================================================");
    log::info!("🎉 Bot initialization complete in {:.2}s", bot_init_start.elapsed().as_secs_f64());
    log::info!("================================================");

    if let Some(url) = webhook_url {
        // Webhook mode
        let addr: SocketAddr = config::WEBHOOK_ADDR
            .parse()
            .with_context(|| format!("Invalid WEBHOOK_ADDR: {}", *config::WEBHOOK_ADDR))?;
        let url = url::Url::parse(&url).with_context(|| format!("Invalid WEBHOOK_URL: {}", url))?;
        log::info!("Starting bot in webhook mode at {} (listening on {})", url, addr);

        let listener = webhooks::axum(bot.clone(), webhooks::Options::new(addr, url)).await?;
        Dispatcher::builder(bot, handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("An error from the update listener"),
            )
            .await;
        log::info!("Dispatcher shutdown gracefully");
    } else {
        // Long polling mode (default)
        log::info!("Starting bot in long polling mode");
        run_polling_with_retries(bot, handler).await;
    }

    shutdown.cancel();
    Ok(())
}

/// Runs the polling dispatcher, restarting it after panics
async fn run_polling_with_retries(bot: Bot, handler: UpdateHandler<HandlerError>) {
    let mut retry_count = 0;
    let max_retries = config::retry::MAX_DISPATCHER_RETRIES;

    loop {
        let bot_clone = bot.clone();
        let handler_clone = handler.clone();

        // Create a new dispatcher in a separate task to isolate panics
        let handle = tokio::spawn(async move {
            use teloxide::update_listeners::Polling;

            let listener = Polling::builder(bot_clone.clone()).drop_pending_updates().build();

            Dispatcher::builder(bot_clone, handler_clone)
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                break;
            }
            Err(join_err) if join_err.is_panic() => {
                log::error!("Dispatcher panicked: {}", join_err);
                if retry_count >= max_retries {
                    log::error!("Max retries reached after panic. Exiting...");
                    break;
                }
                retry_count += 1;
                log::info!(
                    "Retrying dispatcher connection after panic (attempt {}/{})...",
                    retry_count,
                    max_retries
                );
                exponential_backoff(retry_count).await;
            }
            Err(join_err) => {
                log::warn!("Dispatcher task was cancelled: {}", join_err);
                break;
            }
        }

        // Add a delay between retries to avoid overwhelming the API
        sleep(config::retry::dispatcher_delay()).await;
    }
}

async fn exponential_backoff(retry_count: u32) {
    let delay = Duration::from_secs(config::retry::EXPONENTIAL_BACKOFF_BASE.pow(retry_count));
    sleep(delay).await;
}

/// `info` subcommand: probe and print
async fn run_info(url: &str, json: bool) -> Result<()> {
    let video = parse_video_url(url)?;
    let fetcher = YtDlpFetcher::from_env();
    let metadata = fetcher.probe(&video, &FetchContext::new()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
    } else {
        println!("Title:    {}", metadata.title);
        println!("Uploader: {}", metadata.uploader);
        println!("Duration: {}", format_duration(metadata.duration_secs));
        println!("Platform: {}", video.platform());
        println!("URL:      {}", metadata.url);
        if let Some(thumbnail) = &metadata.thumbnail {
            println!("Thumb:    {}", thumbnail);
        }
    }
    Ok(())
}

/// `download` subcommand: download_to_file with a textual progress line
async fn run_download(url: &str, output: Option<String>, quality: &str, watermark: bool, format: &str) -> Result<()> {
    let video = parse_video_url(url)?;
    let quality: Quality = quality.parse().map_err(anyhow::Error::msg)?;
    let container: Container = format.parse().map_err(anyhow::Error::msg)?;
    let options = FetchOptions::default()
        .with_quality(quality)
        .with_watermark(watermark)
        .with_container(container);
    let dest_dir = PathBuf::from(output.map(|o| config::expand_path(&o)).unwrap_or_else(config::download_folder));

    // Ctrl-C kills the downloader instead of leaving it running
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                FetchEvent::Progress(p) => eprint!("\r[download] {:>3}%", p.percent),
                FetchEvent::Error(cause) => eprintln!("\nERROR: {}", cause),
                FetchEvent::LogLine(_) | FetchEvent::Exit(_) => {}
            }
        }
        eprintln!();
    });

    let fetcher = YtDlpFetcher::from_env();
    let ctx = FetchContext::new().with_cancel(cancel).with_events(tx);
    let result = fetcher.download_to_file(&video, &options, &dest_dir, &ctx).await;
    drop(ctx);
    if let Err(e) = printer.await {
        log::debug!("Progress printer stopped: {}", e);
    }

    let path = result?;
    println!("{}", path.display());
    Ok(())
}
