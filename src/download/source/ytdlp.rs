//! yt-dlp backend for [`VideoFetcher`].
//!
//! Every operation spawns one process with `--cookies <path>` and the URL after
//! `--`. Output lines go through [`classify_line`] before reaching callers, and
//! a short stderr tail is kept for operator logs when the process fails.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{FetchContext, VideoFetcher};
use crate::core::config;
use crate::download::error::FetchError;
use crate::download::events::{classify_line, parse_destination, FetchEvent, Invocation};
use crate::download::format::{build_format_selector, Container, FetchOptions};
use crate::download::metadata::{parse_metadata, VideoMetadata};
use crate::download::stream::VideoStream;
use crate::download::url::VideoReference;

/// Output template used for file downloads, relative to the destination dir
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Fetcher backed by the yt-dlp executable.
///
/// Holds only immutable paths, so clones can run concurrently.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    program: String,
    leading_args: Vec<String>,
    cookies: PathBuf,
}

impl YtDlpFetcher {
    pub fn new(program: impl Into<String>, cookies: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            cookies: cookies.into(),
        }
    }

    /// Arguments placed before the downloader flags, e.g. `-m yt_dlp` for `python3`.
    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    /// Builds the fetcher from `YTDL_BIN` and `YTDL_COOKIES_FILE`.
    pub fn from_env() -> Self {
        let (program, args) = config::ytdl_command();
        Self::new(program, config::cookies_path()).with_leading_args(args)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn cookies_path(&self) -> &Path {
        &self.cookies
    }

    fn probe_args(&self, video: &VideoReference) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--skip-download".to_string(),
            "--no-playlist".to_string(),
        ];
        self.push_tail_args(&mut args, video);
        args
    }

    fn stream_args(&self, video: &VideoReference, opts: &FetchOptions) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            build_format_selector(opts),
            "-o".to_string(),
            "-".to_string(),
            "--newline".to_string(),
            "--no-playlist".to_string(),
        ];
        self.push_tail_args(&mut args, video);
        args
    }

    fn file_args(&self, video: &VideoReference, opts: &FetchOptions, dest_dir: &Path) -> Vec<String> {
        let template = dest_dir.join(OUTPUT_TEMPLATE);
        let mut args = vec![
            "-f".to_string(),
            build_format_selector(opts),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            "--newline".to_string(),
            "--no-playlist".to_string(),
            "--force-overwrites".to_string(),
        ];
        if opts.container != Container::Mp4 {
            args.push("--remux-video".to_string());
            args.push(opts.container.extension().to_string());
        }
        self.push_tail_args(&mut args, video);
        args
    }

    /// Cookies go on every invocation; the URL always comes last, after `--`.
    fn push_tail_args(&self, args: &mut Vec<String>, video: &VideoReference) {
        args.push("--cookies".to_string());
        args.push(self.cookies.to_string_lossy().into_owned());
        args.push("--".to_string());
        args.push(video.as_str().to_string());
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        log::debug!("{} {} {}", self.program, self.leading_args.join(" "), args.join(" "));
        cmd
    }

    fn spawn(&self, args: &[String]) -> Result<Child, FetchError> {
        self.command(args).spawn().map_err(|source| FetchError::Spawn {
            program: self.program.clone(),
            source,
        })
    }
}

#[async_trait]
impl VideoFetcher for YtDlpFetcher {
    async fn probe(&self, video: &VideoReference, ctx: &FetchContext) -> Result<VideoMetadata, FetchError> {
        if ctx.cancel_token().is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        log::info!("Probing {} ({})", video, video.platform());

        let mut child = self
            .spawn(&self.probe_args(video))
            .map_err(|e| FetchError::probe_failed(e.to_string()))?;
        let mut invocation = Invocation::new(ctx.events());
        invocation.start();

        let stdout = child.stdout.take();
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut stdout) = stdout {
                stdout.read_to_end(&mut buf).await?;
            }
            Ok::<_, std::io::Error>(String::from_utf8_lossy(&buf).into_owned())
        });
        let stderr_task = spawn_line_reader(child.stderr.take(), invocation.sender());

        let status = match wait_or_cancel(&mut child, ctx.cancel_token()).await {
            Ok(status) => status,
            Err(e) => {
                stdout_task.abort();
                stop_reader(stderr_task).await;
                invocation.settle(None, false);
                return Err(match e {
                    FetchError::Io(io) => FetchError::probe_failed(io.to_string()),
                    other => other,
                });
            }
        };

        let tail = stderr_task.await.unwrap_or_default();
        let stdout = match stdout_task.await {
            Ok(Ok(stdout)) => stdout,
            Ok(Err(e)) => {
                invocation.settle(status.code(), false);
                return Err(FetchError::probe_failed(format!("failed to read stdout: {}", e)));
            }
            Err(e) => {
                invocation.settle(status.code(), false);
                return Err(FetchError::probe_failed(format!("stdout reader failed: {}", e)));
            }
        };

        if !status.success() {
            invocation.settle(status.code(), false);
            tail.log_failure(video, status);
            return Err(FetchError::probe_failed(match tail.last_error() {
                Some(cause) => format!("{} ({})", describe_status(status), cause),
                None => describe_status(status),
            }));
        }

        let parsed = parse_metadata(&stdout);
        invocation.settle(status.code(), parsed.is_ok());
        let metadata = parsed?;
        log::info!("Probed {}: {:?} by {} ({}s)", video, metadata.title, metadata.uploader, metadata.duration_secs);
        Ok(metadata)
    }

    async fn stream(
        &self,
        video: &VideoReference,
        opts: &FetchOptions,
        ctx: &FetchContext,
    ) -> Result<VideoStream, FetchError> {
        if ctx.cancel_token().is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        if opts.container != Container::Mp4 {
            log::debug!("Streams are always mp4, ignoring container {}", opts.container);
        }
        log::info!("Streaming {} with format {}", video, build_format_selector(opts));

        let mut child = self.spawn(&self.stream_args(video, opts))?;
        let mut invocation = Invocation::new(ctx.events());
        invocation.start();

        let Some(stdout) = child.stdout.take() else {
            invocation.settle(None, false);
            return Err(FetchError::Io(std::io::Error::other("downloader stdout was not captured")));
        };
        let stderr_task = spawn_line_reader(child.stderr.take(), invocation.sender());

        // The stream's guard cancels this token when it is dropped
        let token = ctx.cancel_token().child_token();
        let guard = token.clone().drop_guard();
        let (tx, rx) = oneshot::channel();
        let label = video.to_string();

        tokio::spawn(async move {
            let outcome = match wait_or_cancel(&mut child, &token).await {
                Ok(status) => {
                    let tail = stderr_task.await.unwrap_or_default();
                    invocation.settle(status.code(), status.success());
                    if status.success() {
                        log::info!("✅ Stream finished for {}", label);
                        Ok(())
                    } else {
                        tail.log_failure(&label, status);
                        Err(FetchError::ProcessFailed {
                            exit_code: status.code(),
                        })
                    }
                }
                Err(e) => {
                    stop_reader(stderr_task).await;
                    invocation.settle(None, false);
                    log::warn!("Stream for {} stopped: {}", label, e);
                    Err(e)
                }
            };
            if tx.send(outcome).is_err() {
                log::debug!("Stream consumer for {} went away before the outcome", label);
            }
        });

        Ok(VideoStream::new(Box::new(stdout), rx, guard))
    }

    async fn download_to_file(
        &self,
        video: &VideoReference,
        opts: &FetchOptions,
        dest_dir: &Path,
        ctx: &FetchContext,
    ) -> Result<PathBuf, FetchError> {
        if ctx.cancel_token().is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        tokio::fs::create_dir_all(dest_dir).await?;
        log::info!(
            "Downloading {} into {} as {}",
            video,
            dest_dir.display(),
            opts.container
        );

        let mut child = self.spawn(&self.file_args(video, opts, dest_dir))?;
        let mut invocation = Invocation::new(ctx.events());
        invocation.start();

        let stdout_task = spawn_line_reader(child.stdout.take(), invocation.sender());
        let stderr_task = spawn_line_reader(child.stderr.take(), invocation.sender());

        let status = match wait_or_cancel(&mut child, ctx.cancel_token()).await {
            Ok(status) => status,
            Err(e) => {
                stop_reader(stdout_task).await;
                stop_reader(stderr_task).await;
                invocation.settle(None, false);
                return Err(e);
            }
        };

        let stdout_tail = stdout_task.await.unwrap_or_default();
        let stderr_tail = stderr_task.await.unwrap_or_default();
        // yt-dlp announces destinations on stdout; stderr is the fallback
        let destination = stdout_tail.destination.or(stderr_tail.destination.clone());

        if !status.success() {
            invocation.settle(status.code(), false);
            stderr_tail.log_failure(video, status);
            return Err(FetchError::ProcessFailed {
                exit_code: status.code(),
            });
        }

        invocation.settle(status.code(), destination.is_some());
        match destination {
            Some(path) => {
                log::info!("✅ Downloaded {} to {}", video, path.display());
                Ok(path)
            }
            None => {
                log::error!("Downloader exited 0 for {} without a Destination line", video);
                Err(FetchError::PathUnresolved)
            }
        }
    }
}

/// Waits for exit, killing the process first if `cancel` fires.
async fn wait_or_cancel(child: &mut Child, cancel: &CancellationToken) -> Result<ExitStatus, FetchError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {}
        status = child.wait() => return Ok(status?),
    }
    if let Err(e) = child.start_kill() {
        log::warn!("Failed to kill downloader: {}", e);
    }
    if let Err(e) = child.wait().await {
        log::warn!("Failed to reap killed downloader: {}", e);
    }
    Err(FetchError::Cancelled)
}

/// Aborts a line reader and waits until it can no longer emit events.
async fn stop_reader(reader: JoinHandle<OutputTail>) {
    reader.abort();
    if let Err(e) = reader.await {
        if !e.is_cancelled() {
            log::warn!("Downloader output reader failed: {}", e);
        }
    }
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// What a line reader saw by the time its pipe closed
#[derive(Debug, Default)]
struct OutputTail {
    lines: VecDeque<String>,
    destination: Option<PathBuf>,
}

impl OutputTail {
    fn push(&mut self, line: &str) {
        if let Some(path) = parse_destination(line) {
            self.destination = Some(path);
        }
        if self.lines.len() == config::download::STDERR_TAIL_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    fn last_error(&self) -> Option<&str> {
        self.lines
            .iter()
            .rev()
            .find_map(|line| line.strip_prefix("ERROR:"))
            .map(str::trim)
    }

    fn log_failure(&self, video: impl std::fmt::Display, status: ExitStatus) {
        log::error!("❌ Downloader failed for {} ({})", video, describe_status(status));
        for line in &self.lines {
            log::error!("  yt-dlp: {}", line);
        }
    }
}

/// Reads lines until the pipe closes, forwarding each one as a [`FetchEvent`].
fn spawn_line_reader<R>(pipe: Option<R>, events: Option<mpsc::UnboundedSender<FetchEvent>>) -> JoinHandle<OutputTail>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut tail = OutputTail::default();
        let Some(pipe) = pipe else {
            return tail;
        };
        let mut events = events;
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Failed to read downloader output: {}", e);
                    break;
                }
            }
            // Titles are not guaranteed to be valid UTF-8
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            tail.push(line);
            if let Some(tx) = &events {
                if tx.send(classify_line(line)).is_err() {
                    events = None;
                }
            }
        }
        tail
    })
}
