//! Typed events produced from the downloader's raw output.
//!
//! `classify_line` is the only place that looks at raw yt-dlp text; everything
//! downstream matches on [`FetchEvent`].

use std::path::PathBuf;
use tokio::sync::mpsc;

/// Marker yt-dlp prints before the path it is writing to
pub const DESTINATION_MARKER: &str = "Destination:";

/// Progress snapshot parsed from a `[download]` line
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressInfo {
    pub percent: u8,
    pub speed_bytes_sec: Option<f64>,
    pub eta_seconds: Option<u64>,
    pub total_bytes: Option<u64>,
}

/// One observation from the external process, delivered in emission order
#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent {
    Progress(ProgressInfo),
    LogLine(String),
    /// `ERROR:` line reported by the downloader
    Error(String),
    /// Process exit; `None` when it was killed by a signal
    Exit(Option<i32>),
}

/// Lifecycle of one downloader invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Created,
    Running,
    Succeeded,
    Failed,
}

impl FetchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchState::Succeeded | FetchState::Failed)
    }
}

/// Converts one raw output line into an event.
pub fn classify_line(line: &str) -> FetchEvent {
    let trimmed = line.trim_end();
    if let Some(rest) = trimmed.strip_prefix("ERROR:") {
        return FetchEvent::Error(rest.trim().to_string());
    }
    match parse_progress(trimmed) {
        Some(progress) => FetchEvent::Progress(progress),
        None => FetchEvent::LogLine(trimmed.to_string()),
    }
}

/// Parses progress from yt-dlp output line
/// Example: "[download]  45.2% of 10.00MiB at 500.00KiB/s ETA 00:10"
pub fn parse_progress(line: &str) -> Option<ProgressInfo> {
    if !line.contains("[download]") || !line.contains('%') {
        return None;
    }

    let mut percent = None;
    let mut speed_bytes_sec = None;
    let mut eta_seconds = None;
    let mut total_bytes = None;

    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if part.ends_with('%') && percent.is_none() {
            if let Ok(p) = part.trim_end_matches('%').parse::<f32>() {
                percent = Some(p.clamp(0.0, 100.0) as u8);
            }
        }

        // "of 10.00MiB" or "of ~10.00MiB" for estimated sizes
        if *part == "of" && i + 1 < parts.len() {
            total_bytes = parse_size(parts[i + 1].trim_start_matches('~'));
        }

        // "at 500.00KiB/s"
        if *part == "at" && i + 1 < parts.len() {
            speed_bytes_sec = parse_size(parts[i + 1]).map(|b| b as f64);
        }

        // "ETA 00:10" or "ETA 1:02:03"
        if *part == "ETA" && i + 1 < parts.len() {
            eta_seconds = parse_eta(parts[i + 1]);
        }
    }

    percent.map(|percent| ProgressInfo {
        percent,
        speed_bytes_sec,
        eta_seconds,
        total_bytes,
    })
}

/// Returns the path announced after `Destination:`, if the line has one.
pub fn parse_destination(line: &str) -> Option<PathBuf> {
    let idx = line.find(DESTINATION_MARKER)?;
    let path = line[idx + DESTINATION_MARKER.len()..].trim();
    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

/// Parses a size such as "10.00MiB" or "500.00KiB/s" into bytes
fn parse_size(size_str: &str) -> Option<u64> {
    let size_str = size_str.trim_end_matches("/s");
    let units: [(&str, f64); 4] = [
        ("GiB", 1024.0 * 1024.0 * 1024.0),
        ("MiB", 1024.0 * 1024.0),
        ("KiB", 1024.0),
        ("B", 1.0),
    ];
    for (suffix, multiplier) in units {
        if let Some(number) = size_str.strip_suffix(suffix) {
            return number.parse::<f64>().ok().map(|n| (n * multiplier) as u64);
        }
    }
    None
}

/// Parses ETA like "00:10" or "1:02:03" into seconds
fn parse_eta(eta_str: &str) -> Option<u64> {
    let mut total = 0u64;
    let mut count = 0;
    for part in eta_str.split(':') {
        total = total * 60 + part.parse::<u64>().ok()?;
        count += 1;
    }
    if (2..=3).contains(&count) {
        Some(total)
    } else {
        None
    }
}

/// Tracks one invocation's state and forwards its events.
///
/// Events are only forwarded while `Running`; `settle` emits `Exit` and moves
/// to a terminal state exactly once.
#[derive(Debug)]
pub struct Invocation {
    state: FetchState,
    events: Option<mpsc::UnboundedSender<FetchEvent>>,
}

impl Invocation {
    pub fn new(events: Option<mpsc::UnboundedSender<FetchEvent>>) -> Self {
        Self {
            state: FetchState::Created,
            events,
        }
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    /// Created → Running, on process spawn
    pub fn start(&mut self) {
        if self.state == FetchState::Created {
            self.state = FetchState::Running;
        } else {
            log::warn!("Invocation start ignored in state {:?}", self.state);
        }
    }

    /// Forwards an event; returns false when it was dropped.
    pub fn emit(&self, event: FetchEvent) -> bool {
        if self.state != FetchState::Running {
            return false;
        }
        match &self.events {
            // A closed receiver just means nobody is listening anymore
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Running → Succeeded/Failed. Emits `Exit(code)` before leaving Running.
    pub fn settle(&mut self, exit_code: Option<i32>, succeeded: bool) {
        if self.state.is_terminal() {
            log::warn!("Invocation settled twice (already {:?})", self.state);
            return;
        }
        self.emit(FetchEvent::Exit(exit_code));
        self.state = if succeeded {
            FetchState::Succeeded
        } else {
            FetchState::Failed
        };
    }

    /// Sender for line readers; callers drain or stop them before `settle`
    pub(crate) fn sender(&self) -> Option<mpsc::UnboundedSender<FetchEvent>> {
        self.events.clone()
    }
}
