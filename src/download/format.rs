//! Download preferences and the yt-dlp format selector built from them.

use std::fmt;
use std::str::FromStr;

/// Quality preference, mapped to the base of the yt-dlp format expression
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Quality {
    #[default]
    Best,
    /// Best rendition up to 1080p
    High,
    /// Best rendition up to 720p
    Medium,
    Worst,
    /// Explicit yt-dlp format expression used verbatim as the base
    Explicit(String),
}

impl Quality {
    /// Base of the format selector
    pub fn as_str(&self) -> &str {
        match self {
            Quality::Best => "best",
            Quality::High => "best[height<=1080]",
            Quality::Medium => "best[height<=720]",
            Quality::Worst => "worst",
            Quality::Explicit(expr) => expr,
        }
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // Named levels match the Mini App labels ("Best", "High", "Medium") in any case
        match s.to_ascii_lowercase().as_str() {
            "" => return Err("quality must not be empty".to_string()),
            "best" => return Ok(Quality::Best),
            "high" => return Ok(Quality::High),
            "medium" => return Ok(Quality::Medium),
            "worst" => return Ok(Quality::Worst),
            _ => {}
        }
        // Selector syntax is not allowed inside the base
        if s.contains(['/', '[', ']', ',']) {
            return Err(format!("unsupported quality expression: {}", s));
        }
        Ok(Quality::Explicit(s.to_string()))
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output container requested by the Mini App
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Container {
    #[default]
    Mp4,
    Webm,
    Avi,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Webm => "webm",
            Container::Avi => "avi",
        }
    }
}

impl FromStr for Container {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(Container::Mp4),
            "webm" => Ok(Container::Webm),
            "avi" => Ok(Container::Avi),
            other => Err(format!("unsupported format: {}", other)),
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Per-request download preferences
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchOptions {
    pub quality: Quality,
    pub with_watermark: bool,
    /// Only honoured by file downloads; streams are always MP4
    pub container: Container,
}

impl FetchOptions {
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_watermark(mut self, with_watermark: bool) -> Self {
        self.with_watermark = with_watermark;
        self
    }

    pub fn with_container(mut self, container: Container) -> Self {
        self.container = container;
        self
    }
}

/// Builds the `-f` selector for yt-dlp.
///
/// Without watermark: `<base>[ext=mp4]`.
/// With watermark: prefer a rendition whose format note says "watermarked",
/// falling back to the plain MP4 constraint.
pub fn build_format_selector(opts: &FetchOptions) -> String {
    let base = opts.quality.as_str();
    let mp4 = format!("{}[ext=mp4]", base);
    if opts.with_watermark {
        format!("{}[format_note*=watermarked][ext=mp4]/{}", base, mp4)
    } else {
        mp4
    }
}
