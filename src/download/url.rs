//! Video URL matching shared by the chat handler and the Mini App bridge.
//!
//! Only the five supported shapes are accepted; matching follows host and path
//! structure, so a bare mention of "tiktok" or a profile link never matches.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use url::Url;

use crate::download::error::FetchError;

/// Compiled once at startup and reused for all messages
static VIDEO_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b(?:https?://)?(?:www\.)?(?:",
        r"(?:vt|vm)\.tiktok\.com/[A-Za-z0-9]+/?",
        r"|tiktok\.com/@[A-Za-z0-9._]+/video/\d+",
        r"|instagram\.com/reel/[A-Za-z0-9_-]+/?",
        r"|facebook\.com/reels?/[A-Za-z0-9]+/?",
        r")"
    ))
    .expect("Failed to compile video URL regex")
});

/// Source platform inferred from the matched host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    TikTok,
    Instagram,
    Facebook,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::TikTok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
        }
    }

    fn from_host(host: &str) -> Option<Self> {
        let host = host.to_ascii_lowercase();
        if host == "tiktok.com" || host.ends_with(".tiktok.com") {
            Some(Platform::TikTok)
        } else if host == "instagram.com" || host.ends_with(".instagram.com") {
            Some(Platform::Instagram)
        } else if host == "facebook.com" || host.ends_with(".facebook.com") {
            Some(Platform::Facebook)
        } else {
            None
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Platform::TikTok => "TikTok",
            Platform::Instagram => "Instagram",
            Platform::Facebook => "Facebook",
        })
    }
}

/// A validated video URL plus its platform. Immutable once extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoReference {
    url: Url,
    platform: Platform,
}

impl VideoReference {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }
}

impl fmt::Display for VideoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Returns the first substring of `text` that looks like a supported video URL.
pub fn find_video_url(text: &str) -> Option<&str> {
    VIDEO_URL_REGEX.find(text).map(|m| m.as_str())
}

/// True when `text` contains a supported video URL anywhere.
pub fn matches(text: &str) -> bool {
    VIDEO_URL_REGEX.is_match(text)
}

/// Extracts the first supported video URL from a message.
///
/// Scheme-less matches (`vt.tiktok.com/ZS...`) are normalised to `https://`.
pub fn extract_video_url(text: &str) -> Option<VideoReference> {
    let raw = find_video_url(text)?;
    let normalized = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let url = match Url::parse(&normalized) {
        Ok(url) => url,
        Err(e) => {
            log::warn!("Matched video URL {:?} failed to parse: {}", raw, e);
            return None;
        }
    };
    let platform = Platform::from_host(url.host_str()?)?;
    Some(VideoReference { url, platform })
}

/// Same as [`extract_video_url`] but reports the unmatched input as an error.
pub fn parse_video_url(text: &str) -> Result<VideoReference, FetchError> {
    extract_video_url(text).ok_or_else(|| FetchError::invalid_url(text.trim()))
}
