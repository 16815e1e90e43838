//! Typed view of the downloader's `--dump-single-json` output.
//!
//! The raw JSON is validated at the boundary: missing or mistyped fields fail
//! the probe instead of leaking half-filled metadata to callers.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::download::error::FetchError;

/// Metadata returned by a successful probe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoMetadata {
    pub title: String,
    /// Duration in whole seconds (rounded)
    pub duration_secs: u32,
    pub uploader: String,
    pub thumbnail: Option<Url>,
    /// Canonical page URL reported by the extractor
    pub url: Url,
}

/// Subset of the yt-dlp info dict we care about
#[derive(Debug, Deserialize)]
struct RawInfo {
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    thumbnail: Option<String>,
    webpage_url: Option<String>,
    original_url: Option<String>,
}

impl TryFrom<RawInfo> for VideoMetadata {
    type Error = FetchError;

    fn try_from(raw: RawInfo) -> Result<Self, Self::Error> {
        let title = raw
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| FetchError::probe_failed("missing title"))?;

        let duration = raw.duration.ok_or_else(|| FetchError::probe_failed("missing duration"))?;
        if !duration.is_finite() || duration < 0.0 {
            return Err(FetchError::probe_failed(format!("invalid duration: {}", duration)));
        }

        // Instagram and Facebook extractors sometimes only fill `channel`
        let uploader = raw
            .uploader
            .or(raw.channel)
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| FetchError::probe_failed("missing uploader"))?;

        let page = raw
            .webpage_url
            .or(raw.original_url)
            .ok_or_else(|| FetchError::probe_failed("missing webpage_url"))?;
        let url = Url::parse(&page).map_err(|e| FetchError::probe_failed(format!("invalid webpage_url: {}", e)))?;

        // A broken thumbnail is cosmetic; drop it rather than failing the probe
        let thumbnail = raw.thumbnail.and_then(|t| Url::parse(&t).ok());

        Ok(VideoMetadata {
            title,
            duration_secs: duration.round() as u32,
            uploader,
            thumbnail,
            url,
        })
    }
}

/// Parses probe stdout into [`VideoMetadata`].
pub fn parse_metadata(stdout: &str) -> Result<VideoMetadata, FetchError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(FetchError::probe_failed("downloader printed no metadata"));
    }
    let raw: RawInfo =
        serde_json::from_str(trimmed).map_err(|e| FetchError::probe_failed(format!("could not parse json: {}", e)))?;
    VideoMetadata::try_from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::error::FetchErrorKind;
    use pretty_assertions::assert_eq;

    const TIKTOK_INFO: &str = r#"{
        "id": "7301234567890",
        "title": "cat vs cucumber",
        "duration": 14.7,
        "uploader": "catlover",
        "thumbnail": "https://p16-sign.tiktokcdn.com/thumb.jpeg",
        "webpage_url": "https://www.tiktok.com/@catlover/video/7301234567890",
        "formats": []
    }"#;

    #[test]
    fn test_parse_full_metadata() {
        let meta = parse_metadata(TIKTOK_INFO).unwrap();
        assert_eq!(meta.title, "cat vs cucumber");
        assert_eq!(meta.duration_secs, 15);
        assert_eq!(meta.uploader, "catlover");
        assert_eq!(
            meta.thumbnail.as_ref().map(Url::as_str),
            Some("https://p16-sign.tiktokcdn.com/thumb.jpeg")
        );
        assert_eq!(meta.url.as_str(), "https://www.tiktok.com/@catlover/video/7301234567890");
    }

    #[test]
    fn test_uploader_falls_back_to_channel() {
        let json = r#"{"title":"t","duration":3,"channel":"page","webpage_url":"https://www.facebook.com/reel/1"}"#;
        let meta = parse_metadata(json).unwrap();
        assert_eq!(meta.uploader, "page");
        assert!(meta.thumbnail.is_none());
    }

    #[test]
    fn test_missing_duration_fails() {
        let json = r#"{"title":"t","uploader":"u","webpage_url":"https://www.instagram.com/reel/x/"}"#;
        let err = parse_metadata(json).unwrap_err();
        assert_eq!(err.kind(), FetchErrorKind::ProbeFailed);
        assert!(err.to_string().contains("duration"));
    }

    #[test]
    fn test_wrong_type_fails() {
        let json = r#"{"title":42,"duration":3,"uploader":"u","webpage_url":"https://x.com/"}"#;
        assert_eq!(parse_metadata(json).unwrap_err().kind(), FetchErrorKind::ProbeFailed);
    }

    #[test]
    fn test_negative_duration_fails() {
        let json = r#"{"title":"t","duration":-1,"uploader":"u","webpage_url":"https://x.com/"}"#;
        assert_eq!(parse_metadata(json).unwrap_err().kind(), FetchErrorKind::ProbeFailed);
    }

    #[test]
    fn test_blank_output_fails() {
        assert_eq!(parse_metadata("  \n").unwrap_err().kind(), FetchErrorKind::ProbeFailed);
        assert_eq!(parse_metadata("not json").unwrap_err().kind(), FetchErrorKind::ProbeFailed);
    }
}
