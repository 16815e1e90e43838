//! Mini App bridge payloads.
//!
//! The Mini App packages a download request as JSON and hands it to Telegram
//! through `WebApp.sendData`; it arrives here as a `web_app_data` service
//! message. Nothing is sent back to the UI; progress is shown in the chat.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::download::{parse_video_url, Container, FetchError, FetchOptions, FetchRequest, Quality};

/// The only action the bridge understands
pub const DOWNLOAD_ACTION: &str = "download";

/// Reply for payloads that fail validation
pub const REJECTION_TEXT: &str = "Invalid request from the Mini App. Please check the link and try again.";

/// Data sent from the Mini App
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebAppRequest {
    pub action: String,
    pub url: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub with_watermark: Option<bool>,
}

/// Why a Mini App payload was rejected
#[derive(Debug, Error)]
pub enum WebAppError {
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported action: {0:?}")]
    UnsupportedAction(String),

    #[error(transparent)]
    InvalidUrl(#[from] FetchError),

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidQuality(String),
}

impl WebAppRequest {
    pub fn parse(data: &str) -> Result<Self, WebAppError> {
        Ok(serde_json::from_str(data)?)
    }

    /// Requested download preferences; defaults are best quality, MP4, no watermark.
    pub fn options(&self) -> Result<FetchOptions, WebAppError> {
        let container = match self.format.as_deref() {
            Some(format) => format.parse::<Container>().map_err(WebAppError::InvalidFormat)?,
            None => Container::Mp4,
        };
        let quality = match self.quality.as_deref() {
            Some(quality) => quality.parse::<Quality>().map_err(WebAppError::InvalidQuality)?,
            None => Quality::Best,
        };
        Ok(FetchOptions::default()
            .with_quality(quality)
            .with_container(container)
            .with_watermark(self.with_watermark.unwrap_or(false)))
    }

    /// Validates the payload and turns it into a fetch request.
    ///
    /// MP4 requests are streamed; other containers need a remux on disk and
    /// are downloaded into `file_dir`.
    pub fn into_fetch_request(self, file_dir: &Path) -> Result<FetchRequest, WebAppError> {
        if self.action != DOWNLOAD_ACTION {
            return Err(WebAppError::UnsupportedAction(self.action));
        }
        let options = self.options()?;
        let video = parse_video_url(&self.url)?;
        let request = match options.container {
            Container::Mp4 => FetchRequest::stream(video),
            _ => FetchRequest::to_file(video, file_dir),
        };
        Ok(request.with_options(options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::OutputMode;
    use pretty_assertions::assert_eq;

    fn dir() -> &'static Path {
        Path::new("/tmp/reeldrop/42-7")
    }

    #[test]
    fn test_minimal_payload_streams_mp4() {
        let req = WebAppRequest::parse(r#"{"action":"download","url":"https://vt.tiktok.com/ZSyc781F/"}"#).unwrap();
        let fetch = req.into_fetch_request(dir()).unwrap();
        assert_eq!(fetch.mode, OutputMode::Stream);
        assert_eq!(fetch.options, FetchOptions::default());
    }

    #[test]
    fn test_full_payload() {
        let req = WebAppRequest::parse(
            r#"{"action":"download","url":"https://www.instagram.com/reel/Cxyz/","format":"webm","quality":"worst","withWatermark":true}"#,
        )
        .unwrap();
        assert_eq!(req.with_watermark, Some(true));

        let fetch = req.into_fetch_request(dir()).unwrap();
        assert_eq!(
            fetch.mode,
            OutputMode::File {
                dest_dir: dir().to_path_buf()
            }
        );
        assert_eq!(fetch.options.quality, Quality::Worst);
        assert_eq!(fetch.options.container, Container::Webm);
        assert!(fetch.options.with_watermark);
    }

    #[test]
    fn test_rejects_unknown_action() {
        let req = WebAppRequest::parse(r#"{"action":"subscribe","url":"https://vt.tiktok.com/ZS1/"}"#).unwrap();
        assert!(matches!(
            req.into_fetch_request(dir()),
            Err(WebAppError::UnsupportedAction(a)) if a == "subscribe"
        ));
    }

    #[test]
    fn test_rejects_unsupported_url() {
        let req = WebAppRequest::parse(r#"{"action":"download","url":"https://youtube.com/watch?v=1"}"#).unwrap();
        assert!(matches!(
            req.into_fetch_request(dir()),
            Err(WebAppError::InvalidUrl(FetchError::InvalidUrl { .. }))
        ));
    }

    #[test]
    fn test_rejects_unknown_format() {
        let req = WebAppRequest::parse(r#"{"action":"download","url":"https://vt.tiktok.com/ZS1/","format":"mkv"}"#)
            .unwrap();
        assert!(matches!(req.into_fetch_request(dir()), Err(WebAppError::InvalidFormat(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(WebAppRequest::parse("{not json"), Err(WebAppError::Json(_))));
        assert!(matches!(
            WebAppRequest::parse(r#"{"action":"download"}"#),
            Err(WebAppError::Json(_))
        ));
    }
}
