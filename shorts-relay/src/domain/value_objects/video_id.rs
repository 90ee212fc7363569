//! Video identifier value object.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Base URL for the short-form player link sent in notifications.
const SHORTS_URL_BASE: &str = "https://www.youtube.com/shorts/";

/// Base URL handed to the downloader.
const WATCH_URL_BASE: &str = "https://www.youtube.com/watch?v=";

/// An upstream video identifier.
///
/// Opaque and case-sensitive. Always trimmed and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

impl VideoId {
    /// Create a VideoId, trimming surrounding whitespace.
    pub fn new(id: impl AsRef<str>) -> Result<Self, Error> {
        let trimmed = id.as_ref().trim();
        if trimmed.is_empty() {
            return Err(Error::validation("video id cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Lenient constructor used by the feed parser: blank input yields `None`.
    pub fn parse(id: &str) -> Option<Self> {
        Self::new(id).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Link to the video in the shorts player.
    pub fn shorts_url(&self) -> String {
        format!("{SHORTS_URL_BASE}{}", self.0)
    }

    /// Canonical watch page URL.
    pub fn watch_url(&self) -> String {
        format!("{WATCH_URL_BASE}{}", self.0)
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VideoId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_whitespace() {
        let id = VideoId::new("  dQw4w9WgXcQ\n").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_rejects_blank() {
        assert!(VideoId::new("").is_err());
        assert!(VideoId::new("   \t").is_err());
        assert!(VideoId::parse(" ").is_none());
    }

    #[test]
    fn test_case_sensitive() {
        assert_ne!(VideoId::new("abcDEF").unwrap(), VideoId::new("abcdef").unwrap());
    }

    #[test]
    fn test_urls() {
        let id = VideoId::new("xyz789").unwrap();
        assert_eq!(id.shorts_url(), "https://www.youtube.com/shorts/xyz789");
        assert_eq!(id.watch_url(), "https://www.youtube.com/watch?v=xyz789");
    }

    #[test]
    fn test_serialization() {
        let id = VideoId::new("abc").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");

        let parsed: VideoId = serde_json::from_str("\" abc \"").unwrap();
        assert_eq!(parsed, id);
        assert!(serde_json::from_str::<VideoId>("\"\"").is_err());
    }
}
