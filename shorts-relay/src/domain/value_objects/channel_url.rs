//! Channel URL value object.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Feed URL template; the channel id is appended.
const FEED_TOPIC_BASE: &str = "https://www.youtube.com/feeds/videos.xml?channel_id=";

/// A validated channel page URL, e.g. `https://www.youtube.com/@handle`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelUrl(String);

impl ChannelUrl {
    /// Create a new ChannelUrl from a string, validating it.
    pub fn new(url: impl Into<String>) -> Result<Self, Error> {
        let url = url.into();
        let url = url.trim();
        Self::validate(url)?;
        Ok(Self(url.trim_end_matches('/').to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The PuSH topic URL for a resolved channel id.
    pub fn topic_url(channel_id: &str) -> String {
        format!("{FEED_TOPIC_BASE}{channel_id}")
    }

    fn validate(url: &str) -> Result<(), Error> {
        if url.is_empty() {
            return Err(Error::validation("channel URL cannot be empty"));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::validation(format!(
                "channel URL must start with http:// or https://: {url}"
            )));
        }

        if url.contains(char::is_whitespace) {
            return Err(Error::validation("channel URL cannot contain whitespace"));
        }

        Ok(())
    }
}

impl std::fmt::Display for ChannelUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ChannelUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
