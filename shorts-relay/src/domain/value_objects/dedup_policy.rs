//! How a push containing already-seen entries is handled.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Dedup policy applied to the identifiers of a single push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    /// The first already-seen identifier ends processing of the push.
    ///
    /// Hub feeds list newest first, so anything after a seen entry is
    /// assumed to be seen as well.
    #[default]
    StopAtFirstSeen,
    /// Seen identifiers are skipped; every remaining entry is still evaluated.
    SkipSeen,
}

impl DedupPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StopAtFirstSeen => "stop-at-first-seen",
            Self::SkipSeen => "skip-seen",
        }
    }
}

impl std::fmt::Display for DedupPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DedupPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "stop-at-first-seen" | "stop" => Ok(Self::StopAtFirstSeen),
            "skip-seen" | "skip" => Ok(Self::SkipSeen),
            other => Err(Error::config(format!("unknown dedup policy: {other}"))),
        }
    }
}
