//! Media retrieval through `yt-dlp`.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::command::CommandRunner;
use crate::domain::VideoId;
use crate::{Error, Result};

/// Default downloader binary.
pub const DEFAULT_YTDLP_PATH: &str = "yt-dlp";

/// Default maximum video height requested from the downloader.
pub const DEFAULT_MAX_HEIGHT: u32 = 1920;

/// Retrieves the media for a video.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, id: &VideoId) -> Result<()>;
}

/// Downloader configuration.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Path or name of the `yt-dlp` binary.
    pub binary_path: String,
    /// Directory the downloads are written to.
    pub download_dir: PathBuf,
    /// Highest resolution to request before falling back to best available.
    pub max_height: u32,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            binary_path: DEFAULT_YTDLP_PATH.to_string(),
            download_dir: PathBuf::from("./downloads"),
            max_height: DEFAULT_MAX_HEIGHT,
        }
    }
}

/// `yt-dlp` backed fetcher.
pub struct YtDlpFetcher {
    config: FetcherConfig,
    runner: Arc<dyn CommandRunner>,
}

impl YtDlpFetcher {
    pub fn new(config: FetcherConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Quality selector: capped height, or whatever is best.
    fn format_selector(&self) -> String {
        format!("best[height<={}]/best", self.config.max_height)
    }

    /// Output template: `<dir>/<timestamp>_<title>.<ext>`, title and extension
    /// filled in by `yt-dlp`.
    fn output_template(&self, now: DateTime<Local>) -> String {
        let stamp = now.format("%Y%m%d_%H%M%S");
        self.config
            .download_dir
            .join(format!("{stamp}_%(title)s.%(ext)s"))
            .to_string_lossy()
            .into_owned()
    }

    fn build_args(&self, id: &VideoId, now: DateTime<Local>) -> Vec<String> {
        vec![
            "-f".to_string(),
            self.format_selector(),
            "-o".to_string(),
            self.output_template(now),
            id.watch_url(),
        ]
    }
}

#[async_trait]
impl Fetcher for YtDlpFetcher {
    async fn fetch(&self, id: &VideoId) -> Result<()> {
        let args = self.build_args(id, Local::now());

        info!(video_id = %id, url = %id.watch_url(), "Downloading");
        let output = self
            .runner
            .run(&self.config.binary_path, &args)
            .await
            .map_err(|e| Error::fetch(id.as_str(), e.to_string()))?;

        if !output.success() {
            let message = output.failure_message();
            warn!(video_id = %id, error = %message, "yt-dlp failed");
            return Err(Error::fetch(id.as_str(), message));
        }

        info!(video_id = %id, "Download complete");
        Ok(())
    }
}
