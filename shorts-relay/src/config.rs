//! Process configuration from environment variables.
//!
//! `.env` files are honored through `dotenvy` by the binaries before this
//! module reads anything. Required values missing at startup are fatal.

use std::path::PathBuf;

use crate::api::server::ApiServerConfig;
use crate::domain::DedupPolicy;
use crate::fetcher::{DEFAULT_MAX_HEIGHT, DEFAULT_YTDLP_PATH, FetcherConfig};
use crate::notification::TelegramConfig;
use crate::{Error, Result};

/// Default download directory.
pub const DEFAULT_DOWNLOAD_PATH: &str = "./downloads";

/// Default seen-set file.
pub const DEFAULT_SEEN_FILE: &str = "seen_shorts.json";

/// Everything the webhook server needs to start.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub server: ApiServerConfig,
    pub telegram: TelegramConfig,
    pub fetcher: FetcherConfig,
    pub seen_file: PathBuf,
    pub dedup_policy: DedupPolicy,
    /// Directory for rolling log files; console only when unset.
    pub log_dir: Option<PathBuf>,
}

impl RelayConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, treating blank values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| get(key).ok_or_else(|| Error::config(format!("missing {key}")));

        let bot_token = require("TELEGRAM_BOT_TOKEN")?;
        let chat_id = require("TELEGRAM_CHAT_ID")?;

        let mut telegram = TelegramConfig::new(bot_token, chat_id);
        if let Some(api_base) = get("TELEGRAM_API_BASE") {
            telegram.api_base = api_base;
        }

        let max_height = match get("YTDLP_MAX_HEIGHT") {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| Error::config(format!("invalid YTDLP_MAX_HEIGHT: {raw}")))?,
            None => DEFAULT_MAX_HEIGHT,
        };

        let fetcher = FetcherConfig {
            binary_path: get("YTDLP_PATH").unwrap_or_else(|| DEFAULT_YTDLP_PATH.to_string()),
            download_dir: PathBuf::from(
                get("DOWNLOAD_PATH").unwrap_or_else(|| DEFAULT_DOWNLOAD_PATH.to_string()),
            ),
            max_height,
        };

        let dedup_policy = match get("RELAY_DEDUP_POLICY") {
            Some(raw) => raw.parse()?,
            None => DedupPolicy::default(),
        };

        let mut server = ApiServerConfig::default();
        if let Some(host) = get("HOST") {
            server.bind_address = host;
        }
        if let Some(port) = get("PORT") {
            server.port = port
                .parse()
                .map_err(|_| Error::config(format!("invalid PORT: {port}")))?;
        }

        Ok(Self {
            server,
            telegram,
            fetcher,
            seen_file: PathBuf::from(
                get("SEEN_FILE").unwrap_or_else(|| DEFAULT_SEEN_FILE.to_string()),
            ),
            dedup_policy,
            log_dir: get("LOG_DIR").map(PathBuf::from),
        })
    }
}
