//! Telegram Bot API notifier.
//!
//! Sends messages via the Telegram Bot API (`POST /bot<token>/sendMessage`)
//! as a form-encoded request with `chat_id` and `text`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Notifier;
use crate::Result;

/// Default Bot API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram `sendMessage` text limit (UTF-8 characters).
const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Telegram notifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Telegram Bot API token.
    pub bot_token: String,
    /// Target chat ID (user, group, or channel).
    pub chat_id: String,
    /// Bot API base URL, overridable for local testing.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            api_base: default_api_base(),
        }
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token
        )
    }
}

/// Telegram notifier.
pub struct TelegramNotifier {
    config: TelegramConfig,
    client: Client,
}

impl TelegramNotifier {
    /// Create a new Telegram notifier using a shared HTTP client.
    ///
    /// The client should come from [`crate::utils::http_client::build_client`].
    pub fn new(config: TelegramConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn channel_type(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, text: &str) -> Result<()> {
        let text = truncate_message(text, TELEGRAM_MESSAGE_LIMIT);
        let form = [("chat_id", self.config.chat_id.as_str()), ("text", text.as_str())];

        let response = self
            .client
            .post(self.config.send_message_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| crate::Error::Notify(format!("Telegram request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Telegram sendMessage failed");
            return Err(crate::Error::Notify(format!(
                "Telegram sendMessage failed: {} - {}",
                status, body
            )));
        }

        debug!(chat_id = %self.config.chat_id, "Telegram notification sent");
        Ok(())
    }
}

/// Truncate a message to fit within the Telegram character limit.
fn truncate_message(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let suffix = "\n\n[truncated]";
    let budget = limit - suffix.len();
    let truncated: String = text.chars().take(budget).collect();
    format!("{truncated}{suffix}")
}
