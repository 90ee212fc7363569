//! Chat notifications for newly published videos.
//!
//! The relay only needs one thing from a notifier: deliver a line of text to
//! a fixed destination. Delivery failures are reported back as errors and the
//! caller decides whether they matter (the relay logs and moves on).

mod telegram;

pub use telegram::{TelegramConfig, TelegramNotifier};

use async_trait::async_trait;

use crate::Result;
use crate::domain::VideoId;

/// Trait for notification channels.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Get the channel type name.
    fn channel_type(&self) -> &'static str;

    /// Send `text` to the configured destination.
    async fn send(&self, text: &str) -> Result<()>;
}

/// Message announcing a new upload.
pub fn new_upload_message(id: &VideoId) -> String {
    format!("\u{1f3ac} New SHORT uploaded:\n{}", id.shorts_url())
}
