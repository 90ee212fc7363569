//! PubSubHubbub subscription registration.
//!
//! A one-shot job, run separately from the webhook server: each channel URL
//! is resolved to a channel id with `yt-dlp`, turned into a feed topic URL,
//! and (un)subscribed at the hub with our callback. A failing channel is
//! logged and does not stop the others.

use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::command::CommandRunner;
use crate::domain::ChannelUrl;
use crate::{Error, Result};

/// Public Google hub.
pub const DEFAULT_HUB_URL: &str = "https://pubsubhubbub.appspot.com/subscribe";

/// Subscription mode sent to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum HubMode {
    /// Start receiving pushes for the topic
    #[default]
    Subscribe,
    /// Stop receiving pushes for the topic
    Unsubscribe,
}

impl std::fmt::Display for HubMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl HubMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
        }
    }
}

/// Registrar settings.
#[derive(Debug, Clone)]
pub struct RegistrarConfig {
    /// Our public webhook URL, sent as `hub.callback`.
    pub callback_url: String,
    pub hub_url: String,
    pub mode: HubMode,
    /// Path or name of the `yt-dlp` binary.
    pub ytdlp_path: String,
}

/// A channel resolved for subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSubscription {
    pub channel_url: ChannelUrl,
    pub channel_id: String,
    pub topic_url: String,
}

/// Result of registering one channel.
#[derive(Debug)]
pub struct SubscriptionReport {
    pub channel_url: String,
    pub result: Result<SubscriptionAck>,
}

/// Hub reply for a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionAck {
    pub channel_id: String,
    pub topic_url: String,
    pub status: u16,
}

#[derive(Debug, Deserialize)]
struct ChannelInfo {
    channel_id: Option<String>,
}

/// Resolves channels and registers them with the hub.
pub struct Registrar {
    config: RegistrarConfig,
    runner: Arc<dyn CommandRunner>,
    client: Client,
}

impl Registrar {
    /// The client should come from [`crate::utils::http_client::build_client`].
    pub fn new(config: RegistrarConfig, runner: Arc<dyn CommandRunner>, client: Client) -> Self {
        Self {
            config,
            runner,
            client,
        }
    }

    /// Look up the channel id with a flat, download-free metadata dump.
    pub async fn resolve(&self, channel_url: &ChannelUrl) -> Result<ChannelSubscription> {
        let args: Vec<String> = [
            "--quiet",
            "--skip-download",
            "--dump-single-json",
            "--extract-flat",
            channel_url.as_str(),
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let output = self.runner.run(&self.config.ytdlp_path, &args).await?;
        if !output.success() {
            return Err(Error::Other(format!(
                "yt-dlp metadata extraction failed for {}: {}",
                channel_url,
                output.failure_message()
            )));
        }

        let info: ChannelInfo = serde_json::from_str(output.stdout.trim())?;
        let channel_id = info
            .channel_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                Error::validation(format!("could not extract channel_id from {channel_url}"))
            })?;

        Ok(ChannelSubscription {
            channel_url: channel_url.clone(),
            topic_url: ChannelUrl::topic_url(&channel_id),
            channel_id,
        })
    }

    /// Send the (un)subscribe request for a resolved channel.
    ///
    /// The hub verifies asynchronously, so it answers `202 Accepted` on success.
    pub async fn register(&self, subscription: &ChannelSubscription) -> Result<u16> {
        let form = [
            ("hub.callback", self.config.callback_url.as_str()),
            ("hub.mode", self.config.mode.as_str()),
            ("hub.topic", subscription.topic_url.as_str()),
            ("hub.verify", "async"),
        ];

        let response = self
            .client
            .post(&self.config.hub_url)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Other(format!(
                "hub rejected {} for {}: {} - {}",
                self.config.mode.as_str(),
                subscription.topic_url,
                status,
                body.trim()
            )));
        }

        Ok(status.as_u16())
    }

    async fn process(&self, channel: &str) -> Result<SubscriptionAck> {
        let channel_url = ChannelUrl::new(channel)?;
        let subscription = self.resolve(&channel_url).await?;
        let status = self.register(&subscription).await?;
        Ok(SubscriptionAck {
            channel_id: subscription.channel_id,
            topic_url: subscription.topic_url,
            status,
        })
    }

    /// Register every channel, one after another.
    pub async fn run<S: AsRef<str>>(&self, channels: &[S]) -> Vec<SubscriptionReport> {
        let mut reports = Vec::with_capacity(channels.len());

        for channel in channels {
            let channel = channel.as_ref();
            let result = self.process(channel).await;
            match &result {
                Ok(ack) => info!(
                    channel = %channel,
                    channel_id = %ack.channel_id,
                    status = ack.status,
                    mode = self.config.mode.as_str(),
                    "Subscribed"
                ),
                Err(e) => error!(channel = %channel, error = %e, "Subscription failed"),
            }
            reports.push(SubscriptionReport {
                channel_url: channel.to_string(),
                result,
            });
        }

        let failed = reports.iter().filter(|r| r.result.is_err()).count();
        if failed > 0 {
            warn!(failed, total = reports.len(), "Some channels were not registered");
        }
        reports
    }
}

/// Split a comma/whitespace separated channel list.
pub fn parse_channel_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use axum::extract::{Form, State};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use parking_lot::Mutex;
    use tokio::net::TcpListener;

    use crate::command::CommandOutput;
    use crate::test_utils::FakeRunner;

    type Captured = Arc<Mutex<Vec<HashMap<String, String>>>>;

    async fn spawn_fake_hub(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .route(
                "/subscribe",
                post(
                    move |State(captured): State<Captured>,
                          Form(form): Form<HashMap<String, String>>| async move {
                        captured.lock().push(form);
                        (status, "")
                    },
                ),
            )
            .with_state(captured.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/subscribe"), captured)
    }

    fn registrar(runner: Arc<FakeRunner>, hub_url: String) -> Registrar {
        Registrar::new(
            RegistrarConfig {
                callback_url: "https://relay.example.com/youtube-webhook".to_string(),
                hub_url,
                mode: HubMode::Subscribe,
                ytdlp_path: "yt-dlp".to_string(),
            },
            runner,
            crate::utils::http_client::build_client().unwrap(),
        )
    }

    fn channel_json(id: &str) -> String {
        format!(r#"{{"id":"{id}","channel_id":"{id}","title":"Some channel","entries":[]}}"#)
    }

    #[tokio::test]
    async fn test_resolve_runs_flat_extraction() {
        let runner = Arc::new(FakeRunner::with_stdout(channel_json("UCabc")));
        let registrar = registrar(runner.clone(), DEFAULT_HUB_URL.to_string());

        let url = ChannelUrl::new("https://www.youtube.com/@someone").unwrap();
        let sub = registrar.resolve(&url).await.unwrap();

        assert_eq!(sub.channel_id, "UCabc");
        assert_eq!(
            sub.topic_url,
            "https://www.youtube.com/feeds/videos.xml?channel_id=UCabc"
        );

        let calls = runner.calls();
        assert_eq!(
            calls[0].1,
            vec![
                "--quiet",
                "--skip-download",
                "--dump-single-json",
                "--extract-flat",
                "https://www.youtube.com/@someone",
            ]
        );
    }

    #[tokio::test]
    async fn test_resolve_without_channel_id_fails() {
        let runner = Arc::new(FakeRunner::with_stdout(r#"{"id":"x","title":"no channel"}"#));
        let registrar = registrar(runner, DEFAULT_HUB_URL.to_string());

        let url = ChannelUrl::new("https://www.youtube.com/@someone").unwrap();
        assert!(matches!(
            registrar.resolve(&url).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_run_subscribes_and_continues_after_failures() {
        let (hub_url, captured) = spawn_fake_hub(StatusCode::ACCEPTED).await;
        let runner = Arc::new(
            FakeRunner::with_stdout(channel_json("UCgood")).respond_to(
                "https://www.youtube.com/@broken",
                CommandOutput {
                    exit_code: Some(1),
                    stdout: String::new(),
                    stderr: "ERROR: Unable to download API page".to_string(),
                },
            ),
        );
        let registrar = registrar(runner, hub_url);

        let reports = registrar
            .run(&[
                "https://www.youtube.com/@broken",
                "not a url",
                "https://www.youtube.com/@good",
            ])
            .await;

        assert_eq!(reports.len(), 3);
        assert!(reports[0].result.is_err());
        assert!(reports[1].result.is_err());
        let ack = reports[2].result.as_ref().unwrap();
        assert_eq!(ack.status, 202);
        assert_eq!(ack.channel_id, "UCgood");

        let forms = captured.lock();
        assert_eq!(forms.len(), 1);
        let form = &forms[0];
        assert_eq!(form["hub.callback"], "https://relay.example.com/youtube-webhook");
        assert_eq!(form["hub.mode"], "subscribe");
        assert_eq!(
            form["hub.topic"],
            "https://www.youtube.com/feeds/videos.xml?channel_id=UCgood"
        );
        assert_eq!(form["hub.verify"], "async");
    }

    #[tokio::test]
    async fn test_hub_rejection_is_reported() {
        let (hub_url, _captured) = spawn_fake_hub(StatusCode::BAD_REQUEST).await;
        let runner = Arc::new(FakeRunner::with_stdout(channel_json("UCx")));
        let registrar = registrar(runner, hub_url);

        let reports = registrar.run(&["https://www.youtube.com/@x"]).await;
        let err = reports[0].result.as_ref().unwrap_err();
        assert!(err.to_string().contains("400"));
    }

    #[test]
    fn test_parse_channel_list() {
        assert_eq!(
            parse_channel_list(" https://a , https://b\nhttps://c,, "),
            vec!["https://a", "https://b", "https://c"]
        );
        assert!(parse_channel_list("  ").is_empty());
    }
}
