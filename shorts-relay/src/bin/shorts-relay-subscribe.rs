//! Registers YouTube channels with the PubSubHubbub hub.
//!
//! Channels come from the command line, or from `CHANNELS` (comma or
//! whitespace separated) when none are given. Exits non-zero if any channel
//! could not be registered.

use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::error;

use shorts_relay::command::ProcessRunner;
use shorts_relay::fetcher::DEFAULT_YTDLP_PATH;
use shorts_relay::logging;
use shorts_relay::subscription::{
    DEFAULT_HUB_URL, HubMode, Registrar, RegistrarConfig, parse_channel_list,
};
use shorts_relay::utils::http_client;

#[derive(Debug, Parser)]
#[command(
    name = "shorts-relay-subscribe",
    version,
    about = "Subscribe the relay's webhook to YouTube channel feeds"
)]
struct Args {
    /// Channel URLs, e.g. https://www.youtube.com/@handle
    #[arg(value_name = "CHANNEL_URL")]
    channels: Vec<String>,

    /// Comma separated channel URLs, used when none are passed as arguments
    #[arg(long, env = "CHANNELS", hide_env_values = true)]
    channel_list: Option<String>,

    /// Public URL of the relay's webhook endpoint
    #[arg(long, env = "WEBHOOK_URL")]
    callback: String,

    /// Hub subscription endpoint
    #[arg(long, default_value = DEFAULT_HUB_URL)]
    hub: String,

    /// Whether to subscribe or unsubscribe
    #[arg(long, value_enum, default_value_t = HubMode::Subscribe)]
    mode: HubMode,

    /// Path to the yt-dlp binary
    #[arg(long, env = "YTDLP_PATH", default_value = DEFAULT_YTDLP_PATH)]
    ytdlp_path: String,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    logging::init_cli_logging();

    match run(args).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("Application error: {}", e);
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    }
}

/// Returns whether every channel was registered.
async fn run(args: Args) -> anyhow::Result<bool> {
    let channels = if args.channels.is_empty() {
        args.channel_list
            .as_deref()
            .map(parse_channel_list)
            .unwrap_or_default()
    } else {
        args.channels
    };

    if channels.is_empty() {
        anyhow::bail!("no channels given; pass channel URLs or set CHANNELS");
    }

    let registrar = Registrar::new(
        RegistrarConfig {
            callback_url: args.callback,
            hub_url: args.hub,
            mode: args.mode,
            ytdlp_path: args.ytdlp_path,
        },
        Arc::new(ProcessRunner),
        http_client::build_client()?,
    );

    let reports = registrar.run(&channels).await;

    println!();
    println!("{} summary:", args.mode);
    for report in &reports {
        match &report.result {
            Ok(ack) => println!(
                "  ok      {} -> {} (HTTP {})",
                report.channel_url, ack.channel_id, ack.status
            ),
            Err(e) => println!("  failed  {}: {}", report.channel_url, e),
        }
    }

    let failed = reports.iter().filter(|r| r.result.is_err()).count();
    println!(
        "{} of {} channels registered",
        reports.len() - failed,
        reports.len()
    );

    Ok(failed == 0)
}
