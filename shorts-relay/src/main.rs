use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use shorts_relay::api::{ApiServer, AppState};
use shorts_relay::command::ProcessRunner;
use shorts_relay::config::RelayConfig;
use shorts_relay::fetcher::YtDlpFetcher;
use shorts_relay::logging;
use shorts_relay::notification::TelegramNotifier;
use shorts_relay::relay::Relay;
use shorts_relay::store::SeenStore;
use shorts_relay::utils::{fs, http_client};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = RelayConfig::from_env().context("invalid configuration")?;
    let _logging_guard = logging::init_logging(config.log_dir.as_deref())?;

    fs::ensure_dir_all_with_op("creating download directory", &config.fetcher.download_dir)
        .await?;

    let store = Arc::new(SeenStore::load(&config.seen_file)?);

    let client = http_client::build_client()?;
    let notifier = TelegramNotifier::new(config.telegram.clone(), client);
    let fetcher = YtDlpFetcher::new(config.fetcher.clone(), Arc::new(ProcessRunner));
    let relay = Relay::new(store, Arc::new(notifier), Arc::new(fetcher))
        .with_policy(config.dedup_policy);

    info!(
        download_dir = %config.fetcher.download_dir.display(),
        policy = %config.dedup_policy,
        "shorts-relay starting"
    );

    let server = Arc::new(ApiServer::with_state(
        config.server.clone(),
        AppState::new(Arc::new(relay)),
    ));

    let cancel_token = server.cancel_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
        }
        cancel_token.cancel();
    });

    server.run().await?;

    info!("shorts-relay stopped");
    Ok(())
}
