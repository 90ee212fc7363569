//! Shared outbound HTTP client construction.

use std::sync::OnceLock;

use tracing::debug;

use crate::Result;

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate may have installed one first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build the client used for Telegram and hub requests.
///
/// Installs the rustls provider first; reqwest is built without one and
/// cannot create a client otherwise. No request timeout is set: a hung call
/// is bounded by the remote side.
pub fn build_client() -> Result<reqwest::Client> {
    install_rustls_provider();

    let client = reqwest::Client::builder()
        .user_agent(concat!("shorts-relay/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
