//! PubSubHubbub callback routes.
//!
//! - `GET` answers the hub's subscription verification by echoing the challenge.
//! - `POST` receives Atom pushes and hands them to the relay.

use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::routing::get;
use axum::Router;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;

/// Query keys carrying the challenge, in priority order.
const CHALLENGE_KEYS: &[&str] = &["hub.challenge", "hub_challenge"];

/// Create the webhook router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(verify).post(receive_push))
}

/// First value for any of `keys`, in key priority order.
fn query_value(query: Option<&str>, keys: &[&str]) -> Option<String> {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query?.as_bytes())
        .into_owned()
        .collect();
    keys.iter().find_map(|key| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
}

/// Hub verification: reply with the challenge verbatim, empty if absent.
async fn verify(RawQuery(query): RawQuery) -> String {
    let query = query.as_deref();
    let challenge = query_value(query, CHALLENGE_KEYS).unwrap_or_default();

    let mode = query_value(query, &["hub.mode", "hub_mode"]);
    let topic = query_value(query, &["hub.topic", "hub_topic"]);
    if mode.is_some() || topic.is_some() {
        info!(
            mode = mode.as_deref().unwrap_or(""),
            topic = topic.as_deref().unwrap_or(""),
            "Hub verification request"
        );
    }
    if challenge.is_empty() {
        warn!("Verification request without a challenge");
    }

    challenge
}

/// Push delivery: parse, dedup, notify, fetch, commit.
async fn receive_push(State(state): State<AppState>, body: Bytes) -> ApiResult<&'static str> {
    if body.is_empty() {
        return Err(ApiError::bad_request("Missing body"));
    }

    let payload = String::from_utf8_lossy(&body);
    let outcome = state.relay.ingest(&payload).await?;

    info!(
        processed = outcome.processed.len(),
        skipped = outcome.skipped.len(),
        stopped_at = outcome.stopped_at.as_ref().map(|id| id.as_str()).unwrap_or(""),
        "Push handled"
    );
    Ok("OK")
}
