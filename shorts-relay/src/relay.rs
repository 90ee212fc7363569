//! Push ingestion: dedup, notify, fetch, commit.
//!
//! Every push goes through a single async gate, so the membership check and
//! the commit for an identifier happen without any other push interleaving.
//! For each new identifier the side effects run strictly in order: notify,
//! then fetch, then insert into the seen set. Notify and fetch failures are
//! logged and do not stop the commit; a persist failure aborts the push.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{Error, Result};
use crate::domain::{DedupPolicy, VideoId};
use crate::feed;
use crate::fetcher::Fetcher;
use crate::notification::{Notifier, new_upload_message};
use crate::store::SeenStore;

/// What a single push did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOutcome {
    /// New identifiers that were notified, fetched and committed, in order.
    pub processed: Vec<VideoId>,
    /// Already-seen identifiers passed over under [`DedupPolicy::SkipSeen`].
    pub skipped: Vec<VideoId>,
    /// The already-seen identifier that ended processing under
    /// [`DedupPolicy::StopAtFirstSeen`].
    pub stopped_at: Option<VideoId>,
}

/// Orchestrates the side effects for pushed video identifiers.
pub struct Relay {
    store: Arc<SeenStore>,
    notifier: Arc<dyn Notifier>,
    fetcher: Arc<dyn Fetcher>,
    policy: DedupPolicy,
    gate: Mutex<()>,
}

impl Relay {
    pub fn new(
        store: Arc<SeenStore>,
        notifier: Arc<dyn Notifier>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            store,
            notifier,
            fetcher,
            policy: DedupPolicy::default(),
            gate: Mutex::new(()),
        }
    }

    pub fn with_policy(mut self, policy: DedupPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DedupPolicy {
        self.policy
    }

    pub fn store(&self) -> &Arc<SeenStore> {
        &self.store
    }

    /// Parse an Atom payload and handle its identifiers.
    ///
    /// Parse failures return [`crate::Error::Feed`] before anything is touched.
    pub async fn ingest(&self, payload: &str) -> Result<PushOutcome> {
        let ids = feed::parse_video_ids(payload)?;
        debug!(count = ids.len(), "Parsed push payload");
        self.handle_push(ids).await
    }

    /// Handle identifiers in feed order.
    pub async fn handle_push(&self, ids: Vec<VideoId>) -> Result<PushOutcome> {
        let _gate = self.gate.lock().await;
        let mut outcome = PushOutcome::default();

        for id in ids {
            if self.store.contains(&id) {
                match self.policy {
                    DedupPolicy::StopAtFirstSeen => {
                        debug!(video_id = %id, "Already seen, ignoring rest of push");
                        outcome.stopped_at = Some(id);
                        break;
                    }
                    DedupPolicy::SkipSeen => {
                        debug!(video_id = %id, "Already seen, skipping");
                        outcome.skipped.push(id);
                        continue;
                    }
                }
            }

            self.process_new(&id).await?;
            outcome.processed.push(id);
        }

        Ok(outcome)
    }

    async fn process_new(&self, id: &VideoId) -> Result<()> {
        info!(video_id = %id, "New video");

        if let Err(e) = self.notifier.send(&new_upload_message(id)).await {
            warn!(
                video_id = %id,
                channel = self.notifier.channel_type(),
                error = %e,
                "Notification failed, continuing"
            );
        }

        if let Err(e) = self.fetcher.fetch(id).await {
            error!(video_id = %id, error = %e, "Fetch failed, marking as seen anyway");
        }

        self.commit(id).await
    }

    /// Record `id` as seen; the file write runs on a blocking thread.
    async fn commit(&self, id: &VideoId) -> Result<()> {
        let store = self.store.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || store.insert(id))
            .await
            .map_err(|e| Error::Other(format!("Seen set writer task failed: {e}")))??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::test_utils::{Effect, EffectLog, RecordingFetcher, RecordingNotifier};

    struct Harness {
        _dir: tempfile::TempDir,
        store: Arc<SeenStore>,
        log: EffectLog,
    }

    impl Harness {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let store = Arc::new(SeenStore::load(dir.path().join("seen.json")).unwrap());
            Self {
                _dir: dir,
                store,
                log: EffectLog::default(),
            }
        }

        fn relay(&self) -> Relay {
            Relay::new(
                self.store.clone(),
                Arc::new(RecordingNotifier::new(self.log.clone())),
                Arc::new(RecordingFetcher::new(self.log.clone()).observing(self.store.clone())),
            )
        }

        fn seed(&self, id: &str) {
            self.store.insert(vid(id)).unwrap();
        }
    }

    fn vid(s: &str) -> VideoId {
        VideoId::new(s).unwrap()
    }

    fn feed_of(ids: &[&str]) -> String {
        let entries: String = ids
            .iter()
            .map(|id| format!("<entry><yt:videoId>{id}</yt:videoId></entry>"))
            .collect();
        format!(r#"<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015">{entries}</feed>"#)
    }

    #[tokio::test]
    async fn test_new_ids_processed_in_order() {
        let h = Harness::new();
        let outcome = h.relay().ingest(&feed_of(&["A", "B"])).await.unwrap();

        assert_eq!(outcome.processed, vec![vid("A"), vid("B")]);
        assert_eq!(
            h.log.effects(),
            vec![
                Effect::Notified(
                    "🎬 New SHORT uploaded:\nhttps://www.youtube.com/shorts/A".to_string()
                ),
                Effect::Fetched {
                    id: "A".to_string(),
                    committed: false
                },
                Effect::Notified(
                    "🎬 New SHORT uploaded:\nhttps://www.youtube.com/shorts/B".to_string()
                ),
                Effect::Fetched {
                    id: "B".to_string(),
                    committed: false
                },
            ]
        );
        assert!(h.store.contains(&vid("A")));
        assert!(h.store.contains(&vid("B")));
    }

    #[tokio::test]
    async fn test_seen_only_push_has_no_side_effects() {
        let h = Harness::new();
        h.seed("A");

        let outcome = h.relay().ingest(&feed_of(&["A"])).await.unwrap();
        assert!(outcome.processed.is_empty());
        assert_eq!(outcome.stopped_at, Some(vid("A")));
        assert!(h.log.effects().is_empty());
    }

    #[tokio::test]
    async fn test_stops_at_first_seen() {
        let h = Harness::new();
        h.seed("B");

        let outcome = h.relay().ingest(&feed_of(&["A", "B", "C"])).await.unwrap();
        assert_eq!(outcome.processed, vec![vid("A")]);
        assert_eq!(outcome.stopped_at, Some(vid("B")));
        assert_eq!(h.log.fetched(), vec!["A"]);
        assert!(h.store.contains(&vid("A")));
        assert!(!h.store.contains(&vid("C")));
    }

    #[tokio::test]
    async fn test_skip_seen_policy_continues() {
        let h = Harness::new();
        h.seed("B");

        let relay = h.relay().with_policy(DedupPolicy::SkipSeen);
        let outcome = relay.ingest(&feed_of(&["A", "B", "C"])).await.unwrap();
        assert_eq!(outcome.processed, vec![vid("A"), vid("C")]);
        assert_eq!(outcome.skipped, vec![vid("B")]);
        assert_eq!(outcome.stopped_at, None);
        assert_eq!(h.log.fetched(), vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_duplicate_id_in_one_push_is_processed_once() {
        let h = Harness::new();
        let outcome = h.relay().ingest(&feed_of(&["A", "A"])).await.unwrap();
        assert_eq!(outcome.processed, vec![vid("A")]);
        assert_eq!(h.log.fetched(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_notifier_failure_still_fetches_and_commits() {
        let h = Harness::new();
        let relay = Relay::new(
            h.store.clone(),
            Arc::new(RecordingNotifier::failing(h.log.clone())),
            Arc::new(RecordingFetcher::new(h.log.clone())),
        );

        let outcome = relay.ingest(&feed_of(&["A"])).await.unwrap();
        assert_eq!(outcome.processed, vec![vid("A")]);
        assert_eq!(h.log.fetched(), vec!["A"]);
        assert!(h.store.contains(&vid("A")));
    }

    #[tokio::test]
    async fn test_fetch_failure_still_commits() {
        let h = Harness::new();
        let relay = Relay::new(
            h.store.clone(),
            Arc::new(RecordingNotifier::new(h.log.clone())),
            Arc::new(RecordingFetcher::failing(h.log.clone())),
        );

        relay.ingest(&feed_of(&["A", "B"])).await.unwrap();
        assert!(h.store.contains(&vid("A")));
        assert!(h.store.contains(&vid("B")));

        // A retry of the same push is now a no-op.
        relay.ingest(&feed_of(&["A", "B"])).await.unwrap();
        assert_eq!(h.log.fetched(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_malformed_payload_touches_nothing() {
        let h = Harness::new();
        let err = h.relay().ingest("<feed><entry>").await.unwrap_err();
        assert!(matches!(err, Error::Feed(_)));
        assert!(h.log.effects().is_empty());
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_persist_failure_aborts_push() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join("state");
        let store = Arc::new(SeenStore::load(state_dir.join("seen.json")).unwrap());
        std::fs::remove_dir_all(&state_dir).unwrap();

        let log = EffectLog::default();
        let relay = Relay::new(
            store.clone(),
            Arc::new(RecordingNotifier::new(log.clone())),
            Arc::new(RecordingFetcher::new(log.clone())),
        );

        let err = relay.ingest(&feed_of(&["A", "B"])).await.unwrap_err();
        assert!(matches!(err, Error::Persist { .. }));
        assert_eq!(log.fetched(), vec!["A"]);
        assert!(store.contains(&vid("A")));
        assert!(!store.contains(&vid("B")));
    }

    #[tokio::test]
    async fn test_concurrent_pushes_process_once() {
        let h = Harness::new();
        let relay = Arc::new(Relay::new(
            h.store.clone(),
            Arc::new(RecordingNotifier::new(h.log.clone())),
            Arc::new(
                RecordingFetcher::new(h.log.clone()).with_delay(Duration::from_millis(50)),
            ),
        ));

        let payload = feed_of(&["A"]);
        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let relay = relay.clone();
                let payload = payload.clone();
                tokio::spawn(async move { relay.ingest(&payload).await })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(h.log.notified().len(), 1);
        assert_eq!(h.log.fetched(), vec!["A"]);
    }
}
