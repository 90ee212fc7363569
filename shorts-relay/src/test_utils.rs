//! Test doubles for the relay's external collaborators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::command::{CommandOutput, CommandRunner};
use crate::domain::VideoId;
use crate::fetcher::Fetcher;
use crate::notification::Notifier;
use crate::store::SeenStore;
use crate::{Error, Result};

/// Initialize tracing for tests with appropriate settings
#[inline]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A side effect observed by the recording doubles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// A notification with this text was attempted.
    Notified(String),
    /// A fetch was attempted; `committed` tells whether the id was already
    /// in the observed seen set at that moment.
    Fetched { id: String, committed: bool },
}

/// Shared, ordered record of side effects.
#[derive(Debug, Clone, Default)]
pub struct EffectLog(Arc<Mutex<Vec<Effect>>>);

impl EffectLog {
    pub fn push(&self, effect: Effect) {
        self.0.lock().push(effect);
    }

    pub fn effects(&self) -> Vec<Effect> {
        self.0.lock().clone()
    }

    pub fn notified(&self) -> Vec<String> {
        self.effects()
            .into_iter()
            .filter_map(|e| match e {
                Effect::Notified(text) => Some(text),
                Effect::Fetched { .. } => None,
            })
            .collect()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.effects()
            .into_iter()
            .filter_map(|e| match e {
                Effect::Fetched { id, .. } => Some(id),
                Effect::Notified(_) => None,
            })
            .collect()
    }
}

/// Notifier that records every message and optionally fails.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    log: EffectLog,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new(log: EffectLog) -> Self {
        Self { log, fail: false }
    }

    pub fn failing(log: EffectLog) -> Self {
        Self { log, fail: true }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn channel_type(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, text: &str) -> Result<()> {
        self.log.push(Effect::Notified(text.to_string()));
        if self.fail {
            return Err(Error::Notify("simulated notifier outage".to_string()));
        }
        Ok(())
    }
}

/// Fetcher that records every id, optionally slow or failing.
#[derive(Debug, Clone, Default)]
pub struct RecordingFetcher {
    log: EffectLog,
    fail: bool,
    delay: Option<Duration>,
    store: Option<Arc<SeenStore>>,
}

impl RecordingFetcher {
    pub fn new(log: EffectLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn failing(log: EffectLog) -> Self {
        Self {
            log,
            fail: true,
            ..Default::default()
        }
    }

    /// Sleep before completing each fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Record whether each id was already committed when fetched.
    pub fn observing(mut self, store: Arc<SeenStore>) -> Self {
        self.store = Some(store);
        self
    }
}

#[async_trait]
impl Fetcher for RecordingFetcher {
    async fn fetch(&self, id: &VideoId) -> Result<()> {
        let committed = self.store.as_ref().is_some_and(|s| s.contains(id));
        self.log.push(Effect::Fetched {
            id: id.to_string(),
            committed,
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(Error::fetch(id.as_str(), "simulated downloader failure"));
        }
        Ok(())
    }
}

/// Command runner returning canned output and recording invocations.
#[derive(Debug, Default)]
pub struct FakeRunner {
    output: CommandOutput,
    outputs: Mutex<Vec<(String, CommandOutput)>>,
    spawn_fails: bool,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeRunner {
    /// Every invocation returns `output`.
    pub fn with_output(output: CommandOutput) -> Self {
        Self {
            output,
            ..Default::default()
        }
    }

    /// Successful invocation printing `stdout`.
    pub fn with_stdout(stdout: impl Into<String>) -> Self {
        Self::with_output(CommandOutput {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        })
    }

    /// Every invocation fails to spawn.
    pub fn failing() -> Self {
        Self {
            spawn_fails: true,
            ..Default::default()
        }
    }

    /// Return `output` when the last argument equals `last_arg`.
    pub fn respond_to(self, last_arg: impl Into<String>, output: CommandOutput) -> Self {
        self.outputs.lock().push((last_arg.into(), output));
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        self.calls.lock().push((program.to_string(), args.to_vec()));

        if self.spawn_fails {
            return Err(Error::process(
                program,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not installed"),
            ));
        }

        let matched = args.last().and_then(|last| {
            self.outputs
                .lock()
                .iter()
                .find(|(key, _)| key == last)
                .map(|(_, output)| output.clone())
        });

        Ok(matched.unwrap_or_else(|| CommandOutput {
            exit_code: self.output.exit_code.or(Some(0)),
            ..self.output.clone()
        }))
    }
}
