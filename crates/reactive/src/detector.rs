//! Change detection for a watched resource.
//!
//! A `ChangeDetector` checks a resource's validator and emits `WatchEvent`s:
//! `Update` when the validator changed, `Delete` when the check failed. Checks
//! are scheduled either by a timer derived from the resource's cache metadata
//! (polling) or by an externally supplied trigger (deferred).

use crate::config::PollingConfig;
use crate::fetch::{FetchRequest, Fetcher};
use crate::metadata::ResourceMetadata;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What the detector concluded about the resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchEvent {
    /// The resource changed; re-fetch and diff.
    Update,
    /// The resource is gone; retract everything.
    Delete,
}

/// How checks are scheduled.
#[derive(Clone, Debug)]
pub enum DetectionStrategy {
    /// Timer: first after `validity - age`, then every `validity`.
    Polling(PollingConfig),
    /// One check per trigger fired on the supplied channel.
    Deferred { trigger: broadcast::Sender<()> },
}

/// Shared state used by the check loop.
#[derive(Clone)]
struct Check {
    url: Arc<str>,
    fetcher: Arc<dyn Fetcher>,
    metadata: Arc<Mutex<ResourceMetadata>>,
    events: mpsc::UnboundedSender<WatchEvent>,
}

impl Check {
    /// Issues one validator check and emits the resulting event, if any.
    async fn run(&self) {
        let event = match self.fetcher.fetch(&self.url, FetchRequest::head()).await {
            Ok(response) if response.ok() => {
                let observed = ResourceMetadata::from_response(&response);
                let mut last = self.metadata.lock();
                let changed = last.validator_changed(&observed);
                *last = observed;
                changed.then_some(WatchEvent::Update)
            }
            Ok(response) => {
                debug!(url = %self.url, status = response.status(), "check returned failure status");
                self.metadata.lock().invalidate();
                Some(WatchEvent::Delete)
            }
            Err(err) => {
                warn!(url = %self.url, error = %err, "check failed");
                self.metadata.lock().invalidate();
                Some(WatchEvent::Delete)
            }
        };
        if let Some(event) = event {
            debug!(url = %self.url, ?event, "change detected");
            let _ = self.events.send(event);
        }
    }
}

/// Watches one resource for modification.
pub struct ChangeDetector {
    check: Check,
    strategy: DetectionStrategy,
    running: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ChangeDetector {
    /// Creates a stopped detector and the receiver of its events.
    pub fn new(
        url: impl Into<String>,
        fetcher: Arc<dyn Fetcher>,
        metadata: Arc<Mutex<ResourceMetadata>>,
        strategy: DetectionStrategy,
    ) -> (Self, mpsc::UnboundedReceiver<WatchEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let (running, _) = watch::channel(false);
        let detector = Self {
            check: Check {
                url: Arc::from(url.into()),
                fetcher,
                metadata,
                events,
            },
            strategy,
            running,
            task: None,
        };
        (detector, receiver)
    }

    /// Returns the watched resource.
    pub fn url(&self) -> &str {
        &self.check.url
    }

    /// Returns true while checks are actively scheduled.
    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Starts scheduling checks. Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.running.send_replace(true);
        let check = self.check.clone();
        let running = self.running.subscribe();
        debug!(url = %check.url, "change detector started");
        self.task = Some(match &self.strategy {
            DetectionStrategy::Polling(config) => {
                tokio::spawn(poll_loop(check, config.clone(), running))
            }
            DetectionStrategy::Deferred { trigger } => {
                // Subscribe before returning so no trigger sent after start() is missed.
                tokio::spawn(deferred_loop(check, trigger.subscribe(), running))
            }
        });
    }

    /// Stops scheduling checks. An in-flight check runs to completion.
    pub fn stop(&mut self) {
        if self.running.send_replace(false) {
            debug!(url = %self.check.url, "change detector stopped");
        }
        self.task = None;
    }

    /// Runs one check immediately, regardless of the schedule.
    pub async fn check_now(&self) {
        self.check.run().await;
    }
}

impl Drop for ChangeDetector {
    fn drop(&mut self) {
        self.running.send_replace(false);
    }
}

/// Resolves once the running flag is cleared or its sender is gone.
async fn stopped(running: &mut watch::Receiver<bool>) {
    loop {
        if !*running.borrow_and_update() {
            return;
        }
        if running.changed().await.is_err() {
            return;
        }
    }
}

async fn poll_loop(check: Check, config: PollingConfig, mut running: watch::Receiver<bool>) {
    let mut delay = check.metadata.lock().first_check_delay(&config);
    loop {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = stopped(&mut running) => break,
        }
        check.run().await;
        if !*running.borrow() {
            break;
        }
        delay = check.metadata.lock().check_interval(&config);
    }
}

async fn deferred_loop(
    check: Check,
    mut trigger: broadcast::Receiver<()>,
    mut running: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            received = trigger.recv() => match received {
                Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = stopped(&mut running) => break,
        }
        check.run().await;
        if !*running.borrow() {
            break;
        }
    }
}
