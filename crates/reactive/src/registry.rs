//! Registry of watched resources.
//!
//! `WatchRegistry` owns one change detector per resource and a pump task that
//! routes the detector's events into the resource's `ResourceWatch`.

use crate::detector::{ChangeDetector, DetectionStrategy};
use crate::watch::ResourceWatch;
use hashbrown::HashMap;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

struct Entry {
    watch: ResourceWatch,
    detector: ChangeDetector,
    pump: JoinHandle<()>,
}

/// Tracks watched resources by URL.
#[derive(Default)]
pub struct WatchRegistry {
    entries: HashMap<String, Entry>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource with the given detection strategy.
    ///
    /// The detector is created stopped. Returns false if the URL is already
    /// registered. Must be called inside a tokio runtime.
    pub fn register(&mut self, watch: ResourceWatch, strategy: DetectionStrategy) -> bool {
        if self.entries.contains_key(watch.url()) {
            return false;
        }
        let (detector, mut events) =
            ChangeDetector::new(watch.url(), watch.fetcher(), watch.metadata(), strategy);
        let target = watch.clone();
        let pump = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if let Err(err) = target.handle(event).await {
                    warn!(url = target.url(), error = %err, "dropping watch");
                    break;
                }
            }
        });
        debug!(url = watch.url(), "resource registered");
        self.entries.insert(
            watch.url().to_string(),
            Entry {
                watch,
                detector,
                pump,
            },
        );
        true
    }

    /// Stops and removes a resource. Its quads stay in the store.
    pub fn unregister(&mut self, url: &str) -> Option<ResourceWatch> {
        let mut entry = self.entries.remove(url)?;
        entry.detector.stop();
        entry.pump.abort();
        debug!(url, "resource unregistered");
        Some(entry.watch)
    }

    /// Starts change detection for a resource. Returns false if unknown.
    pub fn start(&mut self, url: &str) -> bool {
        match self.entries.get_mut(url) {
            Some(entry) => {
                entry.detector.start();
                true
            }
            None => false,
        }
    }

    /// Stops change detection for a resource. Returns false if unknown.
    pub fn stop(&mut self, url: &str) -> bool {
        match self.entries.get_mut(url) {
            Some(entry) => {
                entry.detector.stop();
                true
            }
            None => false,
        }
    }

    pub fn start_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.detector.start();
        }
    }

    pub fn stop_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.detector.stop();
        }
    }

    pub fn get(&self, url: &str) -> Option<&ResourceWatch> {
        self.entries.get(url).map(|entry| &entry.watch)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Returns true if the resource is registered and its detector running.
    pub fn is_running(&self, url: &str) -> bool {
        self.entries
            .get(url)
            .map_or(false, |entry| entry.detector.is_running())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates registered URLs.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Drop for WatchRegistry {
    fn drop(&mut self) {
        for (_, entry) in self.entries.drain() {
            entry.pump.abort();
        }
    }
}
