//! Materializing a watched resource into the store.

use crate::detector::WatchEvent;
use crate::fetch::{FetchRequest, Fetcher, QuadParser};
use crate::metadata::ResourceMetadata;
use parking_lot::Mutex;
use std::sync::Arc;
use tidal_core::{Error, Quad, QuadPattern, Result};
use tidal_storage::{QuadDiff, StreamingStore};
use tracing::{debug, warn};

/// Keeps the quads of one remote resource in sync with the store.
///
/// The resource owns the quads matching `scope`. A refresh replaces that
/// region with a freshly parsed copy through a single halted diff, so
/// downstream consumers see only the net changes.
#[derive(Clone)]
pub struct ResourceWatch {
    url: Arc<str>,
    store: StreamingStore,
    scope: QuadPattern,
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn QuadParser>,
    metadata: Arc<Mutex<ResourceMetadata>>,
}

impl ResourceWatch {
    pub fn new(
        url: impl Into<String>,
        store: StreamingStore,
        scope: QuadPattern,
        fetcher: Arc<dyn Fetcher>,
        parser: Arc<dyn QuadParser>,
    ) -> Self {
        Self {
            url: Arc::from(url.into()),
            store,
            scope,
            fetcher,
            parser,
            metadata: Arc::new(Mutex::new(ResourceMetadata::default())),
        }
    }

    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[inline]
    pub fn scope(&self) -> &QuadPattern {
        &self.scope
    }

    #[inline]
    pub fn store(&self) -> &StreamingStore {
        &self.store
    }

    #[inline]
    pub fn fetcher(&self) -> Arc<dyn Fetcher> {
        Arc::clone(&self.fetcher)
    }

    /// Metadata shared with the change detector.
    #[inline]
    pub fn metadata(&self) -> Arc<Mutex<ResourceMetadata>> {
        Arc::clone(&self.metadata)
    }

    /// Performs the initial retrieval. Unlike `refresh`, failure is reported.
    pub async fn load(&self) -> Result<usize> {
        let quads = self.retrieve().await?;
        let old = self.store.snapshot(&self.scope);
        let count = quads.len();
        self.store.apply_diff(QuadDiff::between(&old, &quads))?;
        debug!(url = %self.url, quads = count, "resource loaded");
        Ok(count)
    }

    /// Re-fetches the resource and applies the difference to the store.
    ///
    /// A failed retrieval degrades to retracting every resident quad of the
    /// resource. Only store errors are returned.
    pub async fn refresh(&self) -> Result<()> {
        let old = self.store.snapshot(&self.scope);
        let diff = match self.retrieve().await {
            Ok(new) => QuadDiff::between(&old, &new),
            Err(err) => {
                warn!(url = %self.url, error = %err, "refresh failed, retracting resource");
                self.metadata.lock().invalidate();
                QuadDiff::retract_all(old)
            }
        };
        debug!(
            url = %self.url,
            added = diff.added().len(),
            removed = diff.removed().len(),
            "applying resource diff"
        );
        self.store.apply_diff(diff)
    }

    /// Retracts every resident quad of the resource.
    pub fn retract_all(&self) -> Result<()> {
        let old = self.store.snapshot(&self.scope);
        debug!(url = %self.url, removed = old.len(), "retracting resource");
        self.store.apply_diff(QuadDiff::retract_all(old))
    }

    /// Reacts to a detector event.
    pub async fn handle(&self, event: WatchEvent) -> Result<()> {
        match event {
            WatchEvent::Update => self.refresh().await,
            WatchEvent::Delete => self.retract_all(),
        }
    }

    async fn retrieve(&self) -> Result<Vec<Quad>> {
        let response = self.fetcher.fetch(&self.url, FetchRequest::get()).await?;
        if !response.ok() {
            return Err(Error::fetch(
                self.url.as_ref(),
                format!("status {}", response.status()),
            ));
        }
        let quads = self.parser.parse(&self.url, &response)?;
        *self.metadata.lock() = ResourceMetadata::from_response(&response);

        let total = quads.len();
        let scoped: Vec<Quad> = quads.into_iter().filter(|q| self.scope.matches(q)).collect();
        if scoped.len() < total {
            debug!(url = %self.url, dropped = total - scoped.len(), "quads outside scope ignored");
        }
        Ok(scoped)
    }
}
