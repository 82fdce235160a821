//! Tidal Reactive - Change detection for remote RDF resources.
//!
//! This crate keeps the streaming store in sync with resources that change
//! underneath it. A change detector checks each resource's validator and a
//! resource watch turns every detected change into the minimal set of quad
//! additions and retractions.
//!
//! # Core Concepts
//!
//! - `Fetcher` / `QuadParser`: injected network and syntax capabilities
//! - `ResourceMetadata`: validator and cache lifetime read from response headers
//! - `ChangeDetector`: polling or deferred probing, emitting `WatchEvent`s
//! - `ResourceWatch`: re-fetch, diff against the store, apply under halt
//! - `WatchRegistry`: one detector and event pump per watched URL
//!
//! A failed check or re-fetch never surfaces as an error downstream: it
//! degrades to retracting everything the resource contributed.
//!
//! # Example
//!
//! ```ignore
//! use tidal_reactive::{DetectionStrategy, PollingConfig, ResourceWatch, WatchRegistry};
//!
//! let watch = ResourceWatch::new(url, store.clone(), scope, fetcher, parser);
//! watch.load().await?;
//!
//! let mut registry = WatchRegistry::new();
//! registry.register(watch, DetectionStrategy::Polling(PollingConfig::default()));
//! registry.start(url);
//! ```

pub mod config;
pub mod detector;
pub mod fetch;
pub mod metadata;
pub mod registry;
pub mod watch;

pub use config::PollingConfig;
pub use detector::{ChangeDetector, DetectionStrategy, WatchEvent};
pub use fetch::{FetchRequest, FetchResponse, Fetcher, Method, QuadParser};
pub use metadata::ResourceMetadata;
pub use registry::WatchRegistry;
pub use watch::ResourceWatch;
