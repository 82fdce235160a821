//! Tidal Storage - Streaming quad store.
//!
//! This crate provides the store that the change detector writes to and the
//! incremental operators read from:
//!
//! - `StreamingStore`: mutable quad set with live `match_quads` channels
//! - `QuadStream` / `BindingStream`: replay-then-live addition/retraction streams
//! - `ResidentSet`: the indexed resident quads
//! - `PendingStreams`: the pattern → channel index consulted on every mutation
//! - `Journal` / `QuadDiff`: halt buffering and snapshot differences
//!
//! # Example
//!
//! ```rust
//! use futures::{FutureExt, StreamExt};
//! use tidal_core::{Quad, QuadPattern, Term};
//! use tidal_storage::StreamingStore;
//!
//! let store = StreamingStore::new();
//! let mut stream = store.match_quads(QuadPattern::any());
//!
//! store.add(Quad::triple(Term::iri("s"), Term::iri("p"), Term::iri("o"))).unwrap();
//!
//! let delta = stream.next().now_or_never().unwrap().unwrap().unwrap();
//! assert!(delta.is_addition());
//! ```

pub mod bindings;
pub mod journal;
pub mod pending;
pub mod resident;
pub mod store;

pub use bindings::BindingStream;
pub use journal::{Journal, JournalEntry, QuadDiff};
pub use pending::{PendingStreams, StreamId};
pub use resident::ResidentSet;
pub use store::{QuadStream, StreamingStore};
