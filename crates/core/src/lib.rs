//! Tidal Core - RDF terms, bindings and polarity-tagged deltas.
//!
//! This crate provides the foundational types shared by the tidal store,
//! change detector and incremental operators:
//!
//! - `Term`, `Literal`: RDF terms with SPARQL ordering (`compare_terms`)
//! - `Quad`, `QuadPattern`, `TriplePattern`: data and patterns over it
//! - `Binding`, `Variable`, `OrderMeta`: solution mappings
//! - `Delta`, `Polarity`, `Message`: the addition/retraction unit of flow
//! - `Numeric`: literal arithmetic consumed by aggregates
//! - `Error`: error type for all tidal crates
//!
//! # Example
//!
//! ```rust
//! use tidal_core::{Binding, Delta, Term};
//!
//! let b = Binding::new().with("x", Term::integer(1));
//! let added = Delta::addition(b.clone());
//! let removed = added.negated();
//!
//! assert!(removed.is_retraction());
//! assert_eq!(removed.data, b);
//! ```

pub mod binding;
pub mod delta;
mod error;
pub mod numeric;
pub mod quad;
pub mod term;

pub use binding::{Binding, OrderMeta, Variable};
pub use delta::{Delta, Message, Polarity};
pub use error::{Error, Result};
pub use numeric::Numeric;
pub use quad::{PatternTerm, Quad, QuadPattern, TriplePattern};
pub use term::{compare_terms, vocab, Literal, OrderedTerm, Term};
