//! Incremental operators over binding deltas.
//!
//! Every operator is a synchronous state machine: it takes one delta and
//! returns the deltas it produces. `crate::stream` drives them over streams.
//!
//! - Join: `CountingHashJoin` (default), `SymmetricHashJoin`, `NestedLoopJoin`
//! - Minus and Optional, built on an anti-join memory
//! - Union, Filter, Project: stateless pass-through operators
//! - Distinct/Reduced: refcount gate over whole bindings
//! - Slice: ordered window over bindings carrying order metadata
//! - Group: per-group aggregates

mod distinct;
mod filter;
mod group;
mod join;
pub mod memory;
mod minus;
mod optional;
mod project;
mod slice;
mod union;

pub use distinct::{Distinct, Reduced};
pub use filter::{Filter, Predicate};
pub use group::Group;
pub use join::{join, CountingHashJoin, NestedLoopJoin, SymmetricHashJoin};
pub use memory::{shared_variables, JoinKey};
pub use minus::{Minus, MinusMode};
pub use optional::Optional;
pub use project::Project;
pub use slice::Slice;
pub use union::Union;
