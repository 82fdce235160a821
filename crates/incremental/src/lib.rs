//! Tidal Incremental - incremental operators over binding delta streams.
//!
//! Every value flowing between operators is a `Delta<Binding>`: a solution
//! mapping tagged as an addition or a retraction. Each operator keeps just
//! enough state to emit the exact output delta for one input delta.
//!
//! # Operators
//!
//! - `CountingHashJoin`: reference-counted hash join, the default
//! - `SymmetricHashJoin`, `NestedLoopJoin`: alternate join strategies
//! - `Minus`, `Optional`, `Union`
//! - `Filter`, `Project`
//! - `Distinct` / `Reduced`: refcount gate
//! - `Slice`: ordered OFFSET/LIMIT window
//! - `Group` with `Aggregator`: COUNT, SUM, AVG, MIN, MAX, GROUP_CONCAT, SAMPLE
//!
//! # Dispatch
//!
//! `dispatch(Operation)` builds an operator, wires it to its input streams
//! and returns the output stream with cardinality and variable metadata.
//!
//! # Example
//!
//! ```rust
//! use futures::executor::block_on;
//! use futures::StreamExt;
//! use tidal_core::{Binding, Delta, Term, Variable};
//! use tidal_incremental::stream::from_deltas;
//! use tidal_incremental::{dispatch, Metadata, Operation, OperationOutput};
//!
//! let x = |v| Binding::new().with("x", Term::integer(v));
//! let input = OperationOutput::new(
//!     from_deltas(vec![Delta::addition(x(1)), Delta::addition(x(1))]),
//!     Metadata { cardinality: 2, variables: vec![Variable::new("x")] },
//! );
//!
//! let distinct = dispatch(Operation::Distinct { input }).unwrap();
//! let out: Vec<_> = block_on(distinct.stream.collect::<Vec<_>>());
//! assert_eq!(out.len(), 1);
//! ```

pub mod aggregate;
pub mod config;
pub mod mediator;
pub mod operators;
pub mod stream;

pub use aggregate::{
    AggregateInput, AggregateKind, AggregateResult, AggregateSpec, Aggregator, TermFunction,
    WildcardCount,
};
pub use config::{JoinAlgorithm, MediatorConfig};
pub use mediator::{dispatch, Mediator, Metadata, Operation, OperationOutput};
pub use operators::{
    CountingHashJoin, Distinct, Filter, Group, Minus, MinusMode, NestedLoopJoin, Optional,
    Predicate, Project, Reduced, Slice, SymmetricHashJoin, Union,
};
pub use stream::{BinaryOperator, BindingDeltaStream, BoxedDeltaStream, Side, UnaryOperator};
