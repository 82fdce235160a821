//! Incremental aggregate functions.
//!
//! Every aggregator accepts `put` and `remove` of single terms and reports
//! through `result()`, which follows one contract for all functions:
//!
//! - `Unchanged` when the value is the same as at the previous call
//! - `Error` once after an evaluation error, then `Unchanged` forever
//! - `Value(v)` otherwise, where `v` is the empty value until the first `put`
//!
//! COUNT(*) counts bindings rather than terms and lives in `WildcardCount`.

mod accumulator;
mod concat;
mod wildcard;

pub use wildcard::WildcardCount;

use accumulator::{Avg, Count, Extremum, Sum};
use concat::{GroupConcat, Sample};
use core::fmt;
use hashbrown::HashMap;
use std::sync::Arc;
use tidal_core::{Binding, Error, Result, Term, Variable};
use tracing::warn;

/// Outcome of `result()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AggregateResult {
    /// Same value as last reported.
    Unchanged,
    /// An evaluation error occurred; the aggregate is unbound from now on.
    Error,
    /// A new value; `None` is unbound.
    Value(Option<Term>),
}

/// The aggregate function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AggregateKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    GroupConcat { separator: String },
    Sample,
}

impl AggregateKind {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateKind::Count => "COUNT",
            AggregateKind::Sum => "SUM",
            AggregateKind::Avg => "AVG",
            AggregateKind::Min => "MIN",
            AggregateKind::Max => "MAX",
            AggregateKind::GroupConcat { .. } => "GROUP_CONCAT",
            AggregateKind::Sample => "SAMPLE",
        }
    }

    /// GROUP_CONCAT with the default single-space separator.
    pub fn group_concat() -> Self {
        AggregateKind::GroupConcat {
            separator: " ".to_string(),
        }
    }
}

/// Per-function running state.
pub(crate) trait Accumulator: Send + fmt::Debug {
    fn put(&mut self, term: &Term) -> Result<()>;
    fn remove(&mut self, term: &Term) -> Result<()>;
    /// Current value. Only called after at least one `put`.
    fn value(&self) -> Result<Option<Term>>;
    /// Value reported before anything was put.
    fn empty_value(&self) -> Option<Term>;
}

/// Tracks what `result()` last reported, including the sticky error.
#[derive(Debug, Default)]
pub(crate) struct ResultTracker {
    last: Option<Option<Term>>,
    errored: bool,
    error_reported: bool,
}

impl ResultTracker {
    #[inline]
    pub(crate) fn errored(&self) -> bool {
        self.errored
    }

    pub(crate) fn fail(&mut self) {
        self.errored = true;
    }

    pub(crate) fn report(&mut self, value: Option<Term>) -> AggregateResult {
        if self.errored {
            return self.report_error();
        }
        if self.last.as_ref() == Some(&value) {
            return AggregateResult::Unchanged;
        }
        self.last = Some(value.clone());
        AggregateResult::Value(value)
    }

    fn report_error(&mut self) -> AggregateResult {
        if self.error_reported {
            AggregateResult::Unchanged
        } else {
            self.error_reported = true;
            AggregateResult::Error
        }
    }
}

/// A term aggregate with an optional DISTINCT gate.
#[derive(Debug)]
pub struct Aggregator {
    kind: AggregateKind,
    accumulator: Box<dyn Accumulator>,
    distinct: Option<HashMap<Term, usize>>,
    populated: bool,
    tracker: ResultTracker,
}

impl Aggregator {
    pub fn new(kind: AggregateKind, distinct: bool) -> Self {
        let accumulator: Box<dyn Accumulator> = match &kind {
            AggregateKind::Count => Box::new(Count::default()),
            AggregateKind::Sum => Box::new(Sum::default()),
            AggregateKind::Avg => Box::new(Avg::default()),
            AggregateKind::Min => Box::new(Extremum::min()),
            AggregateKind::Max => Box::new(Extremum::max()),
            AggregateKind::GroupConcat { separator } => Box::new(GroupConcat::new(separator.clone())),
            AggregateKind::Sample => Box::new(Sample::default()),
        };
        Self {
            kind,
            accumulator,
            distinct: distinct.then(HashMap::new),
            populated: false,
            tracker: ResultTracker::default(),
        }
    }

    #[inline]
    pub fn kind(&self) -> &AggregateKind {
        &self.kind
    }

    #[inline]
    pub fn is_distinct(&self) -> bool {
        self.distinct.is_some()
    }

    /// True once an evaluation error made the result permanently unbound.
    #[inline]
    pub fn is_errored(&self) -> bool {
        self.tracker.errored()
    }

    /// Marks the aggregate as failed by an evaluation error.
    pub fn fail(&mut self, err: &Error) {
        if !self.tracker.errored() {
            warn!(aggregate = self.kind.name(), error = %err, "aggregate evaluation failed");
            self.tracker.fail();
        }
    }

    fn absorb(&mut self, outcome: Result<()>) -> Result<()> {
        match outcome {
            Ok(()) => Ok(()),
            Err(err) if err.is_evaluation() => {
                self.fail(&err);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Adds a term. Evaluation errors set the sticky error; others are fatal.
    pub fn put(&mut self, term: &Term) -> Result<()> {
        if self.tracker.errored() {
            return Ok(());
        }
        if let Some(gate) = self.distinct.as_mut() {
            let count = gate.entry(term.clone()).or_insert(0);
            *count += 1;
            if *count > 1 {
                return Ok(());
            }
        }
        self.populated = true;
        let outcome = self.accumulator.put(term);
        self.absorb(outcome)
    }

    /// Removes a previously added term.
    pub fn remove(&mut self, term: &Term) -> Result<()> {
        if self.tracker.errored() {
            return Ok(());
        }
        if !self.populated {
            return Err(Error::empty_aggregate_removal(self.kind.name(), term));
        }
        if let Some(gate) = self.distinct.as_mut() {
            let count = gate
                .get_mut(term)
                .ok_or_else(|| Error::unknown_retraction("aggregate term", term))?;
            *count -= 1;
            if *count > 0 {
                return Ok(());
            }
            gate.remove(term);
        }
        let outcome = self.accumulator.remove(term);
        self.absorb(outcome)
    }

    pub fn result(&mut self) -> AggregateResult {
        if self.tracker.errored() {
            return self.tracker.report(None);
        }
        let value = if self.populated {
            match self.accumulator.value() {
                Ok(value) => value,
                Err(err) => {
                    self.fail(&err);
                    return self.tracker.report(None);
                }
            }
        } else {
            self.accumulator.empty_value()
        };
        self.tracker.report(value)
    }
}

/// A pluggable term-valued expression over one binding.
pub type TermFunction = Arc<dyn Fn(&Binding) -> Result<Term> + Send + Sync>;

/// What an aggregate consumes from each binding.
#[derive(Clone)]
pub enum AggregateInput {
    /// The whole binding, for COUNT(*).
    Wildcard,
    /// The value of an expression.
    Expression(TermFunction),
}

impl AggregateInput {
    /// The term bound to a variable; unbound is an evaluation error.
    pub fn variable(name: impl Into<String>) -> Self {
        let var = Variable::new(name);
        AggregateInput::Expression(Arc::new(move |binding: &Binding| {
            binding
                .get(var.name())
                .cloned()
                .ok_or_else(|| Error::evaluation(format!("{} is unbound", var)))
        }))
    }
}

impl fmt::Debug for AggregateInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateInput::Wildcard => f.write_str("Wildcard"),
            AggregateInput::Expression(_) => f.write_str("Expression(..)"),
        }
    }
}

/// One aggregate column of a GROUP.
#[derive(Clone, Debug)]
pub struct AggregateSpec {
    pub output: Variable,
    pub kind: AggregateKind,
    pub input: AggregateInput,
    pub distinct: bool,
}

impl AggregateSpec {
    pub fn new(output: impl Into<String>, kind: AggregateKind, input: AggregateInput) -> Self {
        Self {
            output: Variable::new(output),
            kind,
            input,
            distinct: false,
        }
    }

    /// `COUNT(*)`.
    pub fn count_all(output: impl Into<String>) -> Self {
        Self::new(output, AggregateKind::Count, AggregateInput::Wildcard)
    }

    /// Aggregates over a variable.
    pub fn over(output: impl Into<String>, kind: AggregateKind, variable: impl Into<String>) -> Self {
        Self::new(output, kind, AggregateInput::variable(variable))
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidal_core::vocab;

    fn int(v: i64) -> Term {
        Term::integer(v)
    }

    #[test]
    fn test_sum_scenario() {
        let mut sum = Aggregator::new(AggregateKind::Sum, false);
        for v in [1, 2, 3] {
            sum.put(&int(v)).unwrap();
        }
        sum.remove(&int(2)).unwrap();
        assert_eq!(sum.result(), AggregateResult::Value(Some(int(4))));
        assert_eq!(sum.result(), AggregateResult::Unchanged);
    }

    #[test]
    fn test_empty_value_before_population() {
        assert_eq!(
            Aggregator::new(AggregateKind::Count, false).result(),
            AggregateResult::Value(Some(int(0)))
        );
        assert_eq!(
            Aggregator::new(AggregateKind::Min, false).result(),
            AggregateResult::Value(None)
        );
        assert_eq!(
            Aggregator::new(AggregateKind::group_concat(), false).result(),
            AggregateResult::Value(Some(Term::string("")))
        );
    }

    #[test]
    fn test_sticky_error() {
        let mut sum = Aggregator::new(AggregateKind::Sum, false);
        sum.put(&int(1)).unwrap();
        sum.put(&Term::string("x")).unwrap();
        assert!(sum.is_errored());
        assert_eq!(sum.result(), AggregateResult::Error);
        assert_eq!(sum.result(), AggregateResult::Unchanged);
        sum.put(&int(5)).unwrap();
        assert_eq!(sum.result(), AggregateResult::Unchanged);
    }

    #[test]
    fn test_remove_from_unpopulated_is_fatal() {
        let mut max = Aggregator::new(AggregateKind::Max, false);
        let err = max.remove(&int(1)).unwrap_err();
        assert!(matches!(err, Error::EmptyAggregateRemoval { .. }));
    }

    #[test]
    fn test_distinct_gate() {
        let mut count = Aggregator::new(AggregateKind::Count, true);
        count.put(&int(1)).unwrap();
        count.put(&int(1)).unwrap();
        count.put(&int(2)).unwrap();
        assert_eq!(count.result(), AggregateResult::Value(Some(int(2))));
        count.remove(&int(1)).unwrap();
        assert_eq!(count.result(), AggregateResult::Unchanged);
        count.remove(&int(1)).unwrap();
        assert_eq!(count.result(), AggregateResult::Value(Some(int(1))));
        assert!(count.remove(&int(1)).is_err());
    }

    #[test]
    fn test_avg_is_decimal() {
        let mut avg = Aggregator::new(AggregateKind::Avg, false);
        avg.put(&int(1)).unwrap();
        avg.put(&int(2)).unwrap();
        assert_eq!(
            avg.result(),
            AggregateResult::Value(Some(Term::typed("1.5", vocab::XSD_DECIMAL)))
        );
    }

    #[test]
    fn test_variable_input() {
        let AggregateInput::Expression(f) = AggregateInput::variable("x") else {
            panic!("expected expression");
        };
        let bound = Binding::new().with("x", int(3));
        assert_eq!(f(&bound).unwrap(), int(3));
        assert!(f(&Binding::new()).unwrap_err().is_evaluation());
    }
}
