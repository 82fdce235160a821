//! Operation dispatch.
//!
//! A host composes a query by nesting `Operation`s. `dispatch` builds the
//! operator for one request, wires it to the already-dispatched inputs and
//! returns the lazily-evaluated output stream with its metadata.

use crate::aggregate::AggregateSpec;
use crate::config::{JoinAlgorithm, MediatorConfig};
use crate::operators::{
    shared_variables, CountingHashJoin, Distinct, Filter, Group, Minus, NestedLoopJoin, Optional,
    Predicate, Project, Reduced, Slice, SymmetricHashJoin, Union,
};
use crate::stream::{
    from_store, BinaryOperator, BinaryStream, BindingDeltaStream, Side, UnaryStream,
};
use core::fmt;
use tidal_core::{Binding, Result, TriplePattern, Variable};
use tidal_storage::StreamingStore;
use tracing::debug;

/// What is known about a result before it is consumed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Estimated number of solutions.
    pub cardinality: usize,
    /// Variables the solutions may bind.
    pub variables: Vec<Variable>,
}

/// A dispatched result: its delta stream plus metadata.
pub struct OperationOutput {
    pub stream: BindingDeltaStream,
    pub metadata: Metadata,
}

impl OperationOutput {
    pub fn new(stream: BindingDeltaStream, metadata: Metadata) -> Self {
        Self { stream, metadata }
    }
}

impl fmt::Debug for OperationOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationOutput")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// A typed request for one operator.
pub enum Operation {
    /// Binding stream of a triple pattern over the store.
    Pattern {
        store: StreamingStore,
        pattern: TriplePattern,
    },
    /// Inner join; `algorithm` overrides the configured default.
    Join {
        left: OperationOutput,
        right: OperationOutput,
        algorithm: Option<JoinAlgorithm>,
    },
    Minus {
        left: OperationOutput,
        right: OperationOutput,
    },
    /// Left join, computed as join ∪ anti-join.
    Optional {
        left: OperationOutput,
        right: OperationOutput,
        algorithm: Option<JoinAlgorithm>,
    },
    Union {
        left: OperationOutput,
        right: OperationOutput,
    },
    Filter {
        input: OperationOutput,
        predicate: Predicate,
    },
    Project {
        input: OperationOutput,
        variables: Vec<Variable>,
    },
    Distinct {
        input: OperationOutput,
    },
    Reduced {
        input: OperationOutput,
    },
    /// Ordered window; input bindings must carry order metadata.
    Slice {
        input: OperationOutput,
        start: usize,
        length: Option<usize>,
    },
    Group {
        input: OperationOutput,
        group_by: Vec<Variable>,
        aggregates: Vec<AggregateSpec>,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Pattern { .. } => "pattern",
            Operation::Join { .. } => "join",
            Operation::Minus { .. } => "minus",
            Operation::Optional { .. } => "optional",
            Operation::Union { .. } => "union",
            Operation::Filter { .. } => "filter",
            Operation::Project { .. } => "project",
            Operation::Distinct { .. } => "distinct",
            Operation::Reduced { .. } => "reduced",
            Operation::Slice { .. } => "slice",
            Operation::Group { .. } => "group",
        }
    }
}

/// Routes operations to operators under a configuration.
#[derive(Clone, Debug, Default)]
pub struct Mediator {
    config: MediatorConfig,
}

impl Mediator {
    pub fn new(config: MediatorConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &MediatorConfig {
        &self.config
    }

    pub fn dispatch(&self, operation: Operation) -> Result<OperationOutput> {
        let name = operation.name();
        let output = match operation {
            Operation::Pattern { store, pattern } => {
                let metadata = Metadata {
                    cardinality: store.estimate(&pattern.quad_pattern()),
                    variables: pattern.variables(),
                };
                OperationOutput::new(from_store(store.match_bindings(pattern)), metadata)
            }
            Operation::Join {
                left,
                right,
                algorithm,
            } => {
                let shared = shared_variables(&left.metadata.variables, &right.metadata.variables);
                let join = self.join(algorithm, shared);
                let metadata = Metadata {
                    cardinality: left.metadata.cardinality.saturating_mul(right.metadata.cardinality),
                    variables: merge_variables(&left.metadata.variables, &right.metadata.variables),
                };
                binary(left, right, join, None, metadata)
            }
            Operation::Minus { left, right } => {
                let shared = shared_variables(&left.metadata.variables, &right.metadata.variables);
                let metadata = left.metadata.clone();
                binary(left, right, Minus::new(shared), Some(Side::Right), metadata)
            }
            Operation::Optional {
                left,
                right,
                algorithm,
            } => {
                let shared = shared_variables(&left.metadata.variables, &right.metadata.variables);
                let optional = Optional::with_join(self.join(algorithm, shared.clone()), shared);
                let metadata = Metadata {
                    cardinality: left
                        .metadata
                        .cardinality
                        .saturating_mul(right.metadata.cardinality.max(1)),
                    variables: merge_variables(&left.metadata.variables, &right.metadata.variables),
                };
                binary(left, right, optional, Some(Side::Right), metadata)
            }
            Operation::Union { left, right } => {
                let metadata = Metadata {
                    cardinality: left.metadata.cardinality.saturating_add(right.metadata.cardinality),
                    variables: merge_variables(&left.metadata.variables, &right.metadata.variables),
                };
                binary(left, right, Union, None, metadata)
            }
            Operation::Filter { input, predicate } => {
                let metadata = input.metadata.clone();
                unary(input, Filter::new(predicate), metadata)
            }
            Operation::Project { input, variables } => {
                let metadata = Metadata {
                    cardinality: input.metadata.cardinality,
                    variables: variables.clone(),
                };
                unary(input, Project::new(variables), metadata)
            }
            Operation::Distinct { input } => {
                let metadata = input.metadata.clone();
                unary(input, Distinct::new(), metadata)
            }
            Operation::Reduced { input } => {
                let metadata = input.metadata.clone();
                unary(input, Reduced::new(), metadata)
            }
            Operation::Slice {
                input,
                start,
                length,
            } => {
                let available = input.metadata.cardinality.saturating_sub(start);
                let metadata = Metadata {
                    cardinality: length.map_or(available, |length| length.min(available)),
                    variables: input.metadata.variables.clone(),
                };
                unary(input, Slice::new(start, length), metadata)
            }
            Operation::Group {
                input,
                group_by,
                aggregates,
            } => {
                let cardinality = if group_by.is_empty() {
                    1
                } else {
                    input.metadata.cardinality
                };
                let group = Group::new(group_by, aggregates)?;
                let metadata = Metadata {
                    cardinality,
                    variables: group.variables(),
                };
                unary(input, group, metadata)
            }
        };
        debug!(
            operation = name,
            cardinality = output.metadata.cardinality,
            "operation dispatched"
        );
        Ok(output)
    }

    fn join(&self, algorithm: Option<JoinAlgorithm>, shared: Vec<Variable>) -> Box<dyn BinaryOperator> {
        match algorithm.unwrap_or(self.config.join_algorithm) {
            JoinAlgorithm::Counting => Box::new(CountingHashJoin::new(shared)),
            JoinAlgorithm::Symmetric => Box::new(SymmetricHashJoin::new(shared)),
            JoinAlgorithm::NestedLoop => Box::new(NestedLoopJoin::new()),
        }
    }
}

/// Dispatches an operation under the default configuration.
pub fn dispatch(operation: Operation) -> Result<OperationOutput> {
    Mediator::default().dispatch(operation)
}

fn unary<Op>(input: OperationOutput, operator: Op, metadata: Metadata) -> OperationOutput
where
    Op: crate::stream::UnaryOperator<Binding, Binding> + Unpin + 'static,
{
    OperationOutput::new(Box::pin(UnaryStream::new(input.stream, operator)), metadata)
}

/// Wires a binary operator. MINUS and OPTIONAL give their right input
/// priority so ready exclusions are seen before the left items they hide.
fn binary<Op>(
    left: OperationOutput,
    right: OperationOutput,
    operator: Op,
    priority: Option<Side>,
    metadata: Metadata,
) -> OperationOutput
where
    Op: BinaryOperator + Unpin + 'static,
{
    let mut stream = BinaryStream::new(left.stream, right.stream, operator);
    if let Some(side) = priority {
        stream = stream.with_priority(side);
    }
    OperationOutput::new(Box::pin(stream), metadata)
}

fn merge_variables(left: &[Variable], right: &[Variable]) -> Vec<Variable> {
    let mut variables = left.to_vec();
    for var in right {
        if !variables.contains(var) {
            variables.push(var.clone());
        }
    }
    variables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregateKind;
    use crate::stream::from_deltas;
    use futures::executor::block_on;
    use futures::StreamExt;
    use tidal_core::{Delta, Error, PatternTerm, Quad, Term};

    fn collect(output: OperationOutput) -> Vec<Delta<Binding>> {
        block_on(output.stream.collect::<Vec<_>>())
            .into_iter()
            .map(|r| r.unwrap())
            .collect()
    }

    fn knows(s: &str, o: &str) -> Quad {
        Quad::triple(Term::iri(s), Term::iri("knows"), Term::iri(o))
    }

    fn pattern(store: &StreamingStore, s: &str, o: &str) -> Operation {
        Operation::Pattern {
            store: store.clone(),
            pattern: TriplePattern::new(
                PatternTerm::var(s),
                PatternTerm::Term(Term::iri("knows")),
                PatternTerm::var(o),
            ),
        }
    }

    fn literal(deltas: Vec<Delta<Binding>>, variables: &[&str]) -> OperationOutput {
        OperationOutput::new(
            from_deltas(deltas.clone()),
            Metadata {
                cardinality: deltas.len(),
                variables: variables.iter().map(|v| Variable::new(*v)).collect(),
            },
        )
    }

    fn x(v: i64) -> Binding {
        Binding::new().with("x", Term::integer(v))
    }

    #[test]
    fn test_pattern_join_over_store() {
        let store = StreamingStore::with_quads([knows("a", "b"), knows("b", "c"), knows("c", "d")]);
        store.end();

        let left = dispatch(pattern(&store, "x", "y")).unwrap();
        let right = dispatch(pattern(&store, "y", "z")).unwrap();
        assert_eq!(left.metadata.cardinality, 3);

        let joined = dispatch(Operation::Join {
            left,
            right,
            algorithm: None,
        })
        .unwrap();
        assert_eq!(joined.metadata.variables.len(), 3);
        assert_eq!(joined.metadata.cardinality, 9);

        let out = collect(joined);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|d| d.is_addition()));
    }

    #[test]
    fn test_every_join_algorithm_agrees() {
        for algorithm in [
            JoinAlgorithm::Counting,
            JoinAlgorithm::Symmetric,
            JoinAlgorithm::NestedLoop,
        ] {
            let mediator = Mediator::new(MediatorConfig::default().with_join_algorithm(algorithm));
            let left = literal(vec![Delta::addition(x(1)), Delta::addition(x(2))], &["x"]);
            let right = literal(
                vec![Delta::addition(x(2).with("y", Term::integer(0)))],
                &["x", "y"],
            );
            let out = collect(
                mediator
                    .dispatch(Operation::Join {
                        left,
                        right,
                        algorithm: None,
                    })
                    .unwrap(),
            );
            assert_eq!(out, vec![Delta::addition(x(2).with("y", Term::integer(0)))]);
        }
    }

    #[test]
    fn test_minus_scenario() {
        let left = literal(vec![Delta::addition(x(1)), Delta::addition(x(2))], &["x"]);
        let right = literal(vec![Delta::addition(x(1))], &["x"]);
        let out = collect(dispatch(Operation::Minus { left, right }).unwrap());
        assert_eq!(out, vec![Delta::addition(x(2))]);
    }

    #[test]
    fn test_minus_then_distinct() {
        let left = literal(
            vec![
                Delta::addition(x(1)),
                Delta::addition(x(2)),
                Delta::addition(x(2)),
            ],
            &["x"],
        );
        let right = literal(vec![Delta::addition(x(1))], &["x"]);
        let minus = dispatch(Operation::Minus { left, right }).unwrap();
        let distinct = dispatch(Operation::Distinct { input: minus }).unwrap();
        assert_eq!(collect(distinct), vec![Delta::addition(x(2))]);
    }

    #[test]
    fn test_optional_pads_only_unmatched() {
        let left = literal(vec![Delta::addition(x(1)), Delta::addition(x(2))], &["x"]);
        let right = literal(
            vec![Delta::addition(x(1).with("y", Term::integer(7)))],
            &["x", "y"],
        );
        let out = collect(
            dispatch(Operation::Optional {
                left,
                right,
                algorithm: None,
            })
            .unwrap(),
        );
        assert!(out.iter().all(|d| d.is_addition()));
        assert_eq!(out.len(), 2);
        assert!(out.contains(&Delta::addition(x(1).with("y", Term::integer(7)))));
        assert!(out.contains(&Delta::addition(x(2))));
    }

    #[test]
    fn test_group_metadata_and_result() {
        let input = literal(vec![Delta::addition(x(3)), Delta::addition(x(4))], &["x"]);
        let grouped = dispatch(Operation::Group {
            input,
            group_by: Vec::new(),
            aggregates: vec![AggregateSpec::over("total", AggregateKind::Sum, "x")],
        })
        .unwrap();
        assert_eq!(grouped.metadata.cardinality, 1);
        assert_eq!(grouped.metadata.variables, vec![Variable::new("total")]);

        let out = collect(grouped);
        let last = out.last().unwrap();
        assert!(last.is_addition());
        assert_eq!(last.data.get("total"), Some(&Term::integer(7)));
    }

    #[test]
    fn test_slice_metadata() {
        let input = literal(vec![Delta::addition(x(1)); 10], &["x"]);
        let sliced = dispatch(Operation::Slice {
            input,
            start: 8,
            length: Some(5),
        })
        .unwrap();
        assert_eq!(sliced.metadata.cardinality, 2);
    }

    #[test]
    fn test_invalid_group_is_rejected() {
        let input = literal(Vec::new(), &["x"]);
        let err = dispatch(Operation::Group {
            input,
            group_by: vec![Variable::new("x")],
            aggregates: vec![AggregateSpec::count_all("x")],
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation { .. }));
    }

    #[test]
    fn test_filter_and_project() {
        let input = literal(
            vec![
                Delta::addition(x(1).with("y", Term::integer(1))),
                Delta::addition(x(5).with("y", Term::integer(2))),
            ],
            &["x", "y"],
        );
        let filtered = dispatch(Operation::Filter {
            input,
            predicate: std::sync::Arc::new(|b: &Binding| {
                Ok(b.get("x").and_then(|t| t.lexical().parse::<i64>().ok()).unwrap_or(0) > 2)
            }),
        })
        .unwrap();
        let projected = dispatch(Operation::Project {
            input: filtered,
            variables: vec![Variable::new("y")],
        })
        .unwrap();
        assert_eq!(projected.metadata.variables, vec![Variable::new("y")]);
        assert_eq!(
            collect(projected),
            vec![Delta::addition(Binding::new().with("y", Term::integer(2)))]
        );
    }
}
