//! Incremental GROUP BY with aggregates.
//!
//! Each group owns one aggregator per aggregate column. After every input
//! delta the touched group's solution is rebuilt; if it differs from the
//! solution last emitted, the old one is retracted and the new one added.
//! A group whose last member leaves is retracted, except the single group of
//! an ungrouped aggregate, which falls back to its empty values.

use crate::aggregate::{
    AggregateInput, AggregateKind, AggregateResult, AggregateSpec, Aggregator, WildcardCount,
};
use crate::stream::UnaryOperator;
use hashbrown::{HashMap, HashSet};
use tidal_core::{Binding, Delta, Error, Polarity, Result, Term, Variable};
use tracing::{debug, trace};

enum Slot {
    Term(Aggregator),
    Wildcard(WildcardCount),
}

impl Slot {
    fn result(&mut self) -> AggregateResult {
        match self {
            Slot::Term(aggregator) => aggregator.result(),
            Slot::Wildcard(count) => count.result(),
        }
    }
}

struct GroupState {
    slots: Vec<Slot>,
    values: Vec<Option<Term>>,
    members: usize,
    emitted: Option<Binding>,
}

impl GroupState {
    fn new(specs: &[AggregateSpec]) -> Self {
        let slots = specs
            .iter()
            .map(|spec| match spec.input {
                AggregateInput::Wildcard => Slot::Wildcard(WildcardCount::new(spec.distinct)),
                AggregateInput::Expression(_) => {
                    Slot::Term(Aggregator::new(spec.kind.clone(), spec.distinct))
                }
            })
            .collect();
        Self {
            slots,
            values: vec![None; specs.len()],
            members: 0,
            emitted: None,
        }
    }

    /// Folds the latest aggregate results into `values`.
    fn refresh(&mut self) {
        for (slot, value) in self.slots.iter_mut().zip(self.values.iter_mut()) {
            match slot.result() {
                AggregateResult::Unchanged => {}
                AggregateResult::Error => *value = None,
                AggregateResult::Value(v) => *value = v,
            }
        }
    }
}

/// Groups bindings by key variables and maintains aggregates per group.
pub struct Group {
    group_by: Vec<Variable>,
    aggregates: Vec<AggregateSpec>,
    groups: HashMap<Vec<Option<Term>>, GroupState>,
    emitted_any: bool,
}

impl Group {
    /// Creates a group operator.
    ///
    /// Fails if COUNT(*) is requested for another function, or an output
    /// variable collides with a grouping variable or another output.
    pub fn new(group_by: Vec<Variable>, aggregates: Vec<AggregateSpec>) -> Result<Self> {
        let mut outputs = HashSet::new();
        for spec in &aggregates {
            if matches!(spec.input, AggregateInput::Wildcard) && spec.kind != AggregateKind::Count {
                return Err(Error::invalid_operation(format!(
                    "{}(*) is not an aggregate",
                    spec.kind.name()
                )));
            }
            if group_by.contains(&spec.output) || !outputs.insert(spec.output.clone()) {
                return Err(Error::invalid_operation(format!(
                    "aggregate output {} is bound twice",
                    spec.output
                )));
            }
        }
        Ok(Self {
            group_by,
            aggregates,
            groups: HashMap::new(),
            emitted_any: false,
        })
    }

    /// Variables of the emitted solutions.
    pub fn variables(&self) -> Vec<Variable> {
        self.group_by
            .iter()
            .chain(self.aggregates.iter().map(|spec| &spec.output))
            .cloned()
            .collect()
    }

    /// Number of live groups.
    #[inline]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn has_results(&self) -> bool {
        !self.groups.is_empty()
    }

    fn apply(
        specs: &[AggregateSpec],
        state: &mut GroupState,
        binding: &Binding,
        polarity: Polarity,
    ) -> Result<()> {
        for (spec, slot) in specs.iter().zip(state.slots.iter_mut()) {
            match (slot, &spec.input) {
                (Slot::Wildcard(count), _) => match polarity {
                    Polarity::Addition => count.put(binding)?,
                    Polarity::Retraction => count.remove(binding)?,
                },
                (Slot::Term(aggregator), AggregateInput::Expression(expr)) => match expr(binding) {
                    Ok(term) => match polarity {
                        Polarity::Addition => aggregator.put(&term)?,
                        Polarity::Retraction => aggregator.remove(&term)?,
                    },
                    // COUNT(expr) counts only the bindings where expr has a value.
                    Err(err) if err.is_evaluation() && spec.kind == AggregateKind::Count => {
                        trace!(output = %spec.output, "skipping unevaluable count input");
                    }
                    Err(err) if err.is_evaluation() => aggregator.fail(&err),
                    Err(err) => return Err(err),
                },
                (Slot::Term(_), AggregateInput::Wildcard) => {
                    return Err(Error::invalid_operation("wildcard input on a term aggregate"))
                }
            }
        }
        Ok(())
    }

    fn solution(&self, key: &[Option<Term>], values: &[Option<Term>]) -> Binding {
        let mut solution = Binding::new();
        for (var, term) in self.group_by.iter().zip(key) {
            if let Some(term) = term {
                solution.insert(var.clone(), term.clone());
            }
        }
        for (spec, value) in self.aggregates.iter().zip(values) {
            if let Some(value) = value {
                solution.insert(spec.output.clone(), value.clone());
            }
        }
        solution
    }
}

impl UnaryOperator<Binding, Binding> for Group {
    fn on_delta(&mut self, delta: Delta<Binding>) -> Result<Vec<Delta<Binding>>> {
        let key = delta.data.key(&self.group_by);
        let state = match delta.polarity {
            Polarity::Addition => {
                let state = self
                    .groups
                    .entry(key.clone())
                    .or_insert_with(|| GroupState::new(&self.aggregates));
                state.members += 1;
                state
            }
            Polarity::Retraction => {
                let state = self
                    .groups
                    .get_mut(&key)
                    .ok_or_else(|| Error::unknown_retraction("group member", &delta.data))?;
                state.members -= 1;
                state
            }
        };
        Self::apply(&self.aggregates, state, &delta.data, delta.polarity)?;

        let mut output = Vec::new();
        if state.members == 0 {
            let emitted = state.emitted.take();
            if !self.group_by.is_empty() {
                self.groups.remove(&key);
                debug!(groups = self.groups.len(), "group emptied");
                output.extend(emitted.map(Delta::retraction));
                return Ok(output);
            }
            *state = GroupState::new(&self.aggregates);
            state.emitted = emitted;
            debug!("ungrouped aggregate emptied");
        }

        state.refresh();
        let values = state.values.clone();
        let previous = state.emitted.clone();
        let solution = self.solution(&key, &values);
        if previous.as_ref() != Some(&solution) {
            output.extend(previous.map(Delta::retraction));
            output.push(Delta::addition(solution.clone()));
            if let Some(state) = self.groups.get_mut(&key) {
                state.emitted = Some(solution);
            }
            self.emitted_any = true;
        }
        Ok(output)
    }

    /// An ungrouped aggregate over input that never produced a group still
    /// yields one solution of empty values.
    fn on_end(&mut self) -> Result<Vec<Delta<Binding>>> {
        if !self.group_by.is_empty() || self.emitted_any {
            return Ok(Vec::new());
        }
        let mut state = GroupState::new(&self.aggregates);
        state.refresh();
        self.emitted_any = true;
        Ok(vec![Delta::addition(self.solution(&[], &state.values))])
    }
}
