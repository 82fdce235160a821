//! COUNT(*) over whole bindings.

use super::{AggregateResult, ResultTracker};
use hashbrown::HashMap;
use tidal_core::{Binding, Error, Result, Term, Variable};

/// Counts bindings, optionally de-duplicated.
///
/// DISTINCT bindings are tracked per shape, the sorted list of variables a
/// binding binds, and then by content within that shape.
#[derive(Debug, Default)]
pub struct WildcardCount {
    count: i64,
    shapes: Option<HashMap<Vec<Variable>, HashMap<Binding, usize>>>,
    tracker: ResultTracker,
}

impl WildcardCount {
    pub fn new(distinct: bool) -> Self {
        Self {
            shapes: distinct.then(HashMap::new),
            ..Self::default()
        }
    }

    fn shape(binding: &Binding) -> Vec<Variable> {
        binding.variables().cloned().collect()
    }

    pub fn put(&mut self, binding: &Binding) -> Result<()> {
        if let Some(shapes) = self.shapes.as_mut() {
            let count = shapes
                .entry(Self::shape(binding))
                .or_default()
                .entry(binding.clone())
                .or_insert(0);
            *count += 1;
            if *count > 1 {
                return Ok(());
            }
        }
        self.count += 1;
        Ok(())
    }

    pub fn remove(&mut self, binding: &Binding) -> Result<()> {
        if self.count == 0 {
            return Err(Error::empty_aggregate_removal("COUNT(*)", binding));
        }
        if let Some(shapes) = self.shapes.as_mut() {
            let shape = Self::shape(binding);
            let bindings = shapes
                .get_mut(&shape)
                .ok_or_else(|| Error::unknown_retraction("counted binding", binding))?;
            let count = bindings
                .get_mut(binding)
                .ok_or_else(|| Error::unknown_retraction("counted binding", binding))?;
            *count -= 1;
            if *count > 0 {
                return Ok(());
            }
            bindings.remove(binding);
            if bindings.is_empty() {
                shapes.remove(&shape);
            }
        }
        self.count -= 1;
        Ok(())
    }

    pub fn result(&mut self) -> AggregateResult {
        self.tracker.report(Some(Term::integer(self.count)))
    }
}
