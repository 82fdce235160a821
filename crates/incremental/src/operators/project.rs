//! Incremental projection.

use crate::stream::UnaryOperator;
use tidal_core::{Binding, Delta, Result, Variable};

/// Restricts every binding to a variable list.
///
/// Multiplicity is kept: two bindings that project to the same solution both
/// flow. Order metadata travels with the projected binding.
#[derive(Clone, Debug)]
pub struct Project {
    variables: Vec<Variable>,
}

impl Project {
    pub fn new(variables: Vec<Variable>) -> Self {
        Self { variables }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }
}

impl UnaryOperator<Binding, Binding> for Project {
    fn on_delta(&mut self, delta: Delta<Binding>) -> Result<Vec<Delta<Binding>>> {
        Ok(vec![delta.map(|b| b.project(&self.variables))])
    }
}
