//! Left outer join as the union of an inner join and an anti-join.

use super::join::CountingHashJoin;
use super::minus::Minus;
use crate::stream::{BinaryOperator, Side};
use tidal_core::{Binding, Delta, Result, Variable};

/// OPTIONAL(A, B) = JOIN(A, B) ∪ MINUS(A, B).
///
/// Each input delta is fed to both halves. Outputs are ordered so that on an
/// addition the half that hides something goes first, and on a retraction the
/// half that withdraws something goes first.
pub struct Optional {
    join: Box<dyn BinaryOperator>,
    minus: Minus,
}

impl Optional {
    /// Creates an optional over the given shared variables using the
    /// reference-counted hash join.
    pub fn new(variables: Vec<Variable>) -> Self {
        Self::with_join(Box::new(CountingHashJoin::new(variables.clone())), variables)
    }

    /// Creates an optional around a caller-chosen inner join.
    pub fn with_join(join: Box<dyn BinaryOperator>, variables: Vec<Variable>) -> Self {
        Self {
            join,
            minus: Minus::anti_join(variables),
        }
    }
}

impl BinaryOperator for Optional {
    fn on_delta(&mut self, side: Side, delta: Delta<Binding>) -> Result<Vec<Delta<Binding>>> {
        let mut output;
        if delta.is_addition() {
            output = self.minus.on_delta(side, delta.clone())?;
            output.extend(self.join.on_delta(side, delta)?);
        } else {
            output = self.join.on_delta(side, delta.clone())?;
            output.extend(self.minus.on_delta(side, delta)?);
        }
        Ok(output)
    }

    fn has_results(&self) -> bool {
        self.join.has_results() || self.minus.has_results()
    }
}
