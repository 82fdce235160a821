//! Incremental union.

use crate::stream::{BinaryOperator, Side};
use tidal_core::{Binding, Delta, Result};

/// Bag union: every delta from either input passes through unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Union;

impl BinaryOperator for Union {
    #[inline]
    fn on_delta(&mut self, _side: Side, delta: Delta<Binding>) -> Result<Vec<Delta<Binding>>> {
        Ok(vec![delta])
    }

    fn has_results(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{from_deltas, BinaryStream};
    use futures::executor::block_on;
    use futures::StreamExt;
    use tidal_core::Term;

    #[test]
    fn test_union_keeps_both_sides_and_polarity() {
        let a = Binding::new().with("x", Term::integer(1));
        let b = Binding::new().with("x", Term::integer(2));
        let left = from_deltas(vec![Delta::addition(a.clone()), Delta::retraction(a)]);
        let right = from_deltas(vec![Delta::addition(b)]);
        let out: Vec<_> = block_on(BinaryStream::new(left, right, Union).collect::<Vec<_>>());
        let out: Vec<_> = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(out.len(), 3);
        assert_eq!(out.iter().filter(|d| d.is_retraction()).count(), 1);
    }
}
