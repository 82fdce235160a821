//! Reference-counted DISTINCT and REDUCED.

use crate::stream::UnaryOperator;
use hashbrown::HashMap;
use tidal_core::{Binding, Delta, Error, Polarity, Result};
use tracing::trace;

/// Emits a binding on its first appearance and retracts it on its last
/// disappearance; every other delta is absorbed.
#[derive(Debug, Default)]
pub struct Distinct {
    counts: HashMap<Binding, usize>,
}

/// REDUCED is served by the exact same refcount gate.
pub type Reduced = Distinct;

impl Distinct {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one delta, returning true on a 0→1 or 1→0 transition.
    pub fn apply(&mut self, binding: &Binding, polarity: Polarity) -> Result<bool> {
        match polarity {
            Polarity::Addition => {
                let count = self.counts.entry(binding.clone()).or_insert(0);
                *count += 1;
                Ok(*count == 1)
            }
            Polarity::Retraction => {
                let count = self
                    .counts
                    .get_mut(binding)
                    .ok_or_else(|| Error::unknown_retraction("distinct input", binding))?;
                *count -= 1;
                if *count == 0 {
                    self.counts.remove(binding);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }

    /// Current multiplicity of a binding.
    pub fn count(&self, binding: &Binding) -> usize {
        self.counts.get(binding).copied().unwrap_or(0)
    }

    /// Number of distinct bindings currently present.
    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// True while any binding is held.
    #[inline]
    pub fn has_results(&self) -> bool {
        !self.counts.is_empty()
    }
}

impl UnaryOperator<Binding, Binding> for Distinct {
    fn on_delta(&mut self, delta: Delta<Binding>) -> Result<Vec<Delta<Binding>>> {
        if self.apply(&delta.data, delta.polarity)? {
            trace!(binding = %delta.data, polarity = ?delta.polarity, "distinct transition");
            Ok(vec![delta])
        } else {
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidal_core::Term;

    fn b(v: i64) -> Binding {
        Binding::new().with("x", Term::integer(v))
    }

    #[test]
    fn test_first_and_last_only() {
        let mut distinct = Distinct::new();
        assert_eq!(distinct.on_delta(Delta::addition(b(1))).unwrap().len(), 1);
        assert!(distinct.on_delta(Delta::addition(b(1))).unwrap().is_empty());
        assert_eq!(distinct.count(&b(1)), 2);

        assert!(distinct.on_delta(Delta::retraction(b(1))).unwrap().is_empty());
        let last = distinct.on_delta(Delta::retraction(b(1))).unwrap();
        assert_eq!(last, vec![Delta::retraction(b(1))]);
        assert!(!distinct.has_results());
    }

    #[test]
    fn test_distinct_values_independent() {
        let mut distinct = Reduced::new();
        distinct.on_delta(Delta::addition(b(1))).unwrap();
        assert_eq!(distinct.on_delta(Delta::addition(b(2))).unwrap().len(), 1);
        assert_eq!(distinct.len(), 2);
    }

    #[test]
    fn test_unknown_retraction() {
        let mut distinct = Distinct::new();
        let err = distinct.on_delta(Delta::retraction(b(1))).unwrap_err();
        assert!(matches!(err, Error::UnknownRetraction { .. }));
    }
}
