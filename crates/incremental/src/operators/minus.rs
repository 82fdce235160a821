//! Incremental difference.
//!
//! Left items are suppressed while at least one right item matches their
//! key. Right arrivals and departures flip the visibility of every held left
//! item for the keys they affect, synthesizing the flipped-polarity copies.

use super::memory::{keys_compatible, keys_overlap, JoinKey, KeyedMemory};
use crate::stream::{BinaryOperator, Side};
use tidal_core::{Binding, Delta, Error, Polarity, Result, Variable};
use tracing::trace;

/// When a right key counts as a match for a left key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MinusMode {
    /// MINUS: keys must agree and share at least one bound variable, so
    /// inputs without shared variables never suppress anything.
    Difference,
    /// Anti-join: keys must only agree. Used by OPTIONAL, where a left item
    /// with no matching right item is exactly a left item with no join result.
    AntiJoin,
}

pub struct Minus {
    left: KeyedMemory<Vec<Binding>>,
    right: KeyedMemory<usize>,
    mode: MinusMode,
}

impl Minus {
    /// Creates a difference over the given shared variables.
    pub fn new(variables: Vec<Variable>) -> Self {
        Self::with_mode(variables, MinusMode::Difference)
    }

    /// Creates an anti-join over the given shared variables.
    pub fn anti_join(variables: Vec<Variable>) -> Self {
        Self::with_mode(variables, MinusMode::AntiJoin)
    }

    pub fn with_mode(variables: Vec<Variable>, mode: MinusMode) -> Self {
        Self {
            left: KeyedMemory::new(variables.clone()),
            right: KeyedMemory::new(variables),
            mode,
        }
    }

    #[inline]
    pub fn mode(&self) -> MinusMode {
        self.mode
    }

    fn accept(&self) -> fn(&JoinKey, &JoinKey) -> bool {
        match self.mode {
            MinusMode::Difference => keys_overlap,
            MinusMode::AntiJoin => keys_compatible,
        }
    }

    fn suppressed(&self, key: &JoinKey) -> bool {
        !self.right.candidates(key, self.accept()).is_empty()
    }

    /// Left keys affected by a right change at `key`.
    fn affected_left(&self, key: &JoinKey) -> Vec<JoinKey> {
        self.left
            .candidates(key, self.accept())
            .into_iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Emits every held left item under `keys` with `polarity`.
    fn replay(&self, keys: &[JoinKey], polarity: Polarity) -> Vec<Delta<Binding>> {
        keys.iter()
            .filter_map(|k| self.left.get(k))
            .flatten()
            .map(|b| Delta::new(b.clone(), polarity))
            .collect()
    }

    pub fn on_left_insert(&mut self, binding: Binding) -> Vec<Delta<Binding>> {
        let key = self.left.key_of(&binding);
        let visible = !self.suppressed(&key);
        self.left.entry(key).push(binding.clone());
        if visible {
            vec![Delta::addition(binding)]
        } else {
            Vec::new()
        }
    }

    pub fn on_left_delete(&mut self, binding: &Binding) -> Result<Vec<Delta<Binding>>> {
        let key = self.left.key_of(binding);
        let bucket = self
            .left
            .get_mut(&key)
            .ok_or_else(|| Error::unknown_retraction("minus input", binding))?;
        let position = bucket
            .iter()
            .position(|b| b == binding)
            .ok_or_else(|| Error::unknown_retraction("minus input", binding))?;
        let removed = bucket.swap_remove(position);
        self.left.prune(&key);
        if self.suppressed(&key) {
            Ok(Vec::new())
        } else {
            Ok(vec![Delta::retraction(removed)])
        }
    }

    pub fn on_right_insert(&mut self, binding: &Binding) -> Vec<Delta<Binding>> {
        let key = self.right.key_of(binding);
        let newly_hidden: Vec<JoinKey> = self
            .affected_left(&key)
            .into_iter()
            .filter(|k| !self.suppressed(k))
            .collect();
        *self.right.entry(key) += 1;
        self.replay(&newly_hidden, Polarity::Retraction)
    }

    pub fn on_right_delete(&mut self, binding: &Binding) -> Result<Vec<Delta<Binding>>> {
        let key = self.right.key_of(binding);
        let count = self
            .right
            .get_mut(&key)
            .ok_or_else(|| Error::unknown_retraction("minus input", binding))?;
        *count -= 1;
        self.right.prune(&key);
        let readmitted: Vec<JoinKey> = self
            .affected_left(&key)
            .into_iter()
            .filter(|k| !self.suppressed(k))
            .collect();
        Ok(self.replay(&readmitted, Polarity::Addition))
    }

    /// Left items held, visible or not.
    pub fn left_count(&self) -> usize {
        self.left.size()
    }

    /// Right items counted.
    pub fn right_count(&self) -> usize {
        self.right.size()
    }
}

impl BinaryOperator for Minus {
    fn on_delta(&mut self, side: Side, delta: Delta<Binding>) -> Result<Vec<Delta<Binding>>> {
        let polarity = delta.polarity;
        let output = match (side, polarity) {
            (Side::Left, Polarity::Addition) => self.on_left_insert(delta.data),
            (Side::Left, Polarity::Retraction) => self.on_left_delete(&delta.data)?,
            (Side::Right, Polarity::Addition) => self.on_right_insert(&delta.data),
            (Side::Right, Polarity::Retraction) => self.on_right_delete(&delta.data)?,
        };
        trace!(?side, ?polarity, produced = output.len(), "minus");
        Ok(output)
    }

    fn has_results(&self) -> bool {
        !self.left.is_empty() || !self.right.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidal_core::Term;

    fn x(v: i64) -> Binding {
        Binding::new().with("x", Term::integer(v))
    }

    fn minus() -> Minus {
        Minus::new(vec![Variable::new("x")])
    }

    #[test]
    fn test_minus_scenario() {
        let mut op = minus();
        let mut out = op.on_delta(Side::Right, Delta::addition(x(1))).unwrap();
        out.extend(op.on_delta(Side::Left, Delta::addition(x(1))).unwrap());
        out.extend(op.on_delta(Side::Left, Delta::addition(x(2))).unwrap());
        assert_eq!(out, vec![Delta::addition(x(2))]);

        let readmitted = op.on_delta(Side::Right, Delta::retraction(x(1))).unwrap();
        assert_eq!(readmitted, vec![Delta::addition(x(1))]);
    }

    #[test]
    fn test_late_right_retracts_emitted_left() {
        let mut op = minus();
        op.on_delta(Side::Left, Delta::addition(x(1))).unwrap();
        let hidden = op.on_delta(Side::Right, Delta::addition(x(1))).unwrap();
        assert_eq!(hidden, vec![Delta::retraction(x(1))]);
    }

    #[test]
    fn test_right_first_suppresses() {
        let mut op = minus();
        op.on_delta(Side::Right, Delta::addition(x(1))).unwrap();
        assert!(op.on_delta(Side::Left, Delta::addition(x(1))).unwrap().is_empty());
        assert_eq!(op.on_delta(Side::Left, Delta::addition(x(2))).unwrap().len(), 1);
        // Retracting a suppressed item emits nothing.
        assert!(op.on_delta(Side::Left, Delta::retraction(x(1))).unwrap().is_empty());
    }

    #[test]
    fn test_right_multiplicity() {
        let mut op = minus();
        op.on_delta(Side::Left, Delta::addition(x(1))).unwrap();
        assert_eq!(op.on_delta(Side::Right, Delta::addition(x(1))).unwrap().len(), 1);
        // Second right match: already hidden.
        assert!(op.on_delta(Side::Right, Delta::addition(x(1))).unwrap().is_empty());
        // 2 -> 1: still hidden.
        assert!(op.on_delta(Side::Right, Delta::retraction(x(1))).unwrap().is_empty());
        // 1 -> 0: re-admitted.
        assert_eq!(
            op.on_delta(Side::Right, Delta::retraction(x(1))).unwrap(),
            vec![Delta::addition(x(1))]
        );
    }

    #[test]
    fn test_duplicate_left_items_replayed() {
        let mut op = minus();
        op.on_delta(Side::Left, Delta::addition(x(1))).unwrap();
        op.on_delta(Side::Left, Delta::addition(x(1))).unwrap();
        let hidden = op.on_delta(Side::Right, Delta::addition(x(1))).unwrap();
        assert_eq!(hidden.len(), 2);
        assert!(hidden.iter().all(Delta::is_retraction));
    }

    #[test]
    fn test_no_shared_variables_passes_through() {
        let mut op = Minus::new(Vec::new());
        op.on_delta(Side::Right, Delta::addition(Binding::new().with("y", Term::integer(9))))
            .unwrap();
        assert_eq!(op.on_delta(Side::Left, Delta::addition(x(1))).unwrap().len(), 1);
    }

    #[test]
    fn test_anti_join_without_shared_variables_suppresses() {
        let mut op = Minus::anti_join(Vec::new());
        op.on_delta(Side::Left, Delta::addition(x(1))).unwrap();
        let out = op
            .on_delta(Side::Right, Delta::addition(Binding::new().with("y", Term::integer(9))))
            .unwrap();
        assert_eq!(out, vec![Delta::retraction(x(1))]);
    }

    #[test]
    fn test_memory_drains() {
        let mut op = minus();
        op.on_delta(Side::Left, Delta::addition(x(1))).unwrap();
        op.on_delta(Side::Right, Delta::addition(x(1))).unwrap();
        op.on_delta(Side::Left, Delta::retraction(x(1))).unwrap();
        op.on_delta(Side::Right, Delta::retraction(x(1))).unwrap();
        assert!(!op.has_results());
        assert!(op.on_delta(Side::Right, Delta::retraction(x(1))).is_err());
    }
}
