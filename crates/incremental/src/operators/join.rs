//! Incremental inner joins.
//!
//! Every variant keeps one memory per input. An item arriving on one side
//! updates that side's memory, then is joined against every compatible item
//! held for the other side; the results carry the arriving item's polarity.

use super::memory::{keys_compatible, KeyedMemory};
use crate::stream::{BinaryOperator, Side};
use hashbrown::HashMap;
use tidal_core::{Binding, Delta, Error, Polarity, Result, Variable};
use tracing::trace;

/// Merges two bindings that agree on every shared variable.
#[inline]
pub fn join(left: &Binding, right: &Binding) -> Option<Binding> {
    left.merge(right)
}

/// Symmetric hash join with plain per-key binding lists.
///
/// Duplicates are held as repeated entries; a retraction removes one of them.
pub struct SymmetricHashJoin {
    left: KeyedMemory<Vec<Binding>>,
    right: KeyedMemory<Vec<Binding>>,
}

impl SymmetricHashJoin {
    /// Creates a join over the given shared variables.
    pub fn new(variables: Vec<Variable>) -> Self {
        Self {
            left: KeyedMemory::new(variables.clone()),
            right: KeyedMemory::new(variables),
        }
    }

    fn memories(&mut self, side: Side) -> (&mut KeyedMemory<Vec<Binding>>, &KeyedMemory<Vec<Binding>>) {
        match side {
            Side::Left => (&mut self.left, &self.right),
            Side::Right => (&mut self.right, &self.left),
        }
    }

    /// Handles an insertion on `side`, returning the new join results.
    pub fn on_insert(&mut self, side: Side, binding: Binding) -> Vec<Binding> {
        let (own, other) = self.memories(side);
        let key = own.key_of(&binding);
        let output = other
            .candidates(&key, keys_compatible)
            .into_iter()
            .flat_map(|(_, bucket)| bucket.iter())
            .filter_map(|b| join(&binding, b))
            .collect();
        own.entry(key).push(binding);
        output
    }

    /// Handles a deletion on `side`, returning the join results to retract.
    pub fn on_delete(&mut self, side: Side, binding: &Binding) -> Result<Vec<Binding>> {
        let (own, other) = self.memories(side);
        let key = own.key_of(binding);
        let bucket = own
            .get_mut(&key)
            .ok_or_else(|| Error::unknown_retraction("join input", binding))?;
        let position = bucket
            .iter()
            .position(|b| b == binding)
            .ok_or_else(|| Error::unknown_retraction("join input", binding))?;
        bucket.swap_remove(position);
        own.prune(&key);
        Ok(other
            .candidates(&key, keys_compatible)
            .into_iter()
            .flat_map(|(_, bucket)| bucket.iter())
            .filter_map(|b| join(binding, b))
            .collect())
    }

    pub fn left_count(&self) -> usize {
        self.left.size()
    }

    pub fn right_count(&self) -> usize {
        self.right.size()
    }
}

impl BinaryOperator for SymmetricHashJoin {
    fn on_delta(&mut self, side: Side, delta: Delta<Binding>) -> Result<Vec<Delta<Binding>>> {
        let polarity = delta.polarity;
        let joined = match polarity {
            Polarity::Addition => self.on_insert(side, delta.data),
            Polarity::Retraction => self.on_delete(side, &delta.data)?,
        };
        trace!(?side, ?polarity, produced = joined.len(), "symmetric hash join");
        Ok(joined.into_iter().map(|b| Delta::new(b, polarity)).collect())
    }

    fn has_results(&self) -> bool {
        !self.left.is_empty() || !self.right.is_empty()
    }
}

/// Reference-counted hash join.
///
/// Each side is indexed by join key and then by the full binding, holding a
/// multiplicity. A retraction decrements exactly the binding it names, so a
/// remaining duplicate keeps its matches alive. This is the default join.
pub struct CountingHashJoin {
    left: KeyedMemory<HashMap<Binding, usize>>,
    right: KeyedMemory<HashMap<Binding, usize>>,
}

impl CountingHashJoin {
    /// Creates a join over the given shared variables.
    pub fn new(variables: Vec<Variable>) -> Self {
        Self {
            left: KeyedMemory::new(variables.clone()),
            right: KeyedMemory::new(variables),
        }
    }

    #[allow(clippy::type_complexity)]
    fn memories(
        &mut self,
        side: Side,
    ) -> (
        &mut KeyedMemory<HashMap<Binding, usize>>,
        &KeyedMemory<HashMap<Binding, usize>>,
    ) {
        match side {
            Side::Left => (&mut self.left, &self.right),
            Side::Right => (&mut self.right, &self.left),
        }
    }

    fn matches(other: &KeyedMemory<HashMap<Binding, usize>>, binding: &Binding) -> Vec<Binding> {
        let key = other.key_of(binding);
        let mut output = Vec::new();
        for (_, bucket) in other.candidates(&key, keys_compatible) {
            for (candidate, &count) in bucket {
                if let Some(joined) = join(binding, candidate) {
                    output.extend(std::iter::repeat(joined).take(count));
                }
            }
        }
        output
    }

    /// Handles an insertion on `side`, returning the new join results.
    pub fn on_insert(&mut self, side: Side, binding: Binding) -> Vec<Binding> {
        let (own, other) = self.memories(side);
        let output = Self::matches(other, &binding);
        let key = own.key_of(&binding);
        *own.entry(key).entry(binding).or_insert(0) += 1;
        output
    }

    /// Handles a deletion on `side`, returning the join results to retract.
    pub fn on_delete(&mut self, side: Side, binding: &Binding) -> Result<Vec<Binding>> {
        let (own, other) = self.memories(side);
        let key = own.key_of(binding);
        let bucket = own
            .get_mut(&key)
            .ok_or_else(|| Error::unknown_retraction("join input", binding))?;
        let count = bucket
            .get_mut(binding)
            .ok_or_else(|| Error::unknown_retraction("join input", binding))?;
        *count -= 1;
        if *count == 0 {
            bucket.remove(binding);
        }
        own.prune(&key);
        Ok(Self::matches(other, binding))
    }

    /// Items held on the left, counting multiplicity.
    pub fn left_count(&self) -> usize {
        self.left.size()
    }

    /// Items held on the right, counting multiplicity.
    pub fn right_count(&self) -> usize {
        self.right.size()
    }
}

impl BinaryOperator for CountingHashJoin {
    fn on_delta(&mut self, side: Side, delta: Delta<Binding>) -> Result<Vec<Delta<Binding>>> {
        let polarity = delta.polarity;
        let joined = match polarity {
            Polarity::Addition => self.on_insert(side, delta.data),
            Polarity::Retraction => self.on_delete(side, &delta.data)?,
        };
        trace!(?side, ?polarity, produced = joined.len(), "counting hash join");
        Ok(joined.into_iter().map(|b| Delta::new(b, polarity)).collect())
    }

    fn has_results(&self) -> bool {
        !self.left.is_empty() || !self.right.is_empty()
    }
}

/// Nested-loop join: no hashing, a linear scan of the other side.
#[derive(Default)]
pub struct NestedLoopJoin {
    left: Vec<Binding>,
    right: Vec<Binding>,
}

impl NestedLoopJoin {
    pub fn new() -> Self {
        Self::default()
    }

    fn memories(&mut self, side: Side) -> (&mut Vec<Binding>, &Vec<Binding>) {
        match side {
            Side::Left => (&mut self.left, &self.right),
            Side::Right => (&mut self.right, &self.left),
        }
    }

    pub fn on_insert(&mut self, side: Side, binding: Binding) -> Vec<Binding> {
        let (own, other) = self.memories(side);
        let output = other.iter().filter_map(|b| join(&binding, b)).collect();
        own.push(binding);
        output
    }

    pub fn on_delete(&mut self, side: Side, binding: &Binding) -> Result<Vec<Binding>> {
        let (own, other) = self.memories(side);
        let position = own
            .iter()
            .position(|b| b == binding)
            .ok_or_else(|| Error::unknown_retraction("join input", binding))?;
        own.swap_remove(position);
        Ok(other.iter().filter_map(|b| join(binding, b)).collect())
    }

    pub fn left_count(&self) -> usize {
        self.left.len()
    }

    pub fn right_count(&self) -> usize {
        self.right.len()
    }
}

impl BinaryOperator for NestedLoopJoin {
    fn on_delta(&mut self, side: Side, delta: Delta<Binding>) -> Result<Vec<Delta<Binding>>> {
        let polarity = delta.polarity;
        let joined = match polarity {
            Polarity::Addition => self.on_insert(side, delta.data),
            Polarity::Retraction => self.on_delete(side, &delta.data)?,
        };
        Ok(joined.into_iter().map(|b| Delta::new(b, polarity)).collect())
    }

    fn has_results(&self) -> bool {
        !self.left.is_empty() || !self.right.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidal_core::Term;

    fn emp(id: i64, dept: i64) -> Binding {
        Binding::new()
            .with("emp", Term::integer(id))
            .with("dept", Term::integer(dept))
    }

    fn dept(id: i64, name: &str) -> Binding {
        Binding::new()
            .with("dept", Term::integer(id))
            .with("name", Term::string(name))
    }

    fn vars() -> Vec<Variable> {
        vec![Variable::new("dept")]
    }

    fn all_variants() -> Vec<Box<dyn BinaryOperator>> {
        vec![
            Box::new(SymmetricHashJoin::new(vars())),
            Box::new(CountingHashJoin::new(vars())),
            Box::new(NestedLoopJoin::new()),
        ]
    }

    #[test]
    fn test_join_function() {
        let joined = join(&emp(1, 10), &dept(10, "Engineering")).unwrap();
        assert_eq!(joined.len(), 3);
        assert!(join(&emp(1, 10), &dept(20, "Sales")).is_none());
    }

    #[test]
    fn test_join_left_insert() {
        for mut op in all_variants() {
            op.on_delta(Side::Right, Delta::addition(dept(10, "Engineering"))).unwrap();
            let out = op.on_delta(Side::Left, Delta::addition(emp(1, 10))).unwrap();
            assert_eq!(out.len(), 1);
            assert!(out[0].is_addition());
            assert_eq!(out[0].data.get("name"), Some(&Term::string("Engineering")));
        }
    }

    #[test]
    fn test_join_no_match() {
        for mut op in all_variants() {
            op.on_delta(Side::Right, Delta::addition(dept(10, "Engineering"))).unwrap();
            let out = op.on_delta(Side::Left, Delta::addition(emp(1, 20))).unwrap();
            assert!(out.is_empty());
        }
    }

    #[test]
    fn test_join_retraction_polarity() {
        for mut op in all_variants() {
            op.on_delta(Side::Left, Delta::addition(emp(1, 10))).unwrap();
            op.on_delta(Side::Left, Delta::addition(emp(2, 10))).unwrap();
            let added = op.on_delta(Side::Right, Delta::addition(dept(10, "Sales"))).unwrap();
            assert_eq!(added.len(), 2);

            let removed = op.on_delta(Side::Right, Delta::retraction(dept(10, "Sales"))).unwrap();
            assert_eq!(removed.len(), 2);
            assert!(removed.iter().all(Delta::is_retraction));

            op.on_delta(Side::Left, Delta::retraction(emp(1, 10))).unwrap();
            op.on_delta(Side::Left, Delta::retraction(emp(2, 10))).unwrap();
            assert!(!op.has_results());
        }
    }

    #[test]
    fn test_unknown_retraction_is_fatal() {
        for mut op in all_variants() {
            let err = op.on_delta(Side::Left, Delta::retraction(emp(1, 10))).unwrap_err();
            assert!(matches!(err, Error::UnknownRetraction { .. }));
        }
    }

    #[test]
    fn test_counting_join_duplicates() {
        let mut join = CountingHashJoin::new(vars());
        join.on_insert(Side::Left, emp(1, 10));
        join.on_insert(Side::Left, emp(1, 10));
        assert_eq!(join.left_count(), 2);

        // Each duplicate contributes one result.
        assert_eq!(join.on_insert(Side::Right, dept(10, "Ops")).len(), 2);

        // Retracting one duplicate leaves the other's match in place.
        assert_eq!(join.on_delete(Side::Left, &emp(1, 10)).unwrap().len(), 1);
        assert_eq!(join.on_insert(Side::Right, dept(10, "Ops")).len(), 1);
        assert_eq!(join.right_count(), 2);
    }

    #[test]
    fn test_partial_key_matches_every_compatible_bucket() {
        let mut join = CountingHashJoin::new(vars());
        join.on_insert(Side::Right, dept(10, "Ops"));
        join.on_insert(Side::Right, dept(20, "Sales"));
        // A left binding that leaves ?dept unbound joins with both.
        let unbound = Binding::new().with("emp", Term::integer(7));
        assert_eq!(join.on_insert(Side::Left, unbound.clone()).len(), 2);
        // And later right arrivals see it too.
        assert_eq!(join.on_insert(Side::Right, dept(30, "Legal")).len(), 1);
    }

    #[test]
    fn test_cross_product_without_shared_variables() {
        let mut join = CountingHashJoin::new(Vec::new());
        join.on_insert(Side::Left, Binding::new().with("a", Term::integer(1)));
        join.on_insert(Side::Left, Binding::new().with("a", Term::integer(2)));
        let out = join.on_insert(Side::Right, Binding::new().with("b", Term::integer(3)));
        assert_eq!(out.len(), 2);
    }
}
