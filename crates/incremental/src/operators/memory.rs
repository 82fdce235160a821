//! Keyed operator memory.
//!
//! Join-family operators index each input by the terms bound to the shared
//! variables. A key with an unbound position can match several complete keys,
//! so such keys are tracked separately and checked on every lookup.

use hashbrown::{HashMap, HashSet};
use tidal_core::{Binding, Term, Variable};

/// Terms bound to the join variables, in variable order.
pub type JoinKey = Vec<Option<Term>>;

/// Variables bound by both inputs, in left order.
pub fn shared_variables(left: &[Variable], right: &[Variable]) -> Vec<Variable> {
    left.iter().filter(|v| right.contains(v)).cloned().collect()
}

/// True when every position is bound.
#[inline]
pub fn is_complete(key: &JoinKey) -> bool {
    key.iter().all(Option::is_some)
}

/// True when no position binds different terms.
pub fn keys_compatible(a: &JoinKey, b: &JoinKey) -> bool {
    a.iter().zip(b).all(|pair| match pair {
        (Some(x), Some(y)) => x == y,
        _ => true,
    })
}

/// True when compatible and at least one position is bound on both sides.
pub fn keys_overlap(a: &JoinKey, b: &JoinKey) -> bool {
    keys_compatible(a, b) && a.iter().zip(b).any(|(x, y)| x.is_some() && y.is_some())
}

/// A per-key bucket.
pub trait Bucket: Default {
    fn is_empty(&self) -> bool;

    /// Number of items held, counting multiplicity.
    fn size(&self) -> usize;
}

impl Bucket for Vec<Binding> {
    fn is_empty(&self) -> bool {
        Vec::is_empty(self)
    }

    fn size(&self) -> usize {
        self.len()
    }
}

impl Bucket for HashMap<Binding, usize> {
    fn is_empty(&self) -> bool {
        HashMap::is_empty(self)
    }

    fn size(&self) -> usize {
        self.values().sum()
    }
}

impl Bucket for usize {
    fn is_empty(&self) -> bool {
        *self == 0
    }

    fn size(&self) -> usize {
        *self
    }
}

/// Buckets keyed by `JoinKey`.
#[derive(Debug)]
pub struct KeyedMemory<B> {
    variables: Vec<Variable>,
    buckets: HashMap<JoinKey, B>,
    partial: HashSet<JoinKey>,
}

impl<B: Bucket> KeyedMemory<B> {
    pub fn new(variables: Vec<Variable>) -> Self {
        Self {
            variables,
            buckets: HashMap::new(),
            partial: HashSet::new(),
        }
    }

    #[inline]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// The key of a binding under this memory's variables.
    #[inline]
    pub fn key_of(&self, binding: &Binding) -> JoinKey {
        binding.key(&self.variables)
    }

    /// Returns the bucket for `key`, creating it if needed.
    pub fn entry(&mut self, key: JoinKey) -> &mut B {
        if !is_complete(&key) {
            self.partial.insert(key.clone());
        }
        self.buckets.entry(key).or_default()
    }

    pub fn get(&self, key: &JoinKey) -> Option<&B> {
        self.buckets.get(key)
    }

    pub fn get_mut(&mut self, key: &JoinKey) -> Option<&mut B> {
        self.buckets.get_mut(key)
    }

    /// Drops the bucket for `key` if it became empty.
    pub fn prune(&mut self, key: &JoinKey) {
        if self.buckets.get(key).map_or(false, Bucket::is_empty) {
            self.buckets.remove(key);
            self.partial.remove(key);
        }
    }

    /// Buckets whose keys satisfy `accept` against `key`.
    ///
    /// A complete lookup key only needs its own bucket plus the partial ones.
    pub fn candidates<'a>(
        &'a self,
        key: &'a JoinKey,
        accept: fn(&JoinKey, &JoinKey) -> bool,
    ) -> Vec<(&'a JoinKey, &'a B)> {
        if is_complete(key) {
            let exact = self
                .buckets
                .get_key_value(key)
                .filter(|(k, _)| accept(k, key));
            let partial = self
                .partial
                .iter()
                .filter(move |k| accept(k, key))
                .filter_map(|k| self.buckets.get_key_value(k));
            exact.into_iter().chain(partial).collect()
        } else {
            self.buckets.iter().filter(|(k, _)| accept(k, key)).collect()
        }
    }

    /// Number of distinct keys.
    #[inline]
    pub fn key_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of items held, counting multiplicity.
    pub fn size(&self) -> usize {
        self.buckets.values().map(Bucket::size).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
