//! Solution bindings.
//!
//! A `Binding` maps variables to terms. Identity (equality and hashing) is the
//! variable→term content only: the order metadata attached by an upstream
//! ORDER BY travels with the binding but never takes part in joins or hashing.

use crate::term::Term;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{Hash, Hasher};
use std::collections::BTreeMap;

/// A query variable, displayed as `?name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(String);

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Variable(name.into())
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Variable {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// Position metadata assigned by ORDER BY.
///
/// `index` is the position in the upstream sorted view at which an addition
/// was inserted, or from which a retraction was removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OrderMeta {
    pub hash: u64,
    pub index: usize,
}

/// A partial assignment of variables to terms.
#[derive(Clone, Debug, Default)]
pub struct Binding {
    entries: BTreeMap<Variable, Term>,
    order: Option<OrderMeta>,
}

impl Binding {
    /// Creates an empty binding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, var: impl Into<String>, term: Term) -> Self {
        self.entries.insert(Variable::new(var), term);
        self
    }

    /// Binds a variable, replacing any previous term.
    pub fn insert(&mut self, var: Variable, term: Term) {
        self.entries.insert(var, term);
    }

    /// Returns the term bound to a variable name.
    #[inline]
    pub fn get(&self, var: &str) -> Option<&Term> {
        self.entries.get(var)
    }

    #[inline]
    pub fn contains(&self, var: &str) -> bool {
        self.entries.contains_key(var)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates bound variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.entries.iter()
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.entries.keys()
    }

    #[inline]
    pub fn order(&self) -> Option<OrderMeta> {
        self.order
    }

    pub fn set_order(&mut self, order: Option<OrderMeta>) {
        self.order = order;
    }

    pub fn with_order(mut self, order: OrderMeta) -> Self {
        self.order = Some(order);
        self
    }

    /// Returns a copy restricted to the given variables. Order metadata is kept.
    pub fn project(&self, vars: &[Variable]) -> Binding {
        let entries = self
            .entries
            .iter()
            .filter(|(var, _)| vars.contains(*var))
            .map(|(var, term)| (var.clone(), term.clone()))
            .collect();
        Binding {
            entries,
            order: self.order,
        }
    }

    /// Merges two bindings if they agree on every shared variable.
    ///
    /// The result carries no order metadata.
    pub fn merge(&self, other: &Binding) -> Option<Binding> {
        let mut entries = self.entries.clone();
        for (var, term) in &other.entries {
            match entries.get(var) {
                Some(existing) if existing != term => return None,
                Some(_) => {}
                None => {
                    entries.insert(var.clone(), term.clone());
                }
            }
        }
        Some(Binding { entries, order: None })
    }

    /// Returns true if both bindings agree on all shared variables.
    pub fn is_compatible(&self, other: &Binding) -> bool {
        self.entries
            .iter()
            .all(|(var, term)| other.entries.get(var).map_or(true, |t| t == term))
    }

    /// The terms bound to `vars`, in order; unbound variables yield `None`.
    pub fn key(&self, vars: &[Variable]) -> Vec<Option<Term>> {
        vars.iter().map(|var| self.entries.get(var).cloned()).collect()
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Binding {}

impl Hash for Binding {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entries.hash(state);
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (var, term)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", var, term)?;
        }
        f.write_str("}")
    }
}

impl<V: Into<String>> FromIterator<(V, Term)> for Binding {
    fn from_iter<I: IntoIterator<Item = (V, Term)>>(iter: I) -> Self {
        Binding {
            entries: iter
                .into_iter()
                .map(|(var, term)| (Variable::new(var), term))
                .collect(),
            order: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(b: &Binding) -> u64 {
        let mut h = DefaultHasher::new();
        b.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_identity_ignores_order() {
        let a = Binding::new().with("x", Term::integer(1));
        let b = a.clone().with_order(OrderMeta { hash: 7, index: 3 });
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_merge_compatible() {
        let l = Binding::new().with("x", Term::integer(1)).with("y", Term::integer(2));
        let r = Binding::new().with("x", Term::integer(1)).with("z", Term::integer(3));
        let merged = l.merge(&r).unwrap();
        assert_eq!(merged.len(), 3);
        assert!(l.is_compatible(&r));
    }

    #[test]
    fn test_merge_conflict() {
        let l = Binding::new().with("x", Term::integer(1));
        let r = Binding::new().with("x", Term::integer(2));
        assert!(l.merge(&r).is_none());
        assert!(!l.is_compatible(&r));
    }

    #[test]
    fn test_project_and_key() {
        let b = Binding::new().with("x", Term::integer(1)).with("y", Term::integer(2));
        let vars = vec![Variable::new("x"), Variable::new("w")];
        assert_eq!(b.project(&vars).len(), 1);
        assert_eq!(b.key(&vars), vec![Some(Term::integer(1)), None]);
    }

    #[test]
    fn test_display() {
        let b = Binding::new().with("x", Term::integer(1));
        assert!(b.to_string().starts_with("{?x: "));
    }
}
