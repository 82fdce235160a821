//! Resident quad set.
//!
//! This module provides `ResidentSet`, the set of quads currently present in a
//! streaming store, with one term index per quad position so that pattern
//! lookups cost proportionally to the most selective bound position.

use hashbrown::{HashMap, HashSet};
use tidal_core::{Quad, QuadPattern, Term};

/// Per-position index: term -> quads holding that term at the position.
type PositionIndex = HashMap<Term, HashSet<Quad>>;

/// A set of quads indexed by subject, predicate, object and graph.
#[derive(Default)]
pub struct ResidentSet {
    quads: HashSet<Quad>,
    positions: [PositionIndex; 4],
}

impl ResidentSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of quads.
    #[inline]
    pub fn len(&self) -> usize {
        self.quads.len()
    }

    /// Returns true if the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    #[inline]
    pub fn contains(&self, quad: &Quad) -> bool {
        self.quads.contains(quad)
    }

    /// Inserts a quad. Returns false if it was already resident.
    pub fn insert(&mut self, quad: Quad) -> bool {
        if self.quads.contains(&quad) {
            return false;
        }
        for (i, index) in self.positions.iter_mut().enumerate() {
            index
                .entry(quad.position(i).clone())
                .or_default()
                .insert(quad.clone());
        }
        self.quads.insert(quad);
        true
    }

    /// Removes a quad. Returns false if it was not resident.
    pub fn remove(&mut self, quad: &Quad) -> bool {
        if !self.quads.remove(quad) {
            return false;
        }
        for (i, index) in self.positions.iter_mut().enumerate() {
            let term = quad.position(i);
            if let Some(bucket) = index.get_mut(term) {
                bucket.remove(quad);
                if bucket.is_empty() {
                    index.remove(term);
                }
            }
        }
        true
    }

    /// The smallest candidate set among the pattern's bound positions.
    ///
    /// `None` means the pattern binds nothing and every quad is a candidate.
    /// `Some(None)` means some bound term has no quads at all.
    fn candidates(&self, pattern: &QuadPattern) -> Option<Option<&HashSet<Quad>>> {
        let mut best: Option<Option<&HashSet<Quad>>> = None;
        for i in 0..4 {
            if let Some(term) = pattern.position(i) {
                let bucket = self.positions[i].get(term);
                let smaller = match (&best, bucket) {
                    (None, _) => true,
                    (Some(None), _) => false,
                    (Some(Some(_)), None) => true,
                    (Some(Some(current)), Some(candidate)) => candidate.len() < current.len(),
                };
                if smaller {
                    best = Some(bucket);
                }
            }
        }
        best
    }

    /// Returns all resident quads matching the pattern.
    pub fn matching(&self, pattern: &QuadPattern) -> Vec<Quad> {
        match self.candidates(pattern) {
            None => self.quads.iter().cloned().collect(),
            Some(None) => Vec::new(),
            Some(Some(bucket)) => bucket
                .iter()
                .filter(|quad| pattern.matches(quad))
                .cloned()
                .collect(),
        }
    }

    /// Counts resident quads matching the pattern.
    pub fn count(&self, pattern: &QuadPattern) -> usize {
        match self.candidates(pattern) {
            None => self.quads.len(),
            Some(None) => 0,
            Some(Some(bucket)) => bucket.iter().filter(|quad| pattern.matches(quad)).count(),
        }
    }

    /// Upper bound on the number of matches without filtering.
    pub fn estimate(&self, pattern: &QuadPattern) -> usize {
        match self.candidates(pattern) {
            None => self.quads.len(),
            Some(None) => 0,
            Some(Some(bucket)) => bucket.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(s: &str, p: &str, o: &str) -> Quad {
        Quad::triple(Term::iri(s), Term::iri(p), Term::iri(o))
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut set = ResidentSet::new();
        assert!(set.insert(quad("s", "p", "o")));
        assert!(!set.insert(quad("s", "p", "o")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut set = ResidentSet::new();
        assert!(!set.remove(&quad("s", "p", "o")));
        set.insert(quad("s", "p", "o"));
        assert!(set.remove(&quad("s", "p", "o")));
        assert!(set.is_empty());
        assert_eq!(set.count(&QuadPattern::new(Some(Term::iri("s")), None, None, None)), 0);
    }

    #[test]
    fn test_matching_uses_bound_positions() {
        let mut set = ResidentSet::new();
        set.insert(quad("s1", "p", "o1"));
        set.insert(quad("s1", "q", "o2"));
        set.insert(quad("s2", "p", "o1"));

        let by_subject = QuadPattern::new(Some(Term::iri("s1")), None, None, None);
        assert_eq!(set.count(&by_subject), 2);

        let by_both = QuadPattern::new(Some(Term::iri("s1")), Some(Term::iri("p")), None, None);
        assert_eq!(set.matching(&by_both), vec![quad("s1", "p", "o1")]);

        let unknown = QuadPattern::new(None, Some(Term::iri("zzz")), None, None);
        assert_eq!(set.count(&unknown), 0);
        assert_eq!(set.count(&QuadPattern::any()), 3);
    }

    #[test]
    fn test_estimate_is_upper_bound() {
        let mut set = ResidentSet::new();
        set.insert(quad("s1", "p", "o1"));
        set.insert(quad("s2", "p", "o2"));
        let pattern = QuadPattern::new(Some(Term::iri("s1")), Some(Term::iri("p")), None, None);
        assert!(set.estimate(&pattern) >= set.count(&pattern));
    }
}
