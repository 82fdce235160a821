//! Quads and quad patterns.
//!
//! A `QuadPattern` holds a concrete term or a wildcard in each of the four
//! positions. A `TriplePattern` additionally names variables, so matches can
//! be turned into bindings.

use crate::binding::{Binding, Variable};
use crate::term::Term;
use core::fmt;

/// A subject/predicate/object/graph tuple.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Quad {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    pub graph: Term,
}

impl Quad {
    /// Creates a quad in the given graph.
    pub fn new(subject: Term, predicate: Term, object: Term, graph: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph,
        }
    }

    /// Creates a quad in the default graph.
    pub fn triple(subject: Term, predicate: Term, object: Term) -> Self {
        Self::new(subject, predicate, object, Term::DefaultGraph)
    }

    /// Returns the term at a position (0 = subject .. 3 = graph).
    #[inline]
    pub fn position(&self, index: usize) -> &Term {
        match index {
            0 => &self.subject,
            1 => &self.predicate,
            2 => &self.object,
            _ => &self.graph,
        }
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if !self.graph.is_default_graph() {
            write!(f, " {}", self.graph)?;
        }
        f.write_str(" .")
    }
}

/// A pattern with a concrete term or a wildcard (`None`) per position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct QuadPattern {
    pub subject: Option<Term>,
    pub predicate: Option<Term>,
    pub object: Option<Term>,
    pub graph: Option<Term>,
}

impl QuadPattern {
    /// Creates a pattern from its four positions.
    pub fn new(
        subject: Option<Term>,
        predicate: Option<Term>,
        object: Option<Term>,
        graph: Option<Term>,
    ) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph,
        }
    }

    /// The all-wildcard pattern.
    pub fn any() -> Self {
        Self::default()
    }

    /// Returns the bound term at a position (0 = subject .. 3 = graph).
    #[inline]
    pub fn position(&self, index: usize) -> Option<&Term> {
        match index {
            0 => self.subject.as_ref(),
            1 => self.predicate.as_ref(),
            2 => self.object.as_ref(),
            _ => self.graph.as_ref(),
        }
    }

    /// Bit mask of bound positions, bit `i` set when position `i` is concrete.
    pub fn bound_mask(&self) -> u8 {
        (0..4).fold(0u8, |mask, i| {
            if self.position(i).is_some() {
                mask | (1 << i)
            } else {
                mask
            }
        })
    }

    /// Projects a quad onto the positions selected by `mask`.
    ///
    /// Every pattern matching `quad` equals `from_quad_masked(quad, p.bound_mask())`,
    /// so the 16 masks enumerate all pattern buckets a quad can fall in.
    pub fn from_quad_masked(quad: &Quad, mask: u8) -> Self {
        let pick = |i: usize| {
            if mask & (1 << i) != 0 {
                Some(quad.position(i).clone())
            } else {
                None
            }
        };
        Self::new(pick(0), pick(1), pick(2), pick(3))
    }

    /// Returns true if every bound position equals the quad's term.
    pub fn matches(&self, quad: &Quad) -> bool {
        (0..4).all(|i| match self.position(i) {
            Some(term) => term == quad.position(i),
            None => true,
        })
    }
}

impl fmt::Display for QuadPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..4 {
            if i > 0 {
                f.write_str(" ")?;
            }
            match self.position(i) {
                Some(term) => write!(f, "{}", term)?,
                None => f.write_str("*")?,
            }
        }
        Ok(())
    }
}

/// A position in a triple pattern: a variable or a concrete term.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PatternTerm {
    Variable(Variable),
    Term(Term),
}

impl PatternTerm {
    pub fn var(name: impl Into<String>) -> Self {
        PatternTerm::Variable(Variable::new(name))
    }

    fn as_term(&self) -> Option<&Term> {
        match self {
            PatternTerm::Term(term) => Some(term),
            PatternTerm::Variable(_) => None,
        }
    }
}

impl From<Term> for PatternTerm {
    fn from(term: Term) -> Self {
        PatternTerm::Term(term)
    }
}

/// A quad pattern whose positions may be variables.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TriplePattern {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
    pub graph: PatternTerm,
}

impl TriplePattern {
    /// Creates a pattern matching the default graph.
    pub fn new(subject: PatternTerm, predicate: PatternTerm, object: PatternTerm) -> Self {
        Self::in_graph(subject, predicate, object, PatternTerm::Term(Term::DefaultGraph))
    }

    pub fn in_graph(
        subject: PatternTerm,
        predicate: PatternTerm,
        object: PatternTerm,
        graph: PatternTerm,
    ) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph,
        }
    }

    fn positions(&self) -> [&PatternTerm; 4] {
        [&self.subject, &self.predicate, &self.object, &self.graph]
    }

    /// The store-level pattern: variables become wildcards.
    pub fn quad_pattern(&self) -> QuadPattern {
        let [s, p, o, g] = self.positions();
        QuadPattern::new(
            s.as_term().cloned(),
            p.as_term().cloned(),
            o.as_term().cloned(),
            g.as_term().cloned(),
        )
    }

    /// Distinct variables of the pattern in position order.
    pub fn variables(&self) -> Vec<Variable> {
        let mut vars: Vec<Variable> = Vec::new();
        for position in self.positions() {
            if let PatternTerm::Variable(var) = position {
                if !vars.contains(var) {
                    vars.push(var.clone());
                }
            }
        }
        vars
    }

    /// Binds the pattern's variables against a quad.
    ///
    /// Returns `None` when a concrete position differs or a repeated variable
    /// would bind two different terms.
    pub fn bind(&self, quad: &Quad) -> Option<Binding> {
        let mut binding = Binding::new();
        for (i, position) in self.positions().into_iter().enumerate() {
            let term = quad.position(i);
            match position {
                PatternTerm::Term(expected) => {
                    if expected != term {
                        return None;
                    }
                }
                PatternTerm::Variable(var) => match binding.get(var.name()) {
                    Some(existing) if existing != term => return None,
                    Some(_) => {}
                    None => binding.insert(var.clone(), term.clone()),
                },
            }
        }
        Some(binding)
    }
}
