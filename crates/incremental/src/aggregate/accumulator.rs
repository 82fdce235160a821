//! Numeric and ordered accumulators: COUNT, SUM, AVG, MIN, MAX.

use super::Accumulator;
use hashbrown::HashMap;
use std::collections::BTreeMap;
use tidal_core::{Error, Numeric, OrderedTerm, Result, Term};

/// Multiset of the terms currently folded into an accumulator.
#[derive(Debug, Default)]
struct Resident {
    terms: HashMap<Term, usize>,
    len: usize,
}

impl Resident {
    fn insert(&mut self, term: &Term) {
        *self.terms.entry(term.clone()).or_insert(0) += 1;
        self.len += 1;
    }

    /// Removes one occurrence of `term`, failing if none is resident.
    fn remove(&mut self, aggregate: &'static str, term: &Term) -> Result<()> {
        if self.len == 0 {
            return Err(Error::empty_aggregate_removal(aggregate, term));
        }
        let count = self
            .terms
            .get_mut(term)
            .ok_or_else(|| Error::unknown_retraction("aggregate term", term))?;
        *count -= 1;
        if *count == 0 {
            self.terms.remove(term);
        }
        self.len -= 1;
        Ok(())
    }

    #[inline]
    fn len(&self) -> i64 {
        self.len as i64
    }
}

#[derive(Debug, Default)]
pub(crate) struct Count {
    resident: Resident,
}

impl Accumulator for Count {
    fn put(&mut self, term: &Term) -> Result<()> {
        self.resident.insert(term);
        Ok(())
    }

    fn remove(&mut self, term: &Term) -> Result<()> {
        self.resident.remove("COUNT", term)
    }

    fn value(&self) -> Result<Option<Term>> {
        Ok(Some(Term::integer(self.resident.len())))
    }

    fn empty_value(&self) -> Option<Term> {
        Some(Term::integer(0))
    }
}

/// Running sum over the resident numeric terms.
#[derive(Debug)]
struct Total {
    sum: Numeric,
    resident: Resident,
}

impl Default for Total {
    fn default() -> Self {
        Self {
            sum: Numeric::Integer(0),
            resident: Resident::default(),
        }
    }
}

impl Total {
    fn put(&mut self, term: &Term) -> Result<()> {
        let value = Numeric::from_term(term)?;
        self.sum = self.sum.add(&value)?;
        self.resident.insert(term);
        Ok(())
    }

    fn remove(&mut self, aggregate: &'static str, term: &Term) -> Result<()> {
        let value = Numeric::from_term(term)?;
        self.resident.remove(aggregate, term)?;
        self.sum = self.sum.sub(&value)?;
        if self.resident.len() == 0 {
            self.sum = Numeric::Integer(0);
        }
        Ok(())
    }

    #[inline]
    fn count(&self) -> i64 {
        self.resident.len()
    }
}

#[derive(Debug, Default)]
pub(crate) struct Sum {
    total: Total,
}

impl Accumulator for Sum {
    fn put(&mut self, term: &Term) -> Result<()> {
        self.total.put(term)
    }

    fn remove(&mut self, term: &Term) -> Result<()> {
        self.total.remove("SUM", term)
    }

    fn value(&self) -> Result<Option<Term>> {
        Ok(Some(self.total.sum.to_term()))
    }

    fn empty_value(&self) -> Option<Term> {
        Some(Term::integer(0))
    }
}

/// Average, divided lazily at `value()` time.
#[derive(Debug, Default)]
pub(crate) struct Avg {
    total: Total,
}

impl Accumulator for Avg {
    fn put(&mut self, term: &Term) -> Result<()> {
        self.total.put(term)
    }

    fn remove(&mut self, term: &Term) -> Result<()> {
        self.total.remove("AVG", term)
    }

    fn value(&self) -> Result<Option<Term>> {
        if self.total.count() == 0 {
            return Ok(self.empty_value());
        }
        let avg = self.total.sum.div(&Numeric::Integer(self.total.count()))?;
        Ok(Some(avg.to_term()))
    }

    fn empty_value(&self) -> Option<Term> {
        Some(Term::integer(0))
    }
}

/// MIN or MAX over an ordered multiset of terms.
#[derive(Debug)]
pub(crate) struct Extremum {
    values: BTreeMap<OrderedTerm, usize>,
    max: bool,
}

impl Extremum {
    pub(crate) fn min() -> Self {
        Self {
            values: BTreeMap::new(),
            max: false,
        }
    }

    pub(crate) fn max() -> Self {
        Self {
            values: BTreeMap::new(),
            max: true,
        }
    }

    fn name(&self) -> &'static str {
        if self.max {
            "MAX"
        } else {
            "MIN"
        }
    }
}

impl Accumulator for Extremum {
    fn put(&mut self, term: &Term) -> Result<()> {
        *self.values.entry(OrderedTerm(term.clone())).or_insert(0) += 1;
        Ok(())
    }

    fn remove(&mut self, term: &Term) -> Result<()> {
        if self.values.is_empty() {
            return Err(Error::empty_aggregate_removal(self.name(), term));
        }
        let key = OrderedTerm(term.clone());
        let count = self
            .values
            .get_mut(&key)
            .ok_or_else(|| Error::unknown_retraction("aggregate term", term))?;
        *count -= 1;
        if *count == 0 {
            self.values.remove(&key);
        }
        Ok(())
    }

    fn value(&self) -> Result<Option<Term>> {
        let extremum = if self.max {
            self.values.keys().next_back()
        } else {
            self.values.keys().next()
        };
        Ok(extremum.map(|t| t.0.clone()))
    }

    fn empty_value(&self) -> Option<Term> {
        None
    }
}
