//! String-keyed accumulators: GROUP_CONCAT and SAMPLE.

use super::Accumulator;
use hashbrown::HashMap;
use std::collections::BTreeMap;
use tidal_core::{Error, Result, Term};

/// Concatenation of lexical forms, rebuilt at `value()` time.
///
/// Values are keyed by lexical form and language tag. Each is repeated by
/// its multiplicity, ordered by lexical form, then tag. The result carries a
/// language tag only while every contributing term has that same tag; any
/// disagreement yields a plain string.
#[derive(Debug)]
pub(crate) struct GroupConcat {
    separator: String,
    values: BTreeMap<(String, Option<String>), usize>,
    languages: HashMap<Option<String>, usize>,
}

impl GroupConcat {
    pub(crate) fn new(separator: String) -> Self {
        Self {
            separator,
            values: BTreeMap::new(),
            languages: HashMap::new(),
        }
    }

    fn language_of(term: &Term) -> Option<String> {
        term.as_literal()
            .and_then(|lit| lit.language())
            .map(str::to_string)
    }

    fn key(term: &Term) -> (String, Option<String>) {
        (term.lexical().to_string(), Self::language_of(term))
    }
}

impl Accumulator for GroupConcat {
    fn put(&mut self, term: &Term) -> Result<()> {
        *self.values.entry(Self::key(term)).or_insert(0) += 1;
        *self.languages.entry(Self::language_of(term)).or_insert(0) += 1;
        Ok(())
    }

    fn remove(&mut self, term: &Term) -> Result<()> {
        if self.values.is_empty() {
            return Err(Error::empty_aggregate_removal("GROUP_CONCAT", term));
        }
        let key = Self::key(term);
        let count = self
            .values
            .get_mut(&key)
            .ok_or_else(|| Error::unknown_retraction("aggregate term", term))?;
        *count -= 1;
        if *count == 0 {
            self.values.remove(&key);
        }
        let (_, language) = key;
        if let Some(count) = self.languages.get_mut(&language) {
            *count -= 1;
            if *count == 0 {
                self.languages.remove(&language);
            }
        }
        Ok(())
    }

    fn value(&self) -> Result<Option<Term>> {
        let joined = self
            .values
            .iter()
            .flat_map(|((lexical, _), &count)| std::iter::repeat(lexical.as_str()).take(count))
            .collect::<Vec<_>>()
            .join(&self.separator);
        let mut languages = self.languages.keys();
        let term = match (languages.next(), languages.next()) {
            (Some(Some(language)), None) => Term::lang(joined, language.as_str()),
            _ => Term::string(joined),
        };
        Ok(Some(term))
    }

    fn empty_value(&self) -> Option<Term> {
        Some(Term::string(""))
    }
}

/// An arbitrary resident term. The chosen sample stays put until it leaves.
#[derive(Debug, Default)]
pub(crate) struct Sample {
    values: HashMap<Term, usize>,
    current: Option<Term>,
}

impl Accumulator for Sample {
    fn put(&mut self, term: &Term) -> Result<()> {
        *self.values.entry(term.clone()).or_insert(0) += 1;
        if self.current.is_none() {
            self.current = Some(term.clone());
        }
        Ok(())
    }

    fn remove(&mut self, term: &Term) -> Result<()> {
        if self.values.is_empty() {
            return Err(Error::empty_aggregate_removal("SAMPLE", term));
        }
        let count = self
            .values
            .get_mut(term)
            .ok_or_else(|| Error::unknown_retraction("aggregate term", term))?;
        *count -= 1;
        if *count == 0 {
            self.values.remove(term);
            if self.current.as_ref() == Some(term) {
                self.current = self.values.keys().next().cloned();
            }
        }
        Ok(())
    }

    fn value(&self) -> Result<Option<Term>> {
        Ok(self.current.clone())
    }

    fn empty_value(&self) -> Option<Term> {
        None
    }
}
