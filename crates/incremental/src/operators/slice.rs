//! Ordered SLICE (OFFSET / LIMIT after ORDER BY).
//!
//! The operator materializes every live binding in sort order, positioned by
//! the `order.index` assigned upstream, and keeps the window
//! `[start, start + length)` over that view. Each insertion or removal shifts
//! at most one element across each window boundary, so a delta produces at
//! most two output deltas.

use crate::stream::UnaryOperator;
use tidal_core::{Binding, Delta, Error, Polarity, Result};
use tracing::trace;

#[derive(Debug)]
pub struct Slice {
    start: usize,
    length: Option<usize>,
    view: Vec<Binding>,
}

impl Slice {
    /// Creates a window skipping `start` elements and showing at most
    /// `length` (unbounded when `None`).
    pub fn new(start: usize, length: Option<usize>) -> Self {
        Self {
            start,
            length,
            view: Vec::new(),
        }
    }

    /// Exclusive end of the window.
    #[inline]
    fn end(&self) -> usize {
        match self.length {
            Some(length) => self.start.saturating_add(length),
            None => usize::MAX,
        }
    }

    /// Number of elements currently inside the window.
    pub fn visible(&self) -> usize {
        self.view.len().min(self.end()).saturating_sub(self.start)
    }

    /// The elements currently inside the window.
    pub fn window(&self) -> &[Binding] {
        let from = self.start.min(self.view.len());
        let to = self.end().min(self.view.len());
        &self.view[from..to]
    }

    /// Total elements materialized.
    #[inline]
    pub fn len(&self) -> usize {
        self.view.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    pub fn has_results(&self) -> bool {
        !self.view.is_empty()
    }

    pub fn on_insert(&mut self, index: usize, binding: Binding) -> Vec<Delta<Binding>> {
        let index = index.min(self.view.len());
        self.view.insert(index, binding);
        let (start, end) = (self.start, self.end());
        let mut output = Vec::new();
        if start >= end || index >= end {
            return output;
        }
        // The element at `start` is new to the window: either the inserted
        // one, or the one pushed across the lower boundary.
        let entering = index.max(start);
        if let Some(b) = self.view.get(entering) {
            output.push(Delta::addition(b.clone()));
        }
        // The element pushed past the upper boundary leaves.
        if let Some(b) = self.view.get(end) {
            output.push(Delta::retraction(b.clone()));
        }
        output
    }

    pub fn on_delete(&mut self, index: usize, binding: &Binding) -> Result<Vec<Delta<Binding>>> {
        let index = match self.view.get(index) {
            Some(b) if b == binding => index,
            _ => self
                .view
                .iter()
                .position(|b| b == binding)
                .ok_or_else(|| Error::unknown_retraction("slice input", binding))?,
        };
        let (start, end) = (self.start, self.end());
        let mut output = Vec::new();
        if start < end && index < end {
            // The element leaving the window: the removed one, or the one
            // pulled across the lower boundary.
            let leaving = index.max(start);
            if let Some(b) = self.view.get(leaving) {
                output.push(Delta::retraction(b.clone()));
            }
            // The element pulled across the upper boundary enters.
            if let Some(b) = self.view.get(end) {
                output.push(Delta::addition(b.clone()));
            }
        }
        self.view.remove(index);
        Ok(output)
    }
}

impl UnaryOperator<Binding, Binding> for Slice {
    fn on_delta(&mut self, delta: Delta<Binding>) -> Result<Vec<Delta<Binding>>> {
        let order = delta
            .data
            .order()
            .ok_or_else(|| Error::missing_order(&delta.data))?;
        let output = match delta.polarity {
            Polarity::Addition => self.on_insert(order.index, delta.data),
            Polarity::Retraction => self.on_delete(order.index, &delta.data)?,
        };
        trace!(index = order.index, produced = output.len(), visible = self.visible(), "slice");
        Ok(output)
    }
}
