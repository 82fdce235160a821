//! Incremental filter operator.

use crate::stream::UnaryOperator;
use std::sync::Arc;
use tidal_core::{Binding, Delta, Result};
use tracing::warn;

/// A pluggable boolean expression over one binding.
pub type Predicate = Arc<dyn Fn(&Binding) -> Result<bool> + Send + Sync>;

/// Passes through deltas whose binding satisfies the predicate.
///
/// Polarity is preserved. A binding whose evaluation fails with an
/// evaluation error is dropped with a warning; any other error is fatal.
pub struct Filter {
    predicate: Predicate,
    dropped: usize,
}

impl Filter {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            dropped: 0,
        }
    }

    /// Builds a filter from a closure.
    pub fn from_fn<F>(predicate: F) -> Self
    where
        F: Fn(&Binding) -> Result<bool> + Send + Sync + 'static,
    {
        Self::new(Arc::new(predicate))
    }

    /// Number of items dropped because evaluation failed.
    #[inline]
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl UnaryOperator<Binding, Binding> for Filter {
    fn on_delta(&mut self, delta: Delta<Binding>) -> Result<Vec<Delta<Binding>>> {
        match (self.predicate)(&delta.data) {
            Ok(true) => Ok(vec![delta]),
            Ok(false) => Ok(Vec::new()),
            Err(err) if err.is_evaluation() => {
                warn!(binding = %delta.data, error = %err, "filter evaluation failed, dropping binding");
                self.dropped += 1;
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}
