//! Binding streams over the store.
//!
//! A `BindingStream` wraps a quad channel and binds each quad against a
//! `TriplePattern`, keeping the polarity. Quads that satisfy the wildcard
//! pattern but not the variable constraints (repeated variables) are skipped.

use crate::store::QuadStream;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::Stream;
use tidal_core::{Binding, Delta, Result, TriplePattern, Variable};

/// Pattern-matched binding stream opened by `StreamingStore::match_bindings`.
pub struct BindingStream {
    quads: QuadStream,
    pattern: TriplePattern,
    variables: Vec<Variable>,
}

impl BindingStream {
    pub(crate) fn new(quads: QuadStream, pattern: TriplePattern) -> Self {
        let variables = pattern.variables();
        Self {
            quads,
            pattern,
            variables,
        }
    }

    /// Variables bound by every item of this stream.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// See [`QuadStream::close`].
    pub fn close(&self) {
        self.quads.close();
    }

    /// See [`QuadStream::resync_as_delete`].
    pub fn resync_as_delete(&self) {
        self.quads.resync_as_delete();
    }
}

impl Stream for BindingStream {
    type Item = Result<Delta<Binding>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match Pin::new(&mut this.quads).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Some(Err(err))),
                Poll::Ready(Some(Ok(delta))) => {
                    if let Some(binding) = this.pattern.bind(&delta.data) {
                        return Poll::Ready(Some(Ok(Delta::new(binding, delta.polarity))));
                    }
                }
            }
        }
    }
}
