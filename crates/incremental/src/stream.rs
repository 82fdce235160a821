//! Delta stream plumbing.
//!
//! Operators are synchronous state machines: one input delta in, zero or more
//! output deltas out. `UnaryStream` and `BinaryStream` drive them from boxed
//! input streams, buffering outputs so each poll yields one delta.

use core::pin::Pin;
use core::task::{Context, Poll};
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use tidal_core::{Binding, Delta, Result};
use tidal_storage::BindingStream;
use tracing::trace;

/// A boxed, sendable stream of polarity-tagged items.
pub type BoxedDeltaStream<T> = Pin<Box<dyn Stream<Item = Result<Delta<T>>> + Send>>;

/// A boxed stream of binding deltas, the currency between operators.
pub type BindingDeltaStream = BoxedDeltaStream<Binding>;

/// A single-input operator.
pub trait UnaryOperator<I, O>: Send {
    /// Consumes one input delta and returns the output deltas it causes.
    fn on_delta(&mut self, delta: Delta<I>) -> Result<Vec<Delta<O>>>;

    /// Called once when the input ends.
    fn on_end(&mut self) -> Result<Vec<Delta<O>>> {
        Ok(Vec::new())
    }
}

/// Which input of a binary operator an item arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    #[inline]
    pub fn other(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// A two-input binding operator.
pub trait BinaryOperator: Send {
    /// Consumes one delta from `side` and returns the output deltas it causes.
    fn on_delta(&mut self, side: Side, delta: Delta<Binding>) -> Result<Vec<Delta<Binding>>>;

    /// True while the operator holds memory for either input.
    fn has_results(&self) -> bool;
}

impl<T: BinaryOperator + ?Sized> BinaryOperator for Box<T> {
    fn on_delta(&mut self, side: Side, delta: Delta<Binding>) -> Result<Vec<Delta<Binding>>> {
        (**self).on_delta(side, delta)
    }

    fn has_results(&self) -> bool {
        (**self).has_results()
    }
}

/// Boxes a store binding stream.
pub fn from_store(stream: BindingStream) -> BindingDeltaStream {
    Box::pin(stream)
}

/// A finite stream over the given deltas.
pub fn from_deltas<T: Send + 'static>(deltas: Vec<Delta<T>>) -> BoxedDeltaStream<T> {
    Box::pin(stream::iter(deltas.into_iter().map(Ok)))
}

/// Drives a `UnaryOperator` from one input stream.
///
/// An input error or an operator error is yielded once, after which the
/// stream ends.
pub struct UnaryStream<I, O, Op> {
    input: Option<BoxedDeltaStream<I>>,
    operator: Op,
    buffer: VecDeque<Delta<O>>,
    done: bool,
}

impl<I, O, Op> UnaryStream<I, O, Op>
where
    Op: UnaryOperator<I, O>,
{
    pub fn new(input: BoxedDeltaStream<I>, operator: Op) -> Self {
        Self {
            input: Some(input),
            operator,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    /// Returns the operator state.
    pub fn operator(&self) -> &Op {
        &self.operator
    }

    fn fail(&mut self, err: tidal_core::Error) -> Poll<Option<Result<Delta<O>>>> {
        self.done = true;
        self.input = None;
        self.buffer.clear();
        Poll::Ready(Some(Err(err)))
    }
}

impl<I, O, Op> Stream for UnaryStream<I, O, Op>
where
    Op: UnaryOperator<I, O> + Unpin,
    O: Unpin,
{
    type Item = Result<Delta<O>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(delta) = this.buffer.pop_front() {
                return Poll::Ready(Some(Ok(delta)));
            }
            if this.done {
                return Poll::Ready(None);
            }
            let Some(input) = this.input.as_mut() else {
                this.done = true;
                continue;
            };
            match input.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(delta))) => match this.operator.on_delta(delta) {
                    Ok(outputs) => this.buffer.extend(outputs),
                    Err(err) => return this.fail(err),
                },
                Poll::Ready(Some(Err(err))) => return this.fail(err),
                Poll::Ready(None) => {
                    this.input = None;
                    match this.operator.on_end() {
                        Ok(outputs) => this.buffer.extend(outputs),
                        Err(err) => return this.fail(err),
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Drives a `BinaryOperator` from two input streams.
///
/// Inputs are polled alternately unless one side has priority, in which
/// case every ready item on that side is consumed before the other side is
/// polled. The stream ends once both inputs have ended and every buffered
/// output has been yielded.
pub struct BinaryStream<Op> {
    left: Option<BindingDeltaStream>,
    right: Option<BindingDeltaStream>,
    operator: Op,
    buffer: VecDeque<Delta<Binding>>,
    next: Side,
    priority: Option<Side>,
    done: bool,
}

impl<Op: BinaryOperator> BinaryStream<Op> {
    pub fn new(left: BindingDeltaStream, right: BindingDeltaStream, operator: Op) -> Self {
        Self {
            left: Some(left),
            right: Some(right),
            operator,
            buffer: VecDeque::new(),
            next: Side::Left,
            priority: None,
            done: false,
        }
    }

    /// Drains ready items from `side` before polling the other input.
    ///
    /// Operators whose right input hides left items use this so that a
    /// left item already excluded by a ready right item is never emitted.
    pub fn with_priority(mut self, side: Side) -> Self {
        self.priority = Some(side);
        self
    }

    /// Returns the operator state.
    pub fn operator(&self) -> &Op {
        &self.operator
    }

    fn input(&mut self, side: Side) -> &mut Option<BindingDeltaStream> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    fn fail(&mut self, err: tidal_core::Error) -> Poll<Option<Result<Delta<Binding>>>> {
        self.done = true;
        self.left = None;
        self.right = None;
        self.buffer.clear();
        Poll::Ready(Some(Err(err)))
    }
}

impl<Op: BinaryOperator + Unpin> Stream for BinaryStream<Op> {
    type Item = Result<Delta<Binding>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(delta) = this.buffer.pop_front() {
                return Poll::Ready(Some(Ok(delta)));
            }
            if this.done {
                return Poll::Ready(None);
            }
            if this.left.is_none() && this.right.is_none() {
                trace!("both inputs ended");
                this.done = true;
                continue;
            }

            let first = match this.priority {
                Some(side) => side,
                None => {
                    let first = this.next;
                    this.next = first.other();
                    first
                }
            };
            let mut progressed = false;
            for side in [first, first.other()] {
                let Some(input) = this.input(side).as_mut() else {
                    continue;
                };
                match input.poll_next_unpin(cx) {
                    Poll::Ready(Some(Ok(delta))) => {
                        match this.operator.on_delta(side, delta) {
                            Ok(outputs) => this.buffer.extend(outputs),
                            Err(err) => return this.fail(err),
                        }
                        progressed = true;
                        break;
                    }
                    Poll::Ready(Some(Err(err))) => return this.fail(err),
                    Poll::Ready(None) => {
                        *this.input(side) = None;
                        progressed = true;
                        break;
                    }
                    Poll::Pending => {}
                }
            }
            if !progressed {
                return Poll::Pending;
            }
        }
    }
}
