//! Streaming quad store.
//!
//! `StreamingStore` is a cloneable handle to a mutable quad set whose
//! `match_quads` channels first replay the resident matches and then stay open,
//! receiving every later addition or retraction that matches their pattern.
//!
//! Registration and mutation run under the same lock, so a channel can neither
//! observe a write made before it was registered nor miss one made after.

use crate::bindings::BindingStream;
use crate::journal::{Journal, JournalEntry, QuadDiff};
use crate::pending::{PendingStreams, StreamId};
use crate::resident::ResidentSet;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::Stream;
use parking_lot::Mutex;
use std::sync::Arc;
use tidal_core::{Delta, Error, Message, Quad, QuadPattern, Result, TriplePattern};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::{debug, trace};

struct StoreState {
    resident: ResidentSet,
    pending: PendingStreams,
    journal: Journal,
    /// Nesting depth of `halt()` calls; mutations are buffered while > 0.
    halt_depth: usize,
    ended: bool,
    next_stream_id: StreamId,
}

impl StoreState {
    fn new() -> Self {
        Self {
            resident: ResidentSet::new(),
            pending: PendingStreams::new(),
            journal: Journal::new(),
            halt_depth: 0,
            ended: false,
            next_stream_id: 1,
        }
    }

    fn check_open(&self, operation: &'static str, quad: &Quad) -> Result<()> {
        if self.ended {
            return Err(Error::store_ended(operation, quad));
        }
        Ok(())
    }

    /// Routes a mutation through the journal when halted, else applies it.
    fn submit(&mut self, entry: JournalEntry) {
        if self.halt_depth > 0 {
            match entry {
                JournalEntry::Add(quad) => self.journal.record_add(quad),
                JournalEntry::Remove(quad) => self.journal.record_remove(quad),
            }
        } else {
            self.apply(entry);
        }
    }

    /// The mutation path: no-op short circuit, notify, then update the set.
    fn apply(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Add(quad) => {
                if self.resident.contains(&quad) {
                    return;
                }
                trace!(%quad, "store add");
                let delta = Delta::addition(quad);
                self.pending.notify(&delta);
                self.resident.insert(delta.data);
            }
            JournalEntry::Remove(quad) => {
                if !self.resident.contains(&quad) {
                    return;
                }
                trace!(%quad, "store remove");
                let delta = Delta::retraction(quad);
                self.pending.notify(&delta);
                self.resident.remove(&delta.data);
            }
        }
    }

    fn flush(&mut self) {
        let entries = self.journal.drain();
        if !entries.is_empty() {
            debug!(count = entries.len(), "store replaying buffered mutations");
        }
        for entry in entries {
            self.apply(entry);
        }
    }
}

/// A concurrent, mutable set of quads serving live pattern-matched streams.
#[derive(Clone)]
pub struct StreamingStore {
    state: Arc<Mutex<StoreState>>,
}

impl Default for StreamingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::new())),
        }
    }

    /// Creates a store pre-populated with quads.
    pub fn with_quads(quads: impl IntoIterator<Item = Quad>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock();
            for quad in quads {
                state.resident.insert(quad);
            }
        }
        store
    }

    /// Opens a channel over `pattern`.
    ///
    /// The channel first yields every resident matching quad as an addition,
    /// then every later matching mutation, until closed or the store ends.
    pub fn match_quads(&self, pattern: QuadPattern) -> QuadStream {
        let (sender, receiver) = unbounded_channel();
        let mut state = self.state.lock();
        let id = state.next_stream_id;
        state.next_stream_id += 1;

        for quad in state.resident.matching(&pattern) {
            let _ = sender.send(Message::Item(Delta::addition(quad)));
        }
        if state.ended {
            let _ = sender.send(Message::End);
        } else {
            debug!(stream = id, %pattern, "store stream opened");
            state.pending.register(id, pattern.clone(), sender);
        }

        QuadStream {
            id,
            pattern,
            receiver,
            store: self.clone(),
            done: false,
        }
    }

    /// Opens a channel over a pattern with variables, yielding bindings.
    pub fn match_bindings(&self, pattern: TriplePattern) -> BindingStream {
        let quads = self.match_quads(pattern.quad_pattern());
        BindingStream::new(quads, pattern)
    }

    /// Adds a quad. Adding a resident quad notifies nobody.
    pub fn add(&self, quad: Quad) -> Result<()> {
        let mut state = self.state.lock();
        state.check_open("add", &quad)?;
        state.submit(JournalEntry::Add(quad));
        Ok(())
    }

    /// Removes a quad. Removing an absent quad notifies nobody.
    pub fn remove(&self, quad: Quad) -> Result<()> {
        let mut state = self.state.lock();
        state.check_open("remove", &quad)?;
        state.submit(JournalEntry::Remove(quad));
        Ok(())
    }

    /// Applies a diff as one batch between `halt()` and `resume()`.
    pub fn apply_diff(&self, diff: QuadDiff) -> Result<()> {
        self.halt();
        let applied = diff
            .into_entries()
            .into_iter()
            .try_for_each(|entry| match entry {
                JournalEntry::Add(quad) => self.add(quad),
                JournalEntry::Remove(quad) => self.remove(quad),
            });
        self.resume();
        applied
    }

    /// Starts buffering mutations. Calls nest; each needs a matching `resume()`.
    pub fn halt(&self) {
        let mut state = self.state.lock();
        state.halt_depth += 1;
        debug!(depth = state.halt_depth, "store halted");
    }

    /// Leaves one level of `halt()`; the outermost one replays the buffer.
    pub fn resume(&self) {
        let mut state = self.state.lock();
        if state.halt_depth == 0 {
            return;
        }
        state.halt_depth -= 1;
        if state.halt_depth == 0 {
            state.flush();
            debug!("store resumed");
        }
    }

    /// Ends the store: buffered mutations are applied, every channel is ended
    /// without synthesizing retractions, and further mutations fail.
    pub fn end(&self) {
        let mut state = self.state.lock();
        if state.ended {
            return;
        }
        state.halt_depth = 0;
        state.flush();
        state.ended = true;
        state.pending.close_all();
        debug!(quads = state.resident.len(), "store ended");
    }

    /// Cardinality of a pattern, computed from the most selective bound position.
    pub fn count(&self, pattern: &QuadPattern) -> usize {
        self.state.lock().resident.count(pattern)
    }

    /// Cheap upper bound on a pattern's cardinality.
    pub fn estimate(&self, pattern: &QuadPattern) -> usize {
        self.state.lock().resident.estimate(pattern)
    }

    /// Point-in-time copy of the resident quads matching a pattern.
    pub fn snapshot(&self, pattern: &QuadPattern) -> Vec<Quad> {
        self.state.lock().resident.matching(pattern)
    }

    /// Returns true if the quad is resident.
    pub fn contains(&self, quad: &Quad) -> bool {
        self.state.lock().resident.contains(quad)
    }

    /// Number of resident quads.
    pub fn len(&self) -> usize {
        self.state.lock().resident.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_ended(&self) -> bool {
        self.state.lock().ended
    }

    pub fn is_halted(&self) -> bool {
        self.state.lock().halt_depth > 0
    }

    /// Number of mutations buffered by `halt()`.
    pub fn buffered(&self) -> usize {
        self.state.lock().journal.len()
    }

    /// Number of open match channels.
    pub fn open_streams(&self) -> usize {
        self.state.lock().pending.len()
    }

    fn close_stream(&self, id: StreamId) {
        let mut state = self.state.lock();
        if let Some(sender) = state.pending.unregister(id) {
            debug!(stream = id, "store stream closed");
            let _ = sender.send(Message::End);
        }
    }

    fn resync_stream_as_delete(&self, id: StreamId, pattern: &QuadPattern) {
        let mut state = self.state.lock();
        if let Some(sender) = state.pending.unregister(id) {
            let quads = state.resident.matching(pattern);
            debug!(stream = id, retracted = quads.len(), "store stream resynced as delete");
            for quad in quads {
                let _ = sender.send(Message::Item(Delta::retraction(quad)));
            }
            let _ = sender.send(Message::End);
        }
    }

    fn drop_stream(&self, id: StreamId) {
        self.state.lock().pending.unregister(id);
    }
}

/// A live channel opened by [`StreamingStore::match_quads`].
pub struct QuadStream {
    id: StreamId,
    pattern: QuadPattern,
    receiver: UnboundedReceiver<Message<Quad>>,
    store: StreamingStore,
    done: bool,
}

impl QuadStream {
    /// Returns the channel id.
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Stops receiving updates. Items already queued are still delivered.
    pub fn close(&self) {
        self.store.close_stream(self.id);
    }

    /// Emits every resident matching quad as a retraction, then closes.
    pub fn resync_as_delete(&self) {
        self.store.resync_stream_as_delete(self.id, &self.pattern);
    }
}

impl Stream for QuadStream {
    type Item = Result<Delta<Quad>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match this.receiver.poll_recv(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Message::Item(delta))) => Poll::Ready(Some(Ok(delta))),
            Poll::Ready(Some(Message::Error(err))) => {
                this.done = true;
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(Some(Message::End)) | Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for QuadStream {
    fn drop(&mut self) {
        self.store.drop_stream(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{FutureExt, StreamExt};
    use tidal_core::Term;

    fn quad(s: &str, p: &str, o: &str) -> Quad {
        Quad::triple(Term::iri(s), Term::iri(p), Term::iri(o))
    }

    /// Collects everything the stream has ready without waiting.
    fn ready_items(stream: &mut QuadStream) -> Vec<Delta<Quad>> {
        let mut items = Vec::new();
        while let Some(Some(item)) = stream.next().now_or_never() {
            items.push(item.unwrap());
        }
        items
    }

    #[test]
    fn test_add_add_remove_scenario() {
        let store = StreamingStore::new();
        let mut stream = store.match_quads(QuadPattern::any());

        store.add(quad("s1", "p1", "o1")).unwrap();
        store.add(quad("s2", "p2", "o2")).unwrap();
        store.remove(quad("s1", "p1", "o1")).unwrap();

        let items = ready_items(&mut stream);
        assert_eq!(
            items,
            vec![
                Delta::addition(quad("s1", "p1", "o1")),
                Delta::addition(quad("s2", "p2", "o2")),
                Delta::retraction(quad("s1", "p1", "o1")),
            ]
        );
    }

    #[test]
    fn test_replay_then_live() {
        let store = StreamingStore::with_quads(vec![quad("a", "p", "o")]);
        let mut stream = store.match_quads(QuadPattern::new(None, Some(Term::iri("p")), None, None));
        store.add(quad("b", "p", "o")).unwrap();
        store.add(quad("c", "q", "o")).unwrap();

        let items = ready_items(&mut stream);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|d| d.is_addition()));
    }

    #[test]
    fn test_idempotent_mutations_notify_nobody() {
        let store = StreamingStore::with_quads(vec![quad("a", "p", "o")]);
        let mut stream = store.match_quads(QuadPattern::any());
        assert_eq!(ready_items(&mut stream).len(), 1);

        store.add(quad("a", "p", "o")).unwrap();
        store.remove(quad("zz", "p", "o")).unwrap();
        assert!(ready_items(&mut stream).is_empty());
    }

    #[test]
    fn test_close_stops_updates() {
        let store = StreamingStore::new();
        let mut stream = store.match_quads(QuadPattern::any());
        store.add(quad("a", "p", "o")).unwrap();
        stream.close();
        store.add(quad("b", "p", "o")).unwrap();

        assert_eq!(ready_items(&mut stream).len(), 1);
        assert_eq!(stream.next().now_or_never(), Some(None));
        assert_eq!(store.open_streams(), 0);
    }

    #[test]
    fn test_resync_as_delete() {
        let store = StreamingStore::with_quads(vec![quad("a", "p", "o"), quad("b", "p", "o")]);
        let mut stream = store.match_quads(QuadPattern::any());
        stream.resync_as_delete();

        let items = ready_items(&mut stream);
        assert_eq!(items.len(), 4);
        assert_eq!(items.iter().filter(|d| d.is_retraction()).count(), 2);
        assert_eq!(stream.next().now_or_never(), Some(None));
    }

    #[test]
    fn test_end_closes_and_rejects() {
        let store = StreamingStore::new();
        let mut stream = store.match_quads(QuadPattern::any());
        store.add(quad("a", "p", "o")).unwrap();
        store.end();

        assert_eq!(ready_items(&mut stream).len(), 1);
        assert_eq!(stream.next().now_or_never(), Some(None));
        assert!(matches!(store.add(quad("b", "p", "o")), Err(Error::StoreEnded { .. })));
        assert!(store.remove(quad("a", "p", "o")).is_err());
        assert!(store.is_ended());
    }

    #[test]
    fn test_match_after_end_replays_and_ends() {
        let store = StreamingStore::with_quads(vec![quad("a", "p", "o")]);
        store.end();
        let mut stream = store.match_quads(QuadPattern::any());
        assert_eq!(ready_items(&mut stream).len(), 1);
        assert_eq!(stream.next().now_or_never(), Some(None));
    }

    #[test]
    fn test_halt_buffers_until_resume() {
        let store = StreamingStore::new();
        let mut stream = store.match_quads(QuadPattern::any());

        store.halt();
        store.add(quad("a", "p", "o")).unwrap();
        store.add(quad("a", "p", "o")).unwrap();
        store.remove(quad("b", "p", "o")).unwrap();
        assert_eq!(store.buffered(), 3);
        assert!(!store.contains(&quad("a", "p", "o")));
        assert!(ready_items(&mut stream).is_empty());

        store.resume();
        assert!(store.contains(&quad("a", "p", "o")));
        assert_eq!(ready_items(&mut stream), vec![Delta::addition(quad("a", "p", "o"))]);
    }

    #[test]
    fn test_nested_halt() {
        let store = StreamingStore::new();
        store.halt();
        store.halt();
        store.add(quad("a", "p", "o")).unwrap();
        store.resume();
        assert!(store.is_halted());
        assert!(store.is_empty());
        store.resume();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_apply_diff() {
        let store = StreamingStore::with_quads(vec![quad("a", "p", "o")]);
        let mut stream = store.match_quads(QuadPattern::any());
        ready_items(&mut stream);

        let diff = QuadDiff::between(&[quad("a", "p", "o")], &[quad("b", "p", "o")]);
        store.apply_diff(diff).unwrap();

        let items = ready_items(&mut stream);
        assert_eq!(
            items,
            vec![
                Delta::retraction(quad("a", "p", "o")),
                Delta::addition(quad("b", "p", "o")),
            ]
        );
        assert!(!store.is_halted());
    }

    #[test]
    fn test_dropping_stream_unregisters() {
        let store = StreamingStore::new();
        let stream = store.match_quads(QuadPattern::any());
        assert_eq!(store.open_streams(), 1);
        drop(stream);
        assert_eq!(store.open_streams(), 0);
    }

    #[test]
    fn test_count() {
        let store = StreamingStore::with_quads(vec![
            quad("a", "p", "o"),
            quad("b", "p", "o"),
            quad("c", "q", "o"),
        ]);
        assert_eq!(store.count(&QuadPattern::new(None, Some(Term::iri("p")), None, None)), 2);
        assert_eq!(store.count(&QuadPattern::any()), 3);
    }

    #[tokio::test]
    async fn test_writer_task_and_reader() {
        let store = StreamingStore::new();
        let stream = store.match_quads(QuadPattern::any());
        let writer = store.clone();
        let handle = tokio::spawn(async move {
            for i in 0..10 {
                writer.add(quad(&format!("s{}", i), "p", "o")).unwrap();
            }
            writer.end();
        });
        let items: Vec<_> = stream.collect().await;
        handle.await.unwrap();
        assert_eq!(items.len(), 10);
    }
}
