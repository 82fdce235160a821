//! Pending-stream index.
//!
//! Maps each active pattern to the channels serving it. A quad matches a
//! pattern `P` exactly when `P` equals the quad projected onto `P`'s bound
//! positions, so a mutation reaches every interested channel through 16
//! exact bucket lookups, one per bound-position mask.

use hashbrown::HashMap;
use tidal_core::{Delta, Message, Quad, QuadPattern};
use tokio::sync::mpsc::UnboundedSender;

/// Identifier of an open match channel.
pub type StreamId = u64;

type Sender = UnboundedSender<Message<Quad>>;

/// Registry of open match channels keyed by pattern.
#[derive(Default)]
pub struct PendingStreams {
    buckets: HashMap<QuadPattern, HashMap<StreamId, Sender>>,
    patterns: HashMap<StreamId, QuadPattern>,
}

impl PendingStreams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a channel for a pattern.
    pub fn register(&mut self, id: StreamId, pattern: QuadPattern, sender: Sender) {
        self.buckets
            .entry(pattern.clone())
            .or_default()
            .insert(id, sender);
        self.patterns.insert(id, pattern);
    }

    /// Removes a channel, returning its sender if it was still registered.
    pub fn unregister(&mut self, id: StreamId) -> Option<Sender> {
        let pattern = self.patterns.remove(&id)?;
        let bucket = self.buckets.get_mut(&pattern)?;
        let sender = bucket.remove(&id);
        if bucket.is_empty() {
            self.buckets.remove(&pattern);
        }
        sender
    }

    /// Number of open channels.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Sends a mutation to every channel whose pattern matches the quad.
    ///
    /// Channels whose receiver is gone are dropped from the index.
    pub fn notify(&mut self, delta: &Delta<Quad>) {
        let mut dead = Vec::new();
        for mask in 0..16u8 {
            let bucket_key = QuadPattern::from_quad_masked(&delta.data, mask);
            if let Some(bucket) = self.buckets.get(&bucket_key) {
                for (id, sender) in bucket {
                    if sender.send(Message::Item(delta.clone())).is_err() {
                        dead.push(*id);
                    }
                }
            }
        }
        for id in dead {
            self.unregister(id);
        }
    }

    /// Ends every channel and clears the index.
    pub fn close_all(&mut self) {
        for (_, bucket) in self.buckets.drain() {
            for (_, sender) in bucket {
                let _ = sender.send(Message::End);
            }
        }
        self.patterns.clear();
    }
}
