//! Mutation journal and quad diffs.
//!
//! `Journal` buffers mutations in arrival order while a store is halted.
//! `QuadDiff` is the added/removed pair computed between two snapshots of the
//! same resource.

use hashbrown::HashSet;
use tidal_core::Quad;

/// A single buffered mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JournalEntry {
    /// A quad was added.
    Add(Quad),
    /// A quad was removed.
    Remove(Quad),
}

/// Ordered buffer of mutations.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    /// Creates a new empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an add.
    pub fn record_add(&mut self, quad: Quad) {
        self.entries.push(JournalEntry::Add(quad));
    }

    /// Records a remove.
    pub fn record_remove(&mut self, quad: Quad) {
        self.entries.push(JournalEntry::Remove(quad));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Takes all entries in arrival order, leaving the journal empty.
    pub fn drain(&mut self) -> Vec<JournalEntry> {
        core::mem::take(&mut self.entries)
    }
}

/// Difference between two snapshots of a resource.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuadDiff {
    /// Quads present in the new snapshot only.
    added: Vec<Quad>,
    /// Quads present in the old snapshot only.
    removed: Vec<Quad>,
}

impl QuadDiff {
    /// Symmetric difference: `old \ new` is removed, `new \ old` is added.
    ///
    /// Duplicates within either side are collapsed.
    pub fn between(old: &[Quad], new: &[Quad]) -> Self {
        let old_set: HashSet<&Quad> = old.iter().collect();
        let new_set: HashSet<&Quad> = new.iter().collect();
        let mut seen = HashSet::new();
        let added = new
            .iter()
            .filter(|quad| !old_set.contains(quad) && seen.insert(*quad))
            .cloned()
            .collect();
        let mut seen = HashSet::new();
        let removed = old
            .iter()
            .filter(|quad| !new_set.contains(quad) && seen.insert(*quad))
            .cloned()
            .collect();
        Self { added, removed }
    }

    /// A diff retracting every quad of a snapshot.
    pub fn retract_all(old: Vec<Quad>) -> Self {
        Self {
            added: Vec::new(),
            removed: old,
        }
    }

    /// Returns added quads.
    pub fn added(&self) -> &[Quad] {
        &self.added
    }

    /// Returns removed quads.
    pub fn removed(&self) -> &[Quad] {
        &self.removed
    }

    /// Returns true if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Journal entries for this diff: removals first, then additions.
    pub fn into_entries(self) -> Vec<JournalEntry> {
        self.removed
            .into_iter()
            .map(JournalEntry::Remove)
            .chain(self.added.into_iter().map(JournalEntry::Add))
            .collect()
    }
}
