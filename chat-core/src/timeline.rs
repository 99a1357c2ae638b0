//! The ordered, duplicate-free message timeline.
//!
//! A [`Timeline`] holds the merged view of one conversation: confirmed
//! records and pending optimistic entries in display order. Display order is
//! `created_at` ascending; ties are broken confirmed-before-optimistic
//! (confirmed is authoritative), then by `id` for confirmed entries, and by
//! insertion order for optimistic entries.
//!
//! A `LocalId` index gives O(1) lookup, and doubles as the guard for the
//! no-duplicate-`LocalId` invariant.

use std::cmp::Ordering;
use std::collections::HashMap;

use chat_types::{LocalId, Message, MessageOrigin};

/// Display ordering between two timeline entries.
fn display_order(a: &Message, b: &Message) -> Ordering {
    fn class(m: &Message) -> u8 {
        match m.origin {
            MessageOrigin::Confirmed => 0,
            MessageOrigin::Optimistic => 1,
        }
    }
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| class(a).cmp(&class(b)))
        .then_with(|| match (&a.id, &b.id) {
            (Some(x), Some(y)) => x.cmp(y),
            _ => Ordering::Equal,
        })
}

/// An ordered sequence of messages for one conversation.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    entries: Vec<Message>,
    index: HashMap<LocalId, usize>,
}

impl Timeline {
    /// Create an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message at its display-ordered position.
    ///
    /// Among entries with an equal ordering key the new message lands last,
    /// which gives optimistic entries insertion order. Returns `false`
    /// (without inserting) if an entry with the same `LocalId` already
    /// exists.
    pub fn insert(&mut self, message: Message) -> bool {
        if self.index.contains_key(&message.local_id) {
            return false;
        }
        let pos = self
            .entries
            .partition_point(|e| display_order(e, &message) != Ordering::Greater);
        self.entries.insert(pos, message);
        self.reindex_from(pos);
        true
    }

    /// Look up an entry by its `LocalId`.
    pub fn get(&self, local_id: &LocalId) -> Option<&Message> {
        self.index.get(local_id).map(|&i| &self.entries[i])
    }

    /// Look up an entry mutably by its `LocalId`.
    pub fn get_mut(&mut self, local_id: &LocalId) -> Option<&mut Message> {
        let i = *self.index.get(local_id)?;
        Some(&mut self.entries[i])
    }

    /// Check whether an entry with the given `LocalId` exists.
    pub fn contains(&self, local_id: &LocalId) -> bool {
        self.index.contains_key(local_id)
    }

    /// Iterate over entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter()
    }

    /// The entries in display order.
    pub fn messages(&self) -> &[Message] {
        &self.entries
    }

    /// Clone the entries for publication to the UI layer.
    pub fn snapshot(&self) -> Vec<Message> {
        self.entries.clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the timeline is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn reindex_from(&mut self, pos: usize) {
        for (i, e) in self.entries.iter().enumerate().skip(pos) {
            self.index.insert(e.local_id, i);
        }
    }
}
