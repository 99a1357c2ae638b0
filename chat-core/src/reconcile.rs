//! Reconciliation of optimistic and confirmed message views.
//!
//! The [`Reconciler`] owns the [`Timeline`] for one conversation and is the
//! only thing that mutates it. Two inputs flow in: optimistic entries
//! appended the instant a send is requested, and confirmed snapshots fetched
//! from the authoritative history endpoint. `merge` unifies them into one
//! ordered, duplicate-free view.
//!
//! Matching an optimistic entry to its confirmed counterpart is best-effort:
//! same sender, same conversation, same content, and a confirmed `created_at`
//! no earlier than the optimistic one minus a tolerance window for clock
//! skew. The first unmatched confirmed candidate in arrival order is
//! consumed, so no record ever collapses two optimistic entries.
//!
//! All operations here are synchronous and in-memory; a merge is atomic with
//! respect to the caller's event loop.

use std::collections::{HashMap, VecDeque};

use chat_types::{ConversationId, LocalId, Message, MessageId, MessageRecord};
use chrono::Duration;

use crate::timeline::Timeline;

/// Merges optimistic and confirmed messages into one timeline.
#[derive(Debug)]
pub struct Reconciler {
    conversation: ConversationId,
    tolerance: Duration,
    timeline: Timeline,
}

impl Reconciler {
    /// Create a reconciler for one conversation.
    ///
    /// `tolerance` is the allowed clock skew when matching an optimistic
    /// entry to a confirmed record.
    pub fn new(conversation: ConversationId, tolerance: Duration) -> Self {
        Self {
            conversation,
            tolerance,
            timeline: Timeline::new(),
        }
    }

    /// The conversation this reconciler is bound to.
    pub fn conversation(&self) -> ConversationId {
        self.conversation
    }

    /// The current merged timeline.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Insert an optimistic entry at its ordered position.
    ///
    /// Entries for a different conversation and duplicate `LocalId`s are
    /// discarded. Returns whether the entry was inserted.
    pub fn append_optimistic(&mut self, message: Message) -> bool {
        if message.conversation != self.conversation || !message.is_optimistic() {
            return false;
        }
        self.timeline.insert(message)
    }

    /// Flag a pending optimistic entry whose transport send errored.
    ///
    /// The entry stays visible as unconfirmed and is still eligible for
    /// matching on later merges (the content may have reached the server
    /// before the channel died).
    pub fn mark_send_failed(&mut self, local_id: &LocalId) {
        if let Some(entry) = self.timeline.get_mut(local_id) {
            if entry.is_optimistic() {
                entry.send_failed = true;
            }
        }
    }

    /// Merge a freshly fetched confirmed snapshot into the timeline.
    ///
    /// The new timeline is the snapshot's confirmed records plus any pending
    /// optimistic entries with no matching record yet. The later snapshot
    /// always wins for confirmed content. Records belonging to a different
    /// conversation are skipped.
    ///
    /// Display identity is kept stable: a confirmed record already shown
    /// keeps its `LocalId`, and a record that matches a pending optimistic
    /// entry adopts that entry's `LocalId`, so the displayed item never
    /// flickers when it is promoted.
    pub fn merge(&mut self, snapshot: &[MessageRecord]) {
        // LocalIds of confirmed entries already displayed, keyed by their
        // stable identity. VecDeque because the synthesized identity can
        // repeat for identical rapid messages in the same millisecond.
        let mut known: HashMap<MessageId, VecDeque<LocalId>> = HashMap::new();
        for entry in self.timeline.iter().filter(|e| e.is_confirmed()) {
            if let Some(id) = &entry.id {
                known.entry(id.clone()).or_default().push_back(entry.local_id);
            }
        }

        // Confirmed candidates in arrival order. A candidate that was
        // already displayed keeps its LocalId and is not eligible for
        // optimistic matching; that exclusion is what makes merge
        // idempotent.
        let mut candidates: Vec<(Message, bool)> = Vec::with_capacity(snapshot.len());
        for record in snapshot {
            if record.conversation_id != self.conversation {
                continue;
            }
            match known
                .get_mut(&record.message_id())
                .and_then(VecDeque::pop_front)
            {
                Some(local_id) => candidates.push((Message::confirmed(record, local_id), false)),
                None => candidates.push((Message::confirmed(record, LocalId::new()), true)),
            }
        }

        let pending: Vec<Message> = self
            .timeline
            .iter()
            .filter(|e| e.is_optimistic())
            .cloned()
            .collect();

        let mut survivors = Vec::with_capacity(pending.len());
        for optimistic in pending {
            let earliest = optimistic.created_at - self.tolerance;
            let candidate = candidates.iter_mut().find(|(cand, eligible)| {
                *eligible
                    && cand.sender == optimistic.sender
                    && cand.content == optimistic.content
                    && cand.created_at >= earliest
            });
            match candidate {
                Some((cand, eligible)) => {
                    cand.local_id = optimistic.local_id;
                    *eligible = false;
                }
                None => survivors.push(optimistic),
            }
        }

        let mut next = Timeline::new();
        for (candidate, _) in candidates {
            next.insert(candidate);
        }
        for survivor in survivors {
            next.insert(survivor);
        }
        self.timeline = next;
    }

    /// Iterate over pending (unmatched) optimistic entries.
    pub fn pending(&self) -> impl Iterator<Item = &Message> {
        self.timeline.iter().filter(|e| e.is_optimistic())
    }

    /// Number of pending optimistic entries.
    pub fn pending_count(&self) -> usize {
        self.pending().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_types::{MessageOrigin, UserId};
    use chrono::{DateTime, TimeZone, Utc};

    const CONV: ConversationId = ConversationId::new(1);
    const ME: UserId = UserId::new(2);
    const THEM: UserId = UserId::new(3);

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(CONV, Duration::seconds(5))
    }

    fn optimistic(content: &str, at: DateTime<Utc>) -> Message {
        Message::optimistic(CONV, ME, content, at)
    }

    fn record(sender: UserId, content: &str, at: DateTime<Utc>) -> MessageRecord {
        MessageRecord::new(CONV, sender, content, at)
    }

    fn contents(r: &Reconciler) -> Vec<&str> {
        r.timeline().iter().map(|m| m.content.as_str()).collect()
    }

    fn assert_ordered(r: &Reconciler) {
        let times: Vec<_> = r.timeline().iter().map(|m| m.created_at).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]), "created_at must be non-decreasing");
    }

    #[test]
    fn append_inserts_at_ordered_position() {
        let mut r = reconciler();
        r.append_optimistic(optimistic("late", base() + Duration::seconds(2)));
        r.append_optimistic(optimistic("early", base()));
        assert_eq!(contents(&r), vec!["early", "late"]);
        assert_ordered(&r);
    }

    #[test]
    fn append_ignores_foreign_conversation() {
        let mut r = reconciler();
        let foreign = Message::optimistic(ConversationId::new(99), ME, "hi", base());
        assert!(!r.append_optimistic(foreign));
        assert!(r.timeline().is_empty());
    }

    #[test]
    fn append_ignores_duplicate_local_id() {
        let mut r = reconciler();
        let m = optimistic("hi", base());
        let dup = m.clone();
        assert!(r.append_optimistic(m));
        assert!(!r.append_optimistic(dup));
        assert_eq!(r.timeline().len(), 1);
    }

    #[test]
    fn merge_collapses_optimistic_with_confirmed() {
        let mut r = reconciler();
        let m = optimistic("hi", base());
        let local_id = m.local_id;
        r.append_optimistic(m);

        r.merge(&[record(ME, "hi", base() + Duration::seconds(1))]);

        assert_eq!(r.timeline().len(), 1);
        let entry = &r.timeline().messages()[0];
        assert_eq!(entry.origin, MessageOrigin::Confirmed);
        // The confirmed record adopts the optimistic identity.
        assert_eq!(entry.local_id, local_id);
        assert_eq!(r.pending_count(), 0);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut r = reconciler();
        r.append_optimistic(optimistic("hi", base()));
        r.append_optimistic(optimistic("never sent", base() + Duration::seconds(1)));

        let snapshot = vec![
            record(THEM, "hello", base() - Duration::seconds(30)),
            record(ME, "hi", base()),
        ];
        r.merge(&snapshot);
        let first = r.timeline().snapshot();
        r.merge(&snapshot);
        let second = r.timeline().snapshot();

        assert_eq!(first, second);
    }

    #[test]
    fn merge_keeps_unmatched_optimistic_visible() {
        // 50 confirmed records and 1 unmatched optimistic entry.
        let mut r = reconciler();
        r.append_optimistic(optimistic("pending", base() + Duration::seconds(100)));

        let snapshot: Vec<MessageRecord> = (0..50)
            .map(|i| record(THEM, &format!("msg {i}"), base() + Duration::seconds(i)))
            .collect();
        r.merge(&snapshot);

        assert_eq!(r.timeline().len(), 51);
        let optimistic_entries: Vec<_> = r.pending().collect();
        assert_eq!(optimistic_entries.len(), 1);
        assert_eq!(optimistic_entries[0].content, "pending");
        assert_ordered(&r);
    }

    #[test]
    fn tolerance_rejects_records_from_the_past() {
        let mut r = reconciler();
        r.append_optimistic(optimistic("hi", base()));

        // Same sender and content, but confirmed long before the optimistic
        // send minus the tolerance window: a different, older message.
        r.merge(&[record(ME, "hi", base() - Duration::seconds(60))]);

        assert_eq!(r.timeline().len(), 2);
        assert_eq!(r.pending_count(), 1);
    }

    #[test]
    fn tolerance_accepts_slight_clock_skew() {
        let mut r = reconciler();
        r.append_optimistic(optimistic("hi", base()));

        // Server clock three seconds behind ours; within the 5s window.
        r.merge(&[record(ME, "hi", base() - Duration::seconds(3))]);

        assert_eq!(r.timeline().len(), 1);
        assert_eq!(r.pending_count(), 0);
    }

    #[test]
    fn no_record_collapses_two_optimistic_entries() {
        let mut r = reconciler();
        let first = optimistic("hi", base());
        let second = optimistic("hi", base() + Duration::seconds(1));
        let first_id = first.local_id;
        r.append_optimistic(first);
        r.append_optimistic(second);

        // Only one confirmed "hi": the first pending entry consumes it.
        r.merge(&[record(ME, "hi", base())]);

        assert_eq!(r.timeline().len(), 2);
        assert_eq!(r.pending_count(), 1);
        let confirmed: Vec<_> = r.timeline().iter().filter(|m| m.is_confirmed()).collect();
        assert_eq!(confirmed[0].local_id, first_id);
    }

    #[test]
    fn identical_rapid_messages_consume_distinct_candidates() {
        let mut r = reconciler();
        r.append_optimistic(optimistic("hi", base()));
        r.append_optimistic(optimistic("hi", base()));

        r.merge(&[
            record(ME, "hi", base()),
            record(ME, "hi", base() + Duration::seconds(1)),
        ]);

        assert_eq!(r.timeline().len(), 2);
        assert_eq!(r.pending_count(), 0);
    }

    #[test]
    fn later_snapshot_wins_for_confirmed_content() {
        let mut r = reconciler();
        r.merge(&[
            record(THEM, "one", base()),
            record(THEM, "two", base() + Duration::seconds(1)),
        ]);
        assert_eq!(r.timeline().len(), 2);

        r.merge(&[record(THEM, "two", base() + Duration::seconds(1))]);
        assert_eq!(contents(&r), vec!["two"]);
    }

    #[test]
    fn merge_skips_foreign_conversation_records() {
        let mut r = reconciler();
        let foreign = MessageRecord::new(ConversationId::new(99), THEM, "leak", base());
        r.merge(&[foreign, record(THEM, "ours", base())]);
        assert_eq!(contents(&r), vec!["ours"]);
    }

    #[test]
    fn confirmed_local_id_is_stable_across_merges() {
        let mut r = reconciler();
        let snapshot = vec![record(THEM, "hello", base())];
        r.merge(&snapshot);
        let first = r.timeline().messages()[0].local_id;
        r.merge(&snapshot);
        let second = r.timeline().messages()[0].local_id;
        assert_eq!(first, second);
    }

    #[test]
    fn adopted_local_id_survives_later_merges() {
        let mut r = reconciler();
        let m = optimistic("hi", base());
        let local_id = m.local_id;
        r.append_optimistic(m);

        let snapshot = vec![record(ME, "hi", base())];
        r.merge(&snapshot);
        r.merge(&snapshot);

        assert_eq!(r.timeline().messages()[0].local_id, local_id);
    }

    #[test]
    fn already_confirmed_entry_does_not_rematch() {
        // A confirmed entry displayed from an earlier merge must not absorb
        // a pending optimistic entry with the same content on later merges.
        let mut r = reconciler();
        let snapshot = vec![record(ME, "hi", base())];
        r.merge(&snapshot);
        r.append_optimistic(optimistic("hi", base() + Duration::seconds(1)));

        r.merge(&snapshot);

        assert_eq!(r.timeline().len(), 2);
        assert_eq!(r.pending_count(), 1);
    }

    #[test]
    fn send_failed_flag_survives_merges() {
        let mut r = reconciler();
        let m = optimistic("hi", base());
        let local_id = m.local_id;
        r.append_optimistic(m);
        r.mark_send_failed(&local_id);

        r.merge(&[record(THEM, "unrelated", base())]);

        let entry = r.timeline().get(&local_id).unwrap();
        assert!(entry.send_failed);
        assert!(entry.is_optimistic());
    }

    #[test]
    fn mark_send_failed_on_unknown_id_is_a_no_op() {
        let mut r = reconciler();
        r.mark_send_failed(&LocalId::new());
        assert!(r.timeline().is_empty());
    }

    #[test]
    fn merge_on_empty_timeline_orders_snapshot() {
        let mut r = reconciler();
        r.merge(&[
            record(THEM, "b", base() + Duration::seconds(1)),
            record(THEM, "a", base()),
        ]);
        assert_eq!(contents(&r), vec!["a", "b"]);
        assert_ordered(&r);
    }
}
