//! Per-slot panel state.
//!
//! A panel binds one [`ViewSelector`] to an ordered message collection and a
//! bounded [`KnownIds`] dedup set. Re-keying a panel (changing its selector)
//! bumps its generation and resets both, so a slow in-flight response issued
//! for the old selector can be recognized and discarded on arrival.

use switchboard_core::composer;
use switchboard_core::{KnownIds, Message, MessageId, ViewSelector};

/// Maximum concurrently live panels. Slot 0 is primary.
pub const PANEL_COUNT: usize = 3;

/// State of one live panel slot.
#[derive(Debug, Clone)]
pub struct Panel {
    /// What this panel displays.
    selector: ViewSelector,
    /// Fetch-tagging generation; bumped on every re-key.
    generation: u64,
    /// Ordered message collection, ascending `(created_at, id)`.
    messages: Vec<Message>,
    /// Dedup memory for arrival detection.
    known_ids: KnownIds,
    /// A backfill request is in flight.
    loading_more: bool,
    /// Backfill returned zero new messages; history is exhausted.
    no_more_history: bool,
    /// No fetch has completed for this binding yet (gates composite views).
    syncing: bool,
}

/// Result of applying one poll response to a panel.
#[derive(Debug, Clone, Default)]
pub struct PollOutcome {
    /// Messages not previously known, in arrival order.
    pub new_arrivals: Vec<Message>,
}

impl Panel {
    /// Create a pristine panel bound to `selector`.
    pub fn new(selector: ViewSelector, generation: u64) -> Self {
        Self {
            selector,
            generation,
            messages: Vec::new(),
            known_ids: KnownIds::new(),
            loading_more: false,
            no_more_history: false,
            syncing: true,
        }
    }

    /// The bound selector.
    pub fn selector(&self) -> &ViewSelector {
        &self.selector
    }

    /// Current generation; fetch completions with any other value are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `generation` identifies the current binding.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Read-only snapshot of the ordered collection.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether a backfill request is in flight.
    pub fn loading_more(&self) -> bool {
        self.loading_more
    }

    /// Whether history is exhausted (stop offering "load more").
    pub fn no_more_history(&self) -> bool {
        self.no_more_history
    }

    /// Whether no fetch has completed yet for the current binding.
    pub fn syncing(&self) -> bool {
        self.syncing
    }

    /// Whether this panel has never been populated.
    pub fn is_pristine(&self) -> bool {
        self.syncing && self.known_ids.is_empty()
    }

    /// Oldest known message id, the backfill cursor.
    pub fn oldest_id(&self) -> Option<&MessageId> {
        self.messages.first().map(|m| &m.id)
    }

    /// Replace the collection wholesale from an initial load.
    ///
    /// KnownIds is repopulated atomically with the full id set of the
    /// result; this is backfill, not live arrival, so the caller fires no
    /// notifications for it.
    pub fn apply_initial(&mut self, messages: Vec<Message>) {
        let merged = composer::merge(vec![messages]);
        self.known_ids.clear();
        self.known_ids.extend(merged.iter().map(|m| m.id.clone()));
        self.messages = merged;
        self.syncing = false;
    }

    /// Apply one poll response as a single unit.
    ///
    /// Ids absent from KnownIds are new arrivals: they are inserted in order
    /// and KnownIds is extended once, after the whole response is processed.
    /// Any completed poll lifts the syncing gate, even an empty page: an
    /// empty conversation is loaded, not still loading.
    pub fn apply_poll(&mut self, messages: Vec<Message>) -> PollOutcome {
        self.syncing = false;
        let mut new_arrivals: Vec<Message> = Vec::new();
        for message in messages {
            if !self.known_ids.contains(&message.id)
                && !new_arrivals.iter().any(|m| m.id == message.id)
            {
                new_arrivals.push(message);
            }
        }
        if new_arrivals.is_empty() {
            return PollOutcome::default();
        }

        self.known_ids.extend(new_arrivals.iter().map(|m| m.id.clone()));
        let existing = std::mem::take(&mut self.messages);
        self.messages = composer::merge(vec![existing, new_arrivals.clone()]);

        PollOutcome { new_arrivals }
    }

    /// Mark a backfill request as started.
    pub fn begin_backfill(&mut self) {
        self.loading_more = true;
    }

    /// Apply a backward history page. Returns the number of newly-loaded
    /// messages; zero records history exhaustion.
    pub fn apply_backfill(&mut self, messages: Vec<Message>) -> usize {
        self.loading_more = false;
        let fresh: Vec<Message> =
            messages.into_iter().filter(|m| !self.known_ids.contains(&m.id)).collect();
        let count = fresh.len();
        if count == 0 {
            self.no_more_history = true;
            return 0;
        }
        self.known_ids.extend(fresh.iter().map(|m| m.id.clone()));
        let existing = std::mem::take(&mut self.messages);
        self.messages = composer::merge(vec![fresh, existing]);
        count
    }

    /// Abort an in-flight backfill (cycle failure).
    pub fn cancel_backfill(&mut self) {
        self.loading_more = false;
    }

    /// Sanity predicate used by tests: KnownIds covers every collection id
    /// and the collection is ascending with no duplicate ids.
    pub fn invariants_hold(&self) -> bool {
        let ordered = self.messages.windows(2).all(|w| w[0].sort_key() < w[1].sort_key());
        let covered = self.messages.iter().all(|m| self.known_ids.contains(&m.id));
        ordered && covered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, ts: u64) -> Message {
        Message {
            id: id.into(),
            created_at: ts,
            author_id: "a".into(),
            author_name: "a".into(),
            group_id: Some("g".into()),
            recipient_id: None,
            text: Some("x".into()),
            attachments: Vec::new(),
            liked_by: Vec::new(),
        }
    }

    fn panel() -> Panel {
        Panel::new(ViewSelector::Group("g".into()), 1)
    }

    #[test]
    fn initial_load_populates_without_arrivals() {
        let mut p = panel();
        p.apply_initial(vec![msg("m2", 105), msg("m1", 100)]);

        let ids: Vec<_> = p.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2"]);
        assert!(!p.syncing());
        assert!(p.invariants_hold());
    }

    #[test]
    fn poll_detects_only_unknown_ids() {
        let mut p = panel();
        p.apply_initial(vec![msg("a", 100), msg("b", 101), msg("c", 102)]);

        let outcome = p.apply_poll(vec![msg("b", 101), msg("c", 102), msg("d", 110)]);
        let new_ids: Vec<_> = outcome.new_arrivals.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(new_ids, ["d"]);
        assert_eq!(p.messages().len(), 4);
        assert!(p.invariants_hold());
    }

    #[test]
    fn poll_response_with_internal_duplicates_counts_once() {
        let mut p = panel();
        p.apply_initial(vec![msg("a", 100)]);

        let outcome = p.apply_poll(vec![msg("b", 105), msg("b", 105)]);
        assert_eq!(outcome.new_arrivals.len(), 1);
        assert!(p.invariants_hold());
    }

    #[test]
    fn empty_poll_lifts_the_syncing_gate() {
        let mut p = panel();
        assert!(p.syncing());

        let outcome = p.apply_poll(vec![]);
        assert!(outcome.new_arrivals.is_empty());
        assert!(!p.syncing());
        assert!(p.messages().is_empty());
    }

    #[test]
    fn backfill_prepends_and_reports_count() {
        let mut p = panel();
        p.apply_initial(vec![msg("m5", 500)]);
        p.begin_backfill();

        let count = p.apply_backfill(vec![msg("m1", 100), msg("m2", 200)]);
        assert_eq!(count, 2);
        assert!(!p.loading_more());
        assert!(!p.no_more_history());

        let ids: Vec<_> = p.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2", "m5"]);
        assert!(p.invariants_hold());
    }

    #[test]
    fn exhausted_backfill_records_no_more_history() {
        let mut p = panel();
        p.apply_initial(vec![msg("m1", 100)]);
        p.begin_backfill();

        let count = p.apply_backfill(vec![msg("m1", 100)]);
        assert_eq!(count, 0);
        assert!(p.no_more_history());
    }

    #[test]
    fn backfill_does_not_disturb_arrival_detection() {
        let mut p = panel();
        p.apply_initial(vec![msg("m5", 500)]);
        p.begin_backfill();
        let _ = p.apply_backfill(vec![msg("m1", 100)]);

        let outcome = p.apply_poll(vec![msg("m1", 100), msg("m6", 600)]);
        let new_ids: Vec<_> = outcome.new_arrivals.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(new_ids, ["m6"]);
    }
}
