//! Read tracking and DM approval.
//!
//! [`ReadState`] maps each conversation to the last moment the user is deemed
//! to have seen it; a conversation is unread iff its latest message is newer.
//! [`Approvals`] tracks the per-counterpart DM tri-state (approved / blocked /
//! pending) that gates aggregate views and notifications.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{ConversationId, UserId};

/// Recency window for DM triage: an unapproved DM only needs attention if the
/// latest inbound message is at most this old.
pub const DM_TRIAGE_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Per-conversation last-seen timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadState {
    seen: HashMap<ConversationId, u64>,
}

impl ReadState {
    /// Last-seen timestamp for a conversation. Never-seen conversations
    /// report 0, so any message makes them unread.
    pub fn last_seen_at(&self, conversation: &ConversationId) -> u64 {
        self.seen.get(conversation).copied().unwrap_or(0)
    }

    /// Record that the user has seen `conversation` as of `now`.
    pub fn mark_seen(&mut self, conversation: ConversationId, now: u64) {
        self.seen.insert(conversation, now);
    }

    /// Whether a conversation whose latest message is at `latest_ts` is
    /// unread.
    pub fn is_unread(&self, conversation: &ConversationId, latest_ts: u64) -> bool {
        latest_ts > self.last_seen_at(conversation)
    }
}

/// Explicit DM approval decision. Absence of a record means *pending*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approval {
    /// Counterpart may appear in aggregate views and notify.
    Approved,
    /// Counterpart is excluded from aggregate views and notifications.
    Blocked,
}

/// Per-DM-counterpart approval records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Approvals {
    records: HashMap<UserId, Approval>,
}

impl Approvals {
    /// Explicit decision for a counterpart, if one was made.
    pub fn status(&self, user: &str) -> Option<Approval> {
        self.records.get(user).copied()
    }

    /// Whether the counterpart has been explicitly approved.
    pub fn is_approved(&self, user: &str) -> bool {
        self.status(user) == Some(Approval::Approved)
    }

    /// Whether the counterpart has been explicitly blocked.
    pub fn is_blocked(&self, user: &str) -> bool {
        self.status(user) == Some(Approval::Blocked)
    }

    /// Record an approval decision.
    pub fn set(&mut self, user: UserId, approval: Approval) {
        self.records.insert(user, approval);
    }

    /// Drop any decision for a counterpart, returning them to pending.
    pub fn clear(&mut self, user: &str) {
        self.records.remove(user);
    }
}

/// DM triage policy: whether a counterpart belongs in the "needs triage"
/// section.
///
/// Pending iff no approval record exists, we have never written to them in
/// the fetched history, and their latest inbound message is recent (within
/// [`DM_TRIAGE_WINDOW_SECS`]). Read state deliberately does not participate:
/// having glanced at a DM is not a triage decision, and stale unapproved DMs
/// age out of the list rather than lingering.
pub fn needs_triage(
    approvals: &Approvals,
    user: &str,
    latest_inbound_ts: u64,
    has_outbound: bool,
    now: u64,
) -> bool {
    if approvals.status(user).is_some() || has_outbound {
        return false;
    }
    now.saturating_sub(latest_inbound_ts) <= DM_TRIAGE_WINDOW_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dm(user: &str) -> ConversationId {
        ConversationId::Dm(user.into())
    }

    #[test]
    fn never_seen_conversations_are_unread() {
        let state = ReadState::default();
        assert!(state.is_unread(&dm("u42"), 500));
        assert!(!state.is_unread(&dm("u42"), 0));
    }

    #[test]
    fn mark_seen_clears_unread_up_to_now() {
        let mut state = ReadState::default();
        assert!(state.is_unread(&dm("u42"), 500));

        state.mark_seen(dm("u42"), 1_000);
        assert!(!state.is_unread(&dm("u42"), 500));
        assert!(!state.is_unread(&dm("u42"), 1_000));
        assert!(state.is_unread(&dm("u42"), 1_001));
    }

    #[test]
    fn triage_requires_recency_and_no_decision() {
        let mut approvals = Approvals::default();
        let now = 1_000_000;

        // Fresh inbound from an undecided counterpart.
        assert!(needs_triage(&approvals, "u1", now - 60, false, now));

        // We already replied.
        assert!(!needs_triage(&approvals, "u1", now - 60, true, now));

        // Stale thread ages out.
        assert!(!needs_triage(&approvals, "u1", now - DM_TRIAGE_WINDOW_SECS - 1, false, now));

        // Any explicit decision removes it from triage.
        approvals.set("u1".into(), Approval::Blocked);
        assert!(!needs_triage(&approvals, "u1", now - 60, false, now));
    }

    #[test]
    fn blocked_is_not_approved() {
        let mut approvals = Approvals::default();
        approvals.set("u1".into(), Approval::Blocked);
        assert!(approvals.is_blocked("u1"));
        assert!(!approvals.is_approved("u1"));

        approvals.clear("u1");
        assert_eq!(approvals.status("u1"), None);
    }
}
