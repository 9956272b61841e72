//! Application input events.
//!
//! This module defines [`AppEvent`], the inputs that drive the [`crate::App`]
//! state machine. Events originate from two sources: completions of remote
//! I/O started earlier (fetches, roster loads) and timers fired by the
//! driver. Every fetch completion carries the generation it was issued for so
//! stale responses for a re-keyed panel can be discarded.

use switchboard_core::Message;
use switchboard_gateway::{DirectChat, GroupInfo, User};

use crate::TimerKind;

/// Events processed by the App state machine.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The authenticated user was resolved.
    UserLoaded {
        /// The current user.
        user: User,
    },

    /// Group and DM listings were refreshed.
    RosterLoaded {
        /// All groups the user belongs to.
        groups: Vec<GroupInfo>,
        /// All DM threads.
        chats: Vec<DirectChat>,
    },

    /// A panel's initial (wholesale) load completed.
    InitialLoaded {
        /// Panel slot.
        slot: usize,
        /// Generation the fetch was issued for.
        generation: u64,
        /// Merged, ascending-ordered result.
        messages: Vec<Message>,
    },

    /// A panel's lightweight poll refresh completed.
    PollArrived {
        /// Panel slot.
        slot: usize,
        /// Generation the fetch was issued for.
        generation: u64,
        /// Merged, ascending-ordered result.
        messages: Vec<Message>,
    },

    /// A backward history page completed.
    BackfillLoaded {
        /// Panel slot.
        slot: usize,
        /// Generation the fetch was issued for.
        generation: u64,
        /// Older messages, ascending-ordered.
        messages: Vec<Message>,
    },

    /// A fetch cycle failed wholesale (network down, retries exhausted).
    FetchFailed {
        /// Panel slot.
        slot: usize,
        /// Generation the fetch was issued for.
        generation: u64,
    },

    /// A backward history fetch failed; the panel's in-flight flag must be
    /// cleared so the user can retry.
    BackfillFailed {
        /// Panel slot.
        slot: usize,
        /// Generation the fetch was issued for.
        generation: u64,
    },

    /// The credential was rejected; the user must re-authenticate.
    AuthRejected,

    /// A user-initiated remote operation (send, like, delete, upload)
    /// failed.
    OperationFailed {
        /// Conversation the operation targeted.
        conversation: switchboard_core::ConversationId,
        /// Short human-readable description for the failure toast.
        what: String,
    },

    /// The team-status side channel returned a page.
    StatusUpdated {
        /// Latest status-channel messages, ascending-ordered.
        messages: Vec<Message>,
    },

    /// A scheduled timer fired.
    TimerFired {
        /// Which timer.
        timer: TimerKind,
    },
}
