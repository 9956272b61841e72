//! Application side-effects and intents.
//!
//! This module defines [`AppAction`], the instructions produced by the
//! [`crate::App`] state machine for the runtime to execute, plus the small
//! enums shared between actions and events ([`TimerKind`], [`PersistSlice`],
//! [`FetchKind`]).

use switchboard_core::composer::{FetchOp, FetchPlan};
use switchboard_core::{Attachment, SoundName};

/// Why a fetch plan is being executed; determines which completion event the
/// driver reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Wholesale (re)population of a panel.
    Initial,
    /// Lightweight recurring refresh.
    Poll,
}

/// Timers the runtime schedules on the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// A panel's next poll cycle is due.
    PanelPoll(usize),
    /// The roster listing refresh is due.
    Roster,
    /// The team-status side channel poll is due.
    Status,
}

/// Persisted state slice that changed and must be written through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistSlice {
    /// Last-seen timestamps.
    ReadState,
    /// DM approval decisions.
    Approvals,
    /// Mute flags.
    Mute,
    /// Stream definitions.
    Streams,
    /// Alert words.
    AlertWords,
    /// Sound choices.
    Sounds,
    /// Pinned conversations.
    Pins,
}

impl PersistSlice {
    /// Storage key for this slice.
    pub fn key(self) -> &'static str {
        match self {
            Self::ReadState => "read_state",
            Self::Approvals => "approvals",
            Self::Mute => "mute",
            Self::Streams => "streams",
            Self::AlertWords => "alert_words",
            Self::Sounds => "sounds",
            Self::Pins => "pins",
        }
    }
}

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Resolve the authenticated user.
    LoadUser,

    /// Refresh group and DM listings.
    LoadRoster,

    /// Execute a fetch plan for a panel.
    Fetch {
        /// Panel slot.
        slot: usize,
        /// Generation to tag the completion with.
        generation: u64,
        /// Initial or poll.
        kind: FetchKind,
        /// Fetches to run; individual failures contribute nothing.
        plan: FetchPlan,
    },

    /// Execute a backward history fetch for a panel.
    Backfill {
        /// Panel slot.
        slot: usize,
        /// Generation to tag the completion with.
        generation: u64,
        /// The cursor-carrying fetch.
        op: FetchOp,
    },

    /// Poll the team-status side channel.
    FetchStatus {
        /// Status conversation group id.
        group_id: String,
    },

    /// Send a message to a group.
    SendGroup {
        /// Target group.
        group_id: String,
        /// Message text.
        text: String,
        /// Attachments.
        attachments: Vec<Attachment>,
    },

    /// Send a message to a DM counterpart.
    SendDirect {
        /// Counterpart user id.
        user_id: String,
        /// Message text.
        text: String,
        /// Attachments.
        attachments: Vec<Attachment>,
    },

    /// Like a message.
    Like {
        /// Remote conversation id the message lives in.
        conversation_id: String,
        /// Message id.
        message_id: String,
    },

    /// Remove a like.
    Unlike {
        /// Remote conversation id the message lives in.
        conversation_id: String,
        /// Message id.
        message_id: String,
    },

    /// Delete a group message.
    DeleteMessage {
        /// Owning group.
        group_id: String,
        /// Message id.
        message_id: String,
    },

    /// Play a notification tone.
    PlaySound(SoundName),

    /// Write a changed state slice through to durable storage.
    Persist(PersistSlice),
}
