//! Core domain logic for Switchboard
//!
//! Pure types and algorithms for the dashboard's synchronization engine:
//! messages and their ordering, view selectors, fetch planning and merging,
//! dedup memory, read/approval/mute state, and notification dispatch.
//!
//! Everything in this crate is sans-IO: no clocks, no sockets, no storage.
//! The gateway and app crates feed these types with real-world inputs and
//! execute the decisions they produce.
//!
//! # Components
//!
//! - [`Message`], [`ConversationId`], [`ViewSelector`]: the vocabulary shared
//!   by every layer
//! - [`composer`]: view selector -> fetch plan, and result merging
//! - [`KnownIds`]: bounded per-panel dedup memory
//! - [`ReadState`], [`Approvals`], [`MuteState`]: local client state
//! - [`notify`]: mute/alert-word evaluation and the toast queue

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod composer;
mod error;
mod known_ids;
mod message;
mod mute;
pub mod notify;
mod pins;
mod read_state;
mod selector;
mod stream;

pub use error::GatewayError;
pub use known_ids::KnownIds;
pub use message::{Attachment, ConversationId, GroupId, Message, MessageId, UserId};
pub use mute::MuteState;
pub use pins::PinSet;
pub use read_state::{needs_triage, Approval, Approvals, ReadState, DM_TRIAGE_WINDOW_SECS};
pub use selector::{FeedKind, ViewSelector};
pub use stream::{SoundName, StreamDef, StreamSet};
