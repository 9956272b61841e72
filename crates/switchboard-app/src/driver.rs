//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::future::Future;
use std::time::Duration;

use switchboard_core::SoundName;

use crate::{App, AppEvent, TimerKind};

/// Abstracts I/O operations for the application runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic, so the same
/// orchestration code runs against the real gateway and in simulation.
///
/// # Implementations
///
/// - **Gateway**: [`GatewayDriver`](crate::GatewayDriver) over the HTTP API
/// - **Simulation**: scripted fake with virtual time in tests
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Wait for the next event: a completion of previously submitted I/O or
    /// an elapsed timer.
    ///
    /// Returns `None` when nothing is in flight and no timer is pending,
    /// which tells the runtime to stop.
    ///
    /// # Errors
    ///
    /// Returns an error only for unrecoverable driver faults; per-fetch
    /// failures surface as [`AppEvent`] values instead.
    fn next_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Start a background I/O task; its completion surfaces later through
    /// [`Self::next_event`].
    fn submit(&mut self, task: IoTask);

    /// Arrange for [`AppEvent::TimerFired`] to surface after `delay`.
    ///
    /// Scheduling a timer kind that is already pending replaces it.
    fn schedule(&mut self, timer: TimerKind, delay: Duration);

    /// Play a notification tone. Fire-and-forget.
    fn play_sound(&mut self, sound: SoundName);

    /// Write a persisted slice through to durable storage.
    fn persist(&mut self, key: &str, value: serde_json::Value);

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Current wall-clock time, seconds since the epoch. Virtual in
    /// simulation.
    fn now(&self) -> u64;

    /// Cancel in-flight work and clean up resources.
    fn stop(&mut self);
}

/// A unit of background I/O the runtime hands to the driver.
///
/// Mirrors the I/O-bearing [`crate::AppAction`] variants; the driver decides
/// how to execute each (real HTTP, scripted responses, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoTask {
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
        kind: crate::FetchKind,
        /// Fetches to run.
        plan: switchboard_core::composer::FetchPlan,
    },
    /// Execute a backward history fetch.
    Backfill {
        /// Panel slot.
        slot: usize,
        /// Generation to tag the completion with.
        generation: u64,
        /// The cursor-carrying fetch.
        op: switchboard_core::composer::FetchOp,
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
        attachments: Vec<switchboard_core::Attachment>,
    },
    /// Send a message to a DM counterpart.
    SendDirect {
        /// Counterpart user id.
        user_id: String,
        /// Message text.
        text: String,
        /// Attachments.
        attachments: Vec<switchboard_core::Attachment>,
    },
    /// Like a message.
    Like {
        /// Remote conversation id.
        conversation_id: String,
        /// Message id.
        message_id: String,
    },
    /// Remove a like.
    Unlike {
        /// Remote conversation id.
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
}
