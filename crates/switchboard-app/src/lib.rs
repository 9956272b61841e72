//! Application layer for Switchboard
//!
//! Pure state machine and generic runtime for the multi-panel dashboard,
//! enabling deterministic simulation testing with the same code that runs in
//! production.
//!
//! # Components
//!
//! - [`App`]: dashboard state machine (panels, read state, notifications)
//! - [`Panel`]: per-slot collection, dedup memory, and fetch generation
//! - [`Driver`]: trait for platform-specific I/O abstraction
//! - [`GatewayDriver`]: production driver over the HTTP gateway
//! - [`Runtime`]: generic orchestration loop using Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod driver;
mod event;
mod gateway_driver;
mod panel;
mod runtime;
mod store;

pub use action::{AppAction, FetchKind, PersistSlice, TimerKind};
pub use app::{App, AppConfig, DISCONNECT_THRESHOLD};
pub use driver::{Driver, IoTask};
pub use event::AppEvent;
pub use gateway_driver::{DriverError, GatewayDriver, NullSounds, SoundPlayer};
pub use panel::{Panel, PollOutcome, PANEL_COUNT};
pub use runtime::{Runtime, POLL_INTERVAL, ROSTER_INTERVAL, STATUS_INTERVAL};
pub use store::{MemoryStore, PersistedState, StateStore};
