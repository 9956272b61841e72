//! Conversation gateway for Switchboard
//!
//! Single chokepoint for every remote call the dashboard makes. Owns the
//! bearer credential, a two-lane FIFO concurrency throttle with request
//! pacing, and bounded retry-with-backoff on rate-limit responses.
//!
//! # Components
//!
//! - [`ConversationApi`]: object-safe async trait mirroring the remote
//!   service's operations; the sync engine only ever sees this seam
//! - [`HttpGateway`]: reqwest-backed implementation
//! - [`Throttle`]: in-flight cap plus minimum inter-request-start gap

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod api;
mod http;
mod throttle;
mod wire;

pub use api::{ConversationApi, DirectChat, GroupInfo, User};
pub use http::{HttpGateway, DEFAULT_BASE_URL};
pub use throttle::{Throttle, MAX_IN_FLIGHT, MIN_START_GAP};
