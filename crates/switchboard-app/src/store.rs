//! Durable state slices.
//!
//! [`StateStore`] abstracts the string-keyed JSON storage that client state
//! slices are written through to (browser local storage, a settings file, or
//! an in-memory map in tests). Loading is tolerant: a missing or malformed
//! slice decodes to its default rather than failing startup.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use switchboard_core::notify::{AlertWords, SoundConfig};
use switchboard_core::{Approvals, MuteState, PinSet, ReadState, StreamSet};
use tracing::warn;

use crate::PersistSlice;

/// String-keyed JSON storage for persisted state slices.
pub trait StateStore: Send {
    /// Read the raw value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Write `value` under `key`.
    fn set(&mut self, key: &str, value: serde_json::Value);

    /// Remove the value stored under `key`.
    fn remove(&mut self, key: &str);
}

/// All persisted slices, decoded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    /// Last-seen timestamps.
    pub read_state: ReadState,
    /// DM approval decisions.
    pub approvals: Approvals,
    /// Mute flags.
    pub mute: MuteState,
    /// Stream definitions.
    pub streams: StreamSet,
    /// Alert words.
    pub alert_words: AlertWords,
    /// Sound choices.
    pub sounds: SoundConfig,
    /// Pinned conversations.
    pub pins: PinSet,
}

impl PersistedState {
    /// Load every slice from `store`, falling back to defaults for missing or
    /// malformed entries.
    pub fn load(store: &dyn StateStore) -> Self {
        Self {
            read_state: decode_or_default(store, PersistSlice::ReadState),
            approvals: decode_or_default(store, PersistSlice::Approvals),
            mute: decode_or_default(store, PersistSlice::Mute),
            streams: decode_or_default(store, PersistSlice::Streams),
            alert_words: decode_or_default(store, PersistSlice::AlertWords),
            sounds: decode_or_default(store, PersistSlice::Sounds),
            pins: decode_or_default(store, PersistSlice::Pins),
        }
    }
}

fn decode_or_default<T: DeserializeOwned + Default>(store: &dyn StateStore, slice: PersistSlice) -> T {
    let Some(value) = store.get(slice.key()) else {
        return T::default();
    };
    match serde_json::from_value(value) {
        Ok(decoded) => decoded,
        Err(error) => {
            warn!(key = slice.key(), %error, "discarding malformed persisted slice");
            T::default()
        },
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, serde_json::Value>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: serde_json::Value) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use switchboard_core::ConversationId;

    use super::*;

    #[test]
    fn round_trips_read_state() {
        let mut store = MemoryStore::new();
        let mut read_state = ReadState::default();
        read_state.mark_seen(ConversationId::Group("g1".into()), 1_000);

        store.set(
            PersistSlice::ReadState.key(),
            serde_json::to_value(&read_state).unwrap(),
        );

        let loaded = PersistedState::load(&store);
        assert_eq!(loaded.read_state, read_state);
    }

    #[test]
    fn malformed_slice_falls_back_to_default() {
        let mut store = MemoryStore::new();
        store.set(PersistSlice::Mute.key(), serde_json::json!("not a mute state"));

        let loaded = PersistedState::load(&store);
        assert_eq!(loaded.mute, MuteState::default());
    }

    #[test]
    fn missing_slices_load_as_defaults() {
        let loaded = PersistedState::load(&MemoryStore::new());
        assert_eq!(loaded, PersistedState::default());
    }
}
