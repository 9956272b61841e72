//! User-defined stream aggregations.
//!
//! A stream is a named, ordered set of group ids the user wants to watch as
//! one feed. Definitions persist; whether a stream currently contributes to
//! the unified-streams composite (its *monitored* flag) is transient toggle
//! state owned by the app, not part of the definition.

use serde::{Deserialize, Serialize};

use crate::GroupId;

/// Named alert tone. Playback is a platform concern; these are just stable
/// names for configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundName {
    /// Soft default chime.
    #[default]
    Chime,
    /// Short knock, the stock DM tone.
    Knock,
    /// Bright ping.
    Ping,
    /// Low buzz.
    Buzz,
    /// Harsh two-tone siren, used for priority alerts.
    Siren,
}

/// Persisted stream definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDef {
    /// Unique stream name (the user-facing key).
    pub name: String,
    /// Member groups, in the user's chosen order.
    pub member_group_ids: Vec<GroupId>,
    /// Tone played for arrivals in this stream.
    pub alert_sound: SoundName,
}

/// Ordered collection of stream definitions, unique by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSet {
    streams: Vec<StreamDef>,
}

impl StreamSet {
    /// Insert or replace the definition with the same name.
    ///
    /// A replacement keeps its original position; a new stream appends.
    pub fn upsert(&mut self, def: StreamDef) {
        match self.streams.iter_mut().find(|s| s.name == def.name) {
            Some(slot) => *slot = def,
            None => self.streams.push(def),
        }
    }

    /// Remove a stream by name. Returns the removed definition.
    pub fn remove(&mut self, name: &str) -> Option<StreamDef> {
        let idx = self.streams.iter().position(|s| s.name == name)?;
        Some(self.streams.remove(idx))
    }

    /// Look up a stream by name.
    pub fn get(&self, name: &str) -> Option<&StreamDef> {
        self.streams.iter().find(|s| s.name == name)
    }

    /// All definitions in user order.
    pub fn iter(&self) -> impl Iterator<Item = &StreamDef> {
        self.streams.iter()
    }

    /// Number of defined streams.
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Whether no streams are defined.
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, groups: &[&str]) -> StreamDef {
        StreamDef {
            name: name.into(),
            member_group_ids: groups.iter().map(|g| (*g).to_string()).collect(),
            alert_sound: SoundName::Chime,
        }
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut set = StreamSet::default();
        set.upsert(def("ops", &["g1"]));
        set.upsert(def("dispatch", &["g2"]));
        set.upsert(def("ops", &["g1", "g3"]));

        assert_eq!(set.len(), 2);
        let names: Vec<_> = set.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["ops", "dispatch"]);
        assert_eq!(set.get("ops").map(|s| s.member_group_ids.len()), Some(2));
    }

    #[test]
    fn remove_returns_definition() {
        let mut set = StreamSet::default();
        set.upsert(def("ops", &["g1"]));
        assert!(set.remove("ops").is_some());
        assert!(set.remove("ops").is_none());
        assert!(set.is_empty());
    }
}
