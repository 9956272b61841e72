//! Notification dispatch.
//!
//! Decides, for each new arrival not authored by the current user, whether to
//! emit a sound/toast and at which tier: mute check first, then alert-word
//! matching for the priority tier, else the normal tier with the feed's sound
//! (or the owning stream's tone, or a per-conversation override). Also owns
//! the bounded toast queue.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::{ConversationId, FeedKind, MuteState, SoundName};

/// Display lifetime of a normal-tier toast, seconds.
pub const NORMAL_TOAST_SECS: u64 = 6;

/// Display lifetime of a priority-tier toast, seconds.
pub const PRIORITY_TOAST_SECS: u64 = 12;

/// Maximum outstanding toasts before the oldest is evicted.
pub const TOAST_CAP: usize = 5;

/// Notification urgency tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Regular arrival.
    Normal,
    /// Alert-word match: longer-lived toast, harsher tone.
    Priority,
}

impl Tier {
    /// Toast display duration for this tier.
    pub fn toast_secs(self) -> u64 {
        match self {
            Self::Normal => NORMAL_TOAST_SECS,
            Self::Priority => PRIORITY_TOAST_SECS,
        }
    }
}

/// Configured alert words: a global list plus per-conversation extras.
///
/// Matching is case-insensitive substring matching against each word.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertWords {
    /// Words that alert in every conversation.
    pub global: Vec<String>,
    /// Additional words scoped to one conversation.
    pub per_conversation: HashMap<ConversationId, Vec<String>>,
}

impl AlertWords {
    /// Whether `text` matches any word configured globally or for
    /// `conversation`.
    pub fn matches(&self, conversation: &ConversationId, text: &str) -> bool {
        let haystack = text.to_lowercase();
        let scoped = self.per_conversation.get(conversation).map(Vec::as_slice).unwrap_or(&[]);
        self.global
            .iter()
            .chain(scoped)
            .any(|word| !word.is_empty() && haystack.contains(&word.to_lowercase()))
    }
}

/// Sound selection: one tone per feed family plus per-conversation overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundConfig {
    /// Tone for group-feed arrivals.
    pub groups: SoundName,
    /// Tone for DM arrivals.
    pub dms: SoundName,
    /// Tone for unified-streams arrivals.
    pub streams: SoundName,
    /// Per-conversation overrides.
    pub per_conversation: HashMap<ConversationId, SoundName>,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            groups: SoundName::Chime,
            dms: SoundName::Knock,
            streams: SoundName::Ping,
            per_conversation: HashMap::new(),
        }
    }
}

impl SoundConfig {
    /// Tone for a normal-tier arrival in `conversation`.
    ///
    /// `stream_sound` is the owning stream's configured tone, when the
    /// arrival surfaced through a stream view. It beats the feed default;
    /// a per-conversation override beats both.
    pub fn sound_for(
        &self,
        conversation: &ConversationId,
        kind: FeedKind,
        stream_sound: Option<SoundName>,
    ) -> SoundName {
        if let Some(over) = self.per_conversation.get(conversation) {
            return *over;
        }
        if let Some(sound) = stream_sound {
            return sound;
        }
        match kind {
            FeedKind::Groups => self.groups,
            FeedKind::Dms => self.dms,
            FeedKind::Streams => self.streams,
        }
    }
}

/// Dispatch decision for one arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Muted: no sound, no toast.
    Silent,
    /// Emit a toast and play `sound` at `tier`.
    Notify {
        /// Urgency tier.
        tier: Tier,
        /// Tone to play.
        sound: SoundName,
    },
}

/// Evaluate the dispatch decision for a new arrival.
///
/// The caller has already excluded the current user's own messages and
/// blocked counterparts; this only weighs mutes and alert words.
/// `stream_sound` carries the owning stream's tone for arrivals surfaced
/// through a stream view, `None` everywhere else.
pub fn evaluate(
    conversation: &ConversationId,
    kind: FeedKind,
    stream_sound: Option<SoundName>,
    text: Option<&str>,
    mute: &MuteState,
    words: &AlertWords,
    sounds: &SoundConfig,
) -> Verdict {
    if mute.is_effectively_muted(conversation, kind) {
        return Verdict::Silent;
    }
    let alerted = text.is_some_and(|t| words.matches(conversation, t));
    if alerted {
        Verdict::Notify { tier: Tier::Priority, sound: SoundName::Siren }
    } else {
        let sound = sounds.sound_for(conversation, kind, stream_sound);
        Verdict::Notify { tier: Tier::Normal, sound }
    }
}

/// Ephemeral toast record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Conversation the arrival belongs to.
    pub conversation: ConversationId,
    /// Display name of the source (group name, counterpart name, stream).
    pub source_name: String,
    /// Sender's display name.
    pub sender_name: String,
    /// Message text, empty for attachment-only messages.
    pub text: String,
    /// Message timestamp, seconds.
    pub created_at: u64,
    /// Urgency tier.
    pub tier: Tier,
}

#[derive(Debug, Clone)]
struct QueuedToast {
    toast: Toast,
    expires_at: u64,
}

/// Bounded queue of outstanding toasts, oldest evicted on overflow.
#[derive(Debug, Clone)]
pub struct ToastQueue {
    queue: VecDeque<QueuedToast>,
    cap: usize,
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastQueue {
    /// Create an empty queue with the default cap.
    pub fn new() -> Self {
        Self::with_cap(TOAST_CAP)
    }

    /// Create an empty queue with an explicit cap (minimum 1).
    pub fn with_cap(cap: usize) -> Self {
        Self { queue: VecDeque::new(), cap: cap.max(1) }
    }

    /// Push a toast as of `now`, evicting the oldest if over cap.
    pub fn push(&mut self, toast: Toast, now: u64) {
        let expires_at = now + toast.tier.toast_secs();
        self.queue.push_back(QueuedToast { toast, expires_at });
        while self.queue.len() > self.cap {
            self.queue.pop_front();
        }
    }

    /// Drop toasts whose display duration has elapsed.
    pub fn expire(&mut self, now: u64) {
        self.queue.retain(|q| q.expires_at > now);
    }

    /// Dismiss the toast at `index` (as returned by [`Self::iter`]).
    pub fn dismiss(&mut self, index: usize) -> Option<Toast> {
        self.queue.remove(index).map(|q| q.toast)
    }

    /// Outstanding toasts, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.queue.iter().map(|q| &q.toast)
    }

    /// Number of outstanding toasts.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no toasts are outstanding.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: &str) -> ConversationId {
        ConversationId::Group(id.into())
    }

    fn toast(text: &str, tier: Tier) -> Toast {
        Toast {
            conversation: group("g1"),
            source_name: "ops".into(),
            sender_name: "ana".into(),
            text: text.into(),
            created_at: 100,
            tier,
        }
    }

    #[test]
    fn global_mute_silences_all() {
        let mute = MuteState { global: true, ..MuteState::default() };
        let verdict = evaluate(
            &group("g1"),
            FeedKind::Groups,
            None,
            Some("code red"),
            &mute,
            &AlertWords { global: vec!["code red".into()], ..AlertWords::default() },
            &SoundConfig::default(),
        );
        assert_eq!(verdict, Verdict::Silent);
    }

    #[test]
    fn unmuted_conversations_still_notify_when_another_is_muted() {
        let mut mute = MuteState::default();
        mute.toggle_conversation(group("g1"));

        let words = AlertWords::default();
        let sounds = SoundConfig::default();

        assert_eq!(
            evaluate(&group("g1"), FeedKind::Groups, None, Some("hi"), &mute, &words, &sounds),
            Verdict::Silent
        );
        assert!(matches!(
            evaluate(&group("g2"), FeedKind::Groups, None, Some("hi"), &mute, &words, &sounds),
            Verdict::Notify { tier: Tier::Normal, .. }
        ));
    }

    #[test]
    fn alert_word_match_is_case_insensitive_substring() {
        let words = AlertWords { global: vec!["Backup".into()], ..AlertWords::default() };
        assert!(words.matches(&group("g1"), "need BACKUP at dock 4"));
        assert!(!words.matches(&group("g1"), "all quiet"));
    }

    #[test]
    fn scoped_alert_words_apply_to_their_conversation_only() {
        let mut words = AlertWords::default();
        words.per_conversation.insert(group("g1"), vec!["dock".into()]);
        assert!(words.matches(&group("g1"), "meet at the dock"));
        assert!(!words.matches(&group("g2"), "meet at the dock"));
    }

    #[test]
    fn alert_match_dispatches_priority_with_siren() {
        let words = AlertWords { global: vec!["mayday".into()], ..AlertWords::default() };
        let verdict = evaluate(
            &group("g1"),
            FeedKind::Groups,
            None,
            Some("MAYDAY on channel 2"),
            &MuteState::default(),
            &words,
            &SoundConfig::default(),
        );
        assert_eq!(verdict, Verdict::Notify { tier: Tier::Priority, sound: SoundName::Siren });
    }

    #[test]
    fn per_conversation_sound_override_wins() {
        let mut sounds = SoundConfig::default();
        sounds.per_conversation.insert(group("g1"), SoundName::Buzz);

        assert_eq!(sounds.sound_for(&group("g1"), FeedKind::Groups, None), SoundName::Buzz);
        assert_eq!(sounds.sound_for(&group("g2"), FeedKind::Groups, None), SoundName::Chime);
    }

    #[test]
    fn stream_sound_beats_the_feed_default_but_not_an_override() {
        let mut sounds = SoundConfig::default();
        assert_eq!(
            sounds.sound_for(&group("g1"), FeedKind::Streams, Some(SoundName::Buzz)),
            SoundName::Buzz
        );

        sounds.per_conversation.insert(group("g1"), SoundName::Knock);
        assert_eq!(
            sounds.sound_for(&group("g1"), FeedKind::Streams, Some(SoundName::Buzz)),
            SoundName::Knock
        );
    }

    #[test]
    fn attachment_only_messages_never_match_alert_words() {
        let words = AlertWords { global: vec!["x".into()], ..AlertWords::default() };
        let verdict = evaluate(
            &group("g1"),
            FeedKind::Groups,
            None,
            None,
            &MuteState::default(),
            &words,
            &SoundConfig::default(),
        );
        assert!(matches!(verdict, Verdict::Notify { tier: Tier::Normal, .. }));
    }

    #[test]
    fn toast_queue_evicts_oldest_over_cap() {
        let mut queue = ToastQueue::with_cap(2);
        queue.push(toast("one", Tier::Normal), 0);
        queue.push(toast("two", Tier::Normal), 1);
        queue.push(toast("three", Tier::Normal), 2);

        let texts: Vec<_> = queue.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["two", "three"]);
    }

    #[test]
    fn priority_toasts_outlive_normal_ones() {
        let mut queue = ToastQueue::new();
        queue.push(toast("normal", Tier::Normal), 0);
        queue.push(toast("priority", Tier::Priority), 0);

        queue.expire(NORMAL_TOAST_SECS + 1);
        let texts: Vec<_> = queue.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["priority"]);

        queue.expire(PRIORITY_TOAST_SECS + 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn dismiss_removes_by_position() {
        let mut queue = ToastQueue::new();
        queue.push(toast("a", Tier::Normal), 0);
        queue.push(toast("b", Tier::Normal), 0);

        let removed = queue.dismiss(0);
        assert_eq!(removed.map(|t| t.text), Some("a".into()));
        assert_eq!(queue.len(), 1);
    }
}
