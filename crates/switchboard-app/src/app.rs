//! Application state machine.
//!
//! [`App`] is the stateful core of the dashboard: it owns the panel slots,
//! all local client state (read tracking, approvals, mutes, pins, streams,
//! alert words, sounds, toasts), and the connectivity flag.
//!
//! It is a pure state machine: it consumes [`crate::AppEvent`] inputs plus
//! user-intent method calls and produces [`crate::AppAction`] instructions
//! for the runtime to execute. No I/O, no clock: the caller passes `now`.

use std::collections::{BTreeMap, HashSet};

use switchboard_core::composer::{self, FetchPhase, Roster, RosterEntry};
use switchboard_core::notify::{self, AlertWords, SoundConfig, Tier, Toast, ToastQueue, Verdict};
use switchboard_core::{
    needs_triage, Approval, Approvals, Attachment, ConversationId, FeedKind, GroupId, Message,
    MuteState, PinSet, ReadState, SoundName, StreamDef, StreamSet, UserId, ViewSelector,
};
use switchboard_gateway::User;

use crate::panel::{Panel, PollOutcome, PANEL_COUNT};
use crate::store::PersistedState;
use crate::{AppAction, AppEvent, FetchKind, PersistSlice, TimerKind};

/// Consecutive failed fetch cycles before the connectivity indicator flips.
pub const DISCONNECT_THRESHOLD: u32 = 3;

/// Static configuration for the app.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Optional "team status" side-channel group, polled on its own loop.
    pub status_group_id: Option<GroupId>,
}

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App {
    /// The authenticated user, once resolved.
    current_user: Option<User>,
    /// Panel slots; slot 0 is primary and always live.
    panels: [Option<Panel>; PANEL_COUNT],
    /// Group/DM listings for fan-out ranking and display names.
    roster: Roster,
    /// Last-seen timestamps.
    read_state: ReadState,
    /// DM approval decisions.
    approvals: Approvals,
    /// Mute flags.
    mute: MuteState,
    /// Stream definitions.
    streams: StreamSet,
    /// Streams currently contributing to the unified composite (transient).
    monitored: Vec<String>,
    /// Alert words.
    alert_words: AlertWords,
    /// Sound choices.
    sounds: SoundConfig,
    /// Pinned conversations.
    pins: PinSet,
    /// Outstanding toasts.
    toasts: ToastQueue,
    /// DM counterparts we have written to (drives triage).
    outbound_dm_partners: HashSet<UserId>,
    /// Team-status side channel, if configured.
    status_group_id: Option<GroupId>,
    /// Latest status message per author.
    status_board: BTreeMap<UserId, Message>,
    /// Consecutive failed fetch cycles.
    consecutive_failures: u32,
    /// Binary connectivity indicator.
    disconnected: bool,
    /// Credential was rejected; user must re-authenticate.
    logged_out: bool,
    /// Monotonic generation counter for fetch tagging.
    next_generation: u64,
}

impl App {
    /// Create an app with slot 0 bound to the unified feed.
    pub fn new(config: AppConfig, persisted: PersistedState) -> Self {
        let mut panels: [Option<Panel>; PANEL_COUNT] = [None, None, None];
        panels[0] = Some(Panel::new(ViewSelector::AllFeed, 1));
        Self {
            current_user: None,
            panels,
            roster: Roster::default(),
            read_state: persisted.read_state,
            approvals: persisted.approvals,
            mute: persisted.mute,
            streams: persisted.streams,
            monitored: Vec::new(),
            alert_words: persisted.alert_words,
            sounds: persisted.sounds,
            pins: persisted.pins,
            toasts: ToastQueue::new(),
            outbound_dm_partners: HashSet::new(),
            status_group_id: config.status_group_id,
            status_board: BTreeMap::new(),
            consecutive_failures: 0,
            disconnected: false,
            logged_out: false,
            next_generation: 1,
        }
    }

    /// Startup actions: resolve the user and the roster.
    pub fn boot(&self) -> Vec<AppAction> {
        vec![AppAction::LoadUser, AppAction::LoadRoster, AppAction::Render]
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent, now: u64) -> Vec<AppAction> {
        self.toasts.expire(now);
        match event {
            AppEvent::UserLoaded { user } => {
                self.current_user = Some(user);
                vec![AppAction::Render]
            },
            AppEvent::RosterLoaded { groups, chats } => {
                self.roster = Roster {
                    groups: groups
                        .into_iter()
                        .map(|g| RosterEntry {
                            id: g.id,
                            name: g.name,
                            last_activity_at: g.updated_at,
                        })
                        .collect(),
                    dms: chats
                        .into_iter()
                        .map(|c| RosterEntry {
                            id: c.other_user_id,
                            name: c.other_user_name,
                            last_activity_at: c.updated_at,
                        })
                        .collect(),
                };
                let mut actions = self.refetch_unpopulated_panels();
                actions.push(AppAction::Render);
                actions
            },
            AppEvent::InitialLoaded { slot, generation, messages } => {
                let Some(panel) = self.current_panel_mut(slot, generation) else {
                    return vec![];
                };
                panel.apply_initial(messages);
                self.mark_cycle_success();
                vec![AppAction::Render]
            },
            AppEvent::PollArrived { slot, generation, messages } => {
                let Some(panel) = self.current_panel_mut(slot, generation) else {
                    return vec![];
                };
                let selector = panel.selector().clone();
                let outcome = panel.apply_poll(messages);
                self.mark_cycle_success();
                let mut actions = self.dispatch_arrivals(&outcome, &selector, now);
                actions.push(AppAction::Render);
                actions
            },
            AppEvent::BackfillLoaded { slot, generation, messages } => {
                let Some(panel) = self.current_panel_mut(slot, generation) else {
                    return vec![];
                };
                let _loaded = panel.apply_backfill(messages);
                self.mark_cycle_success();
                vec![AppAction::Render]
            },
            AppEvent::FetchFailed { slot, generation } => {
                if self.current_panel_mut(slot, generation).is_none() {
                    return vec![];
                }
                self.mark_cycle_failure();
                vec![AppAction::Render]
            },
            AppEvent::BackfillFailed { slot, generation } => {
                let Some(panel) = self.current_panel_mut(slot, generation) else {
                    return vec![];
                };
                // User-initiated; the disconnect counter tracks poll cycles
                // only.
                panel.cancel_backfill();
                vec![AppAction::Render]
            },
            AppEvent::AuthRejected => {
                self.logged_out = true;
                vec![AppAction::Render]
            },
            AppEvent::OperationFailed { conversation, what } => {
                let source_name = self.conversation_display_name(&conversation);
                self.toasts.push(
                    Toast {
                        conversation,
                        source_name,
                        sender_name: String::new(),
                        text: what,
                        created_at: now,
                        tier: Tier::Normal,
                    },
                    now,
                );
                vec![AppAction::Render]
            },
            AppEvent::StatusUpdated { messages } => {
                for message in messages {
                    let keep = self
                        .status_board
                        .get(&message.author_id)
                        .is_none_or(|prev| prev.sort_key() < message.sort_key());
                    if keep {
                        self.status_board.insert(message.author_id.clone(), message);
                    }
                }
                vec![AppAction::Render]
            },
            AppEvent::TimerFired { timer } => self.handle_timer(timer),
        }
    }

    fn handle_timer(&mut self, timer: TimerKind) -> Vec<AppAction> {
        match timer {
            TimerKind::PanelPoll(slot) => {
                let Some(panel) = self.panels.get(slot).and_then(Option::as_ref) else {
                    return vec![];
                };
                let plan = composer::plan(
                    panel.selector(),
                    FetchPhase::Poll,
                    &self.roster,
                    &self.approvals,
                    &self.streams,
                    &self.monitored,
                );
                vec![AppAction::Fetch {
                    slot,
                    generation: panel.generation(),
                    kind: FetchKind::Poll,
                    plan,
                }]
            },
            TimerKind::Roster => vec![AppAction::LoadRoster],
            TimerKind::Status => match &self.status_group_id {
                Some(group_id) => vec![AppAction::FetchStatus { group_id: group_id.clone() }],
                None => vec![],
            },
        }
    }

    // ---- user intents -----------------------------------------------------

    /// Bind `slot` to a new selector.
    ///
    /// Re-keys the panel (fresh generation, empty collection and KnownIds)
    /// and, for concrete conversations, marks the conversation seen exactly
    /// once. In-flight fetches for the old binding become stale.
    pub fn switch_view(&mut self, slot: usize, selector: ViewSelector, now: u64) -> Vec<AppAction> {
        if slot >= PANEL_COUNT {
            return vec![];
        }
        let generation = self.bump_generation();
        let plan = composer::plan(
            &selector,
            FetchPhase::Initial,
            &self.roster,
            &self.approvals,
            &self.streams,
            &self.monitored,
        );
        let mut actions = Vec::new();
        if let Some(conversation) = selector.conversation() {
            self.read_state.mark_seen(conversation, now);
            actions.push(AppAction::Persist(PersistSlice::ReadState));
        }
        self.panels[slot] = Some(Panel::new(selector, generation));
        actions.push(AppAction::Fetch { slot, generation, kind: FetchKind::Initial, plan });
        actions.push(AppAction::Render);
        actions
    }

    /// Close a secondary panel. Slot 0 cannot be closed.
    pub fn close_panel(&mut self, slot: usize) -> Vec<AppAction> {
        if slot == 0 || slot >= PANEL_COUNT {
            return vec![];
        }
        self.panels[slot] = None;
        vec![AppAction::Render]
    }

    /// Request backward history for a single-conversation panel.
    pub fn request_backfill(&mut self, slot: usize) -> Vec<AppAction> {
        let Some(panel) = self.panels.get_mut(slot).and_then(Option::as_mut) else {
            return vec![];
        };
        if panel.loading_more() || panel.no_more_history() {
            return vec![];
        }
        let Some(oldest) = panel.oldest_id().cloned() else {
            return vec![];
        };
        let Some(op) = composer::backfill_op(panel.selector(), oldest) else {
            return vec![];
        };
        panel.begin_backfill();
        vec![
            AppAction::Backfill { slot, generation: panel.generation(), op },
            AppAction::Render,
        ]
    }

    /// Send a message to a group. Empty submissions are rejected locally.
    pub fn send_group_message(
        &mut self,
        group_id: GroupId,
        text: String,
        attachments: Vec<Attachment>,
        now: u64,
    ) -> Vec<AppAction> {
        if !self.validate_outgoing(&ConversationId::Group(group_id.clone()), &text, &attachments, now)
        {
            return vec![AppAction::Render];
        }
        vec![AppAction::SendGroup { group_id, text, attachments }]
    }

    /// Send a message to a DM counterpart. Empty submissions are rejected
    /// locally; a successful submission records the counterpart as written-to
    /// for triage purposes.
    pub fn send_direct_message(
        &mut self,
        user_id: UserId,
        text: String,
        attachments: Vec<Attachment>,
        now: u64,
    ) -> Vec<AppAction> {
        if !self.validate_outgoing(&ConversationId::Dm(user_id.clone()), &text, &attachments, now) {
            return vec![AppAction::Render];
        }
        self.outbound_dm_partners.insert(user_id.clone());
        vec![AppAction::SendDirect { user_id, text, attachments }]
    }

    /// Like a message.
    pub fn like(&self, conversation_id: String, message_id: String) -> Vec<AppAction> {
        vec![AppAction::Like { conversation_id, message_id }]
    }

    /// Remove a like.
    pub fn unlike(&self, conversation_id: String, message_id: String) -> Vec<AppAction> {
        vec![AppAction::Unlike { conversation_id, message_id }]
    }

    /// Delete a group message.
    pub fn delete_message(&self, group_id: GroupId, message_id: String) -> Vec<AppAction> {
        vec![AppAction::DeleteMessage { group_id, message_id }]
    }

    /// Record a DM approval decision.
    pub fn set_approval(&mut self, user_id: UserId, approval: Approval) -> Vec<AppAction> {
        self.approvals.set(user_id, approval);
        vec![AppAction::Persist(PersistSlice::Approvals), AppAction::Render]
    }

    /// Toggle the mute flag for one conversation.
    pub fn toggle_mute_conversation(&mut self, conversation: ConversationId) -> Vec<AppAction> {
        self.mute.toggle_conversation(conversation);
        vec![AppAction::Persist(PersistSlice::Mute), AppAction::Render]
    }

    /// Toggle a feed-family mute flag.
    pub fn toggle_mute_feed(&mut self, kind: FeedKind) -> Vec<AppAction> {
        self.mute.toggle_feed(kind);
        vec![AppAction::Persist(PersistSlice::Mute), AppAction::Render]
    }

    /// Set the global mute kill-switch.
    pub fn set_global_mute(&mut self, muted: bool) -> Vec<AppAction> {
        self.mute.global = muted;
        vec![AppAction::Persist(PersistSlice::Mute), AppAction::Render]
    }

    /// Replace the global alert-word list.
    pub fn set_alert_words(&mut self, words: Vec<String>) -> Vec<AppAction> {
        self.alert_words.global = words;
        vec![AppAction::Persist(PersistSlice::AlertWords), AppAction::Render]
    }

    /// Replace the alert words scoped to one conversation.
    pub fn set_conversation_alert_words(
        &mut self,
        conversation: ConversationId,
        words: Vec<String>,
    ) -> Vec<AppAction> {
        if words.is_empty() {
            self.alert_words.per_conversation.remove(&conversation);
        } else {
            self.alert_words.per_conversation.insert(conversation, words);
        }
        vec![AppAction::Persist(PersistSlice::AlertWords), AppAction::Render]
    }

    /// Override the tone for one conversation, or clear the override.
    pub fn set_conversation_sound(
        &mut self,
        conversation: ConversationId,
        sound: Option<SoundName>,
    ) -> Vec<AppAction> {
        match sound {
            Some(sound) => {
                self.sounds.per_conversation.insert(conversation, sound);
            },
            None => {
                self.sounds.per_conversation.remove(&conversation);
            },
        }
        vec![AppAction::Persist(PersistSlice::Sounds), AppAction::Render]
    }

    /// Toggle the pin flag for one conversation.
    pub fn toggle_pin(&mut self, conversation: ConversationId) -> Vec<AppAction> {
        self.pins.toggle(conversation);
        vec![AppAction::Persist(PersistSlice::Pins), AppAction::Render]
    }

    /// Create or replace a stream definition.
    pub fn upsert_stream(&mut self, def: StreamDef) -> Vec<AppAction> {
        self.streams.upsert(def);
        vec![AppAction::Persist(PersistSlice::Streams), AppAction::Render]
    }

    /// Delete a stream definition; it also stops being monitored.
    pub fn remove_stream(&mut self, name: &str) -> Vec<AppAction> {
        self.streams.remove(name);
        self.monitored.retain(|m| m != name);
        vec![AppAction::Persist(PersistSlice::Streams), AppAction::Render]
    }

    /// Toggle whether a stream contributes to the unified composite.
    ///
    /// Membership of the composite changed, so any unified-streams panel is
    /// re-keyed like a selector switch (fresh generation and dedup memory).
    pub fn toggle_monitor(&mut self, name: &str, now: u64) -> Vec<AppAction> {
        if self.streams.get(name).is_none() {
            return vec![];
        }
        if self.monitored.iter().any(|m| m == name) {
            self.monitored.retain(|m| m != name);
        } else {
            self.monitored.push(name.to_string());
        }

        let unified_slots: Vec<usize> = self
            .panels
            .iter()
            .enumerate()
            .filter_map(|(slot, panel)| {
                panel
                    .as_ref()
                    .filter(|p| matches!(p.selector(), ViewSelector::UnifiedStreams))
                    .map(|_| slot)
            })
            .collect();

        let mut actions = Vec::new();
        for slot in unified_slots {
            actions.extend(self.switch_view(slot, ViewSelector::UnifiedStreams, now));
        }
        if actions.is_empty() {
            actions.push(AppAction::Render);
        }
        actions
    }

    /// Dismiss the toast at `index`.
    pub fn dismiss_toast(&mut self, index: usize) -> Vec<AppAction> {
        self.toasts.dismiss(index);
        vec![AppAction::Render]
    }

    // ---- read-only surface ------------------------------------------------

    /// The authenticated user, once resolved.
    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    /// Panel state for `slot`. `None` when the slot is closed.
    pub fn panel(&self, slot: usize) -> Option<&Panel> {
        self.panels.get(slot).and_then(Option::as_ref)
    }

    /// Outstanding toasts, oldest first.
    pub fn toasts(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    /// Binary connectivity indicator.
    pub fn disconnected(&self) -> bool {
        self.disconnected
    }

    /// Whether the credential was rejected and the user must re-login.
    pub fn logged_out(&self) -> bool {
        self.logged_out
    }

    /// Whether a conversation whose latest message is at `latest_ts` is
    /// unread.
    pub fn is_unread(&self, conversation: &ConversationId, latest_ts: u64) -> bool {
        self.read_state.is_unread(conversation, latest_ts)
    }

    /// DM counterparts needing triage, per the policy in
    /// [`switchboard_core::needs_triage`].
    ///
    /// The roster's last-activity timestamp stands in for the latest inbound
    /// message time.
    pub fn pending_dm_triage(&self, now: u64) -> Vec<&RosterEntry> {
        self.roster
            .dms
            .iter()
            .filter(|entry| {
                needs_triage(
                    &self.approvals,
                    &entry.id,
                    entry.last_activity_at,
                    self.outbound_dm_partners.contains(&entry.id),
                    now,
                )
            })
            .collect()
    }

    /// Latest status message per author from the side channel.
    pub fn status_board(&self) -> impl Iterator<Item = (&UserId, &Message)> {
        self.status_board.iter()
    }

    /// Current roster listings.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Stream definitions.
    pub fn streams(&self) -> &StreamSet {
        &self.streams
    }

    /// Names of streams currently monitored into the unified composite.
    pub fn monitored(&self) -> &[String] {
        &self.monitored
    }

    /// Whether `conversation` is pinned.
    pub fn is_pinned(&self, conversation: &ConversationId) -> bool {
        self.pins.is_pinned(conversation)
    }

    /// Serialize a persisted slice for write-through.
    pub fn slice_value(&self, slice: PersistSlice) -> serde_json::Value {
        let result = match slice {
            PersistSlice::ReadState => serde_json::to_value(&self.read_state),
            PersistSlice::Approvals => serde_json::to_value(&self.approvals),
            PersistSlice::Mute => serde_json::to_value(&self.mute),
            PersistSlice::Streams => serde_json::to_value(&self.streams),
            PersistSlice::AlertWords => serde_json::to_value(&self.alert_words),
            PersistSlice::Sounds => serde_json::to_value(&self.sounds),
            PersistSlice::Pins => serde_json::to_value(&self.pins),
        };
        result.unwrap_or(serde_json::Value::Null)
    }

    // ---- internals --------------------------------------------------------

    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn current_panel_mut(&mut self, slot: usize, generation: u64) -> Option<&mut Panel> {
        self.panels
            .get_mut(slot)
            .and_then(Option::as_mut)
            .filter(|p| p.is_current(generation))
    }

    fn mark_cycle_success(&mut self) {
        self.consecutive_failures = 0;
        self.disconnected = false;
    }

    fn mark_cycle_failure(&mut self) {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= DISCONNECT_THRESHOLD {
            self.disconnected = true;
        }
    }

    /// Initial fetches for panels that have never been populated, issued
    /// when the roster (which composite fan-out depends on) becomes
    /// available.
    fn refetch_unpopulated_panels(&mut self) -> Vec<AppAction> {
        let mut actions = Vec::new();
        for slot in 0..PANEL_COUNT {
            let Some(panel) = self.panels.get(slot).and_then(Option::as_ref) else {
                continue;
            };
            if !panel.is_pristine() {
                continue;
            }
            let plan = composer::plan(
                panel.selector(),
                FetchPhase::Initial,
                &self.roster,
                &self.approvals,
                &self.streams,
                &self.monitored,
            );
            if !plan.ops.is_empty() {
                actions.push(AppAction::Fetch {
                    slot,
                    generation: panel.generation(),
                    kind: FetchKind::Initial,
                    plan,
                });
            }
        }
        actions
    }

    /// Forward a poll cycle's new arrivals to notification dispatch.
    ///
    /// Toasts are per arrival; at most one tone plays per cycle, the
    /// priority siren winning over any normal-tier sound.
    fn dispatch_arrivals(
        &mut self,
        outcome: &PollOutcome,
        selector: &ViewSelector,
        now: u64,
    ) -> Vec<AppAction> {
        let Some(me) = self.current_user.clone() else {
            return vec![];
        };
        let panel_kind = selector.feed_kind();

        let mut cycle_sound: Option<(Tier, SoundName)> = None;
        for message in &outcome.new_arrivals {
            if message.author_id == me.id {
                if let Some(recipient) = &message.recipient_id {
                    self.outbound_dm_partners.insert(recipient.clone());
                }
                continue;
            }
            let Some(conversation) = message.conversation(&me.id) else {
                continue;
            };
            if let ConversationId::Dm(user) = &conversation {
                if self.approvals.is_blocked(user) {
                    continue;
                }
            }

            // DM arrivals surfacing in a composite panel still belong to the
            // DM feed family for mute and sound purposes.
            let kind = match &conversation {
                ConversationId::Dm(_) => FeedKind::Dms,
                ConversationId::Group(_) | ConversationId::Stream(_) => panel_kind,
            };
            let stream_sound = self.owning_stream_sound(selector, &conversation);

            let verdict = notify::evaluate(
                &conversation,
                kind,
                stream_sound,
                message.text.as_deref(),
                &self.mute,
                &self.alert_words,
                &self.sounds,
            );
            let Verdict::Notify { tier, sound } = verdict else {
                continue;
            };

            let source_name = self.conversation_display_name(&conversation);
            self.toasts.push(
                Toast {
                    conversation,
                    source_name,
                    sender_name: message.author_name.clone(),
                    text: message.text.clone().unwrap_or_default(),
                    created_at: message.created_at,
                    tier,
                },
                now,
            );

            let better = match cycle_sound {
                None => true,
                Some((Tier::Normal, _)) => tier == Tier::Priority,
                Some((Tier::Priority, _)) => false,
            };
            if better {
                cycle_sound = Some((tier, sound));
            }
        }

        cycle_sound.map(|(_, sound)| AppAction::PlaySound(sound)).into_iter().collect()
    }

    /// The configured tone of the stream an arrival surfaced through, for
    /// group arrivals in stream views. For the unified composite the first
    /// monitored stream (in user order) containing the group wins.
    fn owning_stream_sound(
        &self,
        selector: &ViewSelector,
        conversation: &ConversationId,
    ) -> Option<SoundName> {
        let ConversationId::Group(group_id) = conversation else {
            return None;
        };
        match selector {
            ViewSelector::Stream(name) => self.streams.get(name).map(|s| s.alert_sound),
            ViewSelector::UnifiedStreams => self
                .monitored
                .iter()
                .filter_map(|name| self.streams.get(name))
                .find(|s| s.member_group_ids.contains(group_id))
                .map(|s| s.alert_sound),
            _ => None,
        }
    }

    fn conversation_display_name(&self, conversation: &ConversationId) -> String {
        let found = match conversation {
            ConversationId::Group(id) => {
                self.roster.groups.iter().find(|g| &g.id == id).map(|g| g.name.clone())
            },
            ConversationId::Dm(id) => {
                self.roster.dms.iter().find(|d| &d.id == id).map(|d| d.name.clone())
            },
            ConversationId::Stream(name) => Some(name.clone()),
        };
        found.unwrap_or_else(|| conversation.storage_key())
    }

    fn validate_outgoing(
        &mut self,
        conversation: &ConversationId,
        text: &str,
        attachments: &[Attachment],
        now: u64,
    ) -> bool {
        if !text.trim().is_empty() || !attachments.is_empty() {
            return true;
        }
        let source_name = self.conversation_display_name(conversation);
        self.toasts.push(
            Toast {
                conversation: conversation.clone(),
                source_name,
                sender_name: String::new(),
                text: "cannot send an empty message".into(),
                created_at: now,
                tier: Tier::Normal,
            },
            now,
        );
        false
    }
}
