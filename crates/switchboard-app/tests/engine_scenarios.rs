//! End-to-end scenarios for the sync engine.
//!
//! A scripted driver feeds pre-recorded events to the runtime and records
//! every side effect (submitted I/O, timers, sounds, persisted slices), so
//! tests assert on the full observable behavior of a session.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use switchboard_app::{
    App, AppAction, AppConfig, AppEvent, Driver, FetchKind, IoTask, PersistedState, Runtime,
    TimerKind,
};
use switchboard_core::composer::FetchTarget;
use switchboard_core::{Message, SoundName, ViewSelector};
use switchboard_gateway::{DirectChat, GroupInfo, User};

/// Everything a session did to the outside world.
#[derive(Debug, Default)]
struct Recording {
    submitted: Vec<IoTask>,
    scheduled: Vec<TimerKind>,
    sounds: Vec<SoundName>,
    persisted: Vec<String>,
    renders: usize,
}

/// Driver that replays a fixed event script and records side effects.
struct ScriptedDriver {
    script: VecDeque<AppEvent>,
    recording: Arc<Mutex<Recording>>,
    now: u64,
}

impl ScriptedDriver {
    fn new(script: Vec<AppEvent>) -> (Self, Arc<Mutex<Recording>>) {
        let recording = Arc::new(Mutex::new(Recording::default()));
        let driver = Self {
            script: script.into(),
            recording: Arc::clone(&recording),
            now: 1_000,
        };
        (driver, recording)
    }

    fn record(&self) -> std::sync::MutexGuard<'_, Recording> {
        match self.recording.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Driver for ScriptedDriver {
    type Error = Infallible;

    async fn next_event(&mut self) -> Result<Option<AppEvent>, Infallible> {
        self.now += 1;
        Ok(self.script.pop_front())
    }

    fn submit(&mut self, task: IoTask) {
        self.record().submitted.push(task);
    }

    fn schedule(&mut self, timer: TimerKind, _delay: Duration) {
        self.record().scheduled.push(timer);
    }

    fn play_sound(&mut self, sound: SoundName) {
        self.record().sounds.push(sound);
    }

    fn persist(&mut self, key: &str, _value: serde_json::Value) {
        self.record().persisted.push(key.to_string());
    }

    fn render(&mut self, _app: &App) -> Result<(), Infallible> {
        self.record().renders += 1;
        Ok(())
    }

    fn now(&self) -> u64 {
        self.now
    }

    fn stop(&mut self) {}
}

fn me() -> User {
    User { id: "me".into(), name: "Me".into() }
}

fn group_info(id: &str, updated_at: u64) -> GroupInfo {
    GroupInfo { id: id.into(), name: format!("group {id}"), updated_at }
}

fn chat(user: &str, updated_at: u64) -> DirectChat {
    DirectChat {
        other_user_id: user.into(),
        other_user_name: user.into(),
        updated_at,
    }
}

fn group_msg(id: &str, ts: u64, author: &str, group: &str, text: &str) -> Message {
    Message {
        id: id.into(),
        created_at: ts,
        author_id: author.into(),
        author_name: author.into(),
        group_id: Some(group.into()),
        recipient_id: None,
        text: Some(text.into()),
        attachments: Vec::new(),
        liked_by: Vec::new(),
    }
}

fn fetch_targets(task: &IoTask) -> Vec<FetchTarget> {
    match task {
        IoTask::Fetch { plan, .. } => plan.ops.iter().map(|op| op.target.clone()).collect(),
        _ => Vec::new(),
    }
}

#[tokio::test]
async fn boot_resolves_user_then_fans_out_initial_fetch() {
    let script = vec![
        AppEvent::UserLoaded { user: me() },
        AppEvent::RosterLoaded {
            groups: vec![group_info("g1", 300), group_info("g2", 200), group_info("g3", 100)],
            chats: vec![chat("u1", 250)],
        },
    ];
    let (driver, recording) = ScriptedDriver::new(script);
    let app = App::new(AppConfig::default(), PersistedState::default());
    let runtime = Runtime::new(driver, app);
    runtime.run().await.unwrap();

    let recording = recording.lock().unwrap();
    assert!(recording.submitted.contains(&IoTask::LoadUser));
    assert!(recording.submitted.contains(&IoTask::LoadRoster));

    // The unified feed's initial fan-out covers all three groups, most recent
    // first, but not the undecided DM counterpart.
    let fetch = recording
        .submitted
        .iter()
        .find(|t| matches!(t, IoTask::Fetch { kind: FetchKind::Initial, slot: 0, .. }))
        .expect("initial fetch for slot 0");
    let targets = fetch_targets(fetch);
    assert_eq!(
        targets,
        vec![
            FetchTarget::Group("g1".into()),
            FetchTarget::Group("g2".into()),
            FetchTarget::Group("g3".into()),
        ]
    );

    // Recurring listing refresh and status polls are armed.
    assert!(recording.scheduled.contains(&TimerKind::Roster));
    assert!(recording.scheduled.contains(&TimerKind::Status));
    assert!(recording.renders > 0);
}

#[tokio::test]
async fn poll_cycle_notifies_once_and_rearms_the_panel_timer() {
    let script = vec![
        AppEvent::UserLoaded { user: me() },
        AppEvent::RosterLoaded { groups: vec![group_info("g1", 300)], chats: vec![] },
        // Slot 0 panel was created at generation 1.
        AppEvent::InitialLoaded {
            slot: 0,
            generation: 1,
            messages: vec![group_msg("m1", 100, "ana", "g1", "hello")],
        },
        AppEvent::PollArrived {
            slot: 0,
            generation: 1,
            messages: vec![
                group_msg("m1", 100, "ana", "g1", "hello"),
                group_msg("m2", 110, "ana", "g1", "new one"),
                group_msg("m3", 111, "bo", "g1", "another"),
            ],
        },
    ];
    let (driver, recording) = ScriptedDriver::new(script);
    let app = App::new(AppConfig::default(), PersistedState::default());
    let runtime = Runtime::new(driver, app);
    runtime.run().await.unwrap();

    let recording = recording.lock().unwrap();
    // Two arrivals, one tone.
    assert_eq!(recording.sounds, vec![SoundName::Chime]);
    // Both the initial load and the poll completion re-arm the poll timer.
    let polls = recording
        .scheduled
        .iter()
        .filter(|t| matches!(t, TimerKind::PanelPoll(0)))
        .count();
    assert_eq!(polls, 2);
}

#[tokio::test]
async fn alert_word_arrival_plays_the_siren() {
    let script = vec![
        AppEvent::UserLoaded { user: me() },
        AppEvent::InitialLoaded { slot: 0, generation: 2, messages: vec![] },
        AppEvent::PollArrived {
            slot: 0,
            generation: 2,
            messages: vec![group_msg("m1", 100, "ana", "g1", "we need BACKUP now")],
        },
    ];
    let (driver, recording) = ScriptedDriver::new(script);
    let mut app = App::new(AppConfig::default(), PersistedState::default());
    let _ = app.set_alert_words(vec!["backup".into()]);
    // Re-key slot 0 so the scripted generation matches.
    let _ = app.switch_view(0, ViewSelector::Group("g1".into()), 0);

    let runtime = Runtime::new(driver, app);
    runtime.run().await.unwrap();

    let recording = recording.lock().unwrap();
    assert_eq!(recording.sounds, vec![SoundName::Siren]);
}

#[tokio::test]
async fn switch_view_persists_read_state_and_submits_fetch() {
    let (driver, recording) = ScriptedDriver::new(vec![]);
    let app = App::new(AppConfig::default(), PersistedState::default());
    let mut runtime = Runtime::new(driver, app);

    let actions = runtime.app_mut().switch_view(1, ViewSelector::Dm("u1".into()), 500);
    runtime.process_actions(actions).unwrap();

    let recording = recording.lock().unwrap();
    assert_eq!(recording.persisted, vec!["read_state".to_string()]);
    assert!(recording
        .submitted
        .iter()
        .any(|t| matches!(t, IoTask::Fetch { slot: 1, kind: FetchKind::Initial, .. })));
}

#[tokio::test]
async fn failed_cycles_keep_the_poll_loop_alive() {
    let script = vec![
        AppEvent::UserLoaded { user: me() },
        AppEvent::FetchFailed { slot: 0, generation: 1 },
        AppEvent::FetchFailed { slot: 0, generation: 1 },
        AppEvent::FetchFailed { slot: 0, generation: 1 },
    ];
    let (driver, recording) = ScriptedDriver::new(script);
    let app = App::new(AppConfig::default(), PersistedState::default());
    let runtime = Runtime::new(driver, app);
    runtime.run().await.unwrap();

    let recording = recording.lock().unwrap();
    let polls = recording
        .scheduled
        .iter()
        .filter(|t| matches!(t, TimerKind::PanelPoll(0)))
        .count();
    assert_eq!(polls, 3);
}

fn message_strategy() -> impl Strategy<Value = Message> {
    (0u32..24, 0u64..1_000, prop::bool::ANY).prop_map(|(id, ts, mine)| {
        group_msg(
            &format!("m{id}"),
            ts,
            if mine { "me" } else { "other" },
            "g1",
            "text",
        )
    })
}

proptest! {
    /// Arbitrary interleavings of initial loads, polls, and backfills never
    /// break panel ordering, never duplicate a message, and never notify for
    /// an id twice.
    #[test]
    fn prop_poll_sequences_preserve_panel_invariants(
        initial in prop::collection::vec(message_strategy(), 0..10),
        polls in prop::collection::vec(prop::collection::vec(message_strategy(), 0..8), 0..12),
    ) {
        let mut app = App::new(AppConfig::default(), PersistedState::default());
        let _ = app.handle(AppEvent::UserLoaded { user: me() }, 0);
        let actions = app.switch_view(0, ViewSelector::Group("g1".into()), 0);
        let generation = actions.iter().find_map(|a| match a {
            AppAction::Fetch { generation, .. } => Some(*generation),
            _ => None,
        });
        let generation = generation.ok_or(TestCaseError::fail("no fetch issued"))?;

        let _ = app.handle(
            AppEvent::InitialLoaded { slot: 0, generation, messages: initial },
            0,
        );

        let mut notified_total = 0usize;
        let mut seen_ids = std::collections::HashSet::new();
        for (step, batch) in polls.into_iter().enumerate() {
            let fresh: Vec<_> = batch
                .iter()
                .filter(|m| !seen_ids.contains(&m.id))
                .map(|m| m.id.clone())
                .collect();
            let actions =
                app.handle(AppEvent::PollArrived { slot: 0, generation, messages: batch }, step as u64);
            notified_total += actions
                .iter()
                .filter(|a| matches!(a, AppAction::PlaySound(_)))
                .count();

            let panel = app.panel(0).ok_or(TestCaseError::fail("panel gone"))?;
            prop_assert!(panel.invariants_hold());
            for id in panel.messages().iter().map(|m| m.id.clone()) {
                seen_ids.insert(id);
            }
            // At most one tone per cycle, and none for an all-known batch.
            if fresh.is_empty() {
                prop_assert_eq!(
                    actions.iter().filter(|a| matches!(a, AppAction::PlaySound(_))).count(),
                    0
                );
            }
        }
        let panel = app.panel(0).ok_or(TestCaseError::fail("panel gone"))?;
        prop_assert!(panel.messages().len() <= seen_ids.len());
        prop_assert!(notified_total <= seen_ids.len());
    }
}
