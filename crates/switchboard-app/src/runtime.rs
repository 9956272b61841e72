//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: the pure state machine
//! - [`Driver`]: platform-specific I/O
//!
//! Poll scheduling is sequential per panel: the next poll timer for a slot is
//! armed only when the previous cycle's completion (success or failure)
//! arrives, so cycles for one panel never overlap regardless of how slow the
//! remote is.

use std::time::Duration;

use crate::{App, AppAction, AppEvent, Driver, IoTask, TimerKind};

/// Delay between a panel poll cycle's completion and the next cycle.
pub const POLL_INTERVAL: Duration = Duration::from_secs(4);

/// Delay between roster listing refreshes.
pub const ROSTER_INTERVAL: Duration = Duration::from_secs(60);

/// Delay between team-status side channel polls.
pub const STATUS_INTERVAL: Duration = Duration::from_secs(10);

/// Generic runtime that orchestrates App and Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
pub struct Runtime<D: Driver> {
    driver: D,
    app: App,
}

impl<D: Driver> Runtime<D> {
    /// Create a new runtime around an already-constructed app.
    pub fn new(driver: D, app: App) -> Self {
        Self { driver, app }
    }

    /// Run the main event loop.
    ///
    /// Issues the startup actions, then repeatedly waits for the next driver
    /// event, feeds it to the app, and executes the resulting actions. Exits
    /// when the driver reports quiescence (nothing in flight, no timers).
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an unrecoverable fault.
    pub async fn run(mut self) -> Result<(), D::Error> {
        let actions = self.app.boot();
        self.process_actions(actions)?;
        self.driver.schedule(TimerKind::Status, STATUS_INTERVAL);

        loop {
            let Some(event) = self.driver.next_event().await? else {
                break;
            };
            self.reschedule_for(&event);
            let now = self.driver.now();
            let actions = self.app.handle(event, now);
            self.process_actions(actions)?;
        }

        self.driver.stop();
        Ok(())
    }

    /// Execute actions produced by the app.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn process_actions(&mut self, actions: Vec<AppAction>) -> Result<(), D::Error> {
        for action in actions {
            match action {
                AppAction::Render => self.driver.render(&self.app)?,
                AppAction::PlaySound(sound) => self.driver.play_sound(sound),
                AppAction::Persist(slice) => {
                    let value = self.app.slice_value(slice);
                    self.driver.persist(slice.key(), value);
                },
                AppAction::LoadUser => self.driver.submit(IoTask::LoadUser),
                AppAction::LoadRoster => self.driver.submit(IoTask::LoadRoster),
                AppAction::Fetch { slot, generation, kind, plan } => {
                    self.driver.submit(IoTask::Fetch { slot, generation, kind, plan });
                },
                AppAction::Backfill { slot, generation, op } => {
                    self.driver.submit(IoTask::Backfill { slot, generation, op });
                },
                AppAction::FetchStatus { group_id } => {
                    self.driver.submit(IoTask::FetchStatus { group_id });
                },
                AppAction::SendGroup { group_id, text, attachments } => {
                    self.driver.submit(IoTask::SendGroup { group_id, text, attachments });
                },
                AppAction::SendDirect { user_id, text, attachments } => {
                    self.driver.submit(IoTask::SendDirect { user_id, text, attachments });
                },
                AppAction::Like { conversation_id, message_id } => {
                    self.driver.submit(IoTask::Like { conversation_id, message_id });
                },
                AppAction::Unlike { conversation_id, message_id } => {
                    self.driver.submit(IoTask::Unlike { conversation_id, message_id });
                },
                AppAction::DeleteMessage { group_id, message_id } => {
                    self.driver.submit(IoTask::DeleteMessage { group_id, message_id });
                },
            }
        }
        Ok(())
    }

    /// Arm recurring timers keyed off completion events.
    fn reschedule_for(&mut self, event: &AppEvent) {
        match event {
            AppEvent::InitialLoaded { slot, .. }
            | AppEvent::PollArrived { slot, .. }
            | AppEvent::FetchFailed { slot, .. } => {
                self.driver.schedule(TimerKind::PanelPoll(*slot), POLL_INTERVAL);
            },
            AppEvent::RosterLoaded { .. } => {
                self.driver.schedule(TimerKind::Roster, ROSTER_INTERVAL);
            },
            AppEvent::StatusUpdated { .. } => {
                self.driver.schedule(TimerKind::Status, STATUS_INTERVAL);
            },
            _ => {},
        }
    }

    /// Get a reference to the App.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Get a mutable reference to the App.
    ///
    /// Frontends call user-intent methods here and pass the returned actions
    /// to [`Self::process_actions`].
    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }
}
