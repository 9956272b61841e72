//! Production driver over the HTTP gateway.
//!
//! [`GatewayDriver`] implements [`Driver`] on top of any
//! [`ConversationApi`]: submitted I/O tasks run as background tokio tasks
//! whose completions surface through `next_event`, and timers ride tokio's
//! clock (virtual under `test-util`).

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use switchboard_core::composer::{self, FetchPlan};
use switchboard_core::{ConversationId, GatewayError, Message, SoundName};
use switchboard_gateway::ConversationApi;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::warn;

use crate::store::StateStore;
use crate::{App, AppEvent, Driver, FetchKind, IoTask, TimerKind};

/// Delay before retrying a failed user or roster load at startup.
const BOOT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Plays notification tones. Fire-and-forget.
pub trait SoundPlayer: Send {
    /// Play `sound` once.
    fn play(&mut self, sound: SoundName);
}

/// Sound player that discards every tone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSounds;

impl SoundPlayer for NullSounds {
    fn play(&mut self, _sound: SoundName) {}
}

/// Unrecoverable driver faults.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The render callback reported a failure.
    #[error("render failed: {0}")]
    Render(String),
}

/// [`Driver`] implementation over a [`ConversationApi`].
pub struct GatewayDriver<S, P> {
    api: Arc<dyn ConversationApi>,
    store: S,
    sounds: P,
    tasks: JoinSet<Option<AppEvent>>,
    timers: Vec<(Instant, TimerKind)>,
    on_render: Box<dyn FnMut(&App) -> Result<(), String> + Send>,
}

impl<S: StateStore, P: SoundPlayer> GatewayDriver<S, P> {
    /// Create a driver. `on_render` is invoked with the app snapshot on
    /// every render action.
    pub fn new(
        api: Arc<dyn ConversationApi>,
        store: S,
        sounds: P,
        on_render: Box<dyn FnMut(&App) -> Result<(), String> + Send>,
    ) -> Self {
        Self { api, store, sounds, tasks: JoinSet::new(), timers: Vec::new(), on_render }
    }

    fn spawn_fetch(&mut self, slot: usize, generation: u64, kind: FetchKind, plan: FetchPlan) {
        let api = Arc::clone(&self.api);
        self.tasks.spawn(async move {
            match run_plan(api.as_ref(), &plan).await {
                Ok(messages) => Some(match kind {
                    FetchKind::Initial => AppEvent::InitialLoaded { slot, generation, messages },
                    FetchKind::Poll => AppEvent::PollArrived { slot, generation, messages },
                }),
                Err(GatewayError::Auth) => Some(AppEvent::AuthRejected),
                Err(error) => {
                    warn!(slot, %error, "fetch cycle failed");
                    Some(AppEvent::FetchFailed { slot, generation })
                },
            }
        });
    }

    fn spawn_operation(
        &mut self,
        conversation: ConversationId,
        what: &'static str,
        op: impl Future<Output = Result<(), GatewayError>> + Send + 'static,
    ) {
        self.tasks.spawn(async move {
            match op.await {
                Ok(()) => None,
                Err(GatewayError::Auth) => Some(AppEvent::AuthRejected),
                Err(error) => {
                    warn!(%error, what, "operation failed");
                    Some(AppEvent::OperationFailed { conversation, what: what.to_string() })
                },
            }
        });
    }
}

/// Run every op in a plan, merging the successful batches.
///
/// Individual op failures contribute nothing; the cycle as a whole fails
/// only when every op failed. Credential rejection aborts immediately.
async fn run_plan(api: &dyn ConversationApi, plan: &FetchPlan) -> Result<Vec<Message>, GatewayError> {
    let mut batches = Vec::new();
    let mut first_error: Option<GatewayError> = None;
    for op in &plan.ops {
        match api.fetch(op).await {
            Ok(messages) => batches.push(messages),
            Err(GatewayError::Auth) => return Err(GatewayError::Auth),
            Err(error) => {
                warn!(%error, "fetch op failed");
                first_error.get_or_insert(error);
            },
        }
    }
    if batches.is_empty() {
        if let Some(error) = first_error {
            return Err(error);
        }
    }
    Ok(composer::merge(batches))
}

impl<S: StateStore, P: SoundPlayer> Driver for GatewayDriver<S, P> {
    type Error = DriverError;

    async fn next_event(&mut self) -> Result<Option<AppEvent>, DriverError> {
        loop {
            let next_timer = self.timers.iter().map(|(at, _)| *at).min();
            if self.tasks.is_empty() && next_timer.is_none() {
                return Ok(None);
            }
            let sleep_target =
                next_timer.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                joined = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    match joined {
                        Some(Ok(Some(event))) => return Ok(Some(event)),
                        Some(Ok(None)) | None => {},
                        Some(Err(error)) => warn!(%error, "background task failed"),
                    }
                },
                () = tokio::time::sleep_until(sleep_target), if next_timer.is_some() => {
                    let due = self
                        .timers
                        .iter()
                        .enumerate()
                        .min_by_key(|(_, (at, _))| *at)
                        .map(|(index, _)| index);
                    if let Some(index) = due {
                        let (_, timer) = self.timers.swap_remove(index);
                        return Ok(Some(AppEvent::TimerFired { timer }));
                    }
                },
            }
        }
    }

    fn submit(&mut self, task: IoTask) {
        match task {
            IoTask::LoadUser => {
                let api = Arc::clone(&self.api);
                self.tasks.spawn(async move {
                    loop {
                        match api.current_user().await {
                            Ok(user) => return Some(AppEvent::UserLoaded { user }),
                            Err(GatewayError::Auth) => return Some(AppEvent::AuthRejected),
                            Err(error) => {
                                warn!(%error, "user load failed, retrying");
                                tokio::time::sleep(BOOT_RETRY_DELAY).await;
                            },
                        }
                    }
                });
            },
            IoTask::LoadRoster => {
                let api = Arc::clone(&self.api);
                self.tasks.spawn(async move {
                    loop {
                        let groups = match api.list_groups().await {
                            Ok(groups) => groups,
                            Err(GatewayError::Auth) => return Some(AppEvent::AuthRejected),
                            Err(error) => {
                                warn!(%error, "group listing failed, retrying");
                                tokio::time::sleep(BOOT_RETRY_DELAY).await;
                                continue;
                            },
                        };
                        match api.list_direct_chats().await {
                            Ok(chats) => return Some(AppEvent::RosterLoaded { groups, chats }),
                            Err(GatewayError::Auth) => return Some(AppEvent::AuthRejected),
                            Err(error) => {
                                warn!(%error, "chat listing failed, retrying");
                                tokio::time::sleep(BOOT_RETRY_DELAY).await;
                            },
                        }
                    }
                });
            },
            IoTask::Fetch { slot, generation, kind, plan } => {
                self.spawn_fetch(slot, generation, kind, plan);
            },
            IoTask::Backfill { slot, generation, op } => {
                let api = Arc::clone(&self.api);
                self.tasks.spawn(async move {
                    match api.fetch(&op).await {
                        Ok(messages) => {
                            Some(AppEvent::BackfillLoaded { slot, generation, messages })
                        },
                        Err(GatewayError::Auth) => Some(AppEvent::AuthRejected),
                        Err(error) => {
                            warn!(slot, %error, "backfill failed");
                            Some(AppEvent::BackfillFailed { slot, generation })
                        },
                    }
                });
            },
            IoTask::FetchStatus { group_id } => {
                let api = Arc::clone(&self.api);
                self.tasks.spawn(async move {
                    match api.group_messages(&group_id, composer::STREAM_PAGE, None).await {
                        Ok(messages) => Some(AppEvent::StatusUpdated { messages }),
                        Err(GatewayError::Auth) => Some(AppEvent::AuthRejected),
                        Err(error) => {
                            // Empty update keeps the status poll loop armed.
                            warn!(%error, "status poll failed");
                            Some(AppEvent::StatusUpdated { messages: Vec::new() })
                        },
                    }
                });
            },
            IoTask::SendGroup { group_id, text, attachments } => {
                let api = Arc::clone(&self.api);
                let conversation = ConversationId::Group(group_id.clone());
                self.spawn_operation(conversation, "message not sent", async move {
                    api.send_group_message(&group_id, &text, attachments).await
                });
            },
            IoTask::SendDirect { user_id, text, attachments } => {
                let api = Arc::clone(&self.api);
                let conversation = ConversationId::Dm(user_id.clone());
                self.spawn_operation(conversation, "message not sent", async move {
                    api.send_direct_message(&user_id, &text, attachments).await
                });
            },
            IoTask::Like { conversation_id, message_id } => {
                let api = Arc::clone(&self.api);
                let conversation = ConversationId::Group(conversation_id.clone());
                self.spawn_operation(conversation, "like failed", async move {
                    api.like(&conversation_id, &message_id).await
                });
            },
            IoTask::Unlike { conversation_id, message_id } => {
                let api = Arc::clone(&self.api);
                let conversation = ConversationId::Group(conversation_id.clone());
                self.spawn_operation(conversation, "unlike failed", async move {
                    api.unlike(&conversation_id, &message_id).await
                });
            },
            IoTask::DeleteMessage { group_id, message_id } => {
                let api = Arc::clone(&self.api);
                let conversation = ConversationId::Group(group_id.clone());
                self.spawn_operation(conversation, "delete failed", async move {
                    api.delete_message(&group_id, &message_id).await
                });
            },
        }
    }

    fn schedule(&mut self, timer: TimerKind, delay: Duration) {
        self.timers.retain(|(_, pending)| *pending != timer);
        self.timers.push((Instant::now() + delay, timer));
    }

    fn play_sound(&mut self, sound: SoundName) {
        self.sounds.play(sound);
    }

    fn persist(&mut self, key: &str, value: serde_json::Value) {
        self.store.set(key, value);
    }

    fn render(&mut self, app: &App) -> Result<(), DriverError> {
        (self.on_render)(app).map_err(DriverError::Render)
    }

    fn now(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
    }

    fn stop(&mut self) {
        self.tasks.abort_all();
        self.timers.clear();
    }
}
