//! Drives the presence backend from accumulated game state

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::activity::{construct_activity, ActivitySnapshot};
use super::drp_info::DrpInfo;
use super::events::ConsoleEvent;
use super::state::GameState;
use super::traits::{PresenceBackend, PresenceSession};
use crate::settings::Settings;

/// Minimum time between two published activities
pub const UPDATE_INTERVAL: Duration = Duration::from_secs(10);

/// Minimum time between two attempts to (re)initialize the backend
pub const REINITIALIZE_COOLDOWN: Duration = Duration::from_secs(10);

/// Discord allows 5 activity updates per 20 seconds
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(20);
const RATE_LIMIT_UPDATES: u32 = 5;

const _: () = assert!(
    UPDATE_INTERVAL.as_millis() >= RATE_LIMIT_WINDOW.as_millis() / RATE_LIMIT_UPDATES as u128,
    "Update interval too low"
);

const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Owns the game state, the backend connection and the publish debounce
pub struct PresenceManager {
    backend: Box<dyn PresenceBackend>,
    session: Option<Box<dyn PresenceSession>>,
    drp_info: DrpInfo,
    game_state: GameState,
    debug_log: bool,

    wants_update: bool,
    last_initialize: Option<Instant>,
    last_update: Option<Instant>,
    current_activity: ActivitySnapshot,
}

impl PresenceManager {
    pub fn new(backend: Box<dyn PresenceBackend>, drp_info: DrpInfo) -> Self {
        Self {
            backend,
            session: None,
            drp_info,
            game_state: GameState::new(),
            debug_log: false,
            wants_update: false,
            last_initialize: None,
            last_update: None,
            current_activity: ActivitySnapshot::default(),
        }
    }

    pub fn set_debug_logging(&mut self, enabled: bool) {
        self.debug_log = enabled;
        self.game_state.set_debug_logging(enabled);
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    pub fn current_activity(&self) -> &ActivitySnapshot {
        &self.current_activity
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn queue_update(&mut self) {
        self.wants_update = true;
    }

    pub fn handle_event(&mut self, event: &ConsoleEvent) {
        self.queue_update();
        self.game_state.apply_event(event);
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Must be called from within a tokio runtime; publishes complete on spawned tasks.
    pub fn tick_at(&mut self, now: Instant) {
        if self.session.is_none() && self.initialize_cooldown_elapsed(now) {
            self.last_initialize = Some(now);

            match self.backend.initialize() {
                Ok(session) => {
                    self.session = Some(session);

                    // A new session shows nothing until told; resend what was last published
                    let previous = std::mem::take(&mut self.current_activity);
                    if previous != ActivitySnapshot::default() {
                        self.wants_update = true;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to initialize {} presence: {}", self.backend.name(), e);
                }
            }
        }

        let ready = self.session.as_ref().is_some_and(|s| s.is_ready());
        if ready {
            self.update_activity(now);
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };

        if let Err(e) = session.poll() {
            if e.is_fatal() {
                // Never recovers from this; drop it and retry after the full cooldown
                tracing::debug!("Failed to run {} callbacks: {}", self.backend.name(), e);
                self.session = None;
                self.last_initialize = Some(now);
            } else {
                tracing::error!("Failed to run {} callbacks: {}", self.backend.name(), e);
            }
        }
    }

    fn initialize_cooldown_elapsed(&self, now: Instant) -> bool {
        self.last_initialize
            .is_none_or(|last| now.saturating_duration_since(last) > REINITIALIZE_COOLDOWN)
    }

    fn update_activity(&mut self, now: Instant) {
        if !self.wants_update {
            return;
        }

        if let Some(last) = self.last_update {
            if now.saturating_duration_since(last) < UPDATE_INTERVAL {
                return;
            }
        }

        let next_activity = construct_activity(&self.game_state, &self.drp_info);
        if next_activity == self.current_activity {
            if self.debug_log {
                tracing::debug!("DRP: activity state unchanged");
            }
        } else if let Some(session) = self.session.as_mut() {
            let completion = session.publish(&next_activity);
            let debug_log = self.debug_log;
            let published = next_activity.clone();

            tokio::spawn(async move {
                match completion.await {
                    Ok(()) => {
                        if debug_log {
                            tracing::debug!("DRP: updated activity state: {}", published);
                        }
                    }
                    Err(e) => tracing::warn!("Failed to update activity state: {}", e),
                }
            });

            self.current_activity = next_activity;
            self.last_update = Some(now);
        }

        self.wants_update = false;
    }
}

/// Handle for feeding console events to the presence background task
#[derive(Clone)]
pub struct PresenceHandle {
    event_tx: mpsc::UnboundedSender<ConsoleEvent>,
}

impl PresenceHandle {
    pub fn send_event(&self, event: ConsoleEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::debug!("Presence task has stopped, dropping event");
        }
    }
}

/// Start the background task that applies events and ticks the manager at a fixed rate.
///
/// The task ends once every `PresenceHandle` has been dropped.
pub fn start_presence_background_task(
    mut manager: PresenceManager,
    settings: Arc<RwLock<Settings>>,
) -> PresenceHandle {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);

        loop {
            tokio::select! {
                event = event_rx.recv() => match event {
                    Some(event) => manager.handle_event(&event),
                    None => break,
                },
                _ = interval.tick() => {
                    let debug_log = settings.read().logging.discord_rich_presence;
                    manager.set_debug_logging(debug_log);
                    manager.tick();
                }
            }
        }

        tracing::debug!("Presence background task stopped");
    });

    PresenceHandle { event_tx }
}
