//! Discord Rich Presence integration using discord-sdk

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use discord_sdk::{
    activity::{ActivityBuilder, Assets, PartyPrivacy},
    registration::{Application, LaunchCommand},
    wheel::{UserSpoke, UserState, Wheel},
    Discord, Subscriptions,
};
use futures_util::FutureExt;

use super::activity::{ActivitySnapshot, PartySize};
use super::traits::{PresenceBackend, PresenceError, PresenceSession, PublishFuture};
use crate::TF2_APP_ID;

/// Discord Application ID for the TF2 companion
pub const DEFAULT_DISCORD_APP_ID: i64 = 730_945_386_390_224_976;

/// Timeout for waiting for Discord handshake
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

const PARTY_ID: &str = "tf2-party";

pub struct DiscordBackend {
    app_id: i64,
    /// Shared with every session so the launch command is registered once per process
    registered: Arc<AtomicBool>,
}

impl DiscordBackend {
    pub fn new(app_id: i64) -> Self {
        Self {
            app_id,
            registered: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for DiscordBackend {
    fn default() -> Self {
        Self::new(DEFAULT_DISCORD_APP_ID)
    }
}

impl PresenceBackend for DiscordBackend {
    fn name(&self) -> &'static str {
        "Discord"
    }

    /// Must be called from within a tokio runtime; discord-sdk spawns its IO task there.
    fn initialize(&mut self) -> Result<Box<dyn PresenceSession>, PresenceError> {
        let (wheel, handler) = Wheel::new(Box::new(|err| {
            tracing::warn!("Discord error: {:?}", err);
        }));

        let user = wheel.user();

        let discord = Discord::new(self.app_id, Subscriptions::ACTIVITY, Box::new(handler))
            .map_err(|e| PresenceError::Unavailable(format!("{:?}", e)))?;

        tracing::info!("Discord connecting...");

        Ok(Box::new(DiscordSession {
            discord: Arc::new(discord),
            user,
            app_id: self.app_id,
            registered: Arc::clone(&self.registered),
            connected: false,
            started: Instant::now(),
        }))
    }
}

struct DiscordSession {
    discord: Arc<Discord>,
    user: UserSpoke,
    app_id: i64,
    registered: Arc<AtomicBool>,
    connected: bool,
    started: Instant,
}

/// Decide the session's connection after one look at the user state.
///
/// `Ok(true)` once connected, `Ok(false)` while the handshake is pending.
fn connection_status(
    was_connected: bool,
    is_connected: bool,
    since_start: Duration,
) -> Result<bool, PresenceError> {
    if is_connected {
        Ok(true)
    } else if was_connected || since_start > HANDSHAKE_TIMEOUT {
        Err(PresenceError::NotRunning)
    } else {
        Ok(false)
    }
}

/// Run `register` unless it already ran for this flag. Returns whether it ran.
fn register_once(registered: &AtomicBool, register: impl FnOnce()) -> bool {
    if registered.swap(true, Ordering::AcqRel) {
        return false;
    }
    register();
    true
}

fn register_steam_launch(app_id: i64) {
    // Lets Discord launch the game through Steam
    if let Err(e) = discord_sdk::registration::register_app(Application {
        id: app_id,
        name: Some("Team Fortress 2".to_string()),
        command: LaunchCommand::Steam(TF2_APP_ID),
    }) {
        tracing::error!(
            "Failed to register discord integration as steam appid {}: {:?}",
            TF2_APP_ID,
            e
        );
    }
}

fn activity_assets(activity: &ActivitySnapshot) -> Assets {
    let assets = Assets::default().large(activity.assets.large_image.clone(), None::<String>);
    match &activity.assets.small_image {
        Some(small_image) => assets.small(small_image.clone(), activity.assets.small_text.clone()),
        None => assets,
    }
}

/// Discord rejects empty parties; both sizes must be non-zero
fn party_size(party: Option<PartySize>) -> Option<(NonZeroU32, NonZeroU32)> {
    let party = party?;
    Some((
        NonZeroU32::new(u32::from(party.current))?,
        NonZeroU32::new(u32::from(party.max))?,
    ))
}

fn build_activity(activity: &ActivitySnapshot) -> ActivityBuilder {
    let mut builder = ActivityBuilder::new()
        .state(activity.state.clone())
        .details(activity.details.clone())
        .assets(activity_assets(activity));

    if let Some(start) = activity.start_timestamp.filter(|s| *s >= 0) {
        builder = builder.start_timestamp(start);
    }

    if let Some((current, max)) = party_size(activity.party) {
        builder = builder.party(PARTY_ID, Some(current), Some(max), PartyPrivacy::Private);
    }

    builder
}

impl PresenceSession for DiscordSession {
    fn is_ready(&self) -> bool {
        self.connected
    }

    fn publish(&mut self, activity: &ActivitySnapshot) -> PublishFuture {
        let discord = Arc::clone(&self.discord);
        let builder = build_activity(activity);

        async move {
            discord
                .update_activity(builder)
                .await
                .map(|_| ())
                .map_err(|e| PresenceError::Rejected(format!("{:?}", e)))
        }
        .boxed()
    }

    fn poll(&mut self) -> Result<(), PresenceError> {
        let state = self.user.0.borrow();
        let user = match &*state {
            UserState::Connected(user) => Some(user),
            UserState::Disconnected(err) => {
                if self.connected {
                    tracing::debug!("Discord disconnected: {:?}", err);
                }
                None
            }
        };

        let connected = connection_status(self.connected, user.is_some(), self.started.elapsed())
            .inspect_err(|_| {
                if !self.connected {
                    tracing::debug!("Discord handshake timed out");
                }
            })?;

        if connected && !self.connected {
            if let Some(user) = user {
                tracing::info!(
                    "Discord Rich Presence connected as {}#{}",
                    user.username,
                    user.discriminator.unwrap_or(0)
                );
            }

            let app_id = self.app_id;
            register_once(&self.registered, || register_steam_launch(app_id));
        }

        drop(state);
        self.connected = connected;
        Ok(())
    }
}

impl Drop for DiscordSession {
    fn drop(&mut self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let discord = Arc::clone(&self.discord);
        runtime.spawn(async move {
            // In-flight publishes may still hold a reference; those drop the connection themselves
            if let Ok(discord) = Arc::try_unwrap(discord) {
                discord.disconnect().await;
                tracing::info!("Discord Rich Presence disconnected");
            }
        });
    }
}
