mod activity;
mod discord;
mod drp_info;
mod events;
mod manager;
mod state;
mod traits;

pub use activity::{construct_activity, ActivityAssets, ActivitySnapshot, PartySize};
pub use discord::{DiscordBackend, DEFAULT_DISCORD_APP_ID};
pub use drp_info::{DrpInfo, MapInfo};
pub use events::ConsoleEvent;
pub use manager::{
    start_presence_background_task, PresenceHandle, PresenceManager, REINITIALIZE_COOLDOWN,
    UPDATE_INTERVAL,
};
pub use state::{
    ConnectionState, GameState, LobbyChangeType, MatchGroup, QueueCategory, QueueState,
    QueueStateChange, TfClass,
};
pub use traits::{PresenceBackend, PresenceError, PresenceSession, PublishFuture};
