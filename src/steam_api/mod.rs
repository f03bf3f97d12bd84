mod avatar_cache;
mod client;
mod error;
mod http;
mod pool;
mod types;

pub use avatar_cache::{AvatarBitmap, AvatarCache, AVATAR_CACHE_MAX_AGE};
pub use client::{SteamApiClient, MAX_IDS_PER_REQUEST};
pub use error::SteamApiError;
pub use http::{HttpClient, ReqwestHttpClient};
pub use pool::{Pending, WorkerPool};
pub use types::{
    AvatarQuality, CommunityVisibility, EconomyBan, PersonaState, PlayerBans, PlayerSummary,
    SteamId,
};
