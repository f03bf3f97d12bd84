pub mod logging;
pub mod presence;
pub mod settings;
pub mod steam_api;

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use presence::{DiscordBackend, DrpInfo, PresenceHandle, PresenceManager};
use settings::Settings;
use steam_api::{AvatarCache, SteamApiClient};

/// Steam app id of Team Fortress 2
pub const TF2_APP_ID: u32 = 440;

/// Long-lived services shared by the rest of the application
pub struct Companion {
    pub settings: Arc<RwLock<Settings>>,
    /// `None` when rich presence is disabled in settings
    pub presence: Option<PresenceHandle>,
    pub steam_api: Arc<SteamApiClient>,
    /// `None` when the cache directory could not be created
    pub avatar_cache: Option<Arc<AvatarCache>>,
}

/// Load settings and start the presence and Steam API services.
///
/// Must be called from within a tokio runtime.
pub fn start(settings_path: &Path) -> Companion {
    let settings = settings::load_settings(settings_path);

    if settings.steam_api_key.is_empty() {
        tracing::warn!("No Steam API key configured, player lookups will return nothing");
    }

    let presence = if settings.discord.enable_rich_presence {
        let drp_info = settings
            .drp_info_path
            .as_deref()
            .map(DrpInfo::load)
            .unwrap_or_default();

        let mut manager = PresenceManager::new(
            Box::new(DiscordBackend::new(settings.discord.app_id)),
            drp_info,
        );
        manager.set_debug_logging(settings.logging.discord_rich_presence);
        Some(manager)
    } else {
        tracing::info!("Discord rich presence disabled");
        None
    };

    let avatar_cache = match AvatarCache::new(AvatarCache::default_dir()) {
        Ok(cache) => Some(Arc::new(cache)),
        Err(e) => {
            tracing::error!("Failed to open avatar cache: {}", e);
            None
        }
    };

    let settings = Arc::new(RwLock::new(settings));
    let presence = presence.map(|manager| {
        presence::start_presence_background_task(manager, Arc::clone(&settings))
    });

    Companion {
        settings,
        presence,
        steam_api: Arc::new(SteamApiClient::new()),
        avatar_cache,
    }
}
