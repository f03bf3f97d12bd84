//! Cached, pooled lookups against the Steam Web API

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use super::avatar_cache::{AvatarBitmap, AvatarCache};
use super::error::SteamApiError;
use super::http::{redacted, HttpClient, ReqwestHttpClient};
use super::pool::{Pending, WorkerPool};
use super::types::{
    AvatarQuality, PlayerBans, PlayerSummary, RawPlayerBans, RawPlayerSummary, SteamId,
};
use crate::TF2_APP_ID;

const STEAM_API_BASE: &str = "https://api.steampowered.com";
const WORKER_COUNT: usize = 2;

/// Most ids the batched endpoints accept in one request
pub const MAX_IDS_PER_REQUEST: usize = 100;

#[derive(Deserialize)]
struct SummariesResponse {
    response: SummariesPlayers,
}

#[derive(Deserialize)]
struct SummariesPlayers {
    players: Vec<RawPlayerSummary>,
}

#[derive(Deserialize)]
struct BansResponse {
    players: Vec<RawPlayerBans>,
}

#[derive(Deserialize)]
struct FriendListResponse {
    friendslist: FriendList,
}

#[derive(Deserialize)]
struct FriendList {
    friends: Vec<FriendEntry>,
}

#[derive(Deserialize)]
struct FriendEntry {
    steamid: SteamId,
}

pub struct SteamApiClient {
    http: Arc<dyn HttpClient>,
    pool: WorkerPool,
}

impl SteamApiClient {
    pub fn new() -> Self {
        Self::with_http(Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_http(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            pool: WorkerPool::new("steam-api", WORKER_COUNT),
        }
    }

    /// GET `url` on the worker pool and hand the body to `parse` there
    pub(crate) fn get_with<T, F>(&self, url: &str, parse: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(Vec<u8>) -> Result<T, SteamApiError> + Send + 'static,
    {
        let url = match Url::parse(url) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Invalid Steam API URL {:?}: {}", url, e);
                return Pending::ready(Err(SteamApiError::Http(format!("Invalid URL: {}", e))));
            }
        };

        let http = Arc::clone(&self.http);
        self.pool.submit(move || {
            tracing::debug!("[SteamAPI] HTTP GET {}", redacted(&url));
            let body = http.get_bytes(&url)?;
            parse(body)
        })
    }

    pub fn player_summaries(
        &self,
        api_key: &str,
        steam_ids: &[SteamId],
    ) -> Pending<Vec<PlayerSummary>> {
        let Some(ids) = batch_ids(api_key, steam_ids) else {
            return Pending::ready(Ok(Vec::new()));
        };

        let url = api_url(
            "/ISteamUser/GetPlayerSummaries/v0002/",
            &[("key", api_key), ("steamids", &ids)],
        );

        self.get_with(&url, |body| {
            let parsed: SummariesResponse = serde_json::from_slice(&body)?;
            Ok(parsed
                .response
                .players
                .into_iter()
                .map(PlayerSummary::from)
                .collect())
        })
    }

    pub fn player_bans(&self, api_key: &str, steam_ids: &[SteamId]) -> Pending<Vec<PlayerBans>> {
        let Some(ids) = batch_ids(api_key, steam_ids) else {
            return Pending::ready(Ok(Vec::new()));
        };

        let url = api_url(
            "/ISteamUser/GetPlayerBans/v0001/",
            &[("key", api_key), ("steamids", &ids)],
        );

        self.get_with(&url, |body| {
            let parsed: BansResponse = serde_json::from_slice(&body)?;
            Ok(parsed.players.into_iter().map(PlayerBans::from).collect())
        })
    }

    /// Total TF2 playtime. Invalid input yields `SteamApiError::EmptyState`.
    pub fn tf2_playtime(&self, api_key: &str, steam_id: SteamId) -> Pending<Duration> {
        if !validate_single(api_key, steam_id) {
            return Pending::ready(Err(SteamApiError::EmptyState));
        }

        let input_json = serde_json::json!({
            "appids_filter": [TF2_APP_ID],
            "include_played_free_games": true,
            "steamid": steam_id.id64(),
        })
        .to_string();

        let url = api_url(
            "/IPlayerService/GetOwnedGames/v0001/",
            &[("key", api_key), ("input_json", &input_json)],
        );

        self.get_with(&url, |body| parse_playtime(&body))
    }

    pub fn friend_list(&self, api_key: &str, steam_id: SteamId) -> Pending<HashSet<SteamId>> {
        if !validate_single(api_key, steam_id) {
            return Pending::ready(Ok(HashSet::new()));
        }

        let id = steam_id.to_string();
        let url = api_url(
            "/ISteamUser/GetFriendList/v0001/",
            &[("key", api_key), ("steamid", &id)],
        );

        self.get_with(&url, |body| {
            let parsed: FriendListResponse = serde_json::from_slice(&body)?;
            Ok(parsed
                .friendslist
                .friends
                .into_iter()
                .map(|f| f.steamid)
                .collect())
        })
    }
}

impl Default for SteamApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerSummary {
    /// Avatar from `cache`, downloading through `client` on a miss
    pub fn avatar_bitmap(
        &self,
        cache: &Arc<AvatarCache>,
        client: Option<&SteamApiClient>,
        quality: AvatarQuality,
    ) -> Pending<AvatarBitmap> {
        cache.get_avatar_bitmap(client, &self.avatar_url(quality), &self.avatar_hash)
    }
}

fn api_url(path: &str, params: &[(&str, &str)]) -> String {
    let mut url = format!("{}{}", STEAM_API_BASE, path);
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    url.push('?');
    url.push_str(&query);
    url
}

/// Comma-separated ids for a batched request, or `None` if there is nothing to send
fn batch_ids(api_key: &str, steam_ids: &[SteamId]) -> Option<String> {
    if steam_ids.is_empty() {
        return None;
    }

    if api_key.is_empty() {
        tracing::error!("Steam API key was empty");
        return None;
    }

    if steam_ids.len() > MAX_IDS_PER_REQUEST {
        tracing::error!(
            "Attempted to fetch {} steamIDs at once (max {})",
            steam_ids.len(),
            MAX_IDS_PER_REQUEST
        );
    }

    let ids: Vec<String> = steam_ids
        .iter()
        .take(MAX_IDS_PER_REQUEST)
        .map(ToString::to_string)
        .collect();

    Some(ids.join(","))
}

fn validate_single(api_key: &str, steam_id: SteamId) -> bool {
    if !steam_id.is_valid() {
        tracing::error!("Invalid SteamID {}", steam_id);
        return false;
    }

    if api_key.is_empty() {
        tracing::error!("Steam API key was empty");
        return false;
    }

    true
}

fn parse_playtime(body: &[u8]) -> Result<Duration, SteamApiError> {
    let json: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
        tracing::error!("Failed to parse owned games response: {}", e);
        SteamApiError::from(e)
    })?;

    let response = json
        .get("response")
        .ok_or_else(|| SteamApiError::UnexpectedDataFormat("missing response".to_string()))?;

    // An empty response (no game_count at all) means the games list is private
    if response.get("game_count").is_none() {
        return Err(SteamApiError::InfoPrivate);
    }

    let Some(games) = response.get("games") else {
        return Err(SteamApiError::GameNotOwned);
    };

    let games = games
        .as_array()
        .ok_or_else(|| SteamApiError::UnexpectedDataFormat("games is not an array".to_string()))?;

    let first = match games.as_slice() {
        [first] => first,
        other => {
            if !other.is_empty() {
                tracing::error!("Unexpected games array size {}", other.len());
            }
            return Err(SteamApiError::UnexpectedDataFormat(format!(
                "games array size {}",
                other.len()
            )));
        }
    };

    let appid = first.get("appid").and_then(serde_json::Value::as_u64);
    if appid != Some(u64::from(TF2_APP_ID)) {
        tracing::error!("Unexpected appid {:?} at response.games[0].appid", appid);
        return Err(SteamApiError::UnexpectedDataFormat(format!(
            "unexpected appid {:?}",
            appid
        )));
    }

    let minutes = first
        .get("playtime_forever")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| {
            SteamApiError::UnexpectedDataFormat("missing playtime_forever".to_string())
        })?;

    Ok(Duration::from_secs(minutes.saturating_mul(60)))
}
