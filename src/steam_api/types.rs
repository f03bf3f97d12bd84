use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

const VANITY_URL_BASE: &str = "https://steamcommunity.com/id/";
const AVATAR_URL_BASE: &str = "https://steamcdn-a.akamaihd.net/steamcommunity/public/images/avatars";

/// 64-bit Steam account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub struct SteamId(u64);

impl SteamId {
    pub const fn from_id64(id64: u64) -> Self {
        Self(id64)
    }

    pub fn id64(self) -> u64 {
        self.0
    }

    pub fn account_id(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    pub fn account_type(self) -> u8 {
        ((self.0 >> 52) & 0xF) as u8
    }

    pub fn universe(self) -> u8 {
        (self.0 >> 56) as u8
    }

    /// Universe public..dev, a known account type, and a non-zero account
    pub fn is_valid(self) -> bool {
        (1..=4).contains(&self.universe())
            && (1..=10).contains(&self.account_type())
            && self.account_id() != 0
    }
}

impl fmt::Display for SteamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SteamId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl TryFrom<String> for SteamId {
    type Error = std::num::ParseIntError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarQuality {
    Small,
    Medium,
    Large,
}

impl AvatarQuality {
    /// Unknown names fall back to `Small`
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "small" => Self::Small,
            "medium" => Self::Medium,
            "large" | "full" => Self::Large,
            _ => {
                tracing::warn!("Unknown avatar quality {:?}, using small", name);
                Self::Small
            }
        }
    }

    fn url_suffix(self) -> &'static str {
        match self {
            Self::Small => "",
            Self::Medium => "_medium",
            Self::Large => "_full",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonaState {
    Offline,
    Online,
    Busy,
    Away,
    Snooze,
    LookingToTrade,
    LookingToPlay,
    Unknown(u8),
}

impl From<u8> for PersonaState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Offline,
            1 => Self::Online,
            2 => Self::Busy,
            3 => Self::Away,
            4 => Self::Snooze,
            5 => Self::LookingToTrade,
            6 => Self::LookingToPlay,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunityVisibility {
    Private,
    FriendsOnly,
    Public,
    Unknown(u8),
}

impl From<u8> for CommunityVisibility {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Private,
            2 => Self::FriendsOnly,
            3 => Self::Public,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSummary {
    pub steam_id: SteamId,
    pub real_name: String,
    pub nickname: String,
    pub status: PersonaState,
    pub visibility: CommunityVisibility,
    pub avatar_hash: String,
    pub profile_url: String,
    pub last_log_off: Option<DateTime<Utc>>,
    pub profile_configured: Option<bool>,
    pub comment_permissions: Option<bool>,
    pub creation_time: Option<DateTime<Utc>>,
}

impl PlayerSummary {
    pub fn account_age(&self) -> Option<chrono::Duration> {
        self.account_age_at(Utc::now())
    }

    pub fn account_age_at(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.creation_time.map(|created| now.signed_duration_since(created))
    }

    pub fn avatar_url(&self, quality: AvatarQuality) -> String {
        let prefix = self.avatar_hash.get(..2).unwrap_or(&self.avatar_hash);
        format!(
            "{}/{}/{}{}.jpg",
            AVATAR_URL_BASE,
            prefix,
            self.avatar_hash,
            quality.url_suffix()
        )
    }

    /// Custom profile name from `https://steamcommunity.com/id/<name>/`, or empty
    pub fn vanity_url(&self) -> &str {
        match self.profile_url.strip_prefix(VANITY_URL_BASE) {
            Some(rest) => rest.strip_suffix('/').unwrap_or(rest),
            None => "",
        }
    }
}

fn timestamp(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| Utc.timestamp_opt(s, 0).single())
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPlayerSummary {
    steamid: SteamId,
    #[serde(default)]
    realname: Option<String>,
    personaname: String,
    personastate: u8,
    communityvisibilitystate: u8,
    avatarhash: String,
    profileurl: String,
    #[serde(default)]
    lastlogoff: Option<i64>,
    #[serde(default)]
    profilestate: Option<i32>,
    #[serde(default)]
    commentpermission: Option<i32>,
    #[serde(default)]
    timecreated: Option<i64>,
}

impl From<RawPlayerSummary> for PlayerSummary {
    fn from(raw: RawPlayerSummary) -> Self {
        Self {
            steam_id: raw.steamid,
            real_name: raw.realname.unwrap_or_default(),
            nickname: raw.personaname,
            status: raw.personastate.into(),
            visibility: raw.communityvisibilitystate.into(),
            avatar_hash: raw.avatarhash,
            profile_url: raw.profileurl,
            last_log_off: timestamp(raw.lastlogoff),
            profile_configured: raw.profilestate.map(|v| v != 0),
            comment_permissions: raw.commentpermission.map(|v| v != 0),
            creation_time: timestamp(raw.timecreated),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EconomyBan {
    None,
    Banned,
    Probation,
    Unknown,
}

impl EconomyBan {
    pub fn parse(value: &str) -> Self {
        match value {
            "none" => Self::None,
            "banned" => Self::Banned,
            "probation" => Self::Probation,
            _ => {
                tracing::error!("Unknown EconomyBan value {:?}", value);
                Self::Unknown
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerBans {
    pub steam_id: SteamId,
    pub community_banned: bool,
    pub vac_ban_count: u32,
    pub game_ban_count: u32,
    pub time_since_last_ban: Duration,
    pub economy_ban: EconomyBan,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawPlayerBans {
    steam_id: SteamId,
    community_banned: bool,
    #[serde(rename = "NumberOfVACBans")]
    number_of_vac_bans: u32,
    number_of_game_bans: u32,
    days_since_last_ban: u32,
    economy_ban: String,
}

impl From<RawPlayerBans> for PlayerBans {
    fn from(raw: RawPlayerBans) -> Self {
        Self {
            steam_id: raw.steam_id,
            community_banned: raw.community_banned,
            vac_ban_count: raw.number_of_vac_bans,
            game_ban_count: raw.number_of_game_bans,
            time_since_last_ban: Duration::from_secs(u64::from(raw.days_since_last_ban) * 24 * 60 * 60),
            economy_ban: EconomyBan::parse(&raw.economy_ban),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(profile_url: &str) -> PlayerSummary {
        let raw: RawPlayerSummary = serde_json::from_value(serde_json::json!({
            "steamid": "76561197960287930",
            "personaname": "Rabscuttle",
            "personastate": 1,
            "communityvisibilitystate": 3,
            "avatarhash": "fef49e7fa7e1997310d705b2a6158ff8dc1cdfeb",
            "profileurl": profile_url,
            "timecreated": 1_063_407_589,
            "profilestate": 1
        }))
        .unwrap();
        raw.into()
    }

    #[test]
    fn test_steam_id() {
        let id: SteamId = "76561197960287930".parse().unwrap();
        assert_eq!(id.account_id(), 22202);
        assert_eq!(id.universe(), 1);
        assert_eq!(id.account_type(), 1);
        assert!(id.is_valid());

        assert!(!SteamId::from_id64(0).is_valid());
        assert!("not-a-number".parse::<SteamId>().is_err());
    }

    #[test]
    fn test_summary_fields() {
        let s = summary("https://steamcommunity.com/profiles/76561197960287930/");
        assert_eq!(s.nickname, "Rabscuttle");
        assert_eq!(s.real_name, "");
        assert_eq!(s.status, PersonaState::Online);
        assert_eq!(s.visibility, CommunityVisibility::Public);
        assert_eq!(s.profile_configured, Some(true));
        assert_eq!(s.comment_permissions, None);
        assert_eq!(s.last_log_off, None);

        let now = Utc.timestamp_opt(1_063_407_589 + 3600, 0).unwrap();
        assert_eq!(s.account_age_at(now), Some(chrono::Duration::hours(1)));
    }

    #[test]
    fn test_vanity_url() {
        assert_eq!(
            summary("https://steamcommunity.com/id/foobar/").vanity_url(),
            "foobar"
        );
        assert_eq!(
            summary("https://steamcommunity.com/id/foobar").vanity_url(),
            "foobar"
        );
        assert_eq!(
            summary("https://steamcommunity.com/profiles/76561197960287930/").vanity_url(),
            ""
        );
    }

    #[test]
    fn test_avatar_url() {
        let s = summary("https://steamcommunity.com/id/foobar/");
        assert_eq!(
            s.avatar_url(AvatarQuality::Large),
            "https://steamcdn-a.akamaihd.net/steamcommunity/public/images/avatars/fe/fef49e7fa7e1997310d705b2a6158ff8dc1cdfeb_full.jpg"
        );
        assert_eq!(
            s.avatar_url(AvatarQuality::Small),
            "https://steamcdn-a.akamaihd.net/steamcommunity/public/images/avatars/fe/fef49e7fa7e1997310d705b2a6158ff8dc1cdfeb.jpg"
        );
        assert_eq!(AvatarQuality::from_name("medium"), AvatarQuality::Medium);
        assert_eq!(AvatarQuality::from_name("huge"), AvatarQuality::Small);
    }

    #[test]
    fn test_economy_ban() {
        assert_eq!(EconomyBan::parse("none"), EconomyBan::None);
        assert_eq!(EconomyBan::parse("banned"), EconomyBan::Banned);
        assert_eq!(EconomyBan::parse("probation"), EconomyBan::Probation);
        assert_eq!(EconomyBan::parse("weird-value"), EconomyBan::Unknown);
    }

    #[test]
    fn test_bans_fields() {
        let raw: RawPlayerBans = serde_json::from_value(serde_json::json!({
            "SteamId": "76561197960287930",
            "CommunityBanned": false,
            "VACBanned": true,
            "NumberOfVACBans": 2,
            "DaysSinceLastBan": 3,
            "NumberOfGameBans": 1,
            "EconomyBan": "probation"
        }))
        .unwrap();
        let bans = PlayerBans::from(raw);

        assert_eq!(bans.vac_ban_count, 2);
        assert_eq!(bans.game_ban_count, 1);
        assert_eq!(bans.time_since_last_ban, Duration::from_secs(3 * 24 * 3600));
        assert_eq!(bans.economy_ban, EconomyBan::Probation);
    }
}
