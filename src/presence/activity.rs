//! Builds the activity shown on the user's profile from the accumulated game state.

use std::fmt;
use std::time::SystemTime;

use super::drp_info::DrpInfo;
use super::state::{ConnectionState, GameState, QueueCategory, TfClass};

pub const DEFAULT_LARGE_IMAGE_KEY: &str = "tf2_1x1";
pub const UNKNOWN_MAP_IMAGE_KEY: &str = "map_unknown";
pub const MAX_PARTY_SIZE: u8 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivityAssets {
    pub large_image: String,
    pub small_image: Option<String>,
    pub small_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartySize {
    pub current: u8,
    pub max: u8,
}

/// One point-in-time presence value. Compared structurally to decide
/// whether a publish is needed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivitySnapshot {
    pub state: String,
    pub details: String,
    /// Unix seconds
    pub start_timestamp: Option<i64>,
    pub assets: ActivityAssets,
    pub party: Option<PartySize>,
}

impl fmt::Display for ActivitySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\n\tState:      {:?}", self.state)?;
        write!(f, "\n\tDetails:    {:?}", self.details)?;
        write!(f, "\n\tStart:      {:?}", self.start_timestamp)?;
        write!(f, "\n\tLargeImage: {:?}", self.assets.large_image)?;
        write!(f, "\n\tSmallImage: {:?}", self.assets.small_image)?;
        write!(f, "\n\tSmallText:  {:?}", self.assets.small_text)?;
        match self.party {
            Some(p) => write!(f, "\n\tParty:      {}/{}", p.current, p.max),
            None => write!(f, "\n\tParty:      none"),
        }
    }
}

fn game_state_label(state: &GameState) -> &'static str {
    match state.connection_state() {
        ConnectionState::Local => "Local Server",
        ConnectionState::Nonlocal if state.in_lobby() => "Casual",
        ConnectionState::Nonlocal => "Community",
        ConnectionState::Disconnected => "Main Menu",
    }
}

fn searching_label(casual: bool, competitive: bool, mvm: bool) -> &'static str {
    match (casual, competitive, mvm) {
        (true, true, true) => "Searching - Casual, Competitive, and MVM",
        (true, true, false) => "Searching - Casual & Competitive",
        (true, false, true) => "Searching - Casual & MVM",
        (true, false, false) => "Searching - Casual",
        (false, true, true) => "Searching - Competitive & MVM",
        (false, true, false) => "Searching - Competitive",
        (false, false, true) => "Searching - MVM",
        (false, false, false) => {
            tracing::error!("Queue active but no queue category matched");
            "Searching"
        }
    }
}

fn class_asset(class: TfClass) -> Option<(&'static str, &'static str)> {
    match class {
        TfClass::Demoman => Some(("leaderboard_class_demo", "Demo")),
        TfClass::Engie => Some(("leaderboard_class_engineer", "Engineer")),
        TfClass::Heavy => Some(("leaderboard_class_heavy", "Heavy")),
        TfClass::Medic => Some(("leaderboard_class_medic", "Medic")),
        TfClass::Pyro => Some(("leaderboard_class_pyro", "Pyro")),
        TfClass::Scout => Some(("leaderboard_class_scout", "Scout")),
        TfClass::Sniper => Some(("leaderboard_class_sniper", "Sniper")),
        TfClass::Soldier => Some(("leaderboard_class_soldier", "Soldier")),
        TfClass::Spy => Some(("leaderboard_class_spy", "Spy")),
        TfClass::Undefined => None,
    }
}

fn unix_seconds(time: SystemTime) -> i64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Pure function of the game state and the map list
pub fn construct_activity(state: &GameState, drp_info: &DrpInfo) -> ActivitySnapshot {
    let mut activity = ActivitySnapshot::default();
    let connected = state.connection_state() != ConnectionState::Disconnected;

    let mut details = String::new();
    if connected && !state.map_name().is_empty() {
        activity.assets.large_image = drp_info
            .find_map(state.map_name())
            .and_then(|m| m.image_key())
            .unwrap_or_else(|| UNKNOWN_MAP_IMAGE_KEY.to_string());
        details = state.map_name().to_string();
    } else {
        activity.assets.large_image = DEFAULT_LARGE_IMAGE_KEY.to_string();
    }

    if state.is_any_queue_active() {
        activity.state = searching_label(
            state.is_category_active(QueueCategory::Casual),
            state.is_category_active(QueueCategory::Competitive),
            state.is_category_active(QueueCategory::Mvm),
        )
        .to_string();

        activity.start_timestamp = state.earliest_active_queue_start().map(unix_seconds);

        if connected {
            details = if details.is_empty() {
                game_state_label(state).to_string()
            } else {
                format!("{} - {}", game_state_label(state), details)
            };
        }
    } else {
        activity.state = game_state_label(state).to_string();
    }

    if state.party_member_count() > 0 {
        activity.party = Some(PartySize {
            current: state.party_member_count(),
            max: MAX_PARTY_SIZE,
        });
    }

    if connected {
        if let Some((image, text)) = class_asset(state.last_spawned_class()) {
            activity.assets.small_image = Some(image.to_string());
            activity.assets.small_text = Some(text.to_string());
        }
    }

    activity.details = details;
    activity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::state::{MatchGroup, QueueStateChange};
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_main_menu() {
        let activity = construct_activity(&GameState::new(), &DrpInfo::default());

        assert_eq!(activity.state, "Main Menu");
        assert_eq!(activity.details, "");
        assert_eq!(activity.assets.large_image, DEFAULT_LARGE_IMAGE_KEY);
        assert_eq!(activity.assets.small_image, None);
        assert_eq!(activity.party, None);
        assert_eq!(activity.start_timestamp, None);
    }

    #[test]
    fn test_community_server_with_class() {
        let mut state = GameState::new();
        state.on_server_ip_update("203.0.113.7:27015");
        state.set_map_name("pl_badwater");
        state.on_local_player_spawned(TfClass::Engie);

        let activity = construct_activity(&state, &DrpInfo::default());
        assert_eq!(activity.state, "Community");
        assert_eq!(activity.details, "pl_badwater");
        assert_eq!(activity.assets.large_image, "map_pl_badwater");
        assert_eq!(
            activity.assets.small_image.as_deref(),
            Some("leaderboard_class_engineer")
        );
        assert_eq!(activity.assets.small_text.as_deref(), Some("Engineer"));
    }

    #[test]
    fn test_unknown_map_in_lobby() {
        let mut state = GameState::new();
        state.set_in_lobby(true);
        state.set_map_name("cp_mystery_b3");

        let activity = construct_activity(&state, &DrpInfo::default());
        assert_eq!(activity.state, "Casual");
        assert_eq!(activity.assets.large_image, UNKNOWN_MAP_IMAGE_KEY);
    }

    #[test]
    fn test_class_hidden_when_disconnected() {
        let mut state = GameState::new();
        state.on_local_player_spawned(TfClass::Spy);

        let activity = construct_activity(&state, &DrpInfo::default());
        assert_eq!(activity.assets.small_image, None);
        assert_eq!(activity.assets.small_text, None);
    }

    #[test]
    fn test_searching_from_main_menu() {
        let mut state = GameState::new();
        state.on_queue_state_change_at(MatchGroup::Casual, QueueStateChange::Entered, at(300));
        state.on_queue_status_update(MatchGroup::MvmMannUp, at(100));

        let activity = construct_activity(&state, &DrpInfo::default());
        assert_eq!(activity.state, "Searching - Casual & MVM");
        assert_eq!(activity.details, "");
        assert_eq!(activity.start_timestamp, Some(100));
    }

    #[test]
    fn test_searching_while_connected_prefixes_details() {
        let mut state = GameState::new();
        state.set_in_local_server(true);
        state.set_map_name("ctf_2fort");
        state.on_queue_status_update(MatchGroup::CompetitiveSixes, at(42));

        let activity = construct_activity(&state, &DrpInfo::default());
        assert_eq!(activity.state, "Searching - Competitive");
        assert_eq!(activity.details, "Local Server - ctf_2fort");

        state.set_map_name("");
        let activity = construct_activity(&state, &DrpInfo::default());
        assert_eq!(activity.details, "Local Server");
    }

    #[test]
    fn test_searching_labels() {
        assert_eq!(
            searching_label(true, true, true),
            "Searching - Casual, Competitive, and MVM"
        );
        assert_eq!(
            searching_label(true, true, false),
            "Searching - Casual & Competitive"
        );
        assert_eq!(
            searching_label(false, true, true),
            "Searching - Competitive & MVM"
        );
        assert_eq!(searching_label(false, false, true), "Searching - MVM");
        assert_eq!(searching_label(false, false, false), "Searching");
    }

    #[test]
    fn test_party_block() {
        let mut state = GameState::new();
        state.update_party(3);

        let activity = construct_activity(&state, &DrpInfo::default());
        assert_eq!(activity.party, Some(PartySize { current: 3, max: 6 }));
    }

    #[test]
    fn test_equal_states_build_equal_activities() {
        let mut a = GameState::new();
        a.set_in_lobby(true);
        a.set_map_name("koth_viaduct");
        a.on_local_player_spawned(TfClass::Heavy);
        a.on_queue_status_update(MatchGroup::Casual, at(10));
        let b = a.clone();

        let info = DrpInfo::default();
        assert_eq!(construct_activity(&a, &info), construct_activity(&b, &info));
    }
}
