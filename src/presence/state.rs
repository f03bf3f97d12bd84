//! Accumulated game state that feeds the rich presence activity.

use std::fmt;
use std::time::SystemTime;

/// Address prefix reported by the client when it is hosting a listen server.
const LOOPBACK_PREFIX: &str = "0.0.0.0:";

/// Where the game client is currently connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected to a server in the first place
    #[default]
    Disconnected,
    /// Connected to a local (loopback) server
    Local,
    /// Connected to a non-local server
    Nonlocal,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("Disconnected"),
            Self::Local => f.write_str("Local"),
            Self::Nonlocal => f.write_str("Nonlocal"),
        }
    }
}

/// Matchmaking queue kinds the client can search in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchGroup {
    CompetitiveSixes,
    CompetitiveHighlander,
    CompetitiveEvent,
    Casual,
    CasualEvent,
    MvmPractice,
    MvmMannUp,
}

impl MatchGroup {
    pub const ALL: [Self; 7] = [
        Self::CompetitiveSixes,
        Self::CompetitiveHighlander,
        Self::CompetitiveEvent,
        Self::Casual,
        Self::CasualEvent,
        Self::MvmPractice,
        Self::MvmMannUp,
    ];

    pub fn category(self) -> QueueCategory {
        match self {
            Self::CompetitiveSixes | Self::CompetitiveHighlander | Self::CompetitiveEvent => {
                QueueCategory::Competitive
            }
            Self::Casual | Self::CasualEvent => QueueCategory::Casual,
            Self::MvmPractice | Self::MvmMannUp => QueueCategory::Mvm,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Groups of match groups shown together in the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueCategory {
    Casual,
    Competitive,
    Mvm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStateChange {
    Entered,
    Exited,
    RequestedExit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyChangeType {
    Created,
    Updated,
    Destroyed,
}

/// Player classes, plus `Undefined` for "nothing spawned yet"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TfClass {
    #[default]
    Undefined,
    Scout,
    Sniper,
    Soldier,
    Demoman,
    Medic,
    Heavy,
    Pyro,
    Spy,
    Engie,
}

/// Active flag and start time for one matchmaking queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueState {
    pub active: bool,
    pub start_time: SystemTime,
}

impl Default for QueueState {
    fn default() -> Self {
        Self {
            active: false,
            start_time: SystemTime::UNIX_EPOCH,
        }
    }
}

/// Mutable accumulator of everything observed about the local player.
///
/// Only changed through the `on_*`/`set_*` handlers, which are invoked
/// serially from the console-log dispatch.
#[derive(Debug, Clone, Default)]
pub struct GameState {
    queue_states: [QueueState; MatchGroup::ALL.len()],
    last_spawned_class: TfClass,
    map_name: String,
    in_lobby: bool,
    party_member_count: u8,
    connection_state: ConnectionState,
    debug_log: bool,
}

// The logging flag is configuration, not observed state
impl PartialEq for GameState {
    fn eq(&self, other: &Self) -> bool {
        self.queue_states == other.queue_states
            && self.last_spawned_class == other.last_spawned_class
            && self.map_name == other.map_name
            && self.in_lobby == other.in_lobby
            && self.party_member_count == other.party_member_count
            && self.connection_state == other.connection_state
    }
}

impl Eq for GameState {}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable "DRP:" debug lines for handler calls and phase transitions
    pub fn set_debug_logging(&mut self, enabled: bool) {
        self.debug_log = enabled;
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    pub fn in_lobby(&self) -> bool {
        self.in_lobby
    }

    pub fn party_member_count(&self) -> u8 {
        self.party_member_count
    }

    pub fn last_spawned_class(&self) -> TfClass {
        self.last_spawned_class
    }

    pub fn queue_state(&self, group: MatchGroup) -> QueueState {
        self.queue_states
            .get(group.index())
            .copied()
            .unwrap_or_default()
    }

    pub fn is_queue_active(&self, group: MatchGroup) -> bool {
        self.queue_state(group).active
    }

    pub fn is_any_queue_active(&self) -> bool {
        self.queue_states.iter().any(|q| q.active)
    }

    pub fn is_category_active(&self, category: QueueCategory) -> bool {
        MatchGroup::ALL
            .iter()
            .any(|g| g.category() == category && self.is_queue_active(*g))
    }

    pub fn earliest_active_queue_start(&self) -> Option<SystemTime> {
        self.queue_states
            .iter()
            .filter(|q| q.active)
            .map(|q| q.start_time)
            .min()
    }

    pub fn on_queue_state_change(&mut self, group: MatchGroup, change: QueueStateChange) {
        self.on_queue_state_change_at(group, change, SystemTime::now());
    }

    pub(crate) fn on_queue_state_change_at(
        &mut self,
        group: MatchGroup,
        change: QueueStateChange,
        now: SystemTime,
    ) {
        self.drp_debug(format_args!("on_queue_state_change({group:?}, {change:?})"));
        let Some(queue) = self.queue_states.get_mut(group.index()) else {
            return;
        };

        match change {
            QueueStateChange::Entered => {
                queue.active = true;
                queue.start_time = now;
            }
            QueueStateChange::Exited | QueueStateChange::RequestedExit => {
                queue.active = false;
            }
        }
    }

    /// Late-join of an already running search, with the start time the client reports
    pub fn on_queue_status_update(&mut self, group: MatchGroup, queue_start_time: SystemTime) {
        self.drp_debug(format_args!("on_queue_status_update({group:?})"));
        if let Some(queue) = self.queue_states.get_mut(group.index()) {
            queue.active = true;
            queue.start_time = queue_start_time;
        }
    }

    pub fn on_server_ip_update(&mut self, local_ip: &str) {
        self.drp_debug(format_args!("on_server_ip_update({local_ip})"));
        if local_ip.starts_with(LOOPBACK_PREFIX) {
            self.set_in_local_server(true);
        } else {
            self.set_in_local_server(false);
            self.set_connection_state(ConnectionState::Nonlocal);
        }
    }

    pub fn set_in_lobby(&mut self, in_lobby: bool) {
        self.drp_debug(format_args!("set_in_lobby({in_lobby})"));
        if in_lobby {
            self.set_connection_state(ConnectionState::Nonlocal);
        }

        self.in_lobby = in_lobby;
    }

    pub fn set_in_local_server(&mut self, in_local_server: bool) {
        self.drp_debug(format_args!("set_in_local_server({in_local_server})"));
        if in_local_server {
            self.set_connection_state(ConnectionState::Local);
            self.in_lobby = false;
        }
    }

    pub fn set_in_party(&mut self, in_party: bool) {
        self.drp_debug(format_args!("set_in_party({in_party})"));
        if in_party {
            self.party_member_count = self.party_member_count.max(1);
        } else {
            self.party_member_count = 0;
        }
    }

    /// Leaving a map (empty name) also forgets the last spawned class
    pub fn set_map_name(&mut self, map_name: impl Into<String>) {
        self.map_name = map_name.into();
        self.drp_debug(format_args!("set_map_name({:?})", self.map_name));
        if self.map_name.is_empty() {
            self.last_spawned_class = TfClass::Undefined;
        }
    }

    /// Zero is ignored; the party header is only trusted when it reports members
    pub fn update_party(&mut self, party_members: u8) {
        self.drp_debug(format_args!("update_party({party_members})"));
        if party_members > 0 {
            self.set_in_party(true);
            self.party_member_count = party_members;
        }
    }

    pub fn on_local_player_spawned(&mut self, class: TfClass) {
        self.drp_debug(format_args!("on_local_player_spawned({class:?})"));
        self.last_spawned_class = class;
    }

    pub fn on_connection_count_update(&mut self, connection_count: u32) {
        self.drp_debug(format_args!("on_connection_count_update({connection_count})"));
        if connection_count < 1 {
            self.set_connection_state(ConnectionState::Disconnected);
        }
    }

    fn set_connection_state(&mut self, new_state: ConnectionState) {
        if new_state == self.connection_state {
            return;
        }

        self.drp_debug(format_args!(
            "ConnectionState {} -> {}",
            self.connection_state, new_state
        ));
        self.connection_state = new_state;
    }

    fn drp_debug(&self, args: fmt::Arguments<'_>) {
        if self.debug_log {
            tracing::debug!("DRP: {}", args);
        }
    }
}
