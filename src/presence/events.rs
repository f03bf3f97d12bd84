//! Console log events the presence state cares about.

use std::time::SystemTime;

use super::state::{GameState, LobbyChangeType, MatchGroup, QueueStateChange, TfClass};

/// Parsed console lines (and world events) forwarded by the log parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    /// `map` line from the `status` command
    MapPosition { map_name: String },
    PartyHeader { member_count: u8 },
    LobbyHeader,
    LobbyStatusFailed,
    QueueStateChange {
        group: MatchGroup,
        change: QueueStateChange,
    },
    InQueue {
        group: MatchGroup,
        start_time: SystemTime,
    },
    LobbyChanged { change: LobbyChangeType },
    ServerJoin { map_name: String },
    HostNewGame,
    /// Local address from the `status` command
    PlayerStatusIp { local_ip: String },
    NetStatusConfig { connection_count: u32 },
    Connecting { address: String },
    SvcUserMessage { address: String },
    LocalPlayerSpawned { class: TfClass },
}

impl GameState {
    pub fn apply_event(&mut self, event: &ConsoleEvent) {
        match event {
            ConsoleEvent::MapPosition { map_name } => self.set_map_name(map_name.as_str()),
            ConsoleEvent::PartyHeader { member_count } => self.update_party(*member_count),
            ConsoleEvent::LobbyHeader => self.set_in_lobby(true),
            ConsoleEvent::LobbyStatusFailed => self.set_in_lobby(false),
            ConsoleEvent::QueueStateChange { group, change } => {
                self.on_queue_state_change(*group, *change);
            }
            ConsoleEvent::InQueue { group, start_time } => {
                self.on_queue_status_update(*group, *start_time);
            }
            ConsoleEvent::LobbyChanged { change } => {
                if *change == LobbyChangeType::Destroyed {
                    self.set_map_name("");
                }
            }
            ConsoleEvent::ServerJoin { map_name } => {
                self.set_map_name(map_name.as_str());
                // In-lobby is reapplied by the next lobby header if we are still in one
                self.set_in_lobby(false);
            }
            ConsoleEvent::HostNewGame => self.set_in_local_server(true),
            ConsoleEvent::PlayerStatusIp { local_ip } => self.on_server_ip_update(local_ip),
            ConsoleEvent::NetStatusConfig { connection_count } => {
                self.on_connection_count_update(*connection_count);
            }
            ConsoleEvent::Connecting { address } | ConsoleEvent::SvcUserMessage { address } => {
                self.on_server_ip_update(address);
            }
            ConsoleEvent::LocalPlayerSpawned { class } => self.on_local_player_spawned(*class),
        }
    }
}
