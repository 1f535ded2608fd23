//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::vehicle::VehicleKind;

/// Position or Euler rotation as reported by the client
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Round phase of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum RoundPhase {
    #[default]
    Waiting,
    Playing,
    RoundEnd,
}

/// How a hit was delivered. Clients compute the raw damage for each kind;
/// the server only rescales it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionType {
    Headshot,
    HeadOn,
    Side,
    Rear,
    Medium,
    /// Environmental hazard, not a player
    Monster,
    /// Health pack pickup reported on the damage channel
    Heal,
}

impl CollisionType {
    /// Resolve a client-supplied collision type. Unknown values, and `heal`
    /// which only the server may emit, count as a plain `medium` hit.
    pub fn from_client(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("headshot") => Self::Headshot,
            Some("head-on") => Self::HeadOn,
            Some("side") => Self::Side,
            Some("rear") => Self::Rear,
            Some("monster") => Self::Monster,
            _ => Self::Medium,
        }
    }
}

/// Powerup kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerupKind {
    Health,
    Shield,
}

/// Messages sent from client to server.
///
/// Payload fields are optional on the wire so that missing values are
/// reported as rejections by the handlers instead of parse failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMsg {
    /// Enter a room, leaving the current one
    JoinRoom {
        #[serde(default)]
        room_id: Option<String>,
    },

    /// Telemetry update
    PlayerMove {
        #[serde(default)]
        position: Option<Vec3>,
        #[serde(default)]
        rotation: Option<Vec3>,
    },

    VehicleSelected {
        #[serde(default)]
        vehicle_id: Option<String>,
    },

    /// Client-detected hit on another player (or by a hazard)
    PlayerDamaged {
        #[serde(default)]
        damage: Option<f64>,
        #[serde(default)]
        target_player_id: Option<String>,
        #[serde(default)]
        collision_type: Option<String>,
    },

    /// Parachute drop finished
    PlayerLanded {},

    SetNickname {
        #[serde(default)]
        nickname: Option<String>,
    },

    ChatMessage {
        #[serde(default)]
        message: Option<String>,
    },

    CollectPowerup {
        #[serde(default)]
        powerup_id: Option<String>,
    },

    RequestStandings {},
}

impl ClientMsg {
    /// Event name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "joinRoom",
            Self::PlayerMove { .. } => "playerMove",
            Self::VehicleSelected { .. } => "vehicleSelected",
            Self::PlayerDamaged { .. } => "playerDamaged",
            Self::PlayerLanded {} => "playerLanded",
            Self::SetNickname { .. } => "setNickname",
            Self::ChatMessage { .. } => "chatMessage",
            Self::CollectPowerup { .. } => "collectPowerup",
            Self::RequestStandings {} => "requestStandings",
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMsg {
    /// Sent once after connection
    GameState {
        player_id: Uuid,
        arena: ArenaInfo,
    },

    /// Confirmation of a room join, sent to the joiner only
    RoomJoined {
        room_id: String,
        /// Everyone else in the room
        players: Vec<PlayerSnapshot>,
        game_state: RoundSnapshot,
        boost_pads: Vec<Vec3>,
    },

    PlayerJoined {
        player: PlayerSnapshot,
    },

    PlayerLeft {
        player_id: Uuid,
    },

    PlayerMoved {
        player_id: Uuid,
        position: Vec3,
        rotation: Vec3,
    },

    PlayerVehicleChanged {
        player_id: Uuid,
        vehicle_id: VehicleKind,
        health: u32,
        max_health: u32,
    },

    /// Where the recipient has been placed
    PlayerSpawn {
        position: Vec3,
        health: u32,
        invulnerable_ms: u64,
    },

    /// Damage (positive) or healing (negative) applied to a player
    PlayerDamaged {
        player_id: Uuid,
        health: u32,
        damage: i64,
        collision_type: CollisionType,
        /// Player id, or `"monster"` for hazard damage
        attacker_id: String,
    },

    PlayerDestroyed {
        player_id: Uuid,
        respawn_time: u64,
        attacker_id: String,
    },

    PlayerRespawned {
        player: PlayerSnapshot,
        invulnerable_ms: u64,
    },

    WaitingPhaseStarted {
        waiting_end_time: u64,
    },

    RoundStarted {
        round_end_time: u64,
        players: Vec<PlayerSnapshot>,
    },

    RoundEnded {
        leaderboard: Vec<LeaderboardRow>,
        round_stats: RoundStats,
        next_round_start_time: u64,
    },

    Standings {
        leaderboard: Vec<LeaderboardRow>,
        phase: RoundPhase,
    },

    PowerupDropped {
        powerup: PowerupView,
    },

    PowerupCollected {
        powerup_id: Uuid,
        player_id: Uuid,
        powerup_type: PowerupKind,
    },

    PowerupRemoved {
        powerup_id: Uuid,
    },

    /// Sent to the collector of a shield
    ShieldActivated {
        shield_until: u64,
        duration_ms: u64,
    },

    /// Sent to everyone else when a player picks up a shield
    PlayerShielded {
        player_id: Uuid,
        shield_until: u64,
    },

    ChatMessage {
        player_id: Uuid,
        name: String,
        message: String,
        timestamp: u64,
    },

    RoomFull {
        room_id: String,
    },
}

/// Static arena description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaInfo {
    pub half_extent: f64,
    pub wall_margin: f64,
    pub spawn_points: Vec<Vec3>,
    pub boost_pads: Vec<Vec3>,
}

/// Public view of a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: Uuid,
    pub name: String,
    pub position: Vec3,
    pub rotation: Vec3,
    pub health: u32,
    pub max_health: u32,
    pub vehicle_id: VehicleKind,
}

/// Round timing as seen by a client joining mid-flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSnapshot {
    pub phase: RoundPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting_end_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_end_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_round_start_time: Option<u64>,
    pub active_players: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub player_id: Uuid,
    pub player_name: String,
    pub kills: u32,
    pub deaths: u32,
    pub damage_dealt: u64,
}

/// Aggregate totals for a finished round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStats {
    pub total_kills: u32,
    pub total_deaths: u32,
    pub total_damage: u64,
    pub player_count: u32,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerupView {
    pub id: Uuid,
    pub powerup_type: PowerupKind,
    pub position: Vec3,
    pub drop_time: u64,
    pub land_time: u64,
    pub despawn_time: u64,
}
