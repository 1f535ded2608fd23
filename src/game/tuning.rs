//! Gameplay constants. All durations are milliseconds.

/// Reserved room created at boot
pub const DEFAULT_ROOM_ID: &str = "default";
/// Maximum members per room
pub const ROOM_CAPACITY: usize = 8;
/// Room identifiers longer than this are rejected
pub const MAX_ROOM_ID_LEN: usize = 32;

pub const WAITING_DURATION_MS: u64 = 60_000;
pub const ROUND_DURATION_MS: u64 = 240_000;
pub const ROUND_END_DURATION_MS: u64 = 20_000;
pub const RESPAWN_DELAY_MS: u64 = 3_000;

/// Invulnerability granted on a round start or join spawn
pub const SPAWN_INVULNERABILITY_MS: u64 = 3_000;
/// How long the client animates the parachute drop after a spawn
pub const PARACHUTE_DESCENT_MS: u64 = 4_000;
/// Invulnerability granted on respawn
pub const RESPAWN_INVULNERABILITY_MS: u64 = 3_000;

/// Hazard hits cost this fraction of the target's max health
pub const MONSTER_DAMAGE_FRACTION: f64 = 0.20;

pub const MAX_NAME_LEN: usize = 16;
pub const MAX_CHAT_LEN: usize = 200;

// Powerups
pub const POWERUP_MIN_ACTIVE_PLAYERS: usize = 2;
pub const POWERUP_BASE_INTERVAL_MS: u64 = 30_000;
pub const POWERUP_MIN_INTERVAL_MS: u64 = 15_000;
pub const POWERUP_INTERVAL_STEP_MS: u64 = 2_500;
pub const POWERUP_FALL_MS: u64 = 3_000;
pub const POWERUP_LIFETIME_MS: u64 = 45_000;
/// Share of drops that are health packs, the rest are shields
pub const POWERUP_HEALTH_WEIGHT: f64 = 0.70;
pub const HEALTH_PACK_AMOUNT: u32 = 40;
pub const SHIELD_DURATION_MS: u64 = 10_000;

// Arena
/// Half the side length of the square arena floor
pub const ARENA_HALF_EXTENT: f64 = 100.0;
/// Powerups never land closer than this to a wall
pub const ARENA_WALL_MARGIN: f64 = 10.0;
/// Height at which spawning vehicles start their parachute drop
pub const SPAWN_DROP_HEIGHT: f64 = 40.0;
/// Horizontal jitter applied around a spawn point
pub const SPAWN_JITTER: f64 = 4.0;

pub const SPAWN_POINTS: [(f64, f64); 8] = [
    (-70.0, -70.0),
    (0.0, -75.0),
    (70.0, -70.0),
    (75.0, 0.0),
    (70.0, 70.0),
    (0.0, 75.0),
    (-70.0, 70.0),
    (-75.0, 0.0),
];

pub const BOOST_PADS: [(f64, f64); 4] = [(-40.0, 0.0), (40.0, 0.0), (0.0, -40.0), (0.0, 40.0)];
