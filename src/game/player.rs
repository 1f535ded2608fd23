//! Player records and the connection-keyed registry

use std::collections::HashMap;

use uuid::Uuid;

use crate::ws::protocol::{PlayerSnapshot, Vec3};

use super::tuning::MAX_NAME_LEN;
use super::vehicle::{VehicleKind, VehicleStats};

/// Authoritative state of one connected player
#[derive(Debug, Clone)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    /// Last reported telemetry, trusted as-is
    pub position: Vec3,
    pub rotation: Vec3,
    /// Always within `0..=max_health()`
    pub health: u32,
    pub vehicle: VehicleKind,
    pub room: Option<String>,
    /// Until this instant the player can neither deal nor take damage
    pub invulnerable_until: u64,
    /// Until this instant the player cannot take damage
    pub shield_until: u64,
    /// Whether the parachute drop of the latest spawn has finished
    pub landed: bool,
}

impl Player {
    pub fn new(id: Uuid, position: Vec3) -> Self {
        let vehicle = VehicleKind::default();
        Self {
            id,
            name: default_name(id),
            position,
            rotation: Vec3::default(),
            health: vehicle.stats().max_health,
            vehicle,
            room: None,
            invulnerable_until: 0,
            shield_until: 0,
            landed: false,
        }
    }

    pub fn stats(&self) -> VehicleStats {
        self.vehicle.stats()
    }

    pub fn max_health(&self) -> u32 {
        self.stats().max_health
    }

    /// Cannot deal damage
    pub fn is_invulnerable(&self, now: u64) -> bool {
        now < self.invulnerable_until
    }

    /// Cannot receive damage
    pub fn is_protected(&self, now: u64) -> bool {
        self.is_invulnerable(now) || now < self.shield_until
    }

    /// Full health at a new position, invulnerable for `invulnerable_ms`
    pub fn respawn_at(&mut self, position: Vec3, now: u64, invulnerable_ms: u64) {
        self.position = position;
        self.health = self.max_health();
        self.invulnerable_until = now + invulnerable_ms;
        self.landed = false;
    }

    /// Switch vehicle, keeping health within the new maximum
    pub fn set_vehicle(&mut self, vehicle: VehicleKind) {
        self.vehicle = vehicle;
        self.health = self.health.min(self.max_health());
    }

    /// Subtract damage, saturating at zero. Returns the new health.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        self.health = self.health.saturating_sub(amount);
        self.health
    }

    /// Restore health up to the vehicle maximum. Returns the amount restored.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let before = self.health;
        self.health = self.health.saturating_add(amount).min(self.max_health());
        self.health - before
    }

    pub fn remaining_invulnerability(&self, now: u64) -> u64 {
        self.invulnerable_until.saturating_sub(now)
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            name: self.name.clone(),
            position: self.position,
            rotation: self.rotation,
            health: self.health,
            max_health: self.max_health(),
            vehicle_id: self.vehicle,
        }
    }
}

fn default_name(id: Uuid) -> String {
    let simple = id.simple().to_string();
    format!("Player-{}", &simple[..4])
}

/// Trim, then cut to `max_chars` characters. `None` if nothing is left.
pub fn sanitize_text(raw: &str, max_chars: usize) -> Option<String> {
    let cut: String = raw.trim().chars().take(max_chars).collect();
    let cut = cut.trim_end();
    if cut.is_empty() {
        None
    } else {
        Some(cut.to_string())
    }
}

pub fn sanitize_name(raw: &str) -> Option<String> {
    sanitize_text(raw, MAX_NAME_LEN)
}

/// All connected players, keyed by connection id
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<Uuid, Player>,
}

impl PlayerRegistry {
    pub fn insert(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    pub fn get(&self, id: &Uuid) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<Player> {
        self.players.remove(id)
    }

    #[cfg(test)]
    pub fn contains(&self, id: &Uuid) -> bool {
        self.players.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }
}
