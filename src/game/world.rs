//! The owned game context: every player and room, advanced by events and ticks

use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::ws::protocol::{RoundPhase, ServerMsg};

use super::arena::{arena_info, random_spawn_position};
use super::outbox::{Envelope, Outbox, TimerEvent};
use super::player::{Player, PlayerRegistry};
use super::room::RoomDirectory;
use super::tuning::{DEFAULT_ROOM_ID, ROOM_CAPACITY};

/// World construction parameters
#[derive(Debug, Clone)]
pub struct WorldSettings {
    pub default_room: String,
    pub room_capacity: usize,
    pub seed: u64,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            default_room: DEFAULT_ROOM_ID.to_string(),
            room_capacity: ROOM_CAPACITY,
            seed: rand::random(),
        }
    }
}

/// Counters published for the health endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub rooms: usize,
    pub players: usize,
    pub playing_rooms: usize,
}

/// All mutable game state. Owned by a single task; every handler and the
/// tick take `&mut self` and run to completion.
pub struct GameWorld {
    pub players: PlayerRegistry,
    pub rooms: RoomDirectory,
    pub(super) rng: ChaCha8Rng,
    pub(super) out: Outbox,
}

impl GameWorld {
    pub fn new(settings: WorldSettings, now: u64) -> Self {
        Self {
            players: PlayerRegistry::default(),
            rooms: RoomDirectory::new(settings.default_room, settings.room_capacity, now),
            rng: ChaCha8Rng::seed_from_u64(settings.seed),
            out: Outbox::default(),
        }
    }

    /// Register a new connection and greet it
    pub fn connect(&mut self, player_id: Uuid, now: u64) {
        let player = Player::new(player_id, random_spawn_position(&mut self.rng));
        info!(player_id = %player_id, name = %player.name, at = now, "Player connected");
        self.players.insert(player);
        self.out.send_to(
            player_id,
            ServerMsg::GameState {
                player_id,
                arena: arena_info(),
            },
        );
    }

    /// Remove a connection and everything that references it
    pub fn disconnect(&mut self, player_id: Uuid, now: u64) {
        let Some(room_id) = self.players.get(&player_id).and_then(|p| p.room.clone()) else {
            if self.players.remove(&player_id).is_some() {
                info!(player_id = %player_id, "Player disconnected");
            }
            return;
        };
        self.leave_room(player_id, &room_id, now);
        self.players.remove(&player_id);
        info!(player_id = %player_id, room_id = %room_id, "Player disconnected");
    }

    /// Take a player out of `room_id` and tell whoever is left
    pub(super) fn leave_room(&mut self, player_id: Uuid, room_id: &str, now: u64) {
        let remaining = self.rooms.leave(room_id, &player_id, now);
        if let Some(player) = self.players.get_mut(&player_id) {
            player.room = None;
        }
        self.out.broadcast(&remaining, ServerMsg::PlayerLeft { player_id });
        info!(player_id = %player_id, room_id = %room_id, remaining = remaining.len(), "Player left room");
    }

    /// One pass of the tick driver over every room
    pub fn tick(&mut self, now: u64) {
        for room_id in self.rooms.ids() {
            let Some(room) = self.rooms.get_mut(&room_id) else {
                continue;
            };
            room.advance_phase(&mut self.players, &mut self.rng, &mut self.out, now);
            room.process_respawns(&mut self.players, &mut self.rng, &mut self.out, now);
            room.maybe_spawn_powerup(&mut self.rng, &mut self.out, now);
            room.sweep_powerups(&mut self.out, now);
        }
    }

    /// A one-shot timer came due. Timers whose room is gone are no-ops.
    pub fn fire_timer(&mut self, event: TimerEvent, now: u64) {
        match event {
            TimerEvent::RestartRound { room_id, epoch } => {
                let Some(room) = self.rooms.get_mut(&room_id) else {
                    debug!(room_id = %room_id, "Restart timer for deleted room");
                    return;
                };
                room.restart_round(epoch, &mut self.players, &mut self.rng, &mut self.out, now);
            }
        }
    }

    /// Everything emitted since the last call
    pub fn take_output(&mut self) -> (Vec<Envelope>, Vec<(Duration, TimerEvent)>) {
        self.out.drain()
    }

    pub fn stats(&self) -> WorldStats {
        WorldStats {
            rooms: self.rooms.len(),
            players: self.players.len(),
            playing_rooms: self
                .rooms
                .iter()
                .filter(|r| r.round.phase == RoundPhase::Playing)
                .count(),
        }
    }
}
