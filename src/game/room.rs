//! Room membership and the round transitions that act on it

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::ws::protocol::{PlayerSnapshot, RoundPhase, ServerMsg};

use super::arena::random_spawn_position;
use super::outbox::{Outbox, TimerEvent};
use super::player::PlayerRegistry;
use super::round::RoundState;
use super::tuning::{
    PARACHUTE_DESCENT_MS, RESPAWN_INVULNERABILITY_MS, ROUND_DURATION_MS, ROUND_END_DURATION_MS,
    SPAWN_INVULNERABILITY_MS, WAITING_DURATION_MS,
};

/// Invulnerability on a round start or join spawn covers the parachute drop
pub const fn spawn_invulnerability_ms() -> u64 {
    if PARACHUTE_DESCENT_MS > SPAWN_INVULNERABILITY_MS {
        PARACHUTE_DESCENT_MS
    } else {
        SPAWN_INVULNERABILITY_MS
    }
}

/// An arena instance: a bounded, ordered roster plus its round state
#[derive(Debug, Clone)]
pub struct Room {
    pub id: String,
    pub members: Vec<Uuid>,
    pub round: RoundState,
}

impl Room {
    pub fn new(id: String, now: u64) -> Self {
        Self {
            id,
            members: Vec::new(),
            round: RoundState::new(now),
        }
    }

    #[cfg(test)]
    pub fn is_member(&self, player_id: &Uuid) -> bool {
        self.members.contains(player_id)
    }

    /// Drop a player from the roster and every round structure
    pub fn remove_member(&mut self, player_id: &Uuid) -> bool {
        let before = self.members.len();
        self.members.retain(|id| id != player_id);
        self.round.forget(player_id);
        self.members.len() != before
    }

    /// Snapshots of active players in roster order
    pub fn active_snapshots(&self, players: &PlayerRegistry) -> Vec<PlayerSnapshot> {
        self.members
            .iter()
            .filter(|id| self.round.is_active(id))
            .filter_map(|id| players.get(id))
            .map(|p| p.snapshot())
            .collect()
    }

    /// Begin a round for everyone currently in the room
    pub fn start_round(
        &mut self,
        players: &mut PlayerRegistry,
        rng: &mut impl Rng,
        out: &mut Outbox,
        now: u64,
    ) {
        let round = &mut self.round;
        round.phase = RoundPhase::Playing;
        round.epoch += 1;
        round.round_start_time = now;
        round.round_end_time = now + ROUND_DURATION_MS;
        round.active_players.clear();
        round.respawning_players.clear();
        round.last_powerup_drop = now;

        for id in &self.members {
            let Some(player) = players.get_mut(id) else {
                continue;
            };
            player.respawn_at(random_spawn_position(rng), now, spawn_invulnerability_ms());
            round.active_players.insert(*id);
            round.leaderboard.ensure(*id, &player.name);
        }

        info!(
            room_id = %self.id,
            players = self.round.active_players.len(),
            round_end_time = self.round.round_end_time,
            "Round started"
        );

        let msg = ServerMsg::RoundStarted {
            round_end_time: self.round.round_end_time,
            players: self.active_snapshots(players),
        };
        out.broadcast(&self.members, msg);
    }

    /// Close the round, publish standings and schedule the next start
    pub fn end_round(&mut self, out: &mut Outbox, now: u64) {
        let round = &mut self.round;
        round.phase = RoundPhase::RoundEnd;
        round.next_round_start_time = now + ROUND_END_DURATION_MS;

        let leaderboard = round.leaderboard.sorted();
        let round_stats = round
            .leaderboard
            .stats(self.members.len(), now.saturating_sub(round.round_start_time));

        info!(
            room_id = %self.id,
            total_kills = round_stats.total_kills,
            next_round_start_time = round.next_round_start_time,
            "Round ended"
        );

        out.broadcast(
            &self.members,
            ServerMsg::RoundEnded {
                leaderboard,
                round_stats,
                next_round_start_time: round.next_round_start_time,
            },
        );
        out.schedule(
            Duration::from_millis(ROUND_END_DURATION_MS),
            TimerEvent::RestartRound {
                room_id: self.id.clone(),
                epoch: round.epoch,
            },
        );
    }

    /// Fired by the one-shot restart timer. Stale timers are ignored.
    pub fn restart_round(
        &mut self,
        epoch: u64,
        players: &mut PlayerRegistry,
        rng: &mut impl Rng,
        out: &mut Outbox,
        now: u64,
    ) -> bool {
        if self.round.phase != RoundPhase::RoundEnd || self.round.epoch != epoch {
            debug!(room_id = %self.id, epoch, current = self.round.epoch, "Ignoring stale restart timer");
            return false;
        }
        self.start_round(players, rng, out, now);
        true
    }

    /// Tell a player who just arrived where the round stands
    pub fn sync_late_joiner(&mut self, player_id: Uuid, players: &PlayerRegistry, out: &mut Outbox) {
        match self.round.phase {
            RoundPhase::Playing => {
                self.round.active_players.insert(player_id);
                let msg = ServerMsg::RoundStarted {
                    round_end_time: self.round.round_end_time,
                    players: self.active_snapshots(players),
                };
                out.send_to(player_id, msg);
            }
            RoundPhase::Waiting => {
                out.send_to(
                    player_id,
                    ServerMsg::WaitingPhaseStarted {
                        waiting_end_time: self.round.waiting_end_time(),
                    },
                );
            }
            RoundPhase::RoundEnd => {
                out.send_to(
                    player_id,
                    ServerMsg::Standings {
                        leaderboard: self.round.leaderboard.sorted(),
                        phase: self.round.phase,
                    },
                );
            }
        }
    }

    /// Bring back every destroyed player whose timer has run out
    pub fn process_respawns(
        &mut self,
        players: &mut PlayerRegistry,
        rng: &mut impl Rng,
        out: &mut Outbox,
        now: u64,
    ) {
        let mut due: Vec<(Uuid, u64)> = self
            .round
            .respawning_players
            .iter()
            .filter(|&(_, &at)| now >= at)
            .map(|(id, &at)| (*id, at))
            .collect();
        due.sort_by_key(|&(id, at)| (at, id));

        for (id, _) in due {
            self.round.respawning_players.remove(&id);
            let Some(player) = players.get_mut(&id) else {
                continue;
            };
            player.respawn_at(random_spawn_position(rng), now, RESPAWN_INVULNERABILITY_MS);
            self.round.active_players.insert(id);

            debug!(room_id = %self.id, player_id = %id, "Player respawned");
            out.broadcast(
                &self.members,
                ServerMsg::PlayerRespawned {
                    player: player.snapshot(),
                    invulnerable_ms: RESPAWN_INVULNERABILITY_MS,
                },
            );
        }
    }

    /// Time-driven phase transitions
    pub fn advance_phase(
        &mut self,
        players: &mut PlayerRegistry,
        rng: &mut impl Rng,
        out: &mut Outbox,
        now: u64,
    ) {
        match self.round.phase {
            RoundPhase::Waiting => {
                let waited = now.saturating_sub(self.round.waiting_start_time);
                if waited >= WAITING_DURATION_MS && !self.members.is_empty() {
                    self.start_round(players, rng, out, now);
                }
            }
            RoundPhase::Playing => {
                if now.saturating_sub(self.round.round_start_time) >= ROUND_DURATION_MS {
                    self.end_round(out, now);
                }
            }
            // Left by the one-shot restart timer
            RoundPhase::RoundEnd => {}
        }
    }
}

/// All rooms by id, with the reserved default room always present
#[derive(Debug)]
pub struct RoomDirectory {
    rooms: HashMap<String, Room>,
    default_room: String,
    capacity: usize,
}

impl RoomDirectory {
    pub fn new(default_room: String, capacity: usize, now: u64) -> Self {
        let mut rooms = HashMap::new();
        rooms.insert(default_room.clone(), Room::new(default_room.clone(), now));
        Self {
            rooms,
            default_room,
            capacity,
        }
    }

    pub fn default_room(&self) -> &str {
        &self.default_room
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(id)
    }

    pub fn get_or_create(&mut self, id: &str, now: u64) -> &mut Room {
        self.rooms.entry(id.to_string()).or_insert_with(|| {
            info!(room_id = %id, "Room created");
            Room::new(id.to_string(), now)
        })
    }

    pub fn is_full(&self, id: &str) -> bool {
        self.rooms
            .get(id)
            .map(|r| r.members.len() >= self.capacity)
            .unwrap_or(false)
    }

    /// Remove a member. An emptied room is deleted, except the default room
    /// which is reset to a fresh waiting phase instead.
    /// Returns the remaining members so the caller can notify them.
    pub fn leave(&mut self, room_id: &str, player_id: &Uuid, now: u64) -> Vec<Uuid> {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return Vec::new();
        };
        room.remove_member(player_id);
        let remaining = room.members.clone();

        if remaining.is_empty() {
            if room_id == self.default_room {
                room.round.reset(now);
            } else {
                self.rooms.remove(room_id);
                info!(room_id = %room_id, "Room deleted");
            }
        }
        remaining
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Room ids in a stable order for tick processing
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.rooms.keys().cloned().collect();
        ids.sort();
        ids
    }
}
