//! Per-room round memory: phase clock, rosters, leaderboard

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::ws::protocol::{LeaderboardRow, RoundPhase, RoundSnapshot, RoundStats};

use super::powerup::Powerup;
use super::tuning::WAITING_DURATION_MS;

/// Per-player aggregate that survives across rounds within a room
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub player_id: Uuid,
    pub player_name: String,
    pub kills: u32,
    pub deaths: u32,
    pub damage_dealt: u64,
}

impl LeaderboardEntry {
    fn row(&self) -> LeaderboardRow {
        LeaderboardRow {
            player_id: self.player_id,
            player_name: self.player_name.clone(),
            kills: self.kills,
            deaths: self.deaths,
            damage_dealt: self.damage_dealt,
        }
    }
}

/// Entries kept in join order so equal scores sort by who joined first
#[derive(Debug, Clone, Default)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    /// Create an entry unless one exists
    pub fn ensure(&mut self, player_id: Uuid, player_name: &str) {
        if self.get(&player_id).is_none() {
            self.entries.push(LeaderboardEntry {
                player_id,
                player_name: player_name.to_string(),
                kills: 0,
                deaths: 0,
                damage_dealt: 0,
            });
        }
    }

    pub fn get(&self, player_id: &Uuid) -> Option<&LeaderboardEntry> {
        self.entries.iter().find(|e| &e.player_id == player_id)
    }

    pub fn get_mut(&mut self, player_id: &Uuid) -> Option<&mut LeaderboardEntry> {
        self.entries.iter_mut().find(|e| &e.player_id == player_id)
    }

    pub fn remove(&mut self, player_id: &Uuid) {
        self.entries.retain(|e| &e.player_id != player_id);
    }

    pub fn rename(&mut self, player_id: &Uuid, name: &str) {
        if let Some(entry) = self.get_mut(player_id) {
            entry.player_name = name.to_string();
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Kills desc, then damage dealt desc, then deaths asc; stable otherwise
    pub fn sorted(&self) -> Vec<LeaderboardRow> {
        let mut rows: Vec<LeaderboardRow> = self.entries.iter().map(LeaderboardEntry::row).collect();
        rows.sort_by(|a, b| {
            b.kills
                .cmp(&a.kills)
                .then(b.damage_dealt.cmp(&a.damage_dealt))
                .then(a.deaths.cmp(&b.deaths))
        });
        rows
    }

    pub fn stats(&self, player_count: usize, duration_ms: u64) -> RoundStats {
        RoundStats {
            total_kills: self.entries.iter().map(|e| e.kills).sum(),
            total_deaths: self.entries.iter().map(|e| e.deaths).sum(),
            total_damage: self.entries.iter().map(|e| e.damage_dealt).sum(),
            player_count: player_count as u32,
            duration_ms,
        }
    }
}

/// Round state machine memory for one room
#[derive(Debug, Clone)]
pub struct RoundState {
    pub phase: RoundPhase,
    /// Bumped on every round start or reset; stale restart timers carry an old value
    pub epoch: u64,
    pub waiting_start_time: u64,
    pub round_start_time: u64,
    pub round_end_time: u64,
    pub next_round_start_time: u64,
    pub active_players: HashSet<Uuid>,
    /// Player id to the instant they may respawn
    pub respawning_players: HashMap<Uuid, u64>,
    pub leaderboard: Leaderboard,
    pub powerups: HashMap<Uuid, Powerup>,
    pub last_powerup_drop: u64,
}

impl RoundState {
    pub fn new(now: u64) -> Self {
        Self {
            phase: RoundPhase::Waiting,
            epoch: 0,
            waiting_start_time: now,
            round_start_time: 0,
            round_end_time: 0,
            next_round_start_time: 0,
            active_players: HashSet::new(),
            respawning_players: HashMap::new(),
            leaderboard: Leaderboard::default(),
            powerups: HashMap::new(),
            last_powerup_drop: now,
        }
    }

    /// Back to a fresh waiting phase, invalidating pending restarts
    pub fn reset(&mut self, now: u64) {
        let epoch = self.epoch + 1;
        *self = Self::new(now);
        self.epoch = epoch;
    }

    pub fn waiting_end_time(&self) -> u64 {
        self.waiting_start_time + WAITING_DURATION_MS
    }

    pub fn is_active(&self, player_id: &Uuid) -> bool {
        self.active_players.contains(player_id)
    }

    /// Move a destroyed player from the active set to the respawn queue
    pub fn queue_respawn(&mut self, player_id: Uuid, respawn_time: u64) {
        self.active_players.remove(&player_id);
        self.respawning_players.insert(player_id, respawn_time);
    }

    /// Drop every trace of a player who left the room
    pub fn forget(&mut self, player_id: &Uuid) {
        self.active_players.remove(player_id);
        self.respawning_players.remove(player_id);
        self.leaderboard.remove(player_id);
    }

    pub fn snapshot(&self, member_order: &[Uuid]) -> RoundSnapshot {
        let (waiting_end_time, round_end_time, next_round_start_time) = match self.phase {
            RoundPhase::Waiting => (Some(self.waiting_end_time()), None, None),
            RoundPhase::Playing => (None, Some(self.round_end_time), None),
            RoundPhase::RoundEnd => (None, None, Some(self.next_round_start_time)),
        };
        RoundSnapshot {
            phase: self.phase,
            waiting_end_time,
            round_end_time,
            next_round_start_time,
            active_players: member_order
                .iter()
                .copied()
                .filter(|id| self.active_players.contains(id))
                .collect(),
        }
    }
}
