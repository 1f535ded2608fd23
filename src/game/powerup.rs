//! Powerup drops: pacing, collection and expiry

use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::ws::protocol::{CollisionType, PowerupKind, PowerupView, RoundPhase, ServerMsg, Vec3};

use super::arena::random_drop_position;
use super::error::Rejection;
use super::outbox::Outbox;
use super::player::PlayerRegistry;
use super::room::Room;
use super::tuning::{
    HEALTH_PACK_AMOUNT, POWERUP_BASE_INTERVAL_MS, POWERUP_FALL_MS, POWERUP_HEALTH_WEIGHT,
    POWERUP_INTERVAL_STEP_MS, POWERUP_LIFETIME_MS, POWERUP_MIN_ACTIVE_PLAYERS,
    POWERUP_MIN_INTERVAL_MS, SHIELD_DURATION_MS,
};

/// A dropped pickup
#[derive(Debug, Clone, PartialEq)]
pub struct Powerup {
    pub id: Uuid,
    pub kind: PowerupKind,
    pub position: Vec3,
    pub drop_time: u64,
    /// Parachute touches down; collectible from here on
    pub land_time: u64,
    pub despawn_time: u64,
    pub collected: bool,
}

impl Powerup {
    pub fn view(&self) -> PowerupView {
        PowerupView {
            id: self.id,
            powerup_type: self.kind,
            position: self.position,
            drop_time: self.drop_time,
            land_time: self.land_time,
            despawn_time: self.despawn_time,
        }
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now > self.despawn_time
    }
}

/// Time between drops: 30s at two players, 2.5s faster per extra player, never under 15s
pub fn drop_interval_ms(active_players: usize) -> u64 {
    let extra = active_players.saturating_sub(POWERUP_MIN_ACTIVE_PLAYERS) as u64;
    POWERUP_BASE_INTERVAL_MS
        .saturating_sub(extra * POWERUP_INTERVAL_STEP_MS)
        .max(POWERUP_MIN_INTERVAL_MS)
}

impl Room {
    /// Drop a powerup if the room is busy enough and the interval has passed
    pub fn maybe_spawn_powerup(&mut self, rng: &mut impl Rng, out: &mut Outbox, now: u64) -> Option<Uuid> {
        let round = &mut self.round;
        let active = round.active_players.len();
        if round.phase != RoundPhase::Playing || active < POWERUP_MIN_ACTIVE_PLAYERS {
            return None;
        }
        if now.saturating_sub(round.last_powerup_drop) < drop_interval_ms(active) {
            return None;
        }

        let kind = if rng.gen_bool(POWERUP_HEALTH_WEIGHT) {
            PowerupKind::Health
        } else {
            PowerupKind::Shield
        };
        let powerup = Powerup {
            id: uuid::Builder::from_random_bytes(rng.gen()).into_uuid(),
            kind,
            position: random_drop_position(rng),
            drop_time: now,
            land_time: now + POWERUP_FALL_MS,
            despawn_time: now + POWERUP_LIFETIME_MS,
            collected: false,
        };
        let id = powerup.id;

        round.last_powerup_drop = now;
        out.broadcast(&self.members, ServerMsg::PowerupDropped { powerup: powerup.view() });
        round.powerups.insert(id, powerup);

        debug!(room_id = %self.id, powerup_id = %id, ?kind, active, "Powerup dropped");
        Some(id)
    }

    /// Remove expired and collected powerups
    pub fn sweep_powerups(&mut self, out: &mut Outbox, now: u64) {
        let mut stale: Vec<Uuid> = self
            .round
            .powerups
            .values()
            .filter(|p| p.collected || p.is_expired(now))
            .map(|p| p.id)
            .collect();
        stale.sort();

        for id in stale {
            self.round.powerups.remove(&id);
            debug!(room_id = %self.id, powerup_id = %id, "Powerup removed");
            out.broadcast(&self.members, ServerMsg::PowerupRemoved { powerup_id: id });
        }
    }

    /// Hand a landed, unexpired powerup to an active `player_id` and apply its effect
    pub fn collect_powerup(
        &mut self,
        player_id: Uuid,
        powerup_id: Uuid,
        players: &mut PlayerRegistry,
        out: &mut Outbox,
        now: u64,
    ) -> Result<PowerupKind, Rejection> {
        let player = players
            .get_mut(&player_id)
            .ok_or(Rejection::UnknownPlayer(player_id))?;
        if !self.round.is_active(&player_id) {
            return Err(Rejection::CollectorNotActive);
        }
        let powerup = self
            .round
            .powerups
            .get_mut(&powerup_id)
            .ok_or(Rejection::UnknownPowerup(powerup_id))?;
        if powerup.collected {
            return Err(Rejection::AlreadyCollected(powerup_id));
        }
        // Logically gone even if the sweep has not run yet
        if powerup.is_expired(now) {
            return Err(Rejection::PowerupExpired(powerup_id));
        }
        if now < powerup.land_time {
            return Err(Rejection::NotLanded(powerup_id));
        }

        powerup.collected = true;
        let kind = powerup.kind;
        self.round.powerups.remove(&powerup_id);

        out.broadcast(
            &self.members,
            ServerMsg::PowerupCollected {
                powerup_id,
                player_id,
                powerup_type: kind,
            },
        );

        match kind {
            PowerupKind::Health => {
                let healed = player.heal(HEALTH_PACK_AMOUNT);
                out.broadcast(
                    &self.members,
                    ServerMsg::PlayerDamaged {
                        player_id,
                        health: player.health,
                        damage: -i64::from(healed),
                        collision_type: CollisionType::Heal,
                        attacker_id: player_id.to_string(),
                    },
                );
            }
            PowerupKind::Shield => {
                player.shield_until = now + SHIELD_DURATION_MS;
                out.send_to(
                    player_id,
                    ServerMsg::ShieldActivated {
                        shield_until: player.shield_until,
                        duration_ms: SHIELD_DURATION_MS,
                    },
                );
                out.broadcast_except(
                    &self.members,
                    player_id,
                    ServerMsg::PlayerShielded {
                        player_id,
                        shield_until: player.shield_until,
                    },
                );
            }
        }

        info!(room_id = %self.id, player_id = %player_id, ?kind, "Powerup collected");
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::Player;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn playing_room(active: usize) -> (Room, PlayerRegistry, Vec<Uuid>) {
        let mut room = Room::new("r1".to_string(), 0);
        let mut players = PlayerRegistry::default();
        let mut ids = Vec::new();
        for _ in 0..active {
            let id = Uuid::new_v4();
            let mut p = Player::new(id, Vec3::default());
            p.room = Some("r1".to_string());
            players.insert(p);
            room.members.push(id);
            room.round.active_players.insert(id);
            ids.push(id);
        }
        room.round.phase = RoundPhase::Playing;
        room.round.last_powerup_drop = 0;
        (room, players, ids)
    }

    fn place(room: &mut Room, kind: PowerupKind, now: u64) -> Uuid {
        let id = Uuid::new_v4();
        room.round.powerups.insert(
            id,
            Powerup {
                id,
                kind,
                position: Vec3::default(),
                drop_time: now,
                land_time: now + POWERUP_FALL_MS,
                despawn_time: now + POWERUP_LIFETIME_MS,
                collected: false,
            },
        );
        id
    }

    #[test]
    fn drop_interval_shrinks_with_players() {
        assert_eq!(drop_interval_ms(2), 30_000);
        assert_eq!(drop_interval_ms(3), 27_500);
        assert_eq!(drop_interval_ms(6), 20_000);
        assert_eq!(drop_interval_ms(8), 15_000);
        assert_eq!(drop_interval_ms(20), 15_000);
    }

    #[test]
    fn single_player_never_gets_drops() {
        let (mut room, _, _) = playing_room(1);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut out = Outbox::default();
        for t in (0..600_000).step_by(1_000) {
            assert!(room.maybe_spawn_powerup(&mut rng, &mut out, t).is_none());
        }
        assert!(room.round.powerups.is_empty());
    }

    #[test]
    fn two_players_get_a_drop_after_the_interval() {
        let (mut room, _, _) = playing_room(2);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut out = Outbox::default();

        assert!(room.maybe_spawn_powerup(&mut rng, &mut out, 29_999).is_none());
        let id = room.maybe_spawn_powerup(&mut rng, &mut out, 30_000).unwrap();
        let p = &room.round.powerups[&id];
        assert_eq!(p.land_time, 33_000);
        assert_eq!(p.despawn_time, 75_000);
        assert_eq!(room.round.last_powerup_drop, 30_000);
        assert!(matches!(out.envelopes()[0].msg, ServerMsg::PowerupDropped { .. }));

        // Paced from the last drop
        assert!(room.maybe_spawn_powerup(&mut rng, &mut out, 45_000).is_none());
    }

    #[test]
    fn no_drops_outside_playing() {
        let (mut room, _, _) = playing_room(4);
        room.round.phase = RoundPhase::RoundEnd;
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut out = Outbox::default();
        assert!(room.maybe_spawn_powerup(&mut rng, &mut out, 100_000).is_none());
    }

    #[test]
    fn drop_mix_favours_health() {
        let (mut room, _, _) = playing_room(2);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut out = Outbox::default();
        let mut health = 0;
        for i in 1..=1_000u64 {
            if let Some(id) = room.maybe_spawn_powerup(&mut rng, &mut out, i * 30_000) {
                if room.round.powerups[&id].kind == PowerupKind::Health {
                    health += 1;
                }
            }
        }
        assert_eq!(room.round.powerups.len(), 1_000);
        assert!((600..=800).contains(&health), "health drops: {health}");
    }

    #[test]
    fn sweep_removes_only_expired() {
        let (mut room, _, _) = playing_room(2);
        let mut out = Outbox::default();
        let id = place(&mut room, PowerupKind::Shield, 0);

        room.sweep_powerups(&mut out, POWERUP_LIFETIME_MS);
        assert!(room.round.powerups.contains_key(&id));
        assert!(out.is_empty());

        room.sweep_powerups(&mut out, POWERUP_LIFETIME_MS + 1);
        assert!(room.round.powerups.is_empty());
        assert!(matches!(
            out.envelopes()[0].msg,
            ServerMsg::PowerupRemoved { powerup_id } if powerup_id == id
        ));
    }

    #[test]
    fn health_pack_heals_once() {
        let (mut room, mut players, ids) = playing_room(2);
        let mut out = Outbox::default();
        let id = place(&mut room, PowerupKind::Health, 0);
        players.get_mut(&ids[0]).unwrap().health = 30;

        let kind = room.collect_powerup(ids[0], id, &mut players, &mut out, 5_000).unwrap();
        assert_eq!(kind, PowerupKind::Health);
        assert_eq!(players.get(&ids[0]).unwrap().health, 70);
        assert!(room.round.powerups.is_empty());
        match &out.envelopes()[1].msg {
            ServerMsg::PlayerDamaged { damage, collision_type, health, .. } => {
                assert_eq!(*damage, -40);
                assert_eq!(*health, 70);
                assert_eq!(*collision_type, CollisionType::Heal);
            }
            other => panic!("unexpected {other:?}"),
        }
        let sent = out.envelopes().len();

        let again = room.collect_powerup(ids[1], id, &mut players, &mut out, 5_001);
        assert_eq!(again, Err(Rejection::UnknownPowerup(id)));
        assert_eq!(out.envelopes().len(), sent);
        assert_eq!(players.get(&ids[0]).unwrap().health, 70);
    }

    #[test]
    fn health_pack_is_capped_at_max() {
        let (mut room, mut players, ids) = playing_room(2);
        let mut out = Outbox::default();
        let id = place(&mut room, PowerupKind::Health, 0);
        players.get_mut(&ids[0]).unwrap().health = 90;
        room.collect_powerup(ids[0], id, &mut players, &mut out, 5_000).unwrap();
        assert_eq!(players.get(&ids[0]).unwrap().health, 100);
        assert!(matches!(out.envelopes()[1].msg, ServerMsg::PlayerDamaged { damage: -10, .. }));
    }

    #[test]
    fn shield_notifies_collector_and_room_separately() {
        let (mut room, mut players, ids) = playing_room(3);
        let mut out = Outbox::default();
        let id = place(&mut room, PowerupKind::Shield, 0);

        room.collect_powerup(ids[1], id, &mut players, &mut out, 4_000).unwrap();
        assert_eq!(players.get(&ids[1]).unwrap().shield_until, 4_000 + SHIELD_DURATION_MS);

        let envelopes = out.envelopes();
        assert!(matches!(envelopes[1].msg, ServerMsg::ShieldActivated { .. }));
        assert_eq!(envelopes[1].recipients, vec![ids[1]]);
        assert!(matches!(envelopes[2].msg, ServerMsg::PlayerShielded { .. }));
        assert_eq!(envelopes[2].recipients, vec![ids[0], ids[2]]);
    }

    #[test]
    fn falling_powerups_cannot_be_collected() {
        let (mut room, mut players, ids) = playing_room(2);
        let mut out = Outbox::default();
        let id = place(&mut room, PowerupKind::Health, 1_000);
        let result = room.collect_powerup(ids[0], id, &mut players, &mut out, 1_000 + POWERUP_FALL_MS - 1);
        assert_eq!(result, Err(Rejection::NotLanded(id)));
        assert!(room.round.powerups.contains_key(&id));
        assert!(out.is_empty());
    }

    #[test]
    fn expired_powerups_cannot_be_collected_before_the_sweep() {
        let (mut room, mut players, ids) = playing_room(2);
        let mut out = Outbox::default();
        let id = place(&mut room, PowerupKind::Health, 0);
        players.get_mut(&ids[0]).unwrap().health = 20;

        let result = room.collect_powerup(ids[0], id, &mut players, &mut out, POWERUP_LIFETIME_MS + 1);
        assert_eq!(result, Err(Rejection::PowerupExpired(id)));
        assert_eq!(players.get(&ids[0]).unwrap().health, 20);
        assert!(out.is_empty());

        // The last instant before expiry still counts
        let result = room.collect_powerup(ids[0], id, &mut players, &mut out, POWERUP_LIFETIME_MS);
        assert_eq!(result, Ok(PowerupKind::Health));
    }

    #[test]
    fn destroyed_players_cannot_collect() {
        let (mut room, mut players, ids) = playing_room(2);
        let mut out = Outbox::default();
        let id = place(&mut room, PowerupKind::Health, 0);
        players.get_mut(&ids[0]).unwrap().health = 0;
        room.round.queue_respawn(ids[0], 10_000);

        let result = room.collect_powerup(ids[0], id, &mut players, &mut out, 5_000);
        assert_eq!(result, Err(Rejection::CollectorNotActive));
        assert_eq!(players.get(&ids[0]).unwrap().health, 0);
        assert!(room.round.powerups.contains_key(&id));
        assert!(out.is_empty());
    }
}
