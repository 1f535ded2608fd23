//! Combat resolution for client-reported hits

use tracing::info;
use uuid::Uuid;

use crate::ws::protocol::{CollisionType, RoundPhase, ServerMsg};

use super::error::Rejection;
use super::outbox::Outbox;
use super::player::PlayerRegistry;
use super::room::RoomDirectory;
use super::tuning::{MONSTER_DAMAGE_FRACTION, RESPAWN_DELAY_MS};
use super::vehicle::VehicleStats;

/// Attacker id reported for hazard damage
pub const MONSTER_ATTACKER: &str = "monster";

/// A hit as claimed by the attacking client
#[derive(Debug, Clone)]
pub struct HitReport {
    pub attacker_id: Uuid,
    pub target_id: Uuid,
    /// Client-computed damage before vehicle scaling
    pub raw_damage: Option<f64>,
    pub collision: CollisionType,
}

/// What a successful hit did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitOutcome {
    pub damage: u32,
    pub target_health: u32,
    pub destroyed: bool,
}

/// Combat rules: validation, damage scaling, kill bookkeeping
pub struct CombatResolver;

impl CombatResolver {
    /// Damage after vehicle scaling. Hazards ignore the reported value and all
    /// multipliers and take a fixed share of the target's max health.
    pub fn final_damage(
        collision: CollisionType,
        raw_damage: f64,
        attacker: &VehicleStats,
        target: &VehicleStats,
    ) -> u32 {
        let scaled = match collision {
            CollisionType::Monster => f64::from(target.max_health) * MONSTER_DAMAGE_FRACTION,
            _ => raw_damage * attacker.damage_dealt_multiplier * target.damage_taken_multiplier,
        };
        scaled.round().max(0.0) as u32
    }

    /// Validate a hit and apply it. On any rejection nothing is changed and
    /// nothing is sent.
    pub fn resolve(
        report: &HitReport,
        players: &mut PlayerRegistry,
        rooms: &mut RoomDirectory,
        out: &mut Outbox,
        now: u64,
    ) -> Result<HitOutcome, Rejection> {
        let monster = report.collision == CollisionType::Monster;

        let attacker = players
            .get(&report.attacker_id)
            .ok_or(Rejection::UnknownPlayer(report.attacker_id))?;
        let target = players
            .get(&report.target_id)
            .ok_or(Rejection::UnknownPlayer(report.target_id))?;

        let raw_damage = report.raw_damage.ok_or(Rejection::MissingField("damage"))?;
        if !raw_damage.is_finite() || raw_damage < 0.0 {
            return Err(Rejection::InvalidField("damage"));
        }

        let room_id = attacker.room.clone().ok_or(Rejection::NotInRoom)?;
        if target.room.as_deref() != Some(room_id.as_str()) {
            return Err(Rejection::RoomMismatch);
        }
        let room = rooms.get_mut(&room_id).ok_or(Rejection::NotInRoom)?;
        if room.round.phase != RoundPhase::Playing {
            return Err(Rejection::NotPlaying(room.round.phase));
        }

        if attacker.is_invulnerable(now) {
            return Err(Rejection::AttackerInvulnerable);
        }
        if target.is_protected(now) {
            return Err(Rejection::TargetProtected);
        }
        if !monster && report.attacker_id == report.target_id {
            return Err(Rejection::SelfHit);
        }
        if !room.round.is_active(&report.target_id) {
            return Err(Rejection::TargetNotActive);
        }

        let damage = Self::final_damage(report.collision, raw_damage, &attacker.stats(), &target.stats());

        let target = players
            .get_mut(&report.target_id)
            .ok_or(Rejection::UnknownPlayer(report.target_id))?;
        let target_health = target.apply_damage(damage);

        let attacker_ref = if monster {
            MONSTER_ATTACKER.to_string()
        } else {
            report.attacker_id.to_string()
        };

        let leaderboard = &mut room.round.leaderboard;
        if !monster {
            if let Some(entry) = leaderboard.get_mut(&report.attacker_id) {
                entry.damage_dealt += u64::from(damage);
            }
        }

        out.broadcast(
            &room.members,
            ServerMsg::PlayerDamaged {
                player_id: report.target_id,
                health: target_health,
                damage: i64::from(damage),
                collision_type: report.collision,
                attacker_id: attacker_ref.clone(),
            },
        );

        let destroyed = target_health == 0;
        if destroyed {
            if !monster {
                if let Some(entry) = leaderboard.get_mut(&report.attacker_id) {
                    entry.kills += 1;
                }
            }
            if let Some(entry) = leaderboard.get_mut(&report.target_id) {
                entry.deaths += 1;
            }

            let respawn_time = now + RESPAWN_DELAY_MS;
            room.round.queue_respawn(report.target_id, respawn_time);

            info!(
                room_id = %room.id,
                target_id = %report.target_id,
                attacker = %attacker_ref,
                respawn_time,
                "Player destroyed"
            );

            out.broadcast(
                &room.members,
                ServerMsg::PlayerDestroyed {
                    player_id: report.target_id,
                    respawn_time,
                    attacker_id: attacker_ref,
                },
            );
        }

        Ok(HitOutcome {
            damage,
            target_health,
            destroyed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::Player;
    use crate::game::room::Room;
    use crate::game::vehicle::VehicleKind;
    use crate::ws::protocol::Vec3;

    struct Arena {
        players: PlayerRegistry,
        rooms: RoomDirectory,
        a: Uuid,
        b: Uuid,
    }

    /// Two players in a playing room, neither invulnerable
    fn arena() -> Arena {
        let mut players = PlayerRegistry::default();
        let mut rooms = RoomDirectory::new("default".to_string(), 8, 0);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let room: &mut Room = rooms.get_or_create("r1", 0);
        for id in [a, b] {
            let mut p = Player::new(id, Vec3::default());
            p.room = Some("r1".to_string());
            room.members.push(id);
            room.round.active_players.insert(id);
            room.round.leaderboard.ensure(id, &p.name);
            players.insert(p);
        }
        room.round.phase = RoundPhase::Playing;
        Arena { players, rooms, a, b }
    }

    fn hit(a: Uuid, b: Uuid, damage: Option<f64>, collision: CollisionType) -> HitReport {
        HitReport {
            attacker_id: a,
            target_id: b,
            raw_damage: damage,
            collision,
        }
    }

    fn resolve(arena: &mut Arena, report: &HitReport, out: &mut Outbox, now: u64) -> Result<HitOutcome, Rejection> {
        CombatResolver::resolve(report, &mut arena.players, &mut arena.rooms, out, now)
    }

    #[test]
    fn side_hit_between_balanced_vehicles() {
        let mut arena = arena();
        let mut out = Outbox::default();
        let report = hit(arena.a, arena.b, Some(40.0), CollisionType::Side);

        let outcome = resolve(&mut arena, &report, &mut out, 1_000).unwrap();

        assert_eq!(outcome, HitOutcome { damage: 40, target_health: 60, destroyed: false });
        assert_eq!(arena.players.get(&arena.b).unwrap().health, 60);
        match &out.envelopes()[0].msg {
            ServerMsg::PlayerDamaged { damage, health, attacker_id, collision_type, .. } => {
                assert_eq!(*damage, 40);
                assert_eq!(*health, 60);
                assert_eq!(attacker_id, &arena.a.to_string());
                assert_eq!(*collision_type, CollisionType::Side);
            }
            other => panic!("unexpected {other:?}"),
        }
        let room = arena.rooms.get("r1").unwrap();
        assert_eq!(room.round.leaderboard.get(&arena.a).unwrap().damage_dealt, 40);
    }

    #[test]
    fn vehicle_multipliers_scale_damage() {
        let sport = VehicleKind::Sport.stats();
        let tank = VehicleKind::Tank.stats();
        // 50 * 1.15 * 0.8 = 46
        assert_eq!(CombatResolver::final_damage(CollisionType::HeadOn, 50.0, &sport, &tank), 46);
        // 50 * 0.9 * 1.2 = 54
        assert_eq!(CombatResolver::final_damage(CollisionType::Rear, 50.0, &tank, &sport), 54);
        assert_eq!(CombatResolver::final_damage(CollisionType::Side, 0.0, &tank, &sport), 0);
    }

    #[test]
    fn monster_hits_take_a_fifth_of_max_health() {
        let tank = VehicleKind::Tank.stats();
        let sport = VehicleKind::Sport.stats();
        for raw in [0.0, 5.0, 999.0] {
            assert_eq!(CombatResolver::final_damage(CollisionType::Monster, raw, &sport, &tank), 26);
        }

        let mut arena = arena();
        arena.players.get_mut(&arena.b).unwrap().set_vehicle(VehicleKind::Tank);
        arena.players.get_mut(&arena.b).unwrap().health = 130;
        let mut out = Outbox::default();
        let report = hit(arena.b, arena.b, Some(3.0), CollisionType::Monster);
        let outcome = resolve(&mut arena, &report, &mut out, 0).unwrap();
        assert_eq!(outcome.damage, 26);
        assert_eq!(outcome.target_health, 104);
        match &out.envelopes()[0].msg {
            ServerMsg::PlayerDamaged { attacker_id, .. } => assert_eq!(attacker_id, MONSTER_ATTACKER),
            other => panic!("unexpected {other:?}"),
        }
        let board = &arena.rooms.get("r1").unwrap().round.leaderboard;
        assert_eq!(board.get(&arena.b).unwrap().damage_dealt, 0);
    }

    #[test]
    fn lethal_hit_queues_respawn_and_credits_kill() {
        let mut arena = arena();
        let mut out = Outbox::default();
        let report = hit(arena.a, arena.b, Some(150.0), CollisionType::Headshot);

        let outcome = resolve(&mut arena, &report, &mut out, 5_000).unwrap();
        assert!(outcome.destroyed);
        assert_eq!(outcome.target_health, 0);

        let room = arena.rooms.get("r1").unwrap();
        assert!(!room.round.is_active(&arena.b));
        assert_eq!(room.round.respawning_players.get(&arena.b), Some(&(5_000 + RESPAWN_DELAY_MS)));
        assert_eq!(room.round.leaderboard.get(&arena.a).unwrap().kills, 1);
        assert_eq!(room.round.leaderboard.get(&arena.b).unwrap().deaths, 1);
        assert!(matches!(
            out.envelopes()[1].msg,
            ServerMsg::PlayerDestroyed { respawn_time, .. } if respawn_time == 8_000
        ));

        // A destroyed target cannot be hit again
        let again = resolve(&mut arena, &report, &mut out, 5_100);
        assert_eq!(again, Err(Rejection::TargetNotActive));
    }

    #[test]
    fn monster_kill_counts_death_without_kill_credit() {
        let mut arena = arena();
        arena.players.get_mut(&arena.b).unwrap().health = 10;
        let mut out = Outbox::default();
        let report = hit(arena.a, arena.b, Some(0.0), CollisionType::Monster);
        let outcome = resolve(&mut arena, &report, &mut out, 0).unwrap();
        assert!(outcome.destroyed);
        let board = &arena.rooms.get("r1").unwrap().round.leaderboard;
        assert_eq!(board.get(&arena.a).unwrap().kills, 0);
        assert_eq!(board.get(&arena.b).unwrap().deaths, 1);
    }

    #[test]
    fn rejections_leave_state_untouched() {
        let mut arena = arena();
        let (a, b) = (arena.a, arena.b);
        let mut out = Outbox::default();
        let ghost = Uuid::new_v4();

        let cases: Vec<(HitReport, Rejection)> = vec![
            (hit(ghost, b, Some(10.0), CollisionType::Side), Rejection::UnknownPlayer(ghost)),
            (hit(a, ghost, Some(10.0), CollisionType::Side), Rejection::UnknownPlayer(ghost)),
            (hit(a, b, None, CollisionType::Side), Rejection::MissingField("damage")),
            (hit(a, b, Some(-1.0), CollisionType::Side), Rejection::InvalidField("damage")),
            (hit(a, b, Some(f64::NAN), CollisionType::Side), Rejection::InvalidField("damage")),
            (hit(a, a, Some(10.0), CollisionType::Side), Rejection::SelfHit),
        ];
        for (report, expected) in cases {
            assert_eq!(resolve(&mut arena, &report, &mut out, 0), Err(expected));
        }
        assert!(out.is_empty());
        assert_eq!(arena.players.get(&b).unwrap().health, 100);
    }

    #[test]
    fn no_damage_outside_playing_phase() {
        for phase in [RoundPhase::Waiting, RoundPhase::RoundEnd] {
            let mut arena = arena();
            arena.rooms.get_mut("r1").unwrap().round.phase = phase;
            let mut out = Outbox::default();
            let report = hit(arena.a, arena.b, Some(30.0), CollisionType::Side);
            assert_eq!(resolve(&mut arena, &report, &mut out, 0), Err(Rejection::NotPlaying(phase)));
            assert_eq!(arena.players.get(&arena.b).unwrap().health, 100);
            assert!(out.is_empty());
        }
    }

    #[test]
    fn room_mismatch_is_rejected() {
        let mut arena = arena();
        arena.players.get_mut(&arena.b).unwrap().room = Some("elsewhere".to_string());
        let mut out = Outbox::default();
        let report = hit(arena.a, arena.b, Some(30.0), CollisionType::Side);
        assert_eq!(resolve(&mut arena, &report, &mut out, 0), Err(Rejection::RoomMismatch));

        arena.players.get_mut(&arena.a).unwrap().room = None;
        assert_eq!(resolve(&mut arena, &report, &mut out, 0), Err(Rejection::NotInRoom));
    }

    #[test]
    fn invulnerability_and_shields_block_hits() {
        let mut arena = arena();
        let mut out = Outbox::default();
        let report = hit(arena.a, arena.b, Some(30.0), CollisionType::Side);

        arena.players.get_mut(&arena.a).unwrap().invulnerable_until = 2_000;
        assert_eq!(resolve(&mut arena, &report, &mut out, 1_999), Err(Rejection::AttackerInvulnerable));

        arena.players.get_mut(&arena.a).unwrap().invulnerable_until = 0;
        arena.players.get_mut(&arena.b).unwrap().invulnerable_until = 2_000;
        assert_eq!(resolve(&mut arena, &report, &mut out, 1_000), Err(Rejection::TargetProtected));

        arena.players.get_mut(&arena.b).unwrap().invulnerable_until = 0;
        arena.players.get_mut(&arena.b).unwrap().shield_until = 2_000;
        assert_eq!(resolve(&mut arena, &report, &mut out, 1_000), Err(Rejection::TargetProtected));

        assert_eq!(arena.players.get(&arena.b).unwrap().health, 100);
        assert!(out.is_empty());

        // Windows are exclusive at their end
        assert!(resolve(&mut arena, &report, &mut out, 2_000).is_ok());
    }
}
