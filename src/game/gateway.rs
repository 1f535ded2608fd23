//! Inbound event handlers. Each validates its actor and arguments before
//! touching shared state; a rejected event changes nothing and sends nothing.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ws::protocol::{ClientMsg, CollisionType, RoundPhase, ServerMsg, Vec3};

use super::arena::{boost_pads, random_spawn_position};
use super::combat::{CombatResolver, HitReport};
use super::error::Rejection;
use super::player::{sanitize_name, sanitize_text};
use super::room::spawn_invulnerability_ms;
use super::tuning::{MAX_CHAT_LEN, MAX_ROOM_ID_LEN, SPAWN_INVULNERABILITY_MS};
use super::vehicle::VehicleKind;
use super::world::GameWorld;

impl GameWorld {
    /// Run a client message, logging and dropping it if rejected
    pub fn dispatch(&mut self, player_id: Uuid, msg: ClientMsg, now: u64) {
        let event = msg.kind();
        if let Err(rejection) = self.handle_message(player_id, msg, now) {
            warn!(
                player_id = %player_id,
                event,
                category = rejection.kind().as_str(),
                reason = %rejection,
                "Dropped inbound event"
            );
        }
    }

    pub fn handle_message(&mut self, player_id: Uuid, msg: ClientMsg, now: u64) -> Result<(), Rejection> {
        match msg {
            ClientMsg::JoinRoom { room_id } => self.join_room(player_id, room_id.as_deref(), now),
            ClientMsg::PlayerMove { position, rotation } => self.move_player(player_id, position, rotation),
            ClientMsg::VehicleSelected { vehicle_id } => self.select_vehicle(player_id, vehicle_id.as_deref()),
            ClientMsg::PlayerDamaged {
                damage,
                target_player_id,
                collision_type,
            } => self.damage_player(
                player_id,
                damage,
                target_player_id.as_deref(),
                collision_type.as_deref(),
                now,
            ),
            ClientMsg::PlayerLanded {} => self.player_landed(player_id, now),
            ClientMsg::SetNickname { nickname } => self.set_nickname(player_id, nickname.as_deref()),
            ClientMsg::ChatMessage { message } => self.chat(player_id, message.as_deref(), now),
            ClientMsg::CollectPowerup { powerup_id } => {
                self.collect_powerup(player_id, powerup_id.as_deref(), now)
            }
            ClientMsg::RequestStandings {} => self.request_standings(player_id),
        }
    }

    fn current_room(&self, player_id: Uuid) -> Result<String, Rejection> {
        self.players
            .get(&player_id)
            .ok_or(Rejection::UnknownPlayer(player_id))?
            .room
            .clone()
            .ok_or(Rejection::NotInRoom)
    }

    fn join_room(&mut self, player_id: Uuid, requested: Option<&str>, now: u64) -> Result<(), Rejection> {
        let player = self
            .players
            .get(&player_id)
            .ok_or(Rejection::UnknownPlayer(player_id))?;

        let room_id = match requested.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.rooms.default_room().to_string(),
        };
        if room_id.chars().count() > MAX_ROOM_ID_LEN {
            return Err(Rejection::InvalidField("roomId"));
        }
        if player.room.as_deref() == Some(room_id.as_str()) {
            return Err(Rejection::AlreadyInRoom(room_id));
        }
        if self.rooms.is_full(&room_id) {
            self.out.send_to(player_id, ServerMsg::RoomFull { room_id: room_id.clone() });
            return Err(Rejection::RoomFull(room_id));
        }

        if let Some(previous) = player.room.clone() {
            self.leave_room(player_id, &previous, now);
        }

        let room = self.rooms.get_or_create(&room_id, now);
        let starts_round = room.members.is_empty() && room.round.phase == RoundPhase::Waiting;
        room.members.push(player_id);

        let Some(player) = self.players.get_mut(&player_id) else {
            return Err(Rejection::UnknownPlayer(player_id));
        };
        player.room = Some(room_id.clone());
        room.round.leaderboard.ensure(player_id, &player.name);

        let others = room
            .members
            .iter()
            .filter(|id| **id != player_id)
            .filter_map(|id| self.players.get(id))
            .map(|p| p.snapshot())
            .collect();
        self.out.send_to(
            player_id,
            ServerMsg::RoomJoined {
                room_id: room_id.clone(),
                players: others,
                game_state: room.round.snapshot(&room.members),
                boost_pads: boost_pads(),
            },
        );

        if starts_round {
            room.start_round(&mut self.players, &mut self.rng, &mut self.out, now);
        } else if let Some(player) = self.players.get_mut(&player_id) {
            player.respawn_at(random_spawn_position(&mut self.rng), now, spawn_invulnerability_ms());
            self.out.broadcast_except(
                &room.members,
                player_id,
                ServerMsg::PlayerJoined {
                    player: player.snapshot(),
                },
            );
        }

        if let Some(player) = self.players.get(&player_id) {
            self.out.send_to(
                player_id,
                ServerMsg::PlayerSpawn {
                    position: player.position,
                    health: player.health,
                    invulnerable_ms: player.remaining_invulnerability(now),
                },
            );
        }

        if !starts_round {
            room.sync_late_joiner(player_id, &self.players, &mut self.out);
        }

        info!(
            player_id = %player_id,
            room_id = %room_id,
            members = room.members.len(),
            phase = ?room.round.phase,
            "Player joined room"
        );
        Ok(())
    }

    fn move_player(
        &mut self,
        player_id: Uuid,
        position: Option<Vec3>,
        rotation: Option<Vec3>,
    ) -> Result<(), Rejection> {
        let player = self
            .players
            .get_mut(&player_id)
            .ok_or(Rejection::UnknownPlayer(player_id))?;
        let position = position.ok_or(Rejection::MissingField("position"))?;
        let rotation = rotation.ok_or(Rejection::MissingField("rotation"))?;

        // Telemetry is trusted: no bounds or speed checks
        player.position = position;
        player.rotation = rotation;

        if let Some(room) = player.room.as_deref().and_then(|id| self.rooms.get(id)) {
            self.out.broadcast_except(
                &room.members,
                player_id,
                ServerMsg::PlayerMoved {
                    player_id,
                    position,
                    rotation,
                },
            );
        }
        Ok(())
    }

    fn select_vehicle(&mut self, player_id: Uuid, vehicle_id: Option<&str>) -> Result<(), Rejection> {
        let player = self
            .players
            .get_mut(&player_id)
            .ok_or(Rejection::UnknownPlayer(player_id))?;
        let vehicle = vehicle_id.map(VehicleKind::from_client_id).unwrap_or_default();
        player.set_vehicle(vehicle);
        debug!(player_id = %player_id, ?vehicle, "Vehicle selected");

        if let Some(room) = player.room.as_deref().and_then(|id| self.rooms.get(id)) {
            self.out.broadcast(
                &room.members,
                ServerMsg::PlayerVehicleChanged {
                    player_id,
                    vehicle_id: vehicle,
                    health: player.health,
                    max_health: player.max_health(),
                },
            );
        }
        Ok(())
    }

    fn damage_player(
        &mut self,
        attacker_id: Uuid,
        damage: Option<f64>,
        target_id: Option<&str>,
        collision_type: Option<&str>,
        now: u64,
    ) -> Result<(), Rejection> {
        let target_id = target_id.ok_or(Rejection::MissingField("targetPlayerId"))?;
        let target_id = Uuid::parse_str(target_id).map_err(|_| Rejection::InvalidField("targetPlayerId"))?;

        let report = HitReport {
            attacker_id,
            target_id,
            raw_damage: damage,
            collision: CollisionType::from_client(collision_type),
        };
        let outcome = CombatResolver::resolve(&report, &mut self.players, &mut self.rooms, &mut self.out, now)?;
        debug!(
            attacker_id = %attacker_id,
            target_id = %target_id,
            damage = outcome.damage,
            health = outcome.target_health,
            destroyed = outcome.destroyed,
            "Hit applied"
        );
        Ok(())
    }

    fn player_landed(&mut self, player_id: Uuid, now: u64) -> Result<(), Rejection> {
        let player = self
            .players
            .get_mut(&player_id)
            .ok_or(Rejection::UnknownPlayer(player_id))?;
        player.landed = true;
        player.invulnerable_until = player.invulnerable_until.min(now + SPAWN_INVULNERABILITY_MS);
        Ok(())
    }

    fn set_nickname(&mut self, player_id: Uuid, nickname: Option<&str>) -> Result<(), Rejection> {
        let player = self
            .players
            .get_mut(&player_id)
            .ok_or(Rejection::UnknownPlayer(player_id))?;
        let name = sanitize_name(nickname.ok_or(Rejection::MissingField("nickname"))?)
            .ok_or(Rejection::InvalidField("nickname"))?;

        player.name = name;
        if let Some(room) = player.room.as_deref().and_then(|id| self.rooms.get_mut(id)) {
            room.round.leaderboard.rename(&player_id, &player.name);
        }
        info!(player_id = %player_id, name = %player.name, "Nickname set");
        Ok(())
    }

    fn chat(&mut self, player_id: Uuid, message: Option<&str>, now: u64) -> Result<(), Rejection> {
        let room_id = self.current_room(player_id)?;
        let message = sanitize_text(message.ok_or(Rejection::MissingField("message"))?, MAX_CHAT_LEN)
            .ok_or(Rejection::InvalidField("message"))?;
        let (Some(player), Some(room)) = (self.players.get(&player_id), self.rooms.get(&room_id)) else {
            return Err(Rejection::NotInRoom);
        };

        // The sender renders its own copy
        self.out.broadcast_except(
            &room.members,
            player_id,
            ServerMsg::ChatMessage {
                player_id,
                name: player.name.clone(),
                message,
                timestamp: now,
            },
        );
        Ok(())
    }

    fn collect_powerup(&mut self, player_id: Uuid, powerup_id: Option<&str>, now: u64) -> Result<(), Rejection> {
        let room_id = self.current_room(player_id)?;
        let powerup_id = powerup_id.ok_or(Rejection::MissingField("powerupId"))?;
        let powerup_id = Uuid::parse_str(powerup_id).map_err(|_| Rejection::InvalidField("powerupId"))?;
        let room = self.rooms.get_mut(&room_id).ok_or(Rejection::NotInRoom)?;
        room.collect_powerup(player_id, powerup_id, &mut self.players, &mut self.out, now)?;
        Ok(())
    }

    fn request_standings(&mut self, player_id: Uuid) -> Result<(), Rejection> {
        let room_id = self.current_room(player_id)?;
        let room = self.rooms.get(&room_id).ok_or(Rejection::NotInRoom)?;
        self.out.send_to(
            player_id,
            ServerMsg::Standings {
                leaderboard: room.round.leaderboard.sorted(),
                phase: room.round.phase,
            },
        );
        Ok(())
    }
}
