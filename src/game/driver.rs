//! The task that owns the game world: commands in, envelopes out, one tick per second

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::util::time::{unix_millis, TICK_INTERVAL};
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::outbox::{Envelope, TimerEvent};
use super::world::{GameWorld, WorldStats};

/// Capacity of the shared command queue
const COMMAND_QUEUE: usize = 1024;

/// Everything that can mutate the world, serialized through one queue
#[derive(Debug)]
pub enum GameCommand {
    Connect {
        player_id: Uuid,
        outbound: mpsc::Sender<ServerMsg>,
    },
    Client {
        player_id: Uuid,
        msg: ClientMsg,
    },
    Disconnect {
        player_id: Uuid,
    },
    TimerFired(TimerEvent),
}

/// Cloneable handle held by connections and the HTTP layer
#[derive(Clone)]
pub struct GameHandle {
    command_tx: mpsc::Sender<GameCommand>,
    stats: Arc<RwLock<WorldStats>>,
}

impl GameHandle {
    /// Returns false once the game task is gone
    pub async fn connect(&self, player_id: Uuid, outbound: mpsc::Sender<ServerMsg>) -> bool {
        self.command_tx
            .send(GameCommand::Connect { player_id, outbound })
            .await
            .is_ok()
    }

    pub async fn client_message(&self, player_id: Uuid, msg: ClientMsg) -> bool {
        self.command_tx
            .send(GameCommand::Client { player_id, msg })
            .await
            .is_ok()
    }

    pub async fn disconnect(&self, player_id: Uuid) {
        let _ = self.command_tx.send(GameCommand::Disconnect { player_id }).await;
    }

    /// Counters as of the last processed command or tick
    pub fn stats(&self) -> WorldStats {
        *self.stats.read()
    }
}

/// Owns the world and the outbound side of every session
pub struct GameServer {
    world: GameWorld,
    sessions: HashMap<Uuid, mpsc::Sender<ServerMsg>>,
    command_rx: mpsc::Receiver<GameCommand>,
    /// Timers must not keep the queue open on their own
    timer_tx: mpsc::WeakSender<GameCommand>,
    stats: Arc<RwLock<WorldStats>>,
}

impl GameServer {
    pub fn new(world: GameWorld) -> (Self, GameHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let stats = Arc::new(RwLock::new(world.stats()));
        let handle = GameHandle {
            command_tx: command_tx.clone(),
            stats: stats.clone(),
        };
        let server = Self {
            world,
            sessions: HashMap::new(),
            command_rx,
            timer_tx: command_tx.downgrade(),
            stats,
        };
        (server, handle)
    }

    /// Run until every handle is dropped. Pending restart timers do not
    /// keep the loop alive.
    pub async fn run(mut self) {
        info!("Game loop started");

        let mut tick_interval = interval(TICK_INTERVAL);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    self.world.tick(unix_millis());
                }
                command = self.command_rx.recv() => {
                    match command {
                        Some(command) => self.apply(command, unix_millis()),
                        None => break,
                    }
                }
            }
            self.flush();
        }

        info!("Game loop stopped");
    }

    fn apply(&mut self, command: GameCommand, now: u64) {
        match command {
            GameCommand::Connect { player_id, outbound } => {
                self.sessions.insert(player_id, outbound);
                self.world.connect(player_id, now);
            }
            GameCommand::Client { player_id, msg } => {
                self.world.dispatch(player_id, msg, now);
            }
            GameCommand::Disconnect { player_id } => {
                self.sessions.remove(&player_id);
                self.world.disconnect(player_id, now);
            }
            GameCommand::TimerFired(event) => {
                self.world.fire_timer(event, now);
            }
        }
    }

    /// Publish counters, deliver queued envelopes and arm requested timers
    fn flush(&mut self) {
        *self.stats.write() = self.world.stats();

        let (envelopes, timers) = self.world.take_output();
        for envelope in envelopes {
            self.deliver(envelope);
        }

        for (delay, event) in timers {
            let timer_tx = self.timer_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(command_tx) = timer_tx.upgrade() {
                    let _ = command_tx.send(GameCommand::TimerFired(event)).await;
                }
            });
        }
    }

    fn deliver(&self, envelope: Envelope) {
        let Envelope { recipients, msg } = envelope;
        for player_id in recipients {
            let Some(outbound) = self.sessions.get(&player_id) else {
                continue;
            };
            match outbound.try_send(msg.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(player_id = %player_id, "Outbound queue full, dropping message");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(player_id = %player_id, "Outbound queue closed");
                }
            }
        }
    }
}
