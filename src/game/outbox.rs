//! Outbound messages and timer requests produced by the world

use std::time::Duration;

use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

/// A message with its recipients resolved at emission time
#[derive(Debug, Clone)]
pub struct Envelope {
    pub recipients: Vec<Uuid>,
    pub msg: ServerMsg,
}

/// One-shot callbacks the world asks the driver to schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// Start the next round of `room_id` if it is still on round `epoch`
    RestartRound { room_id: String, epoch: u64 },
}

/// Collects everything a handler or tick emits, in order
#[derive(Debug, Default)]
pub struct Outbox {
    envelopes: Vec<Envelope>,
    timers: Vec<(Duration, TimerEvent)>,
}

impl Outbox {
    pub fn send_to(&mut self, player_id: Uuid, msg: ServerMsg) {
        self.envelopes.push(Envelope {
            recipients: vec![player_id],
            msg,
        });
    }

    pub fn broadcast(&mut self, members: &[Uuid], msg: ServerMsg) {
        if members.is_empty() {
            return;
        }
        self.envelopes.push(Envelope {
            recipients: members.to_vec(),
            msg,
        });
    }

    pub fn broadcast_except(&mut self, members: &[Uuid], except: Uuid, msg: ServerMsg) {
        let recipients: Vec<Uuid> = members.iter().copied().filter(|id| *id != except).collect();
        if recipients.is_empty() {
            return;
        }
        self.envelopes.push(Envelope { recipients, msg });
    }

    pub fn schedule(&mut self, delay: Duration, event: TimerEvent) {
        self.timers.push((delay, event));
    }

    /// Take everything queued so far
    pub fn drain(&mut self) -> (Vec<Envelope>, Vec<(Duration, TimerEvent)>) {
        (
            std::mem::take(&mut self.envelopes),
            std::mem::take(&mut self.timers),
        )
    }

    #[cfg(test)]
    pub fn envelopes(&self) -> &[Envelope] {
        &self.envelopes
    }

    #[cfg(test)]
    pub fn timers(&self) -> &[(Duration, TimerEvent)] {
        &self.timers
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty() && self.timers.is_empty()
    }
}
