//! Everything the server guards with its single lock.
//!
//! The world and both latency queues live together so that one ingest pass,
//! one tick or one broadcast capture is a single exclusive operation.

use crate::game::{GameRules, GameState};
use log::trace;
use shared::{LatencyQueue, Message, ProtocolError};
use std::net::SocketAddr;
use std::sync::Arc;

/// A datagram received from a client, waiting out the inbound delay.
#[derive(Debug, Clone)]
pub struct Datagram {
    pub data: Vec<u8>,
    pub from: SocketAddr,
}

/// An encoded message waiting out the outbound delay.
///
/// One snapshot is shared by every delivery made from it.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub data: Arc<[u8]>,
    pub to: SocketAddr,
}

pub struct ServerState {
    pub game: GameState,
    pub inbound: LatencyQueue<Datagram>,
    pub outbound: LatencyQueue<Delivery>,
}

impl ServerState {
    /// `latency` is the simulated one-way delay in seconds, applied in both directions.
    pub fn new(rules: GameRules, latency: f64) -> Self {
        Self {
            game: GameState::new(rules),
            inbound: LatencyQueue::new(latency),
            outbound: LatencyQueue::new(latency),
        }
    }

    /// Queues a received datagram for processing once its delay has passed.
    pub fn receive(&mut self, data: Vec<u8>, from: SocketAddr, now: f64) {
        self.inbound.push(Datagram { data, from }, now);
    }

    /// Applies every due input to the world.
    ///
    /// Malformed datagrams, other message kinds and inputs for unknown
    /// players are dropped without complaint. Returns how many inputs were
    /// applied.
    pub fn ingest_due(&mut self, now: f64) -> usize {
        let mut applied = 0;

        for datagram in self.inbound.drain_due(now) {
            match Message::decode(&datagram.data) {
                Ok(Message::Input { player_id, intent }) => {
                    if self.game.apply_intent(player_id, &intent, datagram.from, now) {
                        applied += 1;
                    } else {
                        trace!("Input for unknown player {} from {}", player_id, datagram.from);
                    }
                }
                Ok(other) => {
                    trace!("Ignoring {} message from {}", other.kind(), datagram.from);
                }
                Err(e) => {
                    trace!("Discarding datagram from {}: {}", datagram.from, e);
                }
            }
        }

        applied
    }

    /// Captures a snapshot and queues one delivery per addressed player.
    ///
    /// Players whose address is still unknown get nothing this cycle.
    /// Returns how many deliveries were queued.
    pub fn broadcast_snapshot(&mut self, now: f64) -> Result<usize, ProtocolError> {
        let snapshot = self.game.capture_snapshot(now);
        let data: Arc<[u8]> = Message::Snapshot(snapshot).encode()?.into();

        let recipients = self.game.known_addrs();
        for (_, to) in &recipients {
            self.outbound.push(
                Delivery {
                    data: Arc::clone(&data),
                    to: *to,
                },
                now,
            );
        }

        Ok(recipients.len())
    }

    /// Removes every delivery whose delay has passed.
    pub fn take_due_deliveries(&mut self, now: f64) -> Vec<Delivery> {
        self.outbound.drain_due(now).collect()
    }
}
