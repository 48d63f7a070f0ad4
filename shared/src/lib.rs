//! Types and constants shared by the coin collector server and client.
//!
//! Both sides agree on the world geometry, the wire protocol and the
//! simulated-latency queue used on every hop between them.

pub mod latency;
pub mod protocol;
pub mod snapshot;

pub use latency::{DrainDue, LatencyQueue};
pub use protocol::{Intent, Message, ProtocolError};
pub use snapshot::{CoinState, PlayerState, Snapshot};

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const HANDSHAKE_PORT: u16 = 9000;
pub const DATA_PORT: u16 = 9001;

pub const TICK_RATE: u32 = 60;
pub const BROADCAST_RATE: u32 = 20;

/// Simulated one-way delay applied by the server to inputs and snapshots, in seconds.
pub const SERVER_LATENCY: f64 = 0.1;
/// Simulated one-way delay applied by the client to inputs and snapshots, in seconds.
pub const CLIENT_LATENCY: f64 = 0.1;
/// How far in the past the client renders, in seconds.
pub const RENDER_DELAY: f64 = 0.1;

pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 600.0;
pub const PLAYER_SPEED: f32 = 200.0;
pub const PLAYER_RADIUS: f32 = 16.0;
pub const COIN_RADIUS: f32 = 10.0;
/// Players may overlap the world edge by their radius minus this inset.
pub const BOUNDARY_INSET: f32 = 6.0;

pub const COIN_SPAWN_INTERVAL: f32 = 2.0;
pub const COIN_SPAWN_MARGIN: f32 = 30.0;
pub const PLAYER_SPAWN_MARGIN: f32 = 50.0;

pub const MAX_PLAYERS: usize = 2;
pub const SNAPSHOT_BUFFER_LEN: usize = 200;
pub const MAX_DATAGRAM_SIZE: usize = 65_536;

/// Wall-clock time in seconds since the Unix epoch.
///
/// Snapshots are stamped with this on the server and compared against it on
/// the client, so both processes are expected to share a clock.
pub fn current_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs_f64()
}
