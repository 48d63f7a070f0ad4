//! # Coin Collector Server Library
//!
//! The authoritative half of the coin collector game. The server owns the
//! canonical world, applies client inputs as commanded velocities, advances
//! the simulation on a fixed tick and periodically broadcasts snapshots of
//! the world to every participant.
//!
//! ## Simulated Latency
//!
//! Every message crossing the server is held in a latency queue before it
//! takes effect: received inputs wait before they are applied, and snapshots
//! wait before they are put on the wire. This lets the netcode be exercised
//! with realistic delay on a single machine.
//!
//! ## Concurrency
//!
//! The server runs several independent tokio tasks:
//! - **Handshake listener**: accepts reliable connections, assigns player ids
//!   and announces the start of the game once the roster is full
//! - **Network pump**: receives datagrams into the inbound queue, applies due
//!   inputs and sends due snapshots
//! - **Tick loop**: integrates movement, spawns coins and resolves pickups
//! - **Broadcast loop**: captures a snapshot per cycle and queues one
//!   delivery per known client address
//!
//! The world and both latency queues share one lock, held for the duration
//! of each logical operation.
//!
//! ## Module Organization
//!
//! - `config`: runtime settings and their validation
//! - `game`: players, coins and the fixed-step simulation
//! - `lobby`: the reliable handshake channel and participant roster
//! - `network`: sockets and the long-running loops
//! - `physics`: vector math, bounds clamping and circle overlap
//! - `state`: the locked server state, input ingestion and broadcast queuing
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!     let (stop_tx, stop_rx) = watch::channel(false);
//!
//!     let running = tokio::spawn(server.run(stop_rx));
//!     tokio::signal::ctrl_c().await?;
//!     stop_tx.send_replace(true);
//!     running.await??;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod game;
pub mod lobby;
pub mod network;
pub mod physics;
pub mod state;
