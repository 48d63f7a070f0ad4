//! # Coin Collector Client Library
//!
//! The client half of the coin collector game. The client never simulates
//! the world itself: it sends its player's intents to the server and draws
//! the authoritative world reconstructed from received snapshots.
//!
//! ## Time-Delayed Interpolation
//!
//! Snapshots arrive at the server's broadcast rate, far below the frame
//! rate. Each frame is rendered a fixed delay in the past, blending the two
//! buffered snapshots around that moment so motion stays smooth despite the
//! gaps between updates, late arrivals and lost datagrams.
//!
//! ## Threads
//!
//! The render loop owns the window on the main thread. A second thread runs
//! a tokio runtime for the handshake and the UDP send and receive loops.
//! The two share a [`game::ClientGameState`] behind a mutex, and intents
//! flow from the render loop to the network over a channel.
//!
//! ## Module Organization
//!
//! - `config`: runtime settings and their validation
//! - `game`: session phase, assigned player id and the snapshot buffer
//! - `input`: keyboard sampling and the send policy for intents
//! - `interpolation`: snapshot buffering and blending
//! - `network`: handshake session and the latency-delayed UDP loops
//! - `rendering`: drawing the world and the status overlay

pub mod config;
pub mod game;
pub mod input;
pub mod interpolation;
pub mod network;
pub mod rendering;
