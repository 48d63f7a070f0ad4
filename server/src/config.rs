use crate::game::GameRules;
use shared::{BROADCAST_RATE, DATA_PORT, HANDSHAKE_PORT, MAX_PLAYERS, SERVER_LATENCY, TICK_RATE};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    ZeroRate { name: &'static str },

    #[error("broadcast rate ({broadcast_rate} Hz) must be lower than tick rate ({tick_rate} Hz)")]
    BroadcastTooFast { broadcast_rate: u32, tick_rate: u32 },

    #[error("latency must be a finite, non-negative number of seconds, got {0}")]
    InvalidLatency(f64),

    #[error("at least one player is required")]
    NoPlayers,
}

/// Runtime settings for the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub handshake_port: u16,
    pub data_port: u16,
    /// Physics ticks per second.
    pub tick_rate: u32,
    /// Snapshots per second.
    pub broadcast_rate: u32,
    /// Simulated one-way delay in seconds, applied to inputs and snapshots.
    pub latency: f64,
    /// Participants required before the game starts; further connections are refused.
    pub max_players: usize,
    pub rules: GameRules,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            handshake_port: HANDSHAKE_PORT,
            data_port: DATA_PORT,
            tick_rate: TICK_RATE,
            broadcast_rate: BROADCAST_RATE,
            latency: SERVER_LATENCY,
            max_players: MAX_PLAYERS,
            rules: GameRules::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::ZeroRate { name: "tick rate" });
        }
        if self.broadcast_rate == 0 {
            return Err(ConfigError::ZeroRate {
                name: "broadcast rate",
            });
        }
        if self.broadcast_rate >= self.tick_rate {
            return Err(ConfigError::BroadcastTooFast {
                broadcast_rate: self.broadcast_rate,
                tick_rate: self.tick_rate,
            });
        }
        if !self.latency.is_finite() || self.latency < 0.0 {
            return Err(ConfigError::InvalidLatency(self.latency));
        }
        if self.max_players == 0 {
            return Err(ConfigError::NoPlayers);
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.broadcast_rate.max(1) as f64)
    }

    pub fn handshake_addr(&self) -> String {
        format!("{}:{}", self.host, self.handshake_port)
    }

    pub fn data_addr(&self) -> String {
        format!("{}:{}", self.host, self.data_port)
    }
}
