use shared::{CLIENT_LATENCY, HANDSHAKE_PORT, RENDER_DELAY, SNAPSHOT_BUFFER_LEN, WORLD_HEIGHT, WORLD_WIDTH};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a finite, non-negative number of seconds, got {value}")]
    InvalidDelay { name: &'static str, value: f64 },

    #[error("snapshot buffer must hold at least one snapshot")]
    EmptyBuffer,
}

/// Runtime settings for the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub handshake_port: u16,
    /// Simulated one-way delay in seconds, applied to sent inputs and received snapshots.
    pub latency: f64,
    /// How far behind the wall clock the interpolated view is rendered.
    pub render_delay: f64,
    pub buffer_len: usize,
    pub width: u32,
    pub height: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            handshake_port: HANDSHAKE_PORT,
            latency: CLIENT_LATENCY,
            render_delay: RENDER_DELAY,
            buffer_len: SNAPSHOT_BUFFER_LEN,
            width: WORLD_WIDTH as u32,
            height: WORLD_HEIGHT as u32,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_delay("latency", self.latency)?;
        check_delay("render delay", self.render_delay)?;
        if self.buffer_len == 0 {
            return Err(ConfigError::EmptyBuffer);
        }
        Ok(())
    }

    pub fn handshake_addr(&self) -> String {
        format!("{}:{}", self.host, self.handshake_port)
    }
}

fn check_delay(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidDelay { name, value });
    }
    Ok(())
}
