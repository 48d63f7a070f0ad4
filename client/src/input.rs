//! Client input sampling with change detection and keep-alive

use macroquad::prelude::{is_key_down, KeyCode};
use shared::Intent;
use std::time::{Duration, Instant};

/// Longest gap between two sent intents while playing.
pub const KEEP_ALIVE: Duration = Duration::from_millis(16);

/// Turns keyboard state into intents worth sending.
pub struct InputManager {
    current: Intent,
    last_sent: Option<Instant>,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            current: Intent::default(),
            last_sent: None,
        }
    }

    /// Samples the keyboard (WASD or arrow keys) and returns the intent to send, if any.
    pub fn update(&mut self) -> Option<Intent> {
        let intent = Intent {
            left: is_key_down(KeyCode::A) || is_key_down(KeyCode::Left),
            right: is_key_down(KeyCode::D) || is_key_down(KeyCode::Right),
            up: is_key_down(KeyCode::W) || is_key_down(KeyCode::Up),
            down: is_key_down(KeyCode::S) || is_key_down(KeyCode::Down),
        };
        self.update_with(intent, Instant::now())
    }

    /// Returns `intent` when it differs from the last one or the keep-alive has elapsed.
    pub fn update_with(&mut self, intent: Intent, now: Instant) -> Option<Intent> {
        let changed = intent != self.current;
        let due = self
            .last_sent
            .map_or(true, |sent| now.saturating_duration_since(sent) >= KEEP_ALIVE);

        if !(changed || due) {
            return None;
        }

        self.current = intent;
        self.last_sent = Some(now);
        Some(intent)
    }

    pub fn current(&self) -> &Intent {
        &self.current
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
