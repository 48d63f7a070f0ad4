use crate::interpolation::{RenderState, SnapshotBuffer};
use shared::Snapshot;
use std::sync::{Arc, Mutex, MutexGuard};

/// Where the client is in its session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    /// Welcomed, waiting for the roster to fill.
    Waiting,
    Playing,
    Failed(String),
}

/// State shared between the render thread and the network thread.
#[derive(Debug)]
pub struct ClientGameState {
    pub phase: Phase,
    pub player_id: Option<u32>,
    pub snapshots: SnapshotBuffer,
}

pub type SharedGameState = Arc<Mutex<ClientGameState>>;

impl ClientGameState {
    pub fn new(buffer_len: usize) -> Self {
        Self {
            phase: Phase::Connecting,
            player_id: None,
            snapshots: SnapshotBuffer::new(buffer_len),
        }
    }

    pub fn shared(buffer_len: usize) -> SharedGameState {
        Arc::new(Mutex::new(Self::new(buffer_len)))
    }

    pub fn welcomed(&mut self, player_id: u32) {
        self.player_id = Some(player_id);
        self.phase = Phase::Waiting;
    }

    pub fn started(&mut self) {
        self.phase = Phase::Playing;
    }

    pub fn failed(&mut self, reason: impl Into<String>) {
        self.phase = Phase::Failed(reason.into());
    }

    pub fn is_playing(&self) -> bool {
        self.phase == Phase::Playing
    }

    pub fn receive_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    /// The world as it should be drawn at `now`, rendered `render_delay` seconds in the past.
    pub fn render_state(&self, now: f64, render_delay: f64) -> Option<RenderState> {
        self.snapshots.interpolate(now - render_delay)
    }

    /// One-line status for the phases that have nothing to draw yet.
    pub fn status_text(&self) -> Option<String> {
        match &self.phase {
            Phase::Connecting => Some("Connecting to server...".to_string()),
            Phase::Waiting => Some("Waiting for players...".to_string()),
            Phase::Playing => None,
            Phase::Failed(reason) => Some(format!("Connection failed: {}", reason)),
        }
    }
}

impl Default for ClientGameState {
    fn default() -> Self {
        Self::new(shared::SNAPSHOT_BUFFER_LEN)
    }
}

/// Locks the shared state, recovering it if another thread panicked while holding it.
pub fn lock(state: &Mutex<ClientGameState>) -> MutexGuard<'_, ClientGameState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::PlayerState;

    #[test]
    fn test_phase_transitions() {
        let mut state = ClientGameState::new(10);
        assert_eq!(state.phase, Phase::Connecting);
        assert!(state.status_text().is_some());

        state.welcomed(2);
        assert_eq!(state.player_id, Some(2));
        assert_eq!(state.phase, Phase::Waiting);

        state.started();
        assert!(state.is_playing());
        assert_eq!(state.status_text(), None);

        state.failed("refused");
        assert_eq!(state.status_text().unwrap(), "Connection failed: refused");
    }

    #[test]
    fn test_render_state_applies_delay() {
        let mut state = ClientGameState::new(10);
        for (time, x) in [(10.0, 0.0), (11.0, 100.0)] {
            let mut snapshot = Snapshot {
                time,
                ..Snapshot::default()
            };
            snapshot.players.insert(1, PlayerState { x, y: 0.0, score: 0 });
            state.receive_snapshot(snapshot);
        }

        let render = state.render_state(11.0, 0.5).unwrap();
        assert_eq!(render.players[&1].x, 50.0);
    }

    #[test]
    fn test_lock_survives_poisoning() {
        let shared = ClientGameState::shared(10);
        let poisoner = Arc::clone(&shared);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("render thread died");
        })
        .join();

        assert!(shared.is_poisoned());
        lock(&shared).welcomed(1);
        assert_eq!(lock(&shared).player_id, Some(1));
    }
}
