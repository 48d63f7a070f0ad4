//! Snapshot buffering and time-delayed interpolation.
//!
//! The server sends discrete snapshots at its broadcast rate. The client
//! renders a little in the past so that, most of the time, two received
//! snapshots bracket the moment being drawn and positions can be blended
//! between them.

use shared::{CoinState, PlayerState, Snapshot};
use std::collections::{BTreeMap, VecDeque};

/// World state ready to be drawn for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderState {
    pub players: BTreeMap<u32, PlayerState>,
    pub coins: Vec<CoinState>,
}

impl From<&Snapshot> for RenderState {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            players: snapshot.players.clone(),
            coins: snapshot.coins.clone(),
        }
    }
}

/// Received snapshots in arrival order, oldest evicted first.
#[derive(Debug, Clone)]
pub struct SnapshotBuffer {
    history: VecDeque<Snapshot>,
    max: usize,
}

impl SnapshotBuffer {
    pub fn new(max: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(max.min(256)),
            max: max.max(1),
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.history.push_back(snapshot);
        while self.history.len() > self.max {
            self.history.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// The most recently received snapshot, which is not necessarily the newest by capture time.
    pub fn latest(&self) -> Option<&Snapshot> {
        self.history.back()
    }

    /// First adjacent pair, in arrival order, whose times enclose `render_time`.
    pub fn bracketing(&self, render_time: f64) -> Option<(&Snapshot, &Snapshot)> {
        self.history
            .iter()
            .zip(self.history.iter().skip(1))
            .find(|(s0, s1)| s0.time <= render_time && render_time <= s1.time)
    }

    /// Reconstructs the world as it was at `render_time`.
    ///
    /// Without a bracketing pair the latest snapshot is returned as is.
    pub fn interpolate(&self, render_time: f64) -> Option<RenderState> {
        let Some((s0, s1)) = self.bracketing(render_time) else {
            return self.latest().map(RenderState::from);
        };

        let alpha = interpolation_alpha(s0.time, s1.time, render_time) as f32;

        let players = s0
            .players
            .iter()
            .map(|(&id, from)| {
                let to = s1.players.get(&id).unwrap_or(from);
                let blended = PlayerState {
                    x: lerp(from.x, to.x, alpha),
                    y: lerp(from.y, to.y, alpha),
                    score: to.score,
                };
                (id, blended)
            })
            .collect();

        Some(RenderState {
            players,
            coins: s1.coins.clone(),
        })
    }
}

impl Default for SnapshotBuffer {
    fn default() -> Self {
        Self::new(shared::SNAPSHOT_BUFFER_LEN)
    }
}

/// Blend factor of `render_time` between `t0` and `t1`, clamped to [0, 1].
///
/// Equal times yield 1.
pub fn interpolation_alpha(t0: f64, t1: f64, render_time: f64) -> f64 {
    let span = t1 - t0;
    if span <= 0.0 {
        return 1.0;
    }
    ((render_time - t0) / span).clamp(0.0, 1.0)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
