//! Immutable world captures sent from the server to every client.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Public state of one player as seen by clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub x: f32,
    pub y: f32,
    pub score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoinState {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

/// A timestamped capture of every player and coin.
///
/// `time` is the server clock reading at capture, in seconds since the Unix
/// epoch. Players are keyed by id; on the wire the keys are JSON strings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: f64,
    #[serde(with = "player_map")]
    pub players: BTreeMap<u32, PlayerState>,
    pub coins: Vec<CoinState>,
}

impl Snapshot {
    pub fn player(&self, id: u32) -> Option<&PlayerState> {
        self.players.get(&id)
    }
}

/// Player map with string keys on the wire.
///
/// Integer keys do not survive serde's buffering of internally tagged content.
mod player_map {
    use super::PlayerState;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(players: &BTreeMap<u32, PlayerState>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let keyed: BTreeMap<String, &PlayerState> = players
            .iter()
            .map(|(id, player)| (id.to_string(), player))
            .collect();
        keyed.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<u32, PlayerState>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let keyed = BTreeMap::<String, PlayerState>::deserialize(deserializer)?;
        keyed
            .into_iter()
            .map(|(key, player)| {
                key.parse::<u32>()
                    .map(|id| (id, player))
                    .map_err(|_| D::Error::custom(format!("invalid player id key {:?}", key)))
            })
            .collect()
    }
}
