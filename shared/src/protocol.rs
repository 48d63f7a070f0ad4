//! Wire protocol between server and clients.
//!
//! Every message is a JSON object carrying a `kind` discriminator. The
//! reliable handshake channel frames one message per line; the unreliable
//! game channel carries one message per datagram.

use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Directional input state for one sample, before normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intent {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl Intent {
    pub fn is_idle(&self) -> bool {
        !(self.left || self.right || self.up || self.down)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    /// Reliable, server to client: assigned id and the game traffic port.
    Welcome { player_id: u32, data_port: u16 },
    /// Reliable, server to client: the roster is full.
    Start,
    /// Unreliable, client to server.
    Input { player_id: u32, intent: Intent },
    /// Unreliable, server to client.
    Snapshot(Snapshot),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Welcome { .. } => "welcome",
            Message::Start => "start",
            Message::Input { .. } => "input",
            Message::Snapshot(_) => "snapshot",
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(self).map_err(ProtocolError::Encode)
    }

    /// Encodes the message followed by a newline, for the handshake stream.
    pub fn encode_line(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut data = self.encode()?;
        data.push(b'\n');
        Ok(data)
    }

    /// Decodes one message. Unknown kinds and malformed payloads fail alike.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{CoinState, PlayerState};
    use assert_approx_eq::assert_approx_eq;
    use std::collections::BTreeMap;

    #[test]
    fn test_welcome_wire_format() {
        let message = Message::Welcome {
            player_id: 3,
            data_port: 9001,
        };
        let encoded = message.encode().unwrap();
        assert_eq!(
            String::from_utf8(encoded).unwrap(),
            r#"{"kind":"welcome","player_id":3,"data_port":9001}"#
        );
    }

    #[test]
    fn test_start_wire_format() {
        let encoded = Message::Start.encode_line().unwrap();
        assert_eq!(encoded, b"{\"kind\":\"start\"}\n".to_vec());
    }

    #[test]
    fn test_decode_input() {
        let data = br#"{"kind":"input","player_id":1,"intent":{"left":true,"right":false,"up":false,"down":true}}"#;
        match Message::decode(data).unwrap() {
            Message::Input { player_id, intent } => {
                assert_eq!(player_id, 1);
                assert!(intent.left);
                assert!(!intent.right);
                assert!(!intent.up);
                assert!(intent.down);
            }
            other => panic!("Unexpected message kind {}", other.kind()),
        }
    }

    #[test]
    fn test_decode_input_with_partial_intent() {
        let data = br#"{"kind":"input","player_id":2,"intent":{"up":true}}"#;
        match Message::decode(data).unwrap() {
            Message::Input { intent, .. } => {
                assert_eq!(
                    intent,
                    Intent {
                        up: true,
                        ..Intent::default()
                    }
                );
            }
            other => panic!("Unexpected message kind {}", other.kind()),
        }
    }

    #[test]
    fn test_snapshot_survives_tagging() {
        let mut players = BTreeMap::new();
        players.insert(1, PlayerState { x: 10.5, y: 20.0, score: 2 });
        players.insert(2, PlayerState { x: 700.0, y: 580.0, score: 0 });
        let snapshot = Snapshot {
            time: 1_700_000_123.5,
            players,
            coins: vec![CoinState { id: 4, x: 31.0, y: 569.0 }],
        };

        let encoded = Message::Snapshot(snapshot.clone()).encode().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(value["kind"], "snapshot");
        assert_eq!(value["players"]["1"]["score"], 2);

        match Message::decode(&encoded).unwrap() {
            Message::Snapshot(decoded) => {
                assert_approx_eq!(decoded.time, snapshot.time, 1e-9);
                assert_eq!(decoded.players, snapshot.players);
                assert_eq!(decoded.coins, snapshot.coins);
            }
            other => panic!("Unexpected message kind {}", other.kind()),
        }
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        let result = Message::decode(br#"{"kind":"teleport","player_id":1}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_malformed_payloads() {
        let valid = Message::Input {
            player_id: 1,
            intent: Intent::default(),
        }
        .encode()
        .unwrap();

        assert!(Message::decode(&valid[..valid.len() / 2]).is_err());
        assert!(Message::decode(b"").is_err());
        assert!(Message::decode(&[0xFF, 0x00, 0x13]).is_err());
        assert!(Message::decode(br#"{"player_id":1}"#).is_err());
    }

    #[test]
    fn test_intent_idle() {
        assert!(Intent::default().is_idle());
        assert!(!Intent {
            right: true,
            ..Intent::default()
        }
        .is_idle());
    }
}
