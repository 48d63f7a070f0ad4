//! Integration tests for the coin collector server and client
//!
//! These tests validate the wire format and real loopback sessions between
//! a running server and client-side networking.

use client::game::{lock, ClientGameState, Phase};
use client::network::{self, HandshakeError, Session};
use client::config::ClientConfig;
use server::config::ServerConfig;
use server::network::Server;
use shared::{Intent, Message, Snapshot};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, timeout};

/// WIRE FORMAT TESTS
mod protocol_tests {
    use super::*;

    #[test]
    fn every_kind_decodes_from_documented_shape() {
        let welcome = Message::decode(br#"{"kind":"welcome","player_id":1,"data_port":9001}"#).unwrap();
        assert_eq!(
            welcome,
            Message::Welcome {
                player_id: 1,
                data_port: 9001
            }
        );

        assert_eq!(Message::decode(br#"{"kind":"start"}"#).unwrap(), Message::Start);

        let input = Message::decode(
            br#"{"kind":"input","player_id":2,"intent":{"left":true,"right":false,"up":false,"down":true}}"#,
        )
        .unwrap();
        assert_eq!(
            input,
            Message::Input {
                player_id: 2,
                intent: Intent {
                    left: true,
                    down: true,
                    ..Intent::default()
                }
            }
        );

        let snapshot = Message::decode(
            br#"{"kind":"snapshot","time":12.5,"players":{"1":{"x":10.0,"y":20.0,"score":3}},"coins":[{"id":4,"x":1.0,"y":2.0}]}"#,
        )
        .unwrap();
        match snapshot {
            Message::Snapshot(snapshot) => {
                assert_eq!(snapshot.time, 12.5);
                assert_eq!(snapshot.player(1).unwrap().score, 3);
                assert_eq!(snapshot.coins[0].id, 4);
            }
            other => panic!("expected snapshot, got {}", other.kind()),
        }
    }

    #[test]
    fn partial_intent_defaults_to_released() {
        let message = Message::decode(br#"{"kind":"input","player_id":1,"intent":{"up":true}}"#).unwrap();
        match message {
            Message::Input { intent, .. } => {
                assert!(intent.up);
                assert!(!intent.left && !intent.right && !intent.down);
            }
            other => panic!("expected input, got {}", other.kind()),
        }
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        let payloads: [&[u8]; 5] = [
            b"",
            b"not json",
            br#"{"player_id":1}"#,
            br#"{"kind":"teleport","player_id":1}"#,
            br#"{"kind":"snapshot","time":1.0,"players":{"one":{"x":0,"y":0,"score":0}},"coins":[]}"#,
        ];
        for payload in payloads {
            assert!(Message::decode(payload).is_err(), "accepted {:?}", payload);
        }
    }

    #[test]
    fn snapshot_player_ids_are_string_keys() {
        let mut snapshot = Snapshot::default();
        snapshot.players.insert(
            7,
            shared::PlayerState {
                x: 1.0,
                y: 2.0,
                score: 0,
            },
        );

        let encoded = String::from_utf8(Message::Snapshot(snapshot).encode().unwrap()).unwrap();
        assert!(encoded.starts_with(r#"{"kind":"snapshot""#));
        assert!(encoded.contains(r#""players":{"7":"#));
    }
}

/// LOOPBACK SESSION TESTS
mod session_tests {
    use super::*;

    fn loopback_config(max_players: usize) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            handshake_port: 0,
            data_port: 0,
            latency: 0.01,
            max_players,
            ..ServerConfig::default()
        }
    }

    async fn start_server(max_players: usize) -> (SocketAddr, watch::Sender<bool>, tokio::task::JoinHandle<std::io::Result<()>>) {
        let server = Server::bind(loopback_config(max_players)).await.unwrap();
        let handshake_addr = server.handshake_addr().unwrap();
        let (stop_tx, stop_rx) = watch::channel(false);
        let running = tokio::spawn(server.run(stop_rx));
        (handshake_addr, stop_tx, running)
    }

    async fn next_snapshot_with(session: &Session, player_id: u32) -> Snapshot {
        let socket = session.socket();
        let mut buffer = vec![0u8; shared::MAX_DATAGRAM_SIZE];
        loop {
            let (len, _) = socket.recv_from(&mut buffer).await.unwrap();
            if let Ok(Message::Snapshot(snapshot)) = Message::decode(&buffer[..len]) {
                if snapshot.player(player_id).is_some() {
                    return snapshot;
                }
            }
        }
    }

    /// Handshake, one input and a snapshot back over real sockets
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn input_round_trip_produces_snapshots() {
        let (handshake_addr, stop_tx, running) = start_server(1).await;

        let mut session = Session::open(&handshake_addr.to_string()).await.unwrap();
        assert_eq!(session.player_id, 1);
        assert_eq!(session.data_addr.ip(), handshake_addr.ip());
        timeout(Duration::from_secs(2), session.wait_for_start())
            .await
            .expect("start never arrived")
            .unwrap();

        let input = Message::Input {
            player_id: session.player_id,
            intent: Intent::default(),
        };
        session
            .socket()
            .send_to(&input.encode().unwrap(), session.data_addr)
            .await
            .unwrap();

        let snapshot = timeout(Duration::from_secs(5), next_snapshot_with(&session, 1))
            .await
            .expect("no snapshot received");
        assert_eq!(snapshot.player(1).unwrap().score, 0);

        stop_tx.send_replace(true);
        running.await.unwrap().unwrap();
    }

    /// Connections beyond the participant cap are closed without a welcome
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn connection_beyond_cap_is_refused() {
        let (handshake_addr, stop_tx, running) = start_server(1).await;

        let _first = Session::open(&handshake_addr.to_string()).await.unwrap();
        let second = timeout(Duration::from_secs(2), Session::open(&handshake_addr.to_string()))
            .await
            .expect("refused connection was left open");
        assert!(matches!(
            second,
            Err(HandshakeError::Closed) | Err(HandshakeError::Io(_))
        ));

        stop_tx.send_replace(true);
        running.await.unwrap().unwrap();
    }

    /// The whole client session: handshake, delayed intents out, delayed snapshots in
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn client_session_moves_its_player() {
        let (handshake_addr, server_stop, running) = start_server(1).await;

        let config = ClientConfig {
            host: handshake_addr.ip().to_string(),
            handshake_port: handshake_addr.port(),
            latency: 0.01,
            ..ClientConfig::default()
        };
        let state = ClientGameState::shared(config.buffer_len);
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let (client_stop, client_stop_rx) = watch::channel(false);
        let session = tokio::spawn(network::run(config, state.clone(), intent_rx, client_stop_rx));

        let mut playing = false;
        for _ in 0..200 {
            sleep(Duration::from_millis(10)).await;
            if lock(&state).is_playing() {
                playing = true;
                break;
            }
        }
        assert!(playing, "phase stuck at {:?}", lock(&state).phase);
        let player_id = lock(&state).player_id.unwrap();

        let right = Intent {
            right: true,
            ..Intent::default()
        };
        intent_tx.send(right).unwrap();

        // Wait for two snapshots showing the player moving right.
        let mut first_x = None;
        let mut moved = false;
        for _ in 0..300 {
            sleep(Duration::from_millis(10)).await;
            let x = lock(&state).snapshots.latest().and_then(|s| s.player(player_id)).map(|p| p.x);
            match (first_x, x) {
                (None, Some(x)) => first_x = Some(x),
                (Some(start), Some(x)) if x > start => {
                    moved = true;
                    break;
                }
                _ => {}
            }
        }
        assert!(moved, "player never moved right");
        assert_eq!(lock(&state).phase, Phase::Playing);

        client_stop.send_replace(true);
        session.await.unwrap();
        server_stop.send_replace(true);
        running.await.unwrap().unwrap();
    }
}
