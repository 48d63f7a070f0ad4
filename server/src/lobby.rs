//! Reliable handshake channel and participant roster
//!
//! Every participant holds one TCP connection for the whole session:
//! - On connect the server allocates a player, replies with a `welcome`
//!   carrying the player id and the game traffic port
//! - Once the roster reaches the participant cap every waiting connection
//!   receives `start`
//! - When the connection closes the player is removed from the world
//!
//! Connections beyond the cap are closed without a welcome. A failure on one
//! connection never affects the others.

use crate::state::ServerState;
use log::{error, info, warn};
use shared::{Message, ProtocolError};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex};

#[derive(Debug, Error)]
pub enum LobbyError {
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// How a participant's connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// The peer closed the channel or it failed.
    Disconnected,
    /// The server is shutting down.
    Stopped,
}

pub struct Lobby {
    state: Arc<Mutex<ServerState>>,
    max_players: usize,
    data_port: u16,
    /// Current number of players, watched by connections waiting for start.
    roster: watch::Sender<usize>,
}

impl Lobby {
    pub fn new(state: Arc<Mutex<ServerState>>, max_players: usize, data_port: u16) -> Self {
        let (roster, _) = watch::channel(0);
        Self {
            state,
            max_players,
            data_port,
            roster,
        }
    }

    /// Allocates a player, or returns None when the roster is full.
    pub async fn join(&self) -> Option<u32> {
        let (player_id, count) = {
            let mut state = self.state.lock().await;
            if state.game.player_count() >= self.max_players {
                return None;
            }
            let player_id = state.game.add_player(&mut rand::thread_rng());
            (player_id, state.game.player_count())
        };

        info!("Player {} joined ({}/{})", player_id, count, self.max_players);
        self.roster.send_replace(count);
        Some(player_id)
    }

    pub async fn leave(&self, player_id: u32) {
        let count = {
            let mut state = self.state.lock().await;
            state.game.remove_player(player_id);
            state.game.player_count()
        };

        info!("Player {} left ({}/{})", player_id, count, self.max_players);
        self.roster.send_replace(count);
    }

    pub fn is_full(&self) -> bool {
        *self.roster.borrow() >= self.max_players
    }

    /// Accepts handshake connections until `stop` is raised.
    pub async fn run_accept_loop(self: Arc<Self>, listener: TcpListener, mut stop: watch::Receiver<bool>) {
        loop {
            if *stop.borrow() {
                break;
            }

            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        info!("Handshake connection from {}", peer);
                        let lobby = Arc::clone(&self);
                        let stop = stop.clone();
                        tokio::spawn(async move {
                            lobby.handle_connection(stream, peer, stop).await;
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                },
                _ = stop.changed() => break,
            }
        }

        info!("Handshake listener stopped");
    }

    async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr, stop: watch::Receiver<bool>) {
        let Some(player_id) = self.join().await else {
            warn!("Refusing {}: server full ({} players)", peer, self.max_players);
            return;
        };

        let (reader, writer) = stream.into_split();
        match self.serve(player_id, reader, writer, stop).await {
            Ok(Departure::Disconnected) => {}
            Ok(Departure::Stopped) => return,
            Err(e) => warn!("Handshake with {} (player {}) failed: {}", peer, player_id, e),
        }
        self.leave(player_id).await;
    }

    /// Runs one participant's reliable channel for the rest of its life.
    pub async fn serve<R, W>(
        &self,
        player_id: u32,
        mut reader: R,
        mut writer: W,
        mut stop: watch::Receiver<bool>,
    ) -> Result<Departure, LobbyError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let welcome = Message::Welcome {
            player_id,
            data_port: self.data_port,
        };
        send_message(&mut writer, &welcome).await?;

        let mut roster = self.roster.subscribe();
        let mut scratch = [0u8; 64];

        loop {
            if *roster.borrow_and_update() >= self.max_players {
                break;
            }
            tokio::select! {
                changed = roster.changed() => {
                    if changed.is_err() {
                        return Ok(Departure::Stopped);
                    }
                }
                read = reader.read(&mut scratch) => {
                    if matches!(read, Ok(0) | Err(_)) {
                        return Ok(Departure::Disconnected);
                    }
                }
                _ = stop.changed() => return Ok(Departure::Stopped),
            }
        }

        send_message(&mut writer, &Message::Start).await?;
        info!("Player {} started", player_id);

        // Anything the client sends from here on is ignored; only closure matters.
        loop {
            tokio::select! {
                read = reader.read(&mut scratch) => {
                    if matches!(read, Ok(0) | Err(_)) {
                        return Ok(Departure::Disconnected);
                    }
                }
                _ = stop.changed() => return Ok(Departure::Stopped),
            }
        }
    }
}

/// Writes one newline-framed message and flushes it.
pub async fn send_message<W>(writer: &mut W, message: &Message) -> Result<(), LobbyError>
where
    W: AsyncWrite + Unpin,
{
    let data = message.encode_line()?;
    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameRules;
    use std::time::Duration;
    use tokio_test::io::Builder;

    fn lobby(max_players: usize) -> Lobby {
        let state = Arc::new(Mutex::new(ServerState::new(GameRules::default(), 0.1)));
        Lobby::new(state, max_players, 9001)
    }

    #[tokio::test]
    async fn test_join_assigns_sequential_ids() {
        let lobby = lobby(3);
        assert_eq!(lobby.join().await, Some(1));
        assert_eq!(lobby.join().await, Some(2));
        assert!(!lobby.is_full());
        assert_eq!(lobby.join().await, Some(3));
        assert!(lobby.is_full());
    }

    #[tokio::test]
    async fn test_join_refused_at_capacity() {
        let lobby = lobby(1);
        assert_eq!(lobby.join().await, Some(1));
        assert_eq!(lobby.join().await, None);

        lobby.leave(1).await;
        assert!(!lobby.is_full());
        assert_eq!(lobby.join().await, Some(2));
        assert_eq!(lobby.state.lock().await.game.player_count(), 1);
    }

    #[tokio::test]
    async fn test_send_message_frames_with_newline() {
        let mut writer = Builder::new()
            .write(b"{\"kind\":\"welcome\",\"player_id\":5,\"data_port\":9001}\n")
            .build();
        let message = Message::Welcome {
            player_id: 5,
            data_port: 9001,
        };
        send_message(&mut writer, &message).await.unwrap();
    }

    #[tokio::test]
    async fn test_single_player_gets_welcome_then_start() {
        let lobby = lobby(1);
        let player_id = lobby.join().await.unwrap();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let reader = Builder::new().wait(Duration::from_millis(10)).build();
        let writer = Builder::new()
            .write(b"{\"kind\":\"welcome\",\"player_id\":1,\"data_port\":9001}\n")
            .write(b"{\"kind\":\"start\"}\n")
            .build();

        let departure = lobby.serve(player_id, reader, writer, stop_rx).await.unwrap();
        assert_eq!(departure, Departure::Disconnected);
    }

    #[tokio::test]
    async fn test_peer_leaving_before_start() {
        let lobby = lobby(2);
        let player_id = lobby.join().await.unwrap();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let reader = Builder::new().build();
        let writer = Builder::new()
            .write(b"{\"kind\":\"welcome\",\"player_id\":1,\"data_port\":9001}\n")
            .build();

        let departure = lobby.serve(player_id, reader, writer, stop_rx).await.unwrap();
        assert_eq!(departure, Departure::Disconnected);
    }

    #[tokio::test]
    async fn test_waiting_player_starts_when_roster_fills() {
        let lobby = Arc::new(lobby(2));
        let first = lobby.join().await.unwrap();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let waiting = {
            let lobby = Arc::clone(&lobby);
            tokio::spawn(async move {
                let reader = Builder::new().wait(Duration::from_millis(200)).build();
                let writer = Builder::new()
                    .write(b"{\"kind\":\"welcome\",\"player_id\":1,\"data_port\":9001}\n")
                    .write(b"{\"kind\":\"start\"}\n")
                    .build();
                lobby.serve(first, reader, writer, stop_rx).await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(lobby.join().await, Some(2));

        let departure = waiting.await.unwrap().unwrap();
        assert_eq!(departure, Departure::Disconnected);
    }
}
