//! Client network layer
//!
//! A session starts on the reliable handshake channel: the server sends a
//! `welcome` with our player id and the port for game traffic, then `start`
//! once every participant has joined. Game traffic then flows over UDP,
//! with each direction passing through its own latency queue:
//! - The send loop takes intents from the render thread and sends them as
//!   `input` messages once their delay has passed
//! - The receive loop holds incoming datagrams for the same delay before
//!   handing snapshots to the shared snapshot buffer

use crate::config::ClientConfig;
use crate::game::{lock, SharedGameState};
use log::{debug, error, info, trace};
use shared::{current_time, Intent, LatencyQueue, Message, ProtocolError, MAX_DATAGRAM_SIZE};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};

/// How often the latency queues are checked for due entries.
const PUMP_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("server closed the connection")]
    Closed,

    #[error("expected {expected} message, got {got}")]
    Unexpected {
        expected: &'static str,
        got: &'static str,
    },
}

/// Reads the next newline-framed message, skipping blank lines.
pub async fn read_message<R>(reader: &mut R) -> Result<Message, HandshakeError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Err(HandshakeError::Closed);
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        return Ok(Message::decode(&line)?);
    }
}

/// Waits for the `welcome` and returns the assigned player id and data port.
pub async fn read_welcome<R>(reader: &mut R) -> Result<(u32, u16), HandshakeError>
where
    R: AsyncBufRead + Unpin,
{
    match read_message(reader).await? {
        Message::Welcome {
            player_id,
            data_port,
        } => Ok((player_id, data_port)),
        other => Err(HandshakeError::Unexpected {
            expected: "welcome",
            got: other.kind(),
        }),
    }
}

pub async fn read_start<R>(reader: &mut R) -> Result<(), HandshakeError>
where
    R: AsyncBufRead + Unpin,
{
    match read_message(reader).await? {
        Message::Start => Ok(()),
        other => Err(HandshakeError::Unexpected {
            expected: "start",
            got: other.kind(),
        }),
    }
}

/// One participant's connection to the server.
pub struct Session {
    pub player_id: u32,
    /// Where game traffic is sent: the handshake peer's address with the welcomed port.
    pub data_addr: SocketAddr,
    control: BufReader<TcpStream>,
    socket: Arc<UdpSocket>,
}

impl Session {
    /// Connects to the handshake channel, waits for the welcome and binds a data socket.
    pub async fn open(handshake_addr: &str) -> Result<Self, HandshakeError> {
        let stream = TcpStream::connect(handshake_addr).await?;
        let server = stream.peer_addr()?;
        let mut control = BufReader::new(stream);

        let (player_id, data_port) = read_welcome(&mut control).await?;
        let data_addr = SocketAddr::new(server.ip(), data_port);

        let unspecified = if server.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = Arc::new(UdpSocket::bind(unspecified).await?);

        Ok(Self {
            player_id,
            data_addr,
            control,
            socket,
        })
    }

    pub fn socket(&self) -> Arc<UdpSocket> {
        Arc::clone(&self.socket)
    }

    /// Blocks until the server announces that the game has started.
    pub async fn wait_for_start(&mut self) -> Result<(), HandshakeError> {
        read_start(&mut self.control).await
    }

    /// Resolves once the server closes the handshake channel.
    pub async fn closed(&mut self) {
        let mut discard = Vec::new();
        loop {
            discard.clear();
            match self.control.read_until(b'\n', &mut discard).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
        }
    }
}

/// Runs a whole session, recording any failure in the shared state.
pub async fn run(
    config: ClientConfig,
    state: SharedGameState,
    intents: mpsc::UnboundedReceiver<Intent>,
    stop: watch::Receiver<bool>,
) {
    if let Err(e) = play(&config, &state, intents, stop).await {
        error!("Session failed: {}", e);
        lock(&state).failed(e.to_string());
    }
}

async fn play(
    config: &ClientConfig,
    state: &SharedGameState,
    intents: mpsc::UnboundedReceiver<Intent>,
    mut stop: watch::Receiver<bool>,
) -> Result<(), HandshakeError> {
    info!("Connecting to {}", config.handshake_addr());
    let handshake_addr = config.handshake_addr();
    let mut session = tokio::select! {
        opened = Session::open(&handshake_addr) => opened?,
        _ = stop.changed() => return Ok(()),
    };
    let player_id = session.player_id;
    let data_addr = session.data_addr;

    info!("Joined as player {}, game traffic to {}", player_id, data_addr);
    lock(state).welcomed(player_id);

    tokio::select! {
        started = session.wait_for_start() => started?,
        _ = stop.changed() => return Ok(()),
    }

    info!("Game started");
    lock(state).started();

    let socket = session.socket();
    tokio::select! {
        _ = run_send_loop(
            Arc::clone(&socket),
            data_addr,
            player_id,
            intents,
            config.latency,
            stop.clone(),
        ) => {}
        _ = run_recv_loop(socket, Arc::clone(state), config.latency, stop.clone()) => {}
        _ = session.closed() => return Err(HandshakeError::Closed),
    }

    info!("Session ended");
    Ok(())
}

/// Sends each intent as an `input` message after the simulated delay.
///
/// Ends when the intent channel closes or `stop` is raised.
pub async fn run_send_loop(
    socket: Arc<UdpSocket>,
    server: SocketAddr,
    player_id: u32,
    mut intents: mpsc::UnboundedReceiver<Intent>,
    latency: f64,
    mut stop: watch::Receiver<bool>,
) {
    let mut outbound = LatencyQueue::new(latency);
    let mut pump = interval(PUMP_INTERVAL);
    pump.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while !*stop.borrow() {
        tokio::select! {
            intent = intents.recv() => match intent {
                Some(intent) => match (Message::Input { player_id, intent }).encode() {
                    Ok(data) => outbound.push(data, current_time()),
                    Err(e) => error!("Failed to encode input: {}", e),
                },
                None => break,
            },
            _ = pump.tick() => {
                let due: Vec<Vec<u8>> = outbound.drain_due(current_time()).collect();
                for data in due {
                    if let Err(e) = socket.send_to(&data, server).await {
                        debug!("Failed to send input: {}", e);
                    }
                }
            },
            _ = stop.changed() => break,
        }
    }
}

/// Receives datagrams and, after the simulated delay, buffers every snapshot among them.
pub async fn run_recv_loop(
    socket: Arc<UdpSocket>,
    state: SharedGameState,
    latency: f64,
    mut stop: watch::Receiver<bool>,
) {
    let mut inbound: LatencyQueue<Vec<u8>> = LatencyQueue::new(latency);
    let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
    let mut pump = interval(PUMP_INTERVAL);
    pump.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while !*stop.borrow() {
        tokio::select! {
            received = socket.recv_from(&mut buffer) => match received {
                Ok((len, _)) => inbound.push(buffer[..len].to_vec(), current_time()),
                Err(e) => debug!("Error receiving datagram: {}", e),
            },
            _ = pump.tick() => {
                for data in inbound.drain_due(current_time()) {
                    match Message::decode(&data) {
                        Ok(Message::Snapshot(snapshot)) => lock(&state).receive_snapshot(snapshot),
                        Ok(other) => trace!("Ignoring {} message", other.kind()),
                        Err(e) => trace!("Discarding datagram: {}", e),
                    }
                }
            },
            _ = stop.changed() => break,
        }
    }
}
