//! Server network layer: sockets and the long-running loops around the world state

use crate::config::ServerConfig;
use crate::lobby::Lobby;
use crate::state::ServerState;
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{current_time, MAX_DATAGRAM_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};

/// How often the latency queues are checked for due entries.
const PUMP_INTERVAL: Duration = Duration::from_millis(1);

/// Authoritative server coordinating handshake, simulation and broadcast
pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
    socket: Arc<UdpSocket>,
    state: Arc<Mutex<ServerState>>,
}

impl Server {
    /// Binds the handshake listener and the game traffic socket.
    pub async fn bind(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;

        let listener = TcpListener::bind(config.handshake_addr()).await?;
        let socket = Arc::new(UdpSocket::bind(config.data_addr()).await?);
        info!(
            "Server listening: handshake on {}, game traffic on {}",
            listener.local_addr()?,
            socket.local_addr()?
        );

        let state = Arc::new(Mutex::new(ServerState::new(config.rules, config.latency)));

        Ok(Server {
            config,
            listener,
            socket,
            state,
        })
    }

    pub fn handshake_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn data_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn state(&self) -> Arc<Mutex<ServerState>> {
        Arc::clone(&self.state)
    }

    /// Runs every server loop until `stop` is raised.
    ///
    /// Queued but undelivered messages are dropped on stop.
    pub async fn run(self, stop: watch::Receiver<bool>) -> std::io::Result<()> {
        let data_port = self.socket.local_addr()?.port();
        let lobby = Arc::new(Lobby::new(
            Arc::clone(&self.state),
            self.config.max_players,
            data_port,
        ));

        let handles = vec![
            tokio::spawn(lobby.run_accept_loop(self.listener, stop.clone())),
            tokio::spawn(run_network_pump(
                Arc::clone(&self.socket),
                Arc::clone(&self.state),
                stop.clone(),
            )),
            tokio::spawn(run_tick_loop(
                Arc::clone(&self.state),
                self.config.tick_interval(),
                stop.clone(),
            )),
            tokio::spawn(run_broadcast_loop(
                Arc::clone(&self.state),
                self.config.broadcast_interval(),
                stop,
            )),
        ];

        info!("Server started successfully");

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Server task panicked: {}", e);
            }
        }

        let mut state = self.state.lock().await;
        let dropped = state.inbound.len() + state.outbound.len();
        state.inbound.clear();
        state.outbound.clear();
        info!("Server stopped, {} in-flight messages dropped", dropped);
        Ok(())
    }
}

/// Receives datagrams into the inbound queue, then on every pump applies due
/// inputs and sends due snapshots.
async fn run_network_pump(
    socket: Arc<UdpSocket>,
    state: Arc<Mutex<ServerState>>,
    mut stop: watch::Receiver<bool>,
) {
    let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
    let mut pump = interval(PUMP_INTERVAL);
    pump.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while !*stop.borrow() {
        tokio::select! {
            received = socket.recv_from(&mut buffer) => match received {
                Ok((len, from)) => {
                    let mut state = state.lock().await;
                    state.receive(buffer[..len].to_vec(), from, current_time());
                }
                Err(e) => {
                    // ICMP errors from departed clients surface here on some platforms.
                    debug!("Error receiving datagram: {}", e);
                }
            },
            _ = pump.tick() => {
                let now = current_time();
                let deliveries = {
                    let mut state = state.lock().await;
                    state.ingest_due(now);
                    state.take_due_deliveries(now)
                };

                for delivery in deliveries {
                    if let Err(e) = socket.send_to(&delivery.data, delivery.to).await {
                        debug!("Failed to send snapshot to {}: {}", delivery.to, e);
                    }
                }
            },
            _ = stop.changed() => break,
        }
    }
}

/// Advances the simulation at a fixed cadence using measured elapsed time.
async fn run_tick_loop(
    state: Arc<Mutex<ServerState>>,
    tick_interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut rng = StdRng::from_entropy();

    // The first tick fires immediately
    ticker.tick().await;
    let mut last_tick = Instant::now();

    while !*stop.borrow() {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop.changed() => break,
        }

        let now = Instant::now();
        let dt = now.duration_since(last_tick).as_secs_f32();
        last_tick = now;

        let mut state = state.lock().await;
        state.game.tick(dt, &mut rng);

        if state.game.tick % 600 == 0 {
            debug!(
                "Tick {}: {} players, {} coins, {:.1}Hz",
                state.game.tick,
                state.game.player_count(),
                state.game.coins.len(),
                1.0 / dt.max(f32::EPSILON)
            );
        }
    }
}

/// Captures and queues a snapshot every `broadcast_interval`.
///
/// Sleeps only the residual of the interval; an overrun starts the next
/// cycle immediately and is not made up later.
async fn run_broadcast_loop(
    state: Arc<Mutex<ServerState>>,
    broadcast_interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    while !*stop.borrow() {
        let started = Instant::now();

        {
            let mut state = state.lock().await;
            if let Err(e) = state.broadcast_snapshot(current_time()) {
                error!("Failed to encode snapshot: {}", e);
            }
        }

        let elapsed = started.elapsed();
        if let Some(residual) = broadcast_interval.checked_sub(elapsed) {
            tokio::select! {
                _ = sleep(residual) => {}
                _ = stop.changed() => break,
            }
        }
    }
}
