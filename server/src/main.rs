use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use shared::{BROADCAST_RATE, DATA_PORT, HANDSHAKE_PORT, MAX_PLAYERS, SERVER_LATENCY, TICK_RATE};
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind both sockets to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port for the reliable handshake channel
    #[arg(short = 'p', long, default_value_t = HANDSHAKE_PORT)]
    handshake_port: u16,

    /// Port for unreliable game traffic
    #[arg(short = 'u', long, default_value_t = DATA_PORT)]
    data_port: u16,

    /// Simulation ticks per second
    #[arg(short, long, default_value_t = TICK_RATE)]
    tick_rate: u32,

    /// Snapshots per second, must be lower than the tick rate
    #[arg(short, long, default_value_t = BROADCAST_RATE)]
    broadcast_rate: u32,

    /// Simulated one-way latency in milliseconds
    #[arg(short, long, default_value_t = (SERVER_LATENCY * 1000.0) as u64)]
    latency_ms: u64,

    /// Players required to start the game
    #[arg(short, long, default_value_t = MAX_PLAYERS)]
    max_players: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ServerConfig {
        host: args.host,
        handshake_port: args.handshake_port,
        data_port: args.data_port,
        tick_rate: args.tick_rate,
        broadcast_rate: args.broadcast_rate,
        latency: args.latency_ms as f64 / 1000.0,
        max_players: args.max_players,
        ..ServerConfig::default()
    };

    info!(
        "Starting server: {}Hz tick, {}Hz broadcast, {}ms latency, {} players",
        config.tick_rate, config.broadcast_rate, args.latency_ms, config.max_players
    );

    let server = Server::bind(config).await?;
    let (stop_tx, stop_rx) = watch::channel(false);
    let running = tokio::spawn(server.run(stop_rx));

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down");
    stop_tx.send_replace(true);

    running.await??;
    Ok(())
}
