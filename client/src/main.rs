use clap::Parser;
use client::config::ClientConfig;
use client::game::{lock, ClientGameState};
use client::input::InputManager;
use client::network;
use client::rendering::Renderer;
use log::{error, info};
use macroquad::prelude::*;
use macroquad::window::Conf;
use shared::{current_time, CLIENT_LATENCY, HANDSHAKE_PORT, RENDER_DELAY, SNAPSHOT_BUFFER_LEN};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1")]
    server: String,

    /// Server handshake port
    #[arg(short = 'p', long, default_value_t = HANDSHAKE_PORT)]
    port: u16,

    /// Simulated one-way latency in milliseconds
    #[arg(short = 'l', long, default_value_t = (CLIENT_LATENCY * 1000.0) as u64)]
    latency_ms: u64,

    /// How far in the past to render, in milliseconds
    #[arg(short = 'r', long, default_value_t = (RENDER_DELAY * 1000.0) as u64)]
    render_delay_ms: u64,

    /// Window width
    #[arg(short = 'w', long, default_value = "800")]
    width: u32,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "600")]
    height: u32,
}

impl Args {
    fn config(&self) -> ClientConfig {
        ClientConfig {
            host: self.server.clone(),
            handshake_port: self.port,
            latency: self.latency_ms as f64 / 1000.0,
            render_delay: self.render_delay_ms as f64 / 1000.0,
            buffer_len: SNAPSHOT_BUFFER_LEN,
            width: self.width,
            height: self.height,
        }
    }
}

fn window_conf() -> Conf {
    let config = Args::parse().config();
    Conf {
        window_title: "Coin Collector".to_owned(),
        window_width: config.width as i32,
        window_height: config.height as i32,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = Args::parse().config();
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return;
    }

    info!("Controls: WASD or arrow keys to move, Escape to quit");

    let state = ClientGameState::shared(config.buffer_len);
    let (intent_tx, intent_rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = watch::channel(false);

    let network_thread = {
        let config = config.clone();
        let state = Arc::clone(&state);
        std::thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("Failed to start network runtime: {}", e);
                    lock(&state).failed(e.to_string());
                    return;
                }
            };
            runtime.block_on(network::run(config, state, intent_rx, stop_rx));
        })
    };

    let renderer = Renderer::new(config.width, config.height);
    let mut input = InputManager::new();

    loop {
        if is_key_pressed(KeyCode::Escape) {
            break;
        }

        let (playing, own_id, status, world) = {
            let state = lock(&state);
            (
                state.is_playing(),
                state.player_id,
                state.status_text(),
                state.render_state(current_time(), config.render_delay),
            )
        };

        if playing {
            if let Some(intent) = input.update() {
                // The network thread may already have ended; the frame still renders.
                let _ = intent_tx.send(intent);
            }
        }

        renderer.render(world.as_ref(), own_id, status.as_deref());
        next_frame().await;
    }

    info!("Shutting down");
    stop_tx.send_replace(true);
    drop(intent_tx);
    if network_thread.join().is_err() {
        error!("Network thread panicked");
    }
}
