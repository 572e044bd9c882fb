//! StatePort - Live Application State over WebSocket
//!
//! This is a demo host for the StatePort server. It plays the part of the
//! embedding application: it loads a world snapshot, starts the server,
//! advances the in-game clock in the background, and tears everything down
//! on Ctrl+C.

use anyhow::{bail, Context};
use stateport::commands::CommandRouter;
use stateport::server::{ServerConfig, WebSocketServer};
use stateport::world::{world_info_registry, WorldSnapshot, WorldState};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Real time per ten in-game minutes
const CLOCK_TICK: Duration = Duration::from_secs(7);

/// Host configuration
struct Config {
    server: ServerConfig,
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> anyhow::Result<Self> {
        let mut server = ServerConfig::default();
        let args: Vec<String> = std::env::args().skip(1).collect();

        let mut i = 0;
        while i < args.len() {
            let value = args.get(i + 1);
            match (args[i].as_str(), value) {
                ("--url" | "-u", Some(url)) => {
                    server = ServerConfig::from_url(url)?;
                    i += 2;
                }
                ("--host" | "-h", Some(host)) => {
                    server.host = host.clone();
                    i += 2;
                }
                ("--port" | "-p", Some(port)) => {
                    server.port = port
                        .parse()
                        .with_context(|| format!("invalid port number: {}", port))?;
                    i += 2;
                }
                ("--path", Some(path)) => {
                    server = server.with_path(path);
                    i += 2;
                }
                ("--help", _) => {
                    print_help();
                    std::process::exit(0);
                }
                ("--version" | "-v", _) => {
                    println!("StatePort version {}", stateport::VERSION);
                    std::process::exit(0);
                }
                ("--url" | "-u" | "--host" | "-h" | "--port" | "-p" | "--path", None) => {
                    bail!("{} requires a value", args[i]);
                }
                (other, _) => {
                    print_help();
                    bail!("unknown argument: {}", other);
                }
            }
        }

        Ok(Self { server })
    }
}

fn print_help() {
    println!(
        r#"
StatePort - Live Application State over WebSocket

USAGE:
    stateport [OPTIONS]

OPTIONS:
    -u, --url <URL>      Full address, e.g. ws://localhost:8080/
    -h, --host <HOST>    Host to bind to (default: localhost)
    -p, --port <PORT>    Port to listen on (default: 8080)
        --path <PATH>    Path prefix clients connect to (default: /)
    -v, --version        Print version information
        --help           Print this help message

ENVIRONMENT:
    RUST_LOG             Log filter (default: info)

CONNECTING:
    Use any WebSocket client, e.g. websocat:
    $ websocat ws://localhost:8080/
    ping
    pong
    info:time
    time:600
    info:level:farming
    level:farming:0
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args()?;

    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Shared state the host keeps current
    let world = Arc::new(WorldState::new());
    let router = CommandRouter::new(world_info_registry(Arc::clone(&world)));
    info!(
        handlers = router.info_registry().len(),
        "Info handlers registered"
    );

    let server = WebSocketServer::new(config.server, router);

    // Session loaded
    world.load(WorldSnapshot::default());
    let addr = server
        .start()
        .await
        .context("failed to start StatePort server")?;
    info!("Connect with ws://{}{}", addr, server.config().path);

    let clock = tokio::spawn(run_clock(Arc::clone(&world)));

    signal::ctrl_c()
        .await
        .context("failed to install Ctrl+C handler")?;
    info!("Shutdown signal received, stopping server...");

    // Session ended
    clock.abort();
    server.stop().await;
    world.unload();

    let stats = server.stats().snapshot();
    info!(
        connections = stats.connections_accepted,
        rejected = stats.handshakes_rejected,
        messages = stats.messages_processed,
        "Server shutdown complete"
    );

    server.dispose().await;
    Ok(())
}

/// Advances the in-game clock while the world is loaded.
async fn run_clock(world: Arc<WorldState>) {
    let mut ticker = tokio::time::interval(CLOCK_TICK);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if let Err(e) = world.update(|s| s.advance_clock(10)) {
            warn!(error = %e, "Clock stopped");
            return;
        }
    }
}
