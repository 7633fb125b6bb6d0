//! Skirmish Server
//!
//! Process wiring: logging, map selection, one match served over
//! WebSocket. The map file is an optional first argument; without it
//! the built-in demo arena is used. `SKIRMISH_ADDR` overrides the bind
//! address, `SKIRMISH_PLAYERS` the lobby size.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use skirmish::game::world::{Map, MapConfig};
use skirmish::network::runner::Runner;
use skirmish::network::server::{GameServer, ServerConfig};
use skirmish::network::session::{MatchSession, SessionConfig};
use skirmish::VERSION;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Skirmish Server v{}", VERSION);

    let map_config = match std::env::args().nth(1) {
        Some(path) => MapConfig::from_path(&path)
            .with_context(|| format!("loading map file {path:?}"))?,
        None => {
            info!("no map file given, using the built-in demo arena");
            MapConfig::demo()
        }
    };

    let mut server_config = ServerConfig::default();
    if let Ok(addr) = std::env::var("SKIRMISH_ADDR") {
        server_config.bind_addr = addr.parse().context("parsing SKIRMISH_ADDR")?;
    }

    let mut session_config = SessionConfig::default();
    if let Ok(players) = std::env::var("SKIRMISH_PLAYERS") {
        session_config.expected_players = players.parse().context("parsing SKIRMISH_PLAYERS")?;
    }

    info!(
        walls = map_config.walls.len(),
        items = map_config.items.len(),
        radius = map_config.radius,
        expected_players = session_config.expected_players,
        "waiting for players"
    );

    let session = MatchSession::new(Map::from_config(map_config), session_config, Runner::new());
    let server = GameServer::new(session, server_config);
    server.run().await.context("running server")?;

    info!("goodbye");
    Ok(())
}
