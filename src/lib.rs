//! # Skirmish Server
//!
//! Authoritative turn server for Skirmish, a top-down arena game where
//! remote bots fight over weapon pickups in a shrinking, wall-broken
//! arena. The server owns the world; clients only ever see what their
//! player can see.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       SKIRMISH SERVER                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  core/             - Geometry primitives                     │
//! │  ├── vec2.rs       - 2D float vector                         │
//! │  └── segment.rs    - Segment-segment intersection            │
//! │                                                              │
//! │  game/             - World state and the per-turn engine     │
//! │  ├── world.rs      - Weapons, items, walls, players, map     │
//! │  ├── visibility.rs - Line-of-sight queries                   │
//! │  ├── movement.rs   - Destination resolution                  │
//! │  ├── command.rs    - Turn command application                │
//! │  ├── snapshot.rs   - Per-player views, observer frames       │
//! │  └── turn.rs       - Turn orchestration and match end        │
//! │                                                              │
//! │  network/          - Transport (WebSocket, JSON)             │
//! │  ├── protocol.rs   - Wire messages                           │
//! │  ├── runner.rs     - Named-player delivery and fan-out       │
//! │  ├── session.rs    - Lobby -> playing -> ended loop          │
//! │  └── server.rs     - Listener and per-connection tasks       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Turn Model
//!
//! All world mutation for a turn (pending commands, then the zone)
//! completes before the first snapshot of that turn is built. Snapshot
//! construction is a pure read over the map; delivery goes through
//! per-client channels drained by independent pump tasks, so one slow
//! client never stalls the match. The resolvers in `game/` are plain
//! synchronous functions over `&Map` and never mutate anything; the
//! command layer is the only writer.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::core::segment::Segment;
pub use crate::core::vec2::Vec2;
pub use crate::game::command::TurnCommand;
pub use crate::game::snapshot::{ObserverFrame, TurnSnapshot};
pub use crate::game::turn::{Game, Transport, TurnConfig};
pub use crate::game::world::{Item, Map, MapConfig, Player, PlayerId, Wall, Weapon};
pub use crate::network::runner::Runner;
pub use crate::network::server::{GameServer, ServerConfig};
pub use crate::network::session::{MatchSession, SessionConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
