//! Game Logic Module
//!
//! The world model and everything computed over it. The resolvers are
//! pure; `command` is the only writer, `turn` drives a match.
//!
//! ## Module Structure
//!
//! - `world`: weapons, items, walls, players, the map
//! - `visibility`: line-of-sight queries and visible sets
//! - `movement`: destination resolution against range and walls
//! - `command`: turn command application
//! - `snapshot`: per-player views and observer frames
//! - `turn`: the per-turn orchestrator

pub mod command;
pub mod movement;
pub mod snapshot;
pub mod turn;
pub mod visibility;
pub mod world;

// Re-export key types
pub use command::{apply_command, CommandError, CommandOutcome, TurnCommand};
pub use movement::resolve_destination;
pub use snapshot::{ObserverFrame, TurnSnapshot};
pub use turn::{Game, Transport, TurnConfig, TurnReport};
pub use visibility::{sight_clear, visible_items, visible_players};
pub use world::{Item, Map, MapConfig, Player, PlayerId, Wall, Weapon};
