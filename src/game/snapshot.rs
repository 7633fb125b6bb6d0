//! Turn Snapshots
//!
//! Serializable views of the world. `TurnSnapshot` is what a player
//! receives each turn: its own full record plus only what it can see.
//! `ObserverFrame` is the unfiltered feed for spectators. Record
//! positions are flattened to top-level `x`/`y` keys, the wire shape
//! clients parse.

use serde::{Deserialize, Serialize};

use crate::core::vec2::Vec2;
use crate::game::visibility::{visible_items, visible_players};
use crate::game::world::{Item, Map, Player, PlayerId, Weapon};

/// Full record of one player. Sent to the player about itself, and to
/// observers about everyone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Position, flattened to `x`/`y`
    #[serde(flatten)]
    pub position: Vec2,
    /// Player id
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Current health
    pub health: u32,
    /// Equipped weapon
    pub weapon: Weapon,
}

impl PlayerSnapshot {
    fn of(player: &Player) -> Self {
        Self {
            position: player.position,
            id: player.id,
            name: player.name.clone(),
            health: player.health,
            weapon: player.weapon,
        }
    }
}

/// What a player learns about another player it can see: position, id
/// and weapon. Never health, never the name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisiblePlayer {
    /// Position, flattened to `x`/`y`
    #[serde(flatten)]
    pub position: Vec2,
    /// Player id (stable across turns, usable as a shot target)
    pub id: PlayerId,
    /// Equipped weapon
    pub weapon: Weapon,
}

impl VisiblePlayer {
    fn of(player: &Player) -> Self {
        Self {
            position: player.position,
            id: player.id,
            weapon: player.weapon,
        }
    }
}

/// A weapon pickup in sight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisibleItem {
    /// Position, flattened to `x`/`y`
    #[serde(flatten)]
    pub position: Vec2,
    /// The weapon it grants
    pub weapon: Weapon,
}

impl VisibleItem {
    fn of(item: &Item) -> Self {
        Self {
            position: item.position,
            weapon: item.weapon,
        }
    }
}

/// Per-player view of one turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnSnapshot {
    /// Current zone radius (shrinks over the match)
    pub radius: f64,
    /// The acting player's own full record
    pub player: PlayerSnapshot,
    /// Items in line of sight, map order
    pub visible_items: Vec<VisibleItem>,
    /// Other players in line of sight, id order
    pub visible_players: Vec<VisiblePlayer>,
}

impl TurnSnapshot {
    /// Build the view for one observer. Read-only over the map.
    pub fn capture(map: &Map, observer: &Player) -> Self {
        Self {
            radius: map.radius,
            player: PlayerSnapshot::of(observer),
            visible_items: visible_items(map, observer)
                .into_iter()
                .map(VisibleItem::of)
                .collect(),
            visible_players: visible_players(map, observer)
                .into_iter()
                .map(VisiblePlayer::of)
                .collect(),
        }
    }

    /// Serialize to the wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Unfiltered world view for spectators: every item and every player,
/// health and names included.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObserverFrame {
    /// Turn this frame describes
    pub turn: u32,
    /// Current zone radius
    pub radius: f64,
    /// All unclaimed items
    pub items: Vec<VisibleItem>,
    /// All players, id order
    pub players: Vec<PlayerSnapshot>,
}

impl ObserverFrame {
    /// Build the spectator view of the whole map.
    pub fn capture(map: &Map, turn: u32) -> Self {
        Self {
            turn,
            radius: map.radius,
            items: map.items.iter().map(VisibleItem::of).collect(),
            players: map.players.values().map(PlayerSnapshot::of).collect(),
        }
    }

    /// Serialize to the wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// TESTS
// =============================================================================
