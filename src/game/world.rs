//! World Model
//!
//! All persistent world state for a match: weapons, items, walls, players
//! and the map that owns them. Uses BTreeMap for deterministic iteration
//! order. The resolvers read this state; only command application and the
//! zone mutate it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::segment::Segment;
use crate::core::vec2::Vec2;

/// Maximum (and starting) player health.
pub const MAX_HEALTH: u32 = 100;

/// How close a player body may get to a wall, in world units.
pub const PLAYER_COLLISION_RADIUS: f64 = 1.0;

/// Maximum travel distance per turn, in world units.
pub const PLAYER_MOVE_RANGE: f64 = 15.0;

/// How close a player must stand to an item to pick it up.
pub const PICKUP_RADIUS: f64 = 2.0;

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier, assigned sequentially at join.
///
/// Implements Ord for deterministic BTreeMap ordering; serializes as a
/// bare number on the wire.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

// =============================================================================
// WEAPONS
// =============================================================================

/// Weapon kinds a player can carry.
///
/// `None` is the bare-handed state, not an absent value; every player
/// always has exactly one of these equipped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Weapon {
    /// Unarmed
    #[default]
    None = 0,
    /// Short reach, heavy hit
    Knife = 1,
    /// Mid range, light hit
    Pistol = 2,
    /// Long range
    Tommy = 3,
}

/// Fixed per-weapon combat numbers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeaponStats {
    /// Maximum shot distance in world units
    pub range: f64,
    /// Health subtracted on a hit
    pub damage: u32,
}

impl Weapon {
    /// Get the stats table entry for this weapon.
    #[inline]
    pub const fn stats(self) -> WeaponStats {
        match self {
            Weapon::None => WeaponStats { range: 0.0, damage: 0 },
            Weapon::Knife => WeaponStats { range: 10.0, damage: 34 },
            Weapon::Pistol => WeaponStats { range: 25.0, damage: 5 },
            Weapon::Tommy => WeaponStats { range: 50.0, damage: 8 },
        }
    }
}

// =============================================================================
// ITEMS
// =============================================================================

/// A weapon pickup lying on the ground.
///
/// Items exist only while unclaimed; picking one up removes it from the
/// map, dropping a weapon creates one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Where the item lies
    pub position: Vec2,
    /// The weapon it grants
    pub weapon: Weapon,
}

// =============================================================================
// WALLS
// =============================================================================

/// Static wall segment. Blocks sight and movement; fixed for the whole
/// match.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    /// First endpoint
    pub a: Vec2,
    /// Second endpoint
    pub b: Vec2,
}

impl Wall {
    /// The wall as a plain segment for intersection queries.
    #[inline]
    pub fn segment(&self) -> Segment {
        Segment::new(self.a, self.b)
    }
}

// =============================================================================
// PLAYER
// =============================================================================

/// State of a single player in the match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    /// Unique player ID
    pub id: PlayerId,

    /// Display name (also the transport routing key)
    pub name: String,

    /// Current position in the arena
    pub position: Vec2,

    /// Current health; 0 means eliminated. Unsigned, so health can never
    /// go negative anywhere in the system.
    pub health: u32,

    /// Currently equipped weapon
    pub weapon: Weapon,

    /// Body radius kept clear of walls when moving
    pub collision_radius: f64,

    /// Maximum travel distance per turn
    pub move_range: f64,
}

impl Player {
    /// Create a new player at a spawn position, unarmed and at full health.
    pub fn new(id: PlayerId, name: impl Into<String>, position: Vec2) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            health: MAX_HEALTH,
            weapon: Weapon::None,
            collision_radius: PLAYER_COLLISION_RADIUS,
            move_range: PLAYER_MOVE_RANGE,
        }
    }

    /// Whether the player is still in the fight.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Subtract damage, saturating at zero.
    pub fn apply_damage(&mut self, damage: u32) {
        self.health = self.health.saturating_sub(damage);
    }
}

// =============================================================================
// MAP
// =============================================================================

/// Complete world state: the single source of truth for a match.
///
/// Walls are fixed at construction. `radius` starts at the configured
/// value and only shrinks (the zone). Players iterate in id order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Map {
    /// Current zone radius; the playable area is the disc around origin
    pub radius: f64,

    /// Static sight and movement blockers
    pub walls: Vec<Wall>,

    /// Unclaimed weapon pickups
    pub items: Vec<Item>,

    /// All players (BTreeMap for deterministic iteration)
    pub players: BTreeMap<PlayerId, Player>,

    /// Preferred spawn positions from the map file
    spawns: Vec<Vec2>,

    /// Next id handed out by `add_player`
    next_player_id: u32,
}

impl Map {
    /// Build a map from a loaded configuration.
    pub fn from_config(config: MapConfig) -> Self {
        Self {
            radius: config.radius,
            walls: config.walls,
            items: config.items,
            players: BTreeMap::new(),
            spawns: config.spawns,
            next_player_id: 0,
        }
    }

    /// Add a player at a spawn position, returning the assigned id.
    pub fn add_player(&mut self, name: impl Into<String>, position: Vec2) -> PlayerId {
        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;
        self.players.insert(id, Player::new(id, name, position));
        id
    }

    /// Get a player by ID.
    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Get a player mutably by ID.
    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Players still in the fight, in id order.
    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| p.is_alive())
    }

    /// Count of players still in the fight.
    pub fn alive_count(&self) -> usize {
        self.alive_players().count()
    }

    /// Spawn position for the `index`-th of `total` joining players.
    ///
    /// Configured spawn points are used first; past those, players land
    /// evenly spaced on a circle at half the starting radius.
    pub fn spawn_position(&self, index: usize, total: usize) -> Vec2 {
        if let Some(spawn) = self.spawns.get(index) {
            return *spawn;
        }
        let slots = total.max(1) as f64;
        let angle = std::f64::consts::TAU * (index as f64) / slots;
        let r = self.radius * 0.5;
        Vec2::new(r * angle.cos(), r * angle.sin())
    }
}

// =============================================================================
// MAP CONFIG
// =============================================================================

/// Serde-loadable map description.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MapConfig {
    /// Starting zone radius
    pub radius: f64,

    /// Wall layout
    #[serde(default)]
    pub walls: Vec<Wall>,

    /// Initial weapon pickups
    #[serde(default)]
    pub items: Vec<Item>,

    /// Preferred spawn positions, in join order
    #[serde(default)]
    pub spawns: Vec<Vec2>,
}

/// Failure to load a map file.
#[derive(Debug, Error)]
pub enum MapError {
    /// Could not read the file
    #[error("failed to read map file: {0}")]
    Io(#[from] std::io::Error),

    /// File contents are not a valid map
    #[error("failed to parse map file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl MapConfig {
    /// Load a map configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Built-in demo arena used when no map file is given.
    pub fn demo() -> Self {
        let wall = |ax, ay, bx, by| Wall {
            a: Vec2::new(ax, ay),
            b: Vec2::new(bx, by),
        };
        let item = |x, y, weapon| Item {
            position: Vec2::new(x, y),
            weapon,
        };
        Self {
            radius: 120.0,
            walls: vec![
                // Central cross
                wall(-20.0, 0.0, 20.0, 0.0),
                wall(0.0, -20.0, 0.0, 20.0),
                // Outer cover, one piece per quadrant
                wall(40.0, 30.0, 60.0, 50.0),
                wall(-40.0, 30.0, -60.0, 50.0),
                wall(-40.0, -30.0, -60.0, -50.0),
                wall(40.0, -30.0, 60.0, -50.0),
            ],
            items: vec![
                item(30.0, 0.0, Weapon::Knife),
                item(-30.0, 0.0, Weapon::Knife),
                item(0.0, 45.0, Weapon::Pistol),
                item(0.0, -45.0, Weapon::Pistol),
                item(75.0, 75.0, Weapon::Tommy),
                item(-75.0, -75.0, Weapon::Tommy),
            ],
            spawns: vec![
                Vec2::new(50.0, 0.0),
                Vec2::new(-50.0, 0.0),
                Vec2::new(0.0, 50.0),
                Vec2::new(0.0, -50.0),
            ],
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weapon_stats_table() {
        assert_eq!(Weapon::None.stats(), WeaponStats { range: 0.0, damage: 0 });
        assert_eq!(Weapon::Knife.stats(), WeaponStats { range: 10.0, damage: 34 });
        assert_eq!(Weapon::Pistol.stats(), WeaponStats { range: 25.0, damage: 5 });
        assert_eq!(Weapon::Tommy.stats(), WeaponStats { range: 50.0, damage: 8 });
    }

    #[test]
    fn test_weapon_wire_names() {
        assert_eq!(serde_json::to_string(&Weapon::Tommy).unwrap(), "\"tommy\"");
        assert_eq!(
            serde_json::from_str::<Weapon>("\"none\"").unwrap(),
            Weapon::None
        );
    }

    #[test]
    fn test_damage_saturates_at_zero() {
        let mut player = Player::new(PlayerId(0), "ada", Vec2::ZERO);
        assert!(player.is_alive());

        player.apply_damage(34);
        assert_eq!(player.health, 66);

        player.apply_damage(1000);
        assert_eq!(player.health, 0);
        assert!(!player.is_alive());

        // Further damage stays at zero
        player.apply_damage(5);
        assert_eq!(player.health, 0);
    }

    #[test]
    fn test_player_ids_are_sequential() {
        let mut map = Map::from_config(MapConfig::demo());
        let a = map.add_player("ada", Vec2::ZERO);
        let b = map.add_player("bob", Vec2::ZERO);
        assert_eq!(a, PlayerId(0));
        assert_eq!(b, PlayerId(1));

        // BTreeMap iterates in id order
        let ids: Vec<_> = map.players.keys().copied().collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn test_alive_count() {
        let mut map = Map::from_config(MapConfig::demo());
        let a = map.add_player("ada", Vec2::ZERO);
        let _ = map.add_player("bob", Vec2::ZERO);
        assert_eq!(map.alive_count(), 2);

        map.get_player_mut(a).unwrap().health = 0;
        assert_eq!(map.alive_count(), 1);
    }

    #[test]
    fn test_spawn_positions() {
        let map = Map::from_config(MapConfig::demo());

        // Configured spawns come first
        assert_eq!(map.spawn_position(0, 6), Vec2::new(50.0, 0.0));
        assert_eq!(map.spawn_position(3, 6), Vec2::new(0.0, -50.0));

        // Past the configured list, players land on the half-radius circle
        let extra = map.spawn_position(4, 6);
        assert!((extra.length() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_map_config_parses() {
        let raw = r#"{
            "radius": 10000.0,
            "walls": [{"a": {"x": 10.0, "y": -20.0}, "b": {"x": 10.0, "y": 20.0}}],
            "items": [{"position": {"x": 5.0, "y": 5.0}, "weapon": "pistol"}],
            "spawns": [{"x": 0.0, "y": 0.0}]
        }"#;
        let config: MapConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.radius, 10000.0);
        assert_eq!(config.walls.len(), 1);
        assert_eq!(config.items[0].weapon, Weapon::Pistol);
        assert_eq!(config.spawns.len(), 1);
    }

    #[test]
    fn test_map_config_defaults_optional_sections() {
        let config: MapConfig = serde_json::from_str(r#"{"radius": 50.0}"#).unwrap();
        assert!(config.walls.is_empty());
        assert!(config.items.is_empty());
        assert!(config.spawns.is_empty());
    }
}
