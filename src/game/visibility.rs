//! Visibility Resolver
//!
//! Pure line-of-sight queries against the wall set. A point is visible
//! from an observer when no wall segment crosses the straight line
//! between them. Nothing here mutates the map, and the answer does not
//! depend on wall order.

use crate::core::segment::Segment;
use crate::core::vec2::Vec2;
use crate::game::world::{Item, Map, Player, Wall};

/// True iff no wall blocks the straight line from `from` to `to`.
///
/// A zero-length sight line (observer looking at its own position) is
/// trivially clear.
pub fn sight_clear(walls: &[Wall], from: Vec2, to: Vec2) -> bool {
    let sight = Segment::new(from, to);
    walls.iter().all(|wall| !sight.intersects(wall.segment()))
}

/// Items the observer has line of sight to, in map storage order.
pub fn visible_items<'a>(map: &'a Map, observer: &Player) -> Vec<&'a Item> {
    map.items
        .iter()
        .filter(|item| sight_clear(&map.walls, observer.position, item.position))
        .collect()
}

/// Other players the observer has line of sight to, in id order.
///
/// The observer itself is excluded. Eliminated players are not: the wall
/// set decides visibility and nothing else, and the per-player snapshot
/// never reveals the health of what it lists.
pub fn visible_players<'a>(map: &'a Map, observer: &Player) -> Vec<&'a Player> {
    map.players
        .values()
        .filter(|other| other.id != observer.id)
        .filter(|other| sight_clear(&map.walls, observer.position, other.position))
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
