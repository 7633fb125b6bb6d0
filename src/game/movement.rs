//! Movement Resolver
//!
//! Pure destination computation for a move request. Three steps: clamp
//! the target to the mover's per-turn range, find the first wall crossing
//! the travel path, and back off that crossing by the mover's collision
//! radius. The caller commits the returned position; nothing here mutates
//! the map.

use crate::core::segment::Segment;
use crate::core::vec2::Vec2;
use crate::game::world::{Map, Player};

/// Resolve where a move request actually ends up.
///
/// The result is never farther than `mover.move_range` from the mover's
/// current position, never on the far side of a wall, and keeps
/// `mover.collision_radius` clear of the wall it stopped at. A mover
/// boxed in closer than its own collision radius stays where it is; it
/// never backs up past its origin.
///
/// The blocking wall is the one whose crossing point lies nearest the
/// origin along the path, so with several walls across the path the
/// geometrically first one always wins.
pub fn resolve_destination(map: &Map, mover: &Player, target: Vec2) -> Vec2 {
    let origin = mover.position;

    // Step 1: clamp the request to the per-turn range.
    let offset = target - origin;
    let clamped = if offset.length_squared() > mover.move_range * mover.move_range {
        origin + offset.normalize().scale(mover.move_range)
    } else {
        target
    };

    // Step 2: nearest crossing point over all walls.
    let travel = Segment::new(origin, clamped);
    let nearest_hit = map
        .walls
        .iter()
        .filter_map(|wall| travel.intersection(wall.segment()))
        .min_by(|p, q| {
            origin
                .distance_squared(*p)
                .total_cmp(&origin.distance_squared(*q))
        });

    // Step 3: stop short of the crossing by the collision radius.
    match nearest_hit {
        Some(hit) => {
            let distance = origin.distance(hit) - mover.collision_radius;
            if distance <= 0.0 {
                origin
            } else {
                origin + (clamped - origin).normalize().scale(distance)
            }
        }
        None => clamped,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::visibility::sight_clear;
    use crate::game::world::{MapConfig, PlayerId, Wall, PLAYER_MOVE_RANGE};
    use proptest::prelude::*;

    fn wall(ax: f64, ay: f64, bx: f64, by: f64) -> Wall {
        Wall {
            a: Vec2::new(ax, ay),
            b: Vec2::new(bx, by),
        }
    }

    fn arena(walls: Vec<Wall>) -> Map {
        Map::from_config(MapConfig {
            radius: 10000.0,
            walls,
            items: Vec::new(),
            spawns: Vec::new(),
        })
    }

    fn mover_at_origin(map: &mut Map) -> Player {
        let id = map.add_player("ada", Vec2::ZERO);
        map.get_player(id).unwrap().clone()
    }

    #[test]
    fn test_in_range_no_walls() {
        let mut map = arena(Vec::new());
        let mover = mover_at_origin(&mut map);

        let dest = resolve_destination(&map, &mover, Vec2::new(1.0, 1.0));
        assert_eq!(dest, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_too_far_clamps_to_range() {
        let mut map = arena(Vec::new());
        let mover = mover_at_origin(&mut map);

        let target = Vec2::new(PLAYER_MOVE_RANGE * 100.0, 0.0);
        let dest = resolve_destination(&map, &mover, target);
        assert_eq!(dest, Vec2::new(PLAYER_MOVE_RANGE, 0.0));
    }

    #[test]
    fn test_wall_out_of_the_way() {
        let mut map = arena(vec![wall(100.0, -100.0, 100.0, 100.0)]);
        let mover = mover_at_origin(&mut map);

        let dest = resolve_destination(&map, &mover, Vec2::new(10.0, 0.0));
        assert_eq!(dest, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn test_wall_across_path_stops_short() {
        let mut map = arena(vec![wall(10.0, -20.0, 10.0, 20.0)]);
        let mover = mover_at_origin(&mut map);

        // Request past the wall; crossing at x=10 minus the collision radius
        let dest = resolve_destination(&map, &mover, Vec2::new(20.0, 0.0));
        assert_eq!(dest, Vec2::new(10.0 - mover.collision_radius, 0.0));
    }

    #[test]
    fn test_boxed_in_stays_at_origin() {
        let mut map = arena(vec![wall(10.0, -20.0, 10.0, 20.0)]);
        let id = map.add_player("ada", Vec2::new(9.5, 0.0));
        let mover = map.get_player(id).unwrap().clone();

        // The wall is nearer than the collision radius; no backwards moves
        let dest = resolve_destination(&map, &mover, Vec2::new(20.0, 0.0));
        assert_eq!(dest, Vec2::new(9.5, 0.0));
    }

    #[test]
    fn test_nearest_crossing_wins() {
        // The far wall's midpoint is nearer the origin than the near
        // wall's midpoint; only the crossing distance may decide.
        let near = wall(3.0, 50.0, 3.0, -1.0);
        let far = wall(8.0, -1.0, 8.0, 1.0);
        let mut map = arena(vec![far, near]);
        let mover = mover_at_origin(&mut map);

        let dest = resolve_destination(&map, &mover, Vec2::new(15.0, 0.0));
        assert_eq!(dest, Vec2::new(3.0 - mover.collision_radius, 0.0));
    }

    #[test]
    fn test_target_at_own_position() {
        let mut map = arena(vec![wall(10.0, -20.0, 10.0, 20.0)]);
        let mover = mover_at_origin(&mut map);

        let dest = resolve_destination(&map, &mover, Vec2::ZERO);
        assert_eq!(dest, Vec2::ZERO);
    }

    proptest! {
        #[test]
        fn prop_open_ground_hits_clamped_target(
            tx in -200.0f64..200.0,
            ty in -200.0f64..200.0,
        ) {
            let mut map = arena(Vec::new());
            let mover = mover_at_origin(&mut map);
            let target = Vec2::new(tx, ty);

            let dest = resolve_destination(&map, &mover, target);
            let requested = target.length();
            if requested <= mover.move_range {
                prop_assert_eq!(dest, target);
            } else {
                prop_assert!((dest.length() - mover.move_range).abs() < 1e-9);
                // Same direction as the request
                prop_assert!(dest.cross(target).abs() < 1e-6);
                prop_assert!(dest.dot(target) > 0.0);
            }
        }

        #[test]
        fn prop_never_exceeds_range_and_never_crosses(
            tx in -200.0f64..200.0,
            ty in -200.0f64..200.0,
        ) {
            let walls = vec![
                wall(5.0, -30.0, 5.0, 30.0),
                wall(-40.0, 10.0, 40.0, 10.0),
                wall(-8.0, -2.0, -2.0, -8.0),
            ];
            let mut map = arena(walls);
            let mover = mover_at_origin(&mut map);

            let dest = resolve_destination(&map, &mover, Vec2::new(tx, ty));
            prop_assert!(dest.distance(mover.position) <= mover.move_range + 1e-9);
            // Stopping short of the first crossing leaves the whole
            // travelled path unobstructed
            prop_assert!(sight_clear(&map.walls, mover.position, dest));
        }
    }
}
