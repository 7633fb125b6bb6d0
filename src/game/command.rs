//! Turn Commands
//!
//! Parsed player intents and their application to the map. This module is
//! the only place world state changes during a match. Commands from dead
//! players and commands naming unknown ids are errors; a shot that merely
//! fails to connect is an outcome, not an error.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::vec2::Vec2;
use crate::game::movement::resolve_destination;
use crate::game::visibility::sight_clear;
use crate::game::world::{Item, Map, PlayerId, Weapon, PICKUP_RADIUS};

// =============================================================================
// COMMAND TYPES
// =============================================================================

/// One player intent for one turn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TurnCommand {
    /// Move toward a point (resolved against range and walls)
    Move {
        /// Requested destination x
        x: f64,
        /// Requested destination y
        y: f64,
    },
    /// Fire the equipped weapon at a player
    Shoot {
        /// Target player id (from `visible_players`)
        target: PlayerId,
    },
    /// Take the nearest item within reach
    Pickup,
    /// Leave the equipped weapon on the ground
    Drop,
    /// Do nothing this turn
    Pass,
}

/// What a successfully applied command did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CommandOutcome {
    /// Position committed by the movement resolver
    Moved {
        /// Where the player ended up
        to: Vec2,
    },
    /// Shot connected
    Hit {
        /// Who was hit
        target: PlayerId,
        /// Health subtracted
        damage: u32,
    },
    /// Shot connected and the target went down
    Eliminated {
        /// Who went down
        target: PlayerId,
    },
    /// Shot fired but did not connect (range, walls, or a dead target)
    Missed {
        /// Who was aimed at
        target: PlayerId,
    },
    /// Item taken
    PickedUp {
        /// Weapon now equipped
        weapon: Weapon,
    },
    /// Weapon left on the ground
    Dropped {
        /// Weapon left behind
        weapon: Weapon,
    },
    /// Nothing happened
    Passed,
}

/// Rejected command.
#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    /// Actor id not present in the map
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    /// Shot target id not present in the map
    #[error("unknown shot target {0}")]
    UnknownTarget(PlayerId),

    /// Dead players take no turns
    #[error("{0} is eliminated")]
    Eliminated(PlayerId),

    /// Shooting requires a weapon
    #[error("{0} has no weapon to fire")]
    Unarmed(PlayerId),

    /// No item within pickup reach
    #[error("no item within reach of {0}")]
    NothingToPickUp(PlayerId),

    /// Dropping bare hands
    #[error("{0} has no weapon to drop")]
    NothingToDrop(PlayerId),
}

// =============================================================================
// APPLICATION
// =============================================================================

/// Apply one command for one player, mutating the map.
pub fn apply_command(
    map: &mut Map,
    actor: PlayerId,
    command: TurnCommand,
) -> Result<CommandOutcome, CommandError> {
    let actor_state = map
        .get_player(actor)
        .cloned()
        .ok_or(CommandError::UnknownPlayer(actor))?;
    if !actor_state.is_alive() {
        return Err(CommandError::Eliminated(actor));
    }

    match command {
        TurnCommand::Move { x, y } => {
            let dest = resolve_destination(map, &actor_state, Vec2::new(x, y));
            if let Some(player) = map.get_player_mut(actor) {
                player.position = dest;
            }
            debug!(%actor, %dest, "moved");
            Ok(CommandOutcome::Moved { to: dest })
        }

        TurnCommand::Shoot { target } => apply_shot(map, actor, target),

        TurnCommand::Pickup => {
            let reach = PICKUP_RADIUS * PICKUP_RADIUS;
            let nearest = map
                .items
                .iter()
                .enumerate()
                .map(|(i, item)| (i, actor_state.position.distance_squared(item.position)))
                .filter(|(_, d2)| *d2 <= reach)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i);
            let Some(index) = nearest else {
                return Err(CommandError::NothingToPickUp(actor));
            };

            let taken = map.items.remove(index);
            if let Some(player) = map.get_player_mut(actor) {
                player.weapon = taken.weapon;
            }
            // A swap leaves the old weapon behind as a new item
            if actor_state.weapon != Weapon::None {
                map.items.push(Item {
                    position: actor_state.position,
                    weapon: actor_state.weapon,
                });
            }
            debug!(%actor, weapon = ?taken.weapon, "picked up");
            Ok(CommandOutcome::PickedUp { weapon: taken.weapon })
        }

        TurnCommand::Drop => {
            if actor_state.weapon == Weapon::None {
                return Err(CommandError::NothingToDrop(actor));
            }
            if let Some(player) = map.get_player_mut(actor) {
                player.weapon = Weapon::None;
            }
            map.items.push(Item {
                position: actor_state.position,
                weapon: actor_state.weapon,
            });
            debug!(%actor, weapon = ?actor_state.weapon, "dropped");
            Ok(CommandOutcome::Dropped { weapon: actor_state.weapon })
        }

        TurnCommand::Pass => Ok(CommandOutcome::Passed),
    }
}

/// Resolve a shot: weapon range and line of sight gate the hit, damage is
/// the weapon's fixed number, health saturates at zero.
fn apply_shot(
    map: &mut Map,
    actor: PlayerId,
    target: PlayerId,
) -> Result<CommandOutcome, CommandError> {
    let shooter = match map.get_player(actor) {
        Some(p) => p.clone(),
        None => return Err(CommandError::UnknownPlayer(actor)),
    };
    if shooter.weapon == Weapon::None {
        return Err(CommandError::Unarmed(actor));
    }

    let (victim_position, victim_alive) = match map.get_player(target) {
        Some(v) => (v.position, v.is_alive()),
        None => return Err(CommandError::UnknownTarget(target)),
    };

    let stats = shooter.weapon.stats();
    let in_range =
        shooter.position.distance_squared(victim_position) <= stats.range * stats.range;
    if !victim_alive || !in_range || !sight_clear(&map.walls, shooter.position, victim_position)
    {
        debug!(%actor, %target, "shot missed");
        return Ok(CommandOutcome::Missed { target });
    }

    let victim = match map.get_player_mut(target) {
        Some(v) => v,
        None => return Err(CommandError::UnknownTarget(target)),
    };
    victim.apply_damage(stats.damage);
    if victim.is_alive() {
        debug!(%actor, %target, damage = stats.damage, "shot hit");
        Ok(CommandOutcome::Hit {
            target,
            damage: stats.damage,
        })
    } else {
        info!(%actor, %target, "player eliminated");
        Ok(CommandOutcome::Eliminated { target })
    }
}

// =============================================================================
// TESTS
// =============================================================================
