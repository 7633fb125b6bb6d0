//! Turn Orchestration
//!
//! `Game` owns the map for one match and drives it turn by turn: apply
//! every pending command, advance the zone, hand each living player its
//! snapshot through the transport, and decide whether the match goes on.
//! All mutation happens before the first snapshot is built.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::game::command::{apply_command, TurnCommand};
use crate::game::snapshot::{ObserverFrame, TurnSnapshot};
use crate::game::world::{Map, Player, PlayerId};

// =============================================================================
// TRANSPORT SEAM
// =============================================================================

/// Delivery seam between the turn loop and the network layer.
///
/// Delivery is fire-and-forget from the game's point of view: an
/// implementation routes by player name, logs what it cannot deliver, and
/// never blocks the turn.
pub trait Transport {
    /// Queue a labelled opaque payload for a named player.
    fn deliver(&self, player_name: &str, label: &str, payload: &str);

    /// Queue a world frame for all observers.
    fn publish_frame(&self, turn: u32, payload: &str);
}

// =============================================================================
// CONFIG
// =============================================================================

/// Zone and pacing parameters for a match.
#[derive(Clone, Copy, Debug)]
pub struct TurnConfig {
    /// Turns before the zone starts shrinking
    pub shrink_start_turn: u32,
    /// Radius lost per turn once shrinking
    pub shrink_per_turn: f64,
    /// Health lost per turn while outside the zone
    pub zone_damage: u32,
    /// The zone never shrinks below this radius
    pub min_radius: f64,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            shrink_start_turn: 50,
            shrink_per_turn: 1.0,
            zone_damage: 5,
            min_radius: 10.0,
        }
    }
}

/// What one turn produced, for the session loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TurnReport {
    /// The turn number just completed
    pub turn: u32,
    /// Whether the match ended this turn
    pub match_over: bool,
    /// The last player standing, if exactly one remains
    pub winner: Option<PlayerId>,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Failure while dispatching a turn.
#[derive(Debug, Error)]
pub enum TurnError {
    /// A snapshot refused to serialize; that player's dispatch is
    /// aborted rather than delivering anything corrupt
    #[error("failed to serialize snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

// =============================================================================
// GAME
// =============================================================================

/// One running match: the map, the turn counter and the transport handle.
pub struct Game {
    /// World state, single source of truth
    pub map: Map,
    /// Monotonic turn counter; the first played turn is 1
    pub turn: u32,
    /// Match identifier for logs and the observer feed
    pub match_id: Uuid,
    transport: Box<dyn Transport + Send + Sync>,
}

impl Game {
    /// Create a match over a prepared map.
    pub fn new(map: Map, transport: Box<dyn Transport + Send + Sync>) -> Self {
        Self {
            map,
            turn: 0,
            match_id: Uuid::new_v4(),
            transport,
        }
    }

    /// Run one full turn: commands, zone, counter, snapshots, verdict.
    pub fn run_turn(
        &mut self,
        commands: &BTreeMap<PlayerId, TurnCommand>,
        config: &TurnConfig,
    ) -> TurnReport {
        // 1. Apply every pending command in id order. Players without a
        //    command simply pass.
        for (id, command) in commands {
            match apply_command(&mut self.map, *id, *command) {
                Ok(outcome) => debug!(player = %id, ?outcome, "command applied"),
                Err(err) => warn!(player = %id, %err, "command rejected"),
            }
        }

        // 2. Advance the zone.
        self.shrink_zone(config);

        // 3. Advance the turn counter.
        self.turn += 1;

        // 4. Snapshots, strictly after all mutation.
        if let Err(err) = self.broadcast_turn() {
            error!(turn = self.turn, %err, "turn broadcast incomplete");
        }

        // 5. Continuation check.
        let match_over = !self.should_continue();
        TurnReport {
            turn: self.turn,
            match_over,
            winner: self.winner().map(|p| p.id),
        }
    }

    /// Build, serialize and deliver one player's snapshot, labelled with
    /// the current turn number.
    pub fn dispatch_turn(&self, player: &Player) -> Result<(), TurnError> {
        let snapshot = TurnSnapshot::capture(&self.map, player);
        let payload = snapshot.to_json()?;
        self.transport
            .deliver(&player.name, &format!("turn {}", self.turn), &payload);
        Ok(())
    }

    /// Dispatch to every living player and publish the observer frame.
    ///
    /// One player's serialization failure does not starve the others;
    /// the first failure is still surfaced after all dispatches ran.
    pub fn broadcast_turn(&self) -> Result<(), TurnError> {
        let mut first_failure = None;
        for player in self.map.alive_players() {
            if let Err(err) = self.dispatch_turn(player) {
                error!(player = %player.id, %err, "snapshot dispatch aborted");
                if first_failure.is_none() {
                    first_failure = Some(err);
                }
            }
        }

        match ObserverFrame::capture(&self.map, self.turn).to_json() {
            Ok(payload) => self.transport.publish_frame(self.turn, &payload),
            Err(err) => {
                error!(%err, "observer frame dropped");
                if first_failure.is_none() {
                    first_failure = Some(TurnError::Snapshot(err));
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Shrink the zone and hurt everyone standing outside it.
    pub fn shrink_zone(&mut self, config: &TurnConfig) {
        if self.turn < config.shrink_start_turn {
            return;
        }

        if self.map.radius > config.min_radius {
            self.map.radius = (self.map.radius - config.shrink_per_turn).max(config.min_radius);
        }

        let radius_sq = self.map.radius * self.map.radius;
        for player in self.map.players.values_mut() {
            if player.is_alive() && player.position.length_squared() > radius_sq {
                player.apply_damage(config.zone_damage);
                if !player.is_alive() {
                    info!(player = %player.id, "eliminated by the zone");
                }
            }
        }
    }

    /// True while strictly more than one player is alive.
    pub fn should_continue(&self) -> bool {
        self.map.alive_count() > 1
    }

    /// The last player standing, if exactly one remains.
    pub fn winner(&self) -> Option<&Player> {
        let mut alive = self.map.alive_players();
        match (alive.next(), alive.next()) {
            (Some(player), None) => Some(player),
            _ => None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
