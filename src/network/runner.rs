//! Runner Transport
//!
//! The delivery seam between a match and its clients. The runner keeps
//! one outbound channel per registered player name plus a list of
//! observer channels, and routes labelled turn payloads and world frames
//! onto them. Sends never block: each channel is drained by that client's
//! own pump task, so a slow client cannot hold up the turn loop.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

use crate::game::turn::Transport;
use crate::network::protocol::ServerMessage;

/// Outbound channel to one client's pump task.
pub type ClientSender = mpsc::UnboundedSender<ServerMessage>;

/// Failure to route a message.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No channel registered under that player name
    #[error("no registered player named {0:?}")]
    UnknownPlayer(String),

    /// The client's pump task is gone
    #[error("outbound channel for {0:?} is closed")]
    Closed(String),
}

#[derive(Default)]
struct Registry {
    players: BTreeMap<String, ClientSender>,
    observers: Vec<ClientSender>,
}

/// Routes labelled payloads to named players and frames to observers.
///
/// Cheap to clone; all clones share one registry. Registration happens
/// from connection tasks, delivery from the session's turn loop.
#[derive(Clone, Default)]
pub struct Runner {
    registry: Arc<RwLock<Registry>>,
}

impl Runner {
    /// Create an empty runner.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a player's outbound channel under its name, replacing
    /// any stale channel left by an earlier connection.
    pub fn register_player(&self, name: &str, sender: ClientSender) {
        self.write().players.insert(name.to_string(), sender);
    }

    /// Drop a player's outbound channel.
    pub fn unregister_player(&self, name: &str) {
        self.write().players.remove(name);
    }

    /// Add an observer channel to the frame fan-out.
    pub fn attach_observer(&self, sender: ClientSender) {
        self.write().observers.push(sender);
    }

    /// Number of registered players.
    pub fn player_count(&self) -> usize {
        self.read().players.len()
    }

    /// Number of attached observers.
    pub fn observer_count(&self) -> usize {
        self.read().observers.len()
    }

    /// Queue one message for one named player.
    pub fn send_to(&self, name: &str, message: ServerMessage) -> Result<(), TransportError> {
        let registry = self.read();
        let sender = registry
            .players
            .get(name)
            .ok_or_else(|| TransportError::UnknownPlayer(name.to_string()))?;
        sender
            .send(message)
            .map_err(|_| TransportError::Closed(name.to_string()))
    }

    /// Queue one labelled turn payload for one named player.
    pub fn send_turn(&self, name: &str, label: &str, payload: &str) -> Result<(), TransportError> {
        self.send_to(
            name,
            ServerMessage::Turn {
                label: label.to_string(),
                data: payload.to_string(),
            },
        )
    }

    /// Fan a message out to every registered player.
    pub fn broadcast_players(&self, message: &ServerMessage) {
        let registry = self.read();
        for (name, sender) in &registry.players {
            if sender.send(message.clone()).is_err() {
                warn!(player = %name, "broadcast to closed channel dropped");
            }
        }
    }

    /// Fan a message out to every observer, pruning closed channels.
    pub fn broadcast_observers(&self, message: &ServerMessage) {
        let mut registry = self.write();
        registry
            .observers
            .retain(|sender| sender.send(message.clone()).is_ok());
    }

    /// Fan a message out to players and observers alike.
    pub fn broadcast_all(&self, message: &ServerMessage) {
        self.broadcast_players(message);
        self.broadcast_observers(message);
    }
}

impl Transport for Runner {
    fn deliver(&self, player_name: &str, label: &str, payload: &str) {
        // Fire-and-forget from the game's side: a vanished client costs a
        // warning, never the turn
        if let Err(err) = self.send_turn(player_name, label, payload) {
            warn!(player = %player_name, %err, "turn delivery dropped");
        }
    }

    fn publish_frame(&self, turn: u32, payload: &str) {
        self.broadcast_observers(&ServerMessage::Frame {
            turn,
            data: payload.to_string(),
        });
    }
}

// =============================================================================
// TESTS
// =============================================================================
