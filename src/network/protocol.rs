//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket. All
//! messages are JSON, internally tagged on `type`. The per-turn snapshot
//! travels as an opaque string inside `Turn`; the transport never looks
//! into it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::command::TurnCommand;
use crate::game::world::{Map, PlayerId, Wall};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join the match as a player.
    Hello {
        /// Display name, also the routing key for turn delivery
        name: String,
    },

    /// Join as a read-only observer.
    Observe,

    /// The command for the current turn.
    Turn(TurnCommand),

    /// Leaving on purpose.
    Leave,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Greeting for a joined player: id and the static map.
    Welcome(WelcomeInfo),

    /// Greeting for an observer: match identity and the static map.
    MatchInfo(MatchInfo),

    /// One turn's snapshot, labelled (`turn <n>`), payload opaque.
    Turn {
        /// Delivery label, `turn <n>`
        label: String,
        /// Serialized snapshot; the client parses this itself
        data: String,
    },

    /// One observer frame, payload opaque.
    Frame {
        /// Turn the frame describes
        turn: u32,
        /// Serialized world frame
        data: String,
    },

    /// The match ended.
    MatchOver(MatchOverInfo),

    /// Something about the last client message was wrong.
    Error {
        /// Human-readable description
        message: String,
    },
}

/// Player greeting payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeInfo {
    /// The id assigned to this player
    pub player_id: PlayerId,
    /// Confirmed display name
    pub name: String,
    /// The static world
    pub map: MapInfo,
}

/// Observer greeting payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchInfo {
    /// Match identifier
    pub match_id: Uuid,
    /// When the match loop started
    pub started_at: DateTime<Utc>,
    /// The static world
    pub map: MapInfo,
}

/// The static parts of the map, sent once at match start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapInfo {
    /// Starting zone radius
    pub radius: f64,
    /// Wall layout, fixed for the match
    pub walls: Vec<Wall>,
}

impl MapInfo {
    /// Extract the static parts of a map.
    pub fn of(map: &Map) -> Self {
        Self {
            radius: map.radius,
            walls: map.walls.clone(),
        }
    }
}

/// Match end payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOverInfo {
    /// Final turn number
    pub turn: u32,
    /// Winner id, `None` on a draw
    pub winner_id: Option<PlayerId>,
    /// Winner name, `None` on a draw
    pub winner_name: Option<String>,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::Vec2;

    #[test]
    fn test_hello_roundtrip() {
        let msg = ClientMessage::Hello {
            name: "ada".to_string(),
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"hello\""));

        let parsed = ClientMessage::from_json(&json).unwrap();
        if let ClientMessage::Hello { name } = parsed {
            assert_eq!(name, "ada");
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_turn_command_tags_inline() {
        // The command's own tag sits next to the message tag
        let raw = r#"{"type": "turn", "action": "move", "x": 3.0, "y": 4.0}"#;
        let parsed = ClientMessage::from_json(raw).unwrap();
        if let ClientMessage::Turn(cmd) = parsed {
            assert_eq!(cmd, TurnCommand::Move { x: 3.0, y: 4.0 });
        } else {
            panic!("Wrong message type");
        }

        let msg = ClientMessage::Turn(TurnCommand::Shoot {
            target: PlayerId(2),
        });
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"action\":\"shoot\""));
    }

    #[test]
    fn test_welcome_roundtrip() {
        let msg = ServerMessage::Welcome(WelcomeInfo {
            player_id: PlayerId(1),
            name: "bob".to_string(),
            map: MapInfo {
                radius: 100.0,
                walls: vec![Wall {
                    a: Vec2::new(10.0, -20.0),
                    b: Vec2::new(10.0, 20.0),
                }],
            },
        });

        let json = msg.to_json().unwrap();
        let parsed = ServerMessage::from_json(&json).unwrap();
        if let ServerMessage::Welcome(info) = parsed {
            assert_eq!(info.player_id, PlayerId(1));
            assert_eq!(info.map.walls.len(), 1);
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_turn_payload_stays_opaque() {
        let msg = ServerMessage::Turn {
            label: "turn 12".to_string(),
            data: r#"{"radius": 100.0}"#.to_string(),
        };
        let json = msg.to_json().unwrap();

        if let ServerMessage::Turn { label, data } = ServerMessage::from_json(&json).unwrap() {
            assert_eq!(label, "turn 12");
            assert_eq!(data, r#"{"radius": 100.0}"#);
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_match_over_draw() {
        let msg = ServerMessage::MatchOver(MatchOverInfo {
            turn: 40,
            winner_id: None,
            winner_name: None,
        });
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"winner_id\":null"));

        let msg = ServerMessage::MatchOver(MatchOverInfo {
            turn: 40,
            winner_id: Some(PlayerId(3)),
            winner_name: Some("cal".to_string()),
        });
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"winner_id\":3"));
    }

    #[test]
    fn test_error_message() {
        let msg = ServerMessage::Error {
            message: "not valid json".to_string(),
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"error\""));
        assert!(json.contains("not valid json"));
    }
}
