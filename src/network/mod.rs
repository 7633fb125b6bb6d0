//! Network Layer
//!
//! Everything between a match and its remote clients: the JSON wire
//! protocol, the runner that routes payloads to named players, the
//! session that walks a match from lobby to completion, and the
//! WebSocket server. No game rules live here; the session calls into
//! `game` and ships the results out.

pub mod protocol;
pub mod runner;
pub mod server;
pub mod session;

pub use protocol::{ClientMessage, MapInfo, MatchInfo, MatchOverInfo, ServerMessage, WelcomeInfo};
pub use runner::{Runner, TransportError};
pub use server::{GameServer, ServerConfig, ServerError};
pub use session::{drive_session, MatchSession, SessionConfig, SessionError, SessionState};
