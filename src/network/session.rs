//! Match Session
//!
//! One match from lobby to completion: players join by name, the turn
//! loop runs at a fixed interval once everyone expected has arrived, and
//! the session ends itself when the continuation check fails or the turn
//! cap is hit. The session task is the only writer to the world; commands
//! arriving between turns are stored per player, latest wins.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::game::command::TurnCommand;
use crate::game::turn::{Game, TurnConfig, TurnReport};
use crate::game::world::{Map, PlayerId};
use crate::network::protocol::{MapInfo, MatchInfo, MatchOverInfo, ServerMessage, WelcomeInfo};
use crate::network::runner::Runner;

/// Session lifecycle. Strictly forward: lobby, playing, ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the expected number of players.
    Lobby,
    /// Turn loop running.
    Playing,
    /// Match over, result broadcast.
    Ended,
}

/// Configuration for a match session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Players required before the match starts.
    pub expected_players: usize,
    /// Wall-clock length of one turn.
    pub turn_interval: Duration,
    /// Hard stop: a match reaching this many turns ends as it stands.
    pub max_turns: u32,
    /// Zone and pacing parameters.
    pub turn_config: TurnConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expected_players: 2,
            turn_interval: Duration::from_millis(250),
            max_turns: 1000,
            turn_config: TurnConfig::default(),
        }
    }
}

/// Session errors.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Joins are only possible in the lobby
    #[error("match already in progress")]
    MatchInProgress,

    /// The expected player count is reached
    #[error("session is full")]
    SessionFull,

    /// Player names double as routing keys and must be unique
    #[error("name {0:?} is already taken")]
    NameTaken(String),

    /// Commands are only accepted while playing
    #[error("match not in progress")]
    MatchNotInProgress,

    /// No such player in this session
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),
}

/// A single match session.
pub struct MatchSession {
    /// Current lifecycle state.
    pub state: SessionState,
    /// Session configuration.
    pub config: SessionConfig,
    /// The match itself, world and turn counter.
    game: Game,
    /// Transport handle shared with the connection tasks.
    runner: Runner,
    /// Pending command per player; latest wins, absent means pass.
    pending: BTreeMap<PlayerId, TurnCommand>,
    /// Set when the turn loop starts.
    started_at: Option<DateTime<Utc>>,
}

impl MatchSession {
    /// Create a session in the lobby over a prepared map.
    pub fn new(map: Map, config: SessionConfig, runner: Runner) -> Self {
        let game = Game::new(map, Box::new(runner.clone()));
        Self {
            state: SessionState::Lobby,
            config,
            game,
            runner,
            pending: BTreeMap::new(),
            started_at: None,
        }
    }

    /// Join the lobby under a unique name.
    ///
    /// The player spawns immediately and the returned greeting carries
    /// its id and the static map.
    pub fn join(&mut self, name: &str) -> Result<WelcomeInfo, SessionError> {
        if self.state != SessionState::Lobby {
            return Err(SessionError::MatchInProgress);
        }
        let joined = self.game.map.players.len();
        if joined >= self.config.expected_players {
            return Err(SessionError::SessionFull);
        }
        if self.game.map.players.values().any(|p| p.name == name) {
            return Err(SessionError::NameTaken(name.to_string()));
        }

        let spawn = self
            .game
            .map
            .spawn_position(joined, self.config.expected_players);
        let player_id = self.game.map.add_player(name, spawn);
        info!(match_id = %self.game.match_id, player = %player_id, name, "player joined");

        Ok(WelcomeInfo {
            player_id,
            name: name.to_string(),
            map: MapInfo::of(&self.game.map),
        })
    }

    /// Whether the lobby is complete and the match can start.
    pub fn ready_to_start(&self) -> bool {
        self.state == SessionState::Lobby
            && self.game.map.players.len() == self.config.expected_players
    }

    /// Leave the lobby and start playing.
    ///
    /// Returns the observer greeting; the caller broadcasts it.
    pub fn start(&mut self) -> Result<MatchInfo, SessionError> {
        if self.state != SessionState::Lobby {
            return Err(SessionError::MatchInProgress);
        }
        let started_at = Utc::now();
        self.state = SessionState::Playing;
        self.started_at = Some(started_at);
        info!(
            match_id = %self.game.match_id,
            players = self.game.map.players.len(),
            "match started"
        );

        Ok(MatchInfo {
            match_id: self.game.match_id,
            started_at,
            map: MapInfo::of(&self.game.map),
        })
    }

    /// Store a player's command for the upcoming turn, replacing any
    /// earlier one from the same player.
    pub fn submit_command(
        &mut self,
        player: PlayerId,
        command: TurnCommand,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Playing {
            return Err(SessionError::MatchNotInProgress);
        }
        if self.game.map.get_player(player).is_none() {
            return Err(SessionError::PlayerNotFound(player));
        }
        debug!(player = %player, ?command, "command queued");
        self.pending.insert(player, command);
        Ok(())
    }

    /// Handle a client dropping its connection.
    ///
    /// In the lobby the player simply leaves; mid-match the player is
    /// eliminated, since its bot is gone for good.
    pub fn handle_disconnect(&mut self, player: PlayerId) {
        self.pending.remove(&player);
        match self.state {
            SessionState::Lobby => {
                if let Some(gone) = self.game.map.players.remove(&player) {
                    info!(name = %gone.name, "player left the lobby");
                    self.runner.unregister_player(&gone.name);
                }
            }
            SessionState::Playing => {
                if let Some(gone) = self.game.map.get_player_mut(player) {
                    if gone.is_alive() {
                        gone.health = 0;
                        info!(player = %player, "player disconnected, eliminated");
                    }
                }
            }
            SessionState::Ended => {}
        }
    }

    /// Run one turn, ending the session if the match is decided or the
    /// turn cap is reached. Returns `None` when not playing.
    pub fn run_turn(&mut self) -> Option<TurnReport> {
        if self.state != SessionState::Playing {
            return None;
        }

        let commands = std::mem::take(&mut self.pending);
        let report = self.game.run_turn(&commands, &self.config.turn_config);

        if report.match_over || report.turn >= self.config.max_turns {
            self.end_match(&report);
        }
        Some(report)
    }

    fn end_match(&mut self, report: &TurnReport) {
        self.state = SessionState::Ended;
        let winner_name = report
            .winner
            .and_then(|id| self.game.map.get_player(id))
            .map(|p| p.name.clone());
        info!(
            match_id = %self.game.match_id,
            turn = report.turn,
            winner = winner_name.as_deref().unwrap_or("none"),
            "match over"
        );
        self.runner
            .broadcast_all(&ServerMessage::MatchOver(MatchOverInfo {
                turn: report.turn,
                winner_id: report.winner,
                winner_name,
            }));
    }

    /// Greeting for an observer attaching after the match started.
    /// `None` while the session is still in its lobby.
    pub fn observer_greeting(&self) -> Option<MatchInfo> {
        self.started_at.map(|started_at| MatchInfo {
            match_id: self.game.match_id,
            started_at,
            map: MapInfo::of(&self.game.map),
        })
    }

    /// Handle to the session's transport.
    pub fn runner(&self) -> Runner {
        self.runner.clone()
    }

    /// Current turn number.
    pub fn turn(&self) -> u32 {
        self.game.turn
    }

    /// Number of joined players.
    pub fn player_count(&self) -> usize {
        self.game.map.players.len()
    }
}

/// Drive a started session's turn loop until the match ends.
///
/// One tick of the interval is one turn. The write lock is held for the
/// duration of a turn and released between turns, so connection tasks
/// interleave their joins and commands freely.
pub async fn drive_session(session: Arc<RwLock<MatchSession>>) {
    let interval = session.read().await.config.turn_interval;
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; skip it so turn 1 lands one
    // interval after start
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let mut locked = session.write().await;
        match locked.run_turn() {
            Some(report) if locked.state == SessionState::Ended => {
                debug!(turn = report.turn, "session loop finished");
                break;
            }
            Some(_) => {}
            None => break,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
