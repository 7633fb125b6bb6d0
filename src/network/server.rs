//! WebSocket Server
//!
//! The listener and per-connection plumbing. Every connection gets two
//! tasks: a handler that reads the socket and feeds the session, and a
//! pump that drains the client's outbound channel into the socket. The
//! turn loop only ever queues onto those channels, so a slow or dead
//! client never stalls a turn. One process serves one match; once the
//! match ends the server stops accepting and `run` returns.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::game::world::PlayerId;
use crate::network::protocol::{ClientMessage, ServerMessage};
use crate::network::runner::{ClientSender, Runner};
use crate::network::session::{drive_session, MatchSession};

/// How long a finished match lingers before the server stops, so the
/// pump tasks can flush the final messages.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections
    pub max_clients: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            max_clients: 64,
        }
    }
}

/// Server failures.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Could not bind the listener
    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),

    /// WebSocket handshake or transport failure
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// What a connection has identified itself as.
enum ClientRole {
    /// Connected, nothing said yet
    Pending,
    /// Joined the match as a player
    Player { id: PlayerId, name: String },
    /// Attached as a read-only observer
    Observer,
}

/// The WebSocket server for one match.
pub struct GameServer {
    config: ServerConfig,
    session: Arc<RwLock<MatchSession>>,
    runner: Runner,
    connections: Arc<AtomicUsize>,
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a server around a session still in its lobby.
    pub fn new(session: MatchSession, config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let runner = session.runner();
        Self {
            config,
            session: Arc::new(RwLock::new(session)),
            runner,
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    /// Bind the configured address and serve until the match completes.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, "listening");
        self.run_on(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn run_on(&self, listener: TcpListener) -> Result<(), ServerError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if self.connections.load(Ordering::Relaxed) >= self.config.max_clients {
                            warn!(%addr, "connection limit reached, rejecting");
                            continue;
                        }
                        info!(%addr, "client connected");
                        self.handle_connection(stream, addr);
                    }
                    Err(err) => error!(%err, "accept failed"),
                },
                _ = shutdown_rx.recv() => {
                    info!("match finished, server stopping");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Ask the accept loop and every connection task to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    /// Spawn the handler and pump tasks for one accepted connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let session = Arc::clone(&self.session);
        let runner = self.runner.clone();
        let connections = Arc::clone(&self.connections);
        let shutdown_tx = self.shutdown_tx.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        connections.fetch_add(1, Ordering::Relaxed);

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(err) => {
                    warn!(%addr, %err, "websocket handshake failed");
                    connections.fetch_sub(1, Ordering::Relaxed);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<ServerMessage>();

            // Pump task: everything queued for this client goes out here.
            let sender_task = tokio::spawn(async move {
                while let Some(message) = msg_rx.recv().await {
                    let text = match message.to_json() {
                        Ok(text) => text,
                        Err(err) => {
                            error!(%err, "dropping unserializable message");
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            let mut role = ClientRole::Pending;
            loop {
                tokio::select! {
                    incoming = ws_receiver.next() => match incoming {
                        Some(Ok(Message::Text(text))) => match ClientMessage::from_json(&text) {
                            Ok(ClientMessage::Leave) => {
                                debug!(%addr, "client left");
                                break;
                            }
                            Ok(message) => {
                                Self::handle_message(
                                    addr,
                                    message,
                                    &mut role,
                                    &session,
                                    &runner,
                                    &msg_tx,
                                    &shutdown_tx,
                                )
                                .await;
                            }
                            Err(err) => {
                                debug!(%addr, %err, "unparseable message");
                                let _ = msg_tx.send(ServerMessage::Error {
                                    message: format!("invalid message: {err}"),
                                });
                            }
                        },
                        Some(Ok(Message::Close(_))) | None => {
                            debug!(%addr, "connection closed");
                            break;
                        }
                        // Binary and control frames are not part of the protocol
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            warn!(%addr, %err, "websocket error");
                            break;
                        }
                    },
                    _ = shutdown_rx.recv() => break,
                }
            }

            sender_task.abort();
            if let ClientRole::Player { id, name } = role {
                session.write().await.handle_disconnect(id);
                runner.unregister_player(&name);
            }
            connections.fetch_sub(1, Ordering::Relaxed);
            debug!(%addr, "connection task finished");
        });
    }

    /// Apply one parsed client message to the session.
    async fn handle_message(
        addr: SocketAddr,
        message: ClientMessage,
        role: &mut ClientRole,
        session: &Arc<RwLock<MatchSession>>,
        runner: &Runner,
        reply: &ClientSender,
        shutdown: &broadcast::Sender<()>,
    ) {
        match message {
            ClientMessage::Hello { name } => {
                if !matches!(role, ClientRole::Pending) {
                    let _ = reply.send(ServerMessage::Error {
                        message: "already joined".to_string(),
                    });
                    return;
                }

                let mut locked = session.write().await;
                match locked.join(&name) {
                    Ok(welcome) => {
                        runner.register_player(&name, reply.clone());
                        *role = ClientRole::Player {
                            id: welcome.player_id,
                            name: name.clone(),
                        };
                        let _ = reply.send(ServerMessage::Welcome(welcome));

                        if locked.ready_to_start() {
                            match locked.start() {
                                Ok(info) => {
                                    runner.broadcast_observers(&ServerMessage::MatchInfo(info));

                                    // The loop runs the match to its end;
                                    // after a short grace for the pumps,
                                    // the whole server stops.
                                    let loop_session = Arc::clone(session);
                                    let shutdown = shutdown.clone();
                                    tokio::spawn(async move {
                                        drive_session(loop_session).await;
                                        tokio::time::sleep(SHUTDOWN_GRACE).await;
                                        let _ = shutdown.send(());
                                    });
                                }
                                Err(err) => error!(%err, "failed to start the match"),
                            }
                        }
                    }
                    Err(err) => {
                        warn!(%addr, %err, "join rejected");
                        let _ = reply.send(ServerMessage::Error {
                            message: err.to_string(),
                        });
                    }
                }
            }

            ClientMessage::Observe => {
                if !matches!(role, ClientRole::Pending) {
                    let _ = reply.send(ServerMessage::Error {
                        message: "already joined".to_string(),
                    });
                    return;
                }
                *role = ClientRole::Observer;

                // Attach under the session lock so a match starting right
                // now cannot greet this observer twice.
                let locked = session.read().await;
                runner.attach_observer(reply.clone());
                if let Some(info) = locked.observer_greeting() {
                    let _ = reply.send(ServerMessage::MatchInfo(info));
                }
                info!(%addr, "observer attached");
            }

            ClientMessage::Turn(command) => match role {
                ClientRole::Player { id, .. } => {
                    if let Err(err) = session.write().await.submit_command(*id, command) {
                        debug!(%addr, %err, "command rejected");
                        let _ = reply.send(ServerMessage::Error {
                            message: err.to_string(),
                        });
                    }
                }
                _ => {
                    let _ = reply.send(ServerMessage::Error {
                        message: "join as a player before sending commands".to_string(),
                    });
                }
            },

            // Leave is intercepted by the read loop
            ClientMessage::Leave => {}
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::Vec2;
    use crate::game::snapshot::{ObserverFrame, TurnSnapshot};
    use crate::game::world::{Map, MapConfig};
    use crate::network::session::SessionConfig;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

    /// Bind a duel server on an ephemeral port and run it in the
    /// background. Four turns at 10 ms each, so a full match is quick.
    async fn spawn_duel_server() -> SocketAddr {
        let map = Map::from_config(MapConfig {
            radius: 100.0,
            walls: Vec::new(),
            items: Vec::new(),
            spawns: vec![Vec2::ZERO, Vec2::new(10.0, 0.0)],
        });
        let session = MatchSession::new(
            map,
            SessionConfig {
                expected_players: 2,
                turn_interval: Duration::from_millis(10),
                max_turns: 4,
                ..SessionConfig::default()
            },
            Runner::new(),
        );
        let server = GameServer::new(session, ServerConfig::default());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = server.run_on(listener).await;
        });
        addr
    }

    async fn connect(addr: SocketAddr) -> WsClient {
        let (ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
        ws
    }

    async fn send(ws: &mut WsClient, message: &ClientMessage) {
        ws.send(Message::Text(message.to_json().unwrap()))
            .await
            .unwrap();
    }

    async fn recv(ws: &mut WsClient) -> ServerMessage {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for a server message")
                .expect("connection closed")
                .expect("websocket error");
            if let Message::Text(text) = frame {
                return ServerMessage::from_json(&text).unwrap();
            }
        }
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_clients, 64);
    }

    #[tokio::test]
    async fn test_two_bots_play_a_full_match() {
        let addr = spawn_duel_server().await;

        let mut ada = connect(addr).await;
        send(&mut ada, &ClientMessage::Hello { name: "ada".into() }).await;
        let welcome = recv(&mut ada).await;
        let ada_id = match welcome {
            ServerMessage::Welcome(info) => {
                assert_eq!(info.name, "ada");
                assert_eq!(info.map.radius, 100.0);
                info.player_id
            }
            other => panic!("expected a welcome, got {other:?}"),
        };
        assert_eq!(ada_id, PlayerId(0));

        let mut bob = connect(addr).await;
        send(&mut bob, &ClientMessage::Hello { name: "bob".into() }).await;
        assert!(matches!(recv(&mut bob).await, ServerMessage::Welcome(_)));

        // The lobby is full, so turns flow until the cap ends the match
        let mut turns_seen = 0;
        loop {
            match recv(&mut ada).await {
                ServerMessage::Turn { label, data } => {
                    turns_seen += 1;
                    if turns_seen == 1 {
                        assert_eq!(label, "turn 1");
                    }
                    let snap: TurnSnapshot = serde_json::from_str(&data).unwrap();
                    assert_eq!(snap.player.name, "ada");
                    assert_eq!(snap.visible_players.len(), 1);
                }
                ServerMessage::MatchOver(info) => {
                    // Both alive at the cap means a draw
                    assert_eq!(info.turn, 4);
                    assert_eq!(info.winner_id, None);
                    break;
                }
                other => panic!("unexpected message: {other:?}"),
            }
        }
        assert_eq!(turns_seen, 4);
    }

    #[tokio::test]
    async fn test_observer_sees_the_whole_match() {
        let addr = spawn_duel_server().await;

        let mut watcher = connect(addr).await;
        send(&mut watcher, &ClientMessage::Observe).await;

        // The player connections must outlive the match, or dropping
        // them would eliminate the players mid-game
        let mut players = Vec::new();
        for name in ["ada", "bob"] {
            let mut player = connect(addr).await;
            send(&mut player, &ClientMessage::Hello { name: name.into() }).await;
            assert!(matches!(recv(&mut player).await, ServerMessage::Welcome(_)));
            players.push(player);
        }

        // Greeting first, then unfiltered frames, then the result
        match recv(&mut watcher).await {
            ServerMessage::MatchInfo(info) => assert_eq!(info.map.radius, 100.0),
            other => panic!("expected the match info, got {other:?}"),
        }
        let mut frames_seen = 0;
        loop {
            match recv(&mut watcher).await {
                ServerMessage::Frame { turn, data } => {
                    frames_seen += 1;
                    let frame: ObserverFrame = serde_json::from_str(&data).unwrap();
                    assert_eq!(frame.turn, turn);
                    assert_eq!(frame.players.len(), 2);
                }
                ServerMessage::MatchOver(_) => break,
                other => panic!("unexpected message: {other:?}"),
            }
        }
        assert_eq!(frames_seen, 4);
    }

    #[tokio::test]
    async fn test_bad_input_gets_an_error_and_the_connection_survives() {
        let addr = spawn_duel_server().await;
        let mut client = connect(addr).await;

        client
            .send(Message::Text("this is not json".to_string()))
            .await
            .unwrap();
        assert!(matches!(recv(&mut client).await, ServerMessage::Error { .. }));

        // Commands before joining are rejected too
        send(
            &mut client,
            &ClientMessage::Turn(crate::game::command::TurnCommand::Pass),
        )
        .await;
        assert!(matches!(recv(&mut client).await, ServerMessage::Error { .. }));

        // The same connection can still join
        send(&mut client, &ClientMessage::Hello { name: "ada".into() }).await;
        assert!(matches!(recv(&mut client).await, ServerMessage::Welcome(_)));

        // But not twice
        send(&mut client, &ClientMessage::Hello { name: "adb".into() }).await;
        assert!(matches!(recv(&mut client).await, ServerMessage::Error { .. }));
    }
}
