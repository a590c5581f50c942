//! WebSocket server: session establishment, connection registry, and
//! visibility-filtered broadcasting.
//!
//! Every connection starts with a session message (`create_room`,
//! `join_room`, or `authenticate`); afterwards the reader loop feeds game
//! traffic through the room store. All game mutation happens under the
//! store's per-room lock, which is always released before broadcasting.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use time::OffsetDateTime;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use tracing::{error, info, warn};

use parlor_core::event::{
    PlayerJoinedPayload, PlayerReconnectedPayload, EVENT_PLAYER_JOINED,
    EVENT_PLAYER_RECONNECTED, SYSTEM_ACTOR,
};
use parlor_core::{Action, GameEvent, Player, Registry, RoomStatus};

use crate::protocol::{ClientMessage, ServerMessage};
use crate::store::MemoryStore;

/// Outbound queue depth per connection. A slow client has its messages
/// dropped rather than blocking anyone else's broadcast.
const OUTBOUND_QUEUE: usize = 256;
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_MAX_PLAYERS: usize = 10;

/// Server state shared across all connections.
pub struct ServerState {
    pub store: MemoryStore,
    pub registry: Registry,
    /// player id -> live connection. At most one per player.
    connections: DashMap<String, ConnectionHandle>,
    next_conn_id: AtomicU64,
}

struct ConnectionHandle {
    conn_id: u64,
    room_code: String,
    sender: mpsc::Sender<ServerMessage>,
    closed: Arc<Notify>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
            registry: Registry::with_builtin_games(),
            connections: DashMap::new(),
            next_conn_id: AtomicU64::new(0),
        }
    }

    /// Register a connection for a player, evicting any predecessor. The
    /// returned `Notify` fires when a newer connection takes over.
    fn register_connection(
        &self,
        player_id: &str,
        room_code: &str,
        sender: mpsc::Sender<ServerMessage>,
    ) -> (u64, Arc<Notify>) {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let closed = Arc::new(Notify::new());

        let previous = self.connections.insert(
            player_id.to_string(),
            ConnectionHandle {
                conn_id,
                room_code: room_code.to_string(),
                sender,
                closed: Arc::clone(&closed),
            },
        );
        if let Some(previous) = previous {
            previous.closed.notify_one();
        }

        (conn_id, closed)
    }

    /// Drop the registration if it still belongs to this connection.
    /// Returns false when a reconnect already replaced it.
    fn unregister_connection(&self, player_id: &str, conn_id: u64) -> bool {
        self.connections
            .remove_if(player_id, |_, handle| handle.conn_id == conn_id)
            .is_some()
    }

    /// Send a message to a specific player, dropping it if their queue is
    /// full or their connection is gone.
    pub fn send_to_player(&self, player_id: &str, msg: ServerMessage) {
        if let Some(conn) = self.connections.get(player_id) {
            if conn.sender.try_send(msg).is_err() {
                warn!("Dropping message for player {}: queue full", player_id);
            }
        }
    }

    /// Send an event to every connected room member who may see it.
    pub fn broadcast_event(&self, room_code: &str, event: &GameEvent) {
        let player_ids: Vec<String> = match self.store.get(room_code) {
            Ok(room) => room.players.keys().cloned().collect(),
            Err(_) => return,
        };

        for player_id in player_ids {
            if !event.can_player_see(&player_id) {
                continue;
            }
            if let Some(conn) = self.connections.get(&player_id) {
                if conn.room_code != room_code {
                    continue;
                }
                let msg = ServerMessage::Event {
                    event: event.clone(),
                };
                if conn.sender.try_send(msg).is_err() {
                    warn!("Dropping event for player {}: queue full", player_id);
                }
            }
        }
    }

    /// Send the current room snapshot to every connected room member.
    pub fn broadcast_room_state(&self, room_code: &str) {
        let state = match self.store.get(room_code) {
            Ok(room) => room.state(),
            Err(_) => return,
        };

        for player in &state.players {
            if let Some(conn) = self.connections.get(&player.id) {
                if conn.room_code != room_code {
                    continue;
                }
                let msg = ServerMessage::RoomState {
                    room_state: state.clone(),
                };
                if conn.sender.try_send(msg).is_err() {
                    warn!("Dropping room state for player {}: queue full", player.id);
                }
            }
        }
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the WebSocket server until the shutdown signal fires.
pub async fn run_server(
    addr: SocketAddr,
    state: Arc<ServerState>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("parlor server listening on {}", addr);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = accepted?;
                let state = Arc::clone(&state);
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, peer_addr, state, shutdown).await {
                        error!("Connection error from {}: {}", peer_addr, e);
                    }
                });
            }
            _ = shutdown.changed() => {
                info!("No longer accepting connections");
                return Ok(());
            }
        }
    }
}

/// A freshly established session and the messages it owes the world.
struct SessionStart {
    room_code: String,
    player_id: String,
    /// Sent to the new connection itself.
    reply: ServerMessage,
    /// Event-log backfill for a reconnecting player.
    backfill: Option<ServerMessage>,
    /// Events to broadcast to the room.
    broadcast: Vec<GameEvent>,
    /// Whether the roster changed and the room snapshot should go out.
    announce_roster: bool,
}

/// Why a first message failed to establish a session.
struct Rejection {
    code: CloseCode,
    reason: String,
}

impl Rejection {
    fn policy(reason: &str) -> Self {
        Self {
            code: CloseCode::Policy,
            reason: reason.to_string(),
        }
    }

    fn internal(reason: String) -> Self {
        Self {
            code: CloseCode::Error,
            reason,
        }
    }
}

/// Handle a single WebSocket connection for its whole lifetime.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // The first frame must establish or resume a session.
    let Some(text) = next_text(&mut ws_receiver).await else {
        return Ok(());
    };
    let first = serde_json::from_str::<ClientMessage>(&text)
        .map_err(|_| Rejection::policy("authentication required"));

    let start = match first.and_then(|msg| establish_session(&state, msg)) {
        Ok(start) => start,
        Err(rejection) => {
            warn!(
                "Rejecting connection from {}: {}",
                addr, rejection.reason
            );
            let _ = ws_sender
                .send(Message::Close(Some(CloseFrame {
                    code: rejection.code,
                    reason: rejection.reason.into(),
                })))
                .await;
            return Ok(());
        }
    };

    let SessionStart {
        room_code,
        player_id,
        reply,
        backfill,
        broadcast,
        announce_roster,
    } = start;

    let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
    let (conn_id, closed) = state.register_connection(&player_id, &room_code, tx.clone());
    info!("Player {} connected to room {}", player_id, room_code);

    // The queue is fresh, so these always fit.
    let _ = tx.try_send(reply);
    if let Some(backfill) = backfill {
        let _ = tx.try_send(backfill);
    }
    for event in &broadcast {
        state.broadcast_event(&room_code, event);
    }
    if announce_roster {
        state.broadcast_room_state(&room_code);
    }

    let write_task = tokio::spawn(write_pump(ws_sender, rx));

    // Reader loop: game traffic until disconnect, eviction, or shutdown.
    loop {
        tokio::select! {
            text = next_text(&mut ws_receiver) => {
                let Some(text) = text else { break };
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => handle_session_message(&state, &room_code, &player_id, msg),
                    Err(e) => {
                        warn!("Invalid message from {}: {}", player_id, e);
                        state.send_to_player(
                            &player_id,
                            ServerMessage::Error {
                                message: format!("invalid message: {e}"),
                            },
                        );
                    }
                }
            }
            _ = closed.notified() => {
                info!("Player {} reconnected elsewhere, closing old connection", player_id);
                break;
            }
            _ = shutdown.changed() => break,
        }
    }

    drop(tx);
    if state.unregister_connection(&player_id, conn_id) {
        if let Ok(mut room) = state.store.get_mut(&room_code) {
            room.set_player_connected(&player_id, false);
        }
        state.broadcast_room_state(&room_code);
        info!("Player {} disconnected from room {}", player_id, room_code);
    }
    let _ = write_task.await;

    Ok(())
}

/// Turn a first message into a session, mutating the room as needed.
fn establish_session(
    state: &ServerState,
    msg: ClientMessage,
) -> Result<SessionStart, Rejection> {
    match msg {
        ClientMessage::CreateRoom {
            game_type,
            display_name,
            max_players,
        } => {
            if display_name.trim().is_empty() {
                return Err(Rejection::policy("display name required"));
            }
            if !state.registry.is_registered(&game_type) {
                return Err(Rejection::policy("unknown game type"));
            }

            let host = Player::new(&display_name);
            let player_id = host.id.clone();
            let session_token = host.session_token.clone();

            let room_code = state
                .store
                .create_room(&game_type, host, max_players.unwrap_or(DEFAULT_MAX_PLAYERS))
                .map_err(|e| Rejection::internal(e.to_string()))?;

            let (event, room_state) = {
                let mut room = state
                    .store
                    .get_mut(&room_code)
                    .map_err(|e| Rejection::internal(e.to_string()))?;
                let event = GameEvent::new_public(
                    EVENT_PLAYER_JOINED,
                    SYSTEM_ACTOR,
                    &PlayerJoinedPayload {
                        player_id: player_id.clone(),
                        display_name,
                    },
                )
                .map_err(|e| Rejection::internal(e.to_string()))?;
                room.append_event(event.clone());
                (event, room.state())
            };

            info!("Created room {} for game {}", room_code, room_state.game_type);

            Ok(SessionStart {
                reply: ServerMessage::SessionCreated {
                    room_code: room_code.clone(),
                    player_id: player_id.clone(),
                    session_token,
                    room_state,
                },
                backfill: None,
                broadcast: vec![event],
                announce_roster: false,
                room_code,
                player_id,
            })
        }

        ClientMessage::JoinRoom {
            room_code,
            display_name,
        } => {
            if display_name.trim().is_empty() {
                return Err(Rejection::policy("display name required"));
            }

            let player = Player::new(&display_name);
            let player_id = player.id.clone();
            let session_token = player.session_token.clone();

            let (event, room_state) = {
                let mut room = state
                    .store
                    .get_mut(&room_code)
                    .map_err(|_| Rejection::policy("room not found"))?;
                room.add_player(player)
                    .map_err(|e| Rejection::policy(&e.to_string()))?;
                let event = GameEvent::new_public(
                    EVENT_PLAYER_JOINED,
                    SYSTEM_ACTOR,
                    &PlayerJoinedPayload {
                        player_id: player_id.clone(),
                        display_name,
                    },
                )
                .map_err(|e| Rejection::internal(e.to_string()))?;
                room.append_event(event.clone());
                (event, room.state())
            };

            info!("Player {} joined room {}", player_id, room_code);

            Ok(SessionStart {
                reply: ServerMessage::SessionCreated {
                    room_code: room_code.clone(),
                    player_id: player_id.clone(),
                    session_token,
                    room_state,
                },
                backfill: None,
                broadcast: vec![event],
                announce_roster: true,
                room_code,
                player_id,
            })
        }

        ClientMessage::Authenticate {
            room_code,
            session_token,
        } => {
            let (player_id, room_state, backfill, broadcast) = {
                let mut room = state
                    .store
                    .get_mut(&room_code)
                    .map_err(|_| Rejection::policy("room not found"))?;

                let player_id = room
                    .player_by_token(&session_token)
                    .map(|p| p.id.clone())
                    .ok_or_else(|| Rejection::policy("invalid session token"))?;
                room.set_player_connected(&player_id, true);

                let events = room.events_for_player(&player_id);
                let backfill = if events.is_empty() {
                    None
                } else {
                    Some(ServerMessage::Events { events })
                };

                // Everyone learns the player is back if a game is running.
                let mut broadcast = Vec::new();
                if room.status == RoomStatus::Playing {
                    let event = GameEvent::new_public(
                        EVENT_PLAYER_RECONNECTED,
                        SYSTEM_ACTOR,
                        &PlayerReconnectedPayload {
                            player_id: player_id.clone(),
                        },
                    )
                    .map_err(|e| Rejection::internal(e.to_string()))?;
                    room.append_event(event.clone());
                    broadcast.push(event);
                }

                (player_id, room.state(), backfill, broadcast)
            };

            info!("Player {} authenticated in room {}", player_id, room_code);

            Ok(SessionStart {
                reply: ServerMessage::Authenticated {
                    player_id: player_id.clone(),
                    room_state,
                },
                backfill,
                broadcast,
                announce_roster: true,
                room_code,
                player_id,
            })
        }

        _ => Err(Rejection::policy("authentication required")),
    }
}

/// Dispatch an in-session message. Synchronous: no await happens while a
/// room lock is held.
fn handle_session_message(
    state: &ServerState,
    room_code: &str,
    player_id: &str,
    msg: ClientMessage,
) {
    match msg {
        ClientMessage::Ping => state.send_to_player(player_id, ServerMessage::Pong),
        ClientMessage::Action { action } => handle_action(state, room_code, player_id, &action),
        ClientMessage::StartGame { config } => {
            handle_start_game(state, room_code, player_id, config)
        }
        ClientMessage::ResetGame => handle_reset_game(state, room_code, player_id),
        ClientMessage::CreateRoom { .. }
        | ClientMessage::JoinRoom { .. }
        | ClientMessage::Authenticate { .. } => {
            state.send_to_player(
                player_id,
                ServerMessage::Error {
                    message: "already in a session".to_string(),
                },
            );
        }
    }
}

fn handle_action(state: &ServerState, room_code: &str, player_id: &str, action: &Action) {
    let outcome = match state.store.get_mut(room_code) {
        Ok(mut room) => {
            let result = room.process_action(player_id, action);
            result
                .map(|events| (events, room.next_phase_deadline, room.status))
                .map_err(|e| e.to_string())
        }
        Err(e) => Err(e.to_string()),
    };

    match outcome {
        Ok((events, deadline, status)) => {
            let _ = state.store.update_room_timer(room_code, deadline);
            for event in &events {
                state.broadcast_event(room_code, event);
            }
            if status == RoomStatus::Finished {
                state.broadcast_room_state(room_code);
            }
        }
        Err(message) => {
            state.send_to_player(
                player_id,
                ServerMessage::Error {
                    message: format!("action failed: {message}"),
                },
            );
        }
    }
}

fn handle_start_game(
    state: &ServerState,
    room_code: &str,
    player_id: &str,
    config: serde_json::Value,
) {
    let result: Result<(Vec<GameEvent>, Option<OffsetDateTime>), String> = (|| {
        let mut room = state.store.get_mut(room_code).map_err(|e| e.to_string())?;
        if !room.is_host(player_id) {
            return Err("only the host may start the game".to_string());
        }

        let game = state
            .registry
            .create_game(&room.game_type)
            .map_err(|e| e.to_string())?;
        let raw = serde_json::to_vec(&config).map_err(|e| e.to_string())?;
        let parsed = state
            .registry
            .parse_config(&room.game_type, &raw)
            .map_err(|e| e.to_string())?;

        let log_start = room.event_log.len();
        room.start_game(game, parsed.as_ref())
            .map_err(|e| e.to_string())?;
        Ok((
            room.event_log[log_start..].to_vec(),
            room.next_phase_deadline,
        ))
    })();

    match result {
        Ok((events, deadline)) => {
            let _ = state.store.update_room_timer(room_code, deadline);

            info!("Game started in room {}", room_code);
            for event in &events {
                state.broadcast_event(room_code, event);
            }
            state.broadcast_room_state(room_code);
        }
        Err(message) => state.send_to_player(player_id, ServerMessage::Error { message }),
    }
}

fn handle_reset_game(state: &ServerState, room_code: &str, player_id: &str) {
    let result: Result<(), String> = (|| {
        let mut room = state.store.get_mut(room_code).map_err(|e| e.to_string())?;
        if !room.is_host(player_id) {
            return Err("only the host may reset the game".to_string());
        }
        room.reset_game().map_err(|e| e.to_string())
    })();

    match result {
        Ok(()) => {
            let _ = state.store.update_room_timer(room_code, None);
            info!("Room {} reset to lobby", room_code);
            state.broadcast_room_state(room_code);
        }
        Err(message) => state.send_to_player(player_id, ServerMessage::Error { message }),
    }
}

/// Read frames until the next text message, a close, or an error.
async fn next_text(ws_receiver: &mut SplitStream<WebSocketStream<TcpStream>>) -> Option<String> {
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => return Some(text),
            Ok(Message::Close(_)) => return None,
            Ok(_) => continue,
            Err(e) => {
                warn!("WebSocket read error: {}", e);
                return None;
            }
        }
    }
    None
}

/// Forward queued messages to the socket and keep the connection alive
/// with periodic pings. Ends when the queue closes or a write fails.
async fn write_pump(
    mut ws_sender: SplitSink<WebSocketStream<TcpStream>, Message>,
    mut rx: mpsc::Receiver<ServerMessage>,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe = rx.recv() => {
                let Some(msg) = maybe else { break };
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to encode server message: {}", e);
                        continue;
                    }
                };
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if ws_sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = ws_sender.close().await;
}
