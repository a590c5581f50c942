//! WebSocket protocol messages for the parlor server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use parlor_core::{Action, GameEvent, RoomState};

/// Messages sent from client to server.
///
/// The first message on a fresh connection must establish or resume a
/// session (`create_room`, `join_room`, or `authenticate`); anything else
/// closes the socket with a policy-violation status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create a new room and become its host
    CreateRoom {
        game_type: String,
        display_name: String,
        #[serde(default)]
        max_players: Option<usize>,
    },

    /// Join an existing room by code
    JoinRoom {
        room_code: String,
        display_name: String,
    },

    /// Resume a session with a previously issued token
    Authenticate {
        room_code: String,
        session_token: String,
    },

    /// Start the game with a game-specific config (host only)
    StartGame {
        #[serde(default)]
        config: Value,
    },

    /// Return the room to the lobby for another round (host only)
    ResetGame,

    /// Submit a game action
    Action { action: Action },

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    /// New session credentials after create_room/join_room. The only
    /// message that ever carries a session token.
    SessionCreated {
        room_code: String,
        player_id: String,
        session_token: String,
        room_state: RoomState,
    },

    /// Session resumed successfully
    Authenticated {
        player_id: String,
        room_state: RoomState,
    },

    /// Room snapshot after a roster or status change
    RoomState { room_state: RoomState },

    /// A single game event
    Event { event: GameEvent },

    /// Event backfill, sent on reconnect
    Events { events: Vec<GameEvent> },

    /// Request failed
    Error { message: String },

    /// Pong response
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_core::event::SYSTEM_ACTOR;

    #[test]
    fn test_client_message_tags() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "create_room", "payload": {"game_type": "werewolf", "display_name": "Alice"}}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::CreateRoom { max_players: None, .. }
        ));

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "action", "payload": {"action": {"type": "vote", "payload": {"target_id": "p1"}}}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::Action { action } => assert_eq!(action.action_type, "vote"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_client_message_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type": "teleport"}"#).is_err());
    }

    #[test]
    fn test_server_message_round_trip() {
        let event =
            GameEvent::new_public("vote_cast", SYSTEM_ACTOR, &serde_json::json!({"voter_id": "p1"}))
                .unwrap();
        let text = serde_json::to_string(&ServerMessage::Event { event }).unwrap();
        assert!(text.contains(r#""type":"event""#));

        let parsed: ServerMessage = serde_json::from_str(&text).unwrap();
        match parsed {
            ServerMessage::Event { event } => assert_eq!(event.event_type, "vote_cast"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_pong_has_no_payload() {
        let text = serde_json::to_string(&ServerMessage::Pong).unwrap();
        assert_eq!(text, r#"{"type":"pong"}"#);
    }
}
