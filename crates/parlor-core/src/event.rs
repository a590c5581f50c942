//! Game events and per-player visibility filtering.
//!
//! Events are the source of truth: the room's current state is a fold over
//! its event log, and reconnecting clients are backfilled from the log. An
//! event is either public (every player, optionally spectators) or private
//! to an explicit allow-list, never both.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::game::{GamePhase, GameResults};

/// Actor id attached to server-generated events.
pub const SYSTEM_ACTOR: &str = "system";

// Event types shared by every game. Games define their own in addition.
pub const EVENT_PLAYER_JOINED: &str = "player_joined";
pub const EVENT_PLAYER_LEFT: &str = "player_left";
pub const EVENT_PLAYER_RECONNECTED: &str = "player_reconnected";
pub const EVENT_GAME_STARTED: &str = "game_started";
pub const EVENT_GAME_FINISHED: &str = "game_finished";
pub const EVENT_PHASE_CHANGED: &str = "phase_changed";

/// Payload serialization failed while constructing an event.
///
/// Callers must treat this as an internal error and abort the operation
/// that wanted to emit the event; it is never safe to drop the event and
/// continue.
#[derive(Debug, Error)]
#[error("failed to encode event payload: {0}")]
pub struct EventError(#[from] serde_json::Error);

/// Controls which clients receive an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventVisibility {
    /// All players (and spectators, if `spectator_ok`) see it.
    pub public: bool,
    /// Specific players who see it when not public.
    pub player_ids: Vec<String>,
    /// Spectators can see it.
    pub spectator_ok: bool,
}

/// An immutable fact about something that happened in a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(rename = "type")]
    pub event_type: String,
    pub actor_id: String,
    pub payload: Value,
    /// Never serialized: clients must not learn who else can see an event.
    #[serde(skip)]
    pub visibility: EventVisibility,
}

impl GameEvent {
    /// Create an event with a fresh id and timestamp.
    pub fn new<P: Serialize>(
        event_type: &str,
        actor_id: &str,
        payload: &P,
        visibility: EventVisibility,
    ) -> Result<Self, EventError> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            timestamp: OffsetDateTime::now_utc(),
            event_type: event_type.to_string(),
            actor_id: actor_id.to_string(),
            payload: serde_json::to_value(payload)?,
            visibility,
        })
    }

    /// Create an event visible to all players and spectators.
    pub fn new_public<P: Serialize>(
        event_type: &str,
        actor_id: &str,
        payload: &P,
    ) -> Result<Self, EventError> {
        Self::new(
            event_type,
            actor_id,
            payload,
            EventVisibility {
                public: true,
                player_ids: Vec::new(),
                spectator_ok: true,
            },
        )
    }

    /// Create an event visible only to the listed players.
    pub fn new_private<P: Serialize>(
        event_type: &str,
        actor_id: &str,
        payload: &P,
        visible_to: Vec<String>,
    ) -> Result<Self, EventError> {
        Self::new(
            event_type,
            actor_id,
            payload,
            EventVisibility {
                public: false,
                player_ids: visible_to,
                spectator_ok: false,
            },
        )
    }

    /// Whether this player should receive the event.
    pub fn can_player_see(&self, player_id: &str) -> bool {
        self.visibility.public
            || self
                .visibility
                .player_ids
                .iter()
                .any(|id| id == player_id)
    }
}

// Payloads for the shared event types.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerJoinedPayload {
    pub player_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerLeftPayload {
    pub player_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerReconnectedPayload {
    pub player_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStartedPayload {
    pub game_type: String,
    pub config: Value,
    pub player_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameFinishedPayload {
    pub results: GameResults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseChangedPayload {
    pub phase: GamePhase,
}
