//! The polymorphic game contract every game variant implements.
//!
//! The platform only ever talks to a game through [`Game`]: actions come in
//! as an opaque [`Action`] envelope, get validated, then processed into
//! events. Per-variant action and payload decoding stays inside the variant;
//! nothing here knows what a "vote" or a "quest" is.

use std::any::Any;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

use crate::event::{EventError, GameEvent};
use crate::player::Player;

/// Configuration errors raised while parsing or validating a game config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised by game engines while validating or processing actions.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("wrong config type for this game")]
    ConfigMismatch,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("player is not part of this game")]
    PlayerNotInGame,

    #[error("unknown action type: {0}")]
    UnknownAction(String),

    #[error("malformed {action} payload: {reason}")]
    MalformedPayload {
        action: &'static str,
        reason: String,
    },

    #[error("{action} is only allowed during the {phase} phase")]
    WrongPhase {
        action: &'static str,
        phase: &'static str,
    },

    #[error("{0}")]
    NotAllowed(&'static str),

    #[error("{0} already submitted")]
    Duplicate(&'static str),

    #[error("unknown target player: {0}")]
    UnknownTarget(String),

    #[error("team must have exactly {expected} members, got {got}")]
    TeamSize { expected: usize, got: usize },

    #[error(transparent)]
    Event(#[from] EventError),
}

/// A player's intent to do something in the game.
///
/// Each game variant defines its own closed set of recognized `type` strings
/// and payload shapes; unrecognized types are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub payload: Value,
}

impl Action {
    pub fn new(action_type: &str, payload: Value) -> Self {
        Self {
            action_type: action_type.to_string(),
            payload,
        }
    }
}

/// The current phase of a game, for UI rendering and timeout scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePhase {
    pub name: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ends_at: Option<OffsetDateTime>,
    pub message: String,
}

/// Final outcome of a finished game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResults {
    /// Player ids of the winners.
    pub winners: Vec<String>,
    /// Machine-readable reason code.
    pub win_reason: String,
    /// Game-specific final state, fully disclosed.
    pub final_state: Value,
}

/// Decode an action payload into its typed shape, reporting which action
/// the payload belonged to on failure.
pub(crate) fn decode_payload<T: serde::de::DeserializeOwned>(
    action: &'static str,
    payload: &Value,
) -> Result<T, GameError> {
    serde_json::from_value(payload.clone()).map_err(|e| GameError::MalformedPayload {
        action,
        reason: e.to_string(),
    })
}

/// Game-specific configuration, produced by a registered parser.
pub trait GameConfig: Send + Sync {
    /// The game type this config belongs to.
    fn game_type(&self) -> &'static str;

    /// Validate independent of any game instance (role composition, counts).
    fn validate(&self) -> Result<(), ConfigError>;

    /// Downcast hook so engines can recover their concrete config type.
    fn as_any(&self) -> &dyn Any;
}

/// The interface every game variant implements.
pub trait Game: Send + Sync {
    /// Set up the game with configuration and players. Returns the initial
    /// events (game started, role assignments, first phase change).
    fn initialize(
        &mut self,
        config: &dyn GameConfig,
        players: &[Player],
    ) -> Result<Vec<GameEvent>, GameError>;

    /// Check whether a player may perform the action in the current state.
    /// Never mutates state.
    fn validate_action(&self, player_id: &str, action: &Action) -> Result<(), GameError>;

    /// Execute an action and return the resulting events. Must only be
    /// called after `validate_action` succeeded on the same input and state;
    /// payload shape is still re-checked here as defense in depth.
    fn process_action(
        &mut self,
        player_id: &str,
        action: &Action,
    ) -> Result<Vec<GameEvent>, GameError>;

    /// The game state visible to this specific player (their own secrets
    /// included, everyone else's filtered out).
    fn player_state(&self, player_id: &str) -> Result<Value, GameError>;

    /// The game state visible to all players and spectators.
    fn public_state(&self) -> Result<Value, GameError>;

    /// The current phase.
    fn phase(&self) -> GamePhase;

    /// Whether the game has concluded.
    fn is_finished(&self) -> bool;

    /// Final results. Only meaningful once `is_finished` returns true.
    fn results(&self) -> GameResults;

    /// Called periodically by the deadline sweep. A no-op for phases
    /// without a deadline.
    fn check_phase_timeout(&mut self, now: OffsetDateTime)
        -> Result<Vec<GameEvent>, GameError>;

    /// Late-bound host binding for games that deliver host-only material.
    /// The host is a room-level concept assigned after construction; games
    /// that do not care keep the default no-op.
    fn set_host(&mut self, host_id: &str) {
        let _ = host_id;
    }
}
