//! Room orchestration: roster, append-only event log, and game lifecycle.
//!
//! A room is a single mutual-exclusion domain. The store hands out exclusive
//! or shared references per room; every mutation below assumes the caller
//! holds the exclusive side.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::event::GameEvent;
use crate::game::{Action, Game, GameConfig, GameError};
use crate::player::Player;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("cannot join: game already started")]
    GameInProgress,

    #[error("room is full")]
    RoomFull,

    #[error("player already in room")]
    DuplicatePlayer,

    #[error("player not in room")]
    PlayerNotInRoom,

    #[error("invalid session token")]
    InvalidSessionToken,

    #[error("game already started")]
    AlreadyStarted,

    #[error("no game in progress")]
    NoGameInProgress,

    #[error("no game to reset")]
    NothingToReset,

    #[error(transparent)]
    Game(#[from] GameError),
}

/// Lifecycle status of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Lobby, waiting for players.
    Waiting,
    /// Game in progress.
    Playing,
    /// Game concluded.
    Finished,
}

/// A game session container identified by a short code.
pub struct Room {
    pub id: String,
    pub created_at: OffsetDateTime,
    pub status: RoomStatus,
    pub game_type: String,
    pub max_players: usize,
    pub host_id: String,
    pub players: HashMap<String, Player>,
    /// Append-only event history.
    pub event_log: Vec<GameEvent>,
    /// The game state machine, attached while playing/finished.
    pub game: Option<Box<dyn Game>>,
    /// Deadline mirrored from the game's current phase, used by the
    /// store's timeout scheduling.
    pub next_phase_deadline: Option<OffsetDateTime>,
}

impl Room {
    pub fn new(room_code: &str, game_type: &str, host: Player, max_players: usize) -> Self {
        let host_id = host.id.clone();
        let mut players = HashMap::new();
        players.insert(host_id.clone(), host);

        Self {
            id: room_code.to_string(),
            created_at: OffsetDateTime::now_utc(),
            status: RoomStatus::Waiting,
            game_type: game_type.to_string(),
            max_players,
            host_id,
            players,
            event_log: Vec::new(),
            game: None,
            next_phase_deadline: None,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    /// Add a player to the lobby.
    pub fn add_player(&mut self, player: Player) -> Result<(), RoomError> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameInProgress);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }
        if self.players.contains_key(&player.id) {
            return Err(RoomError::DuplicatePlayer);
        }

        self.players.insert(player.id.clone(), player);
        Ok(())
    }

    /// Remove a player. If the host leaves, the earliest-joined remaining
    /// player becomes the new host. Returns true when the room is now empty.
    pub fn remove_player(&mut self, player_id: &str) -> Result<bool, RoomError> {
        if self.players.remove(player_id).is_none() {
            return Err(RoomError::PlayerNotInRoom);
        }

        if self.host_id == player_id {
            if let Some(next_host) = self.players_by_join_order().first() {
                self.host_id = next_host.id.clone();
            }
        }

        Ok(self.players.is_empty())
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn player_by_token(&self, token: &str) -> Option<&Player> {
        self.players.values().find(|p| p.session_token == token)
    }

    pub fn is_host(&self, player_id: &str) -> bool {
        self.host_id == player_id
    }

    pub fn set_player_connected(&mut self, player_id: &str, connected: bool) {
        if let Some(player) = self.players.get_mut(player_id) {
            if connected {
                player.reconnect();
            } else {
                player.disconnect();
            }
        }
    }

    /// Players sorted by join time (ties broken by id). Games receive this
    /// order so "next player" rotation is deterministic.
    pub fn players_by_join_order(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.id.cmp(&b.id)));
        players
    }

    pub fn append_event(&mut self, event: GameEvent) {
        self.event_log.push(event);
    }

    pub fn append_events(&mut self, events: Vec<GameEvent>) {
        self.event_log.extend(events);
    }

    /// All events this player can see, in log order.
    pub fn events_for_player(&self, player_id: &str) -> Vec<GameEvent> {
        self.event_log
            .iter()
            .filter(|e| e.can_player_see(player_id))
            .cloned()
            .collect()
    }

    /// Public events only (board view, spectators).
    pub fn public_events(&self) -> Vec<GameEvent> {
        self.event_log
            .iter()
            .filter(|e| e.visibility.public)
            .cloned()
            .collect()
    }

    /// Initialize the game and transition to playing.
    pub fn start_game(
        &mut self,
        mut game: Box<dyn Game>,
        config: &dyn GameConfig,
    ) -> Result<(), RoomError> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::AlreadyStarted);
        }

        let players: Vec<Player> = self
            .players_by_join_order()
            .into_iter()
            .cloned()
            .collect();

        let events = game.initialize(config, &players)?;
        game.set_host(&self.host_id);

        self.next_phase_deadline = game.phase().ends_at;
        self.game = Some(game);
        self.status = RoomStatus::Playing;
        self.event_log.extend(events);

        Ok(())
    }

    /// Return the room to the lobby for another round. Keeps the roster,
    /// clears the game and the event log.
    pub fn reset_game(&mut self) -> Result<(), RoomError> {
        if self.status == RoomStatus::Waiting {
            return Err(RoomError::NothingToReset);
        }

        self.game = None;
        self.event_log.clear();
        self.status = RoomStatus::Waiting;
        self.next_phase_deadline = None;

        Ok(())
    }

    /// Validate and process a player action, appending the resulting events
    /// to the log. Flips the room to finished when the game concludes.
    pub fn process_action(
        &mut self,
        player_id: &str,
        action: &Action,
    ) -> Result<Vec<GameEvent>, RoomError> {
        if self.status != RoomStatus::Playing {
            return Err(RoomError::NoGameInProgress);
        }

        let game = self.game.as_mut().ok_or(RoomError::NoGameInProgress)?;

        game.validate_action(player_id, action)?;
        let events = game.process_action(player_id, action)?;

        self.event_log.extend(events.iter().cloned());
        self.next_phase_deadline = game.phase().ends_at;

        if game.is_finished() {
            self.status = RoomStatus::Finished;
        }

        Ok(events)
    }

    /// Run the game's phase-timeout check. Same locking discipline and
    /// event handling as an ordinary action.
    pub fn check_phase_timeout(
        &mut self,
        now: OffsetDateTime,
    ) -> Result<Vec<GameEvent>, RoomError> {
        if self.status != RoomStatus::Playing {
            return Err(RoomError::NoGameInProgress);
        }

        let game = self.game.as_mut().ok_or(RoomError::NoGameInProgress)?;

        let events = game.check_phase_timeout(now)?;

        self.event_log.extend(events.iter().cloned());
        self.next_phase_deadline = game.phase().ends_at;

        if game.is_finished() {
            self.status = RoomStatus::Finished;
        }

        Ok(events)
    }

    /// Snapshot for client consumption. Session tokens are skipped by the
    /// `Player` serializer.
    pub fn state(&self) -> RoomState {
        RoomState {
            id: self.id.clone(),
            status: self.status,
            game_type: self.game_type.clone(),
            max_players: self.max_players,
            host_id: self.host_id.clone(),
            players: self
                .players_by_join_order()
                .into_iter()
                .cloned()
                .collect(),
        }
    }

    /// Status, creation time, and whether anyone is connected, for the
    /// store's cleanup policy.
    pub fn cleanup_info(&self) -> (RoomStatus, OffsetDateTime, bool) {
        let any_connected = self.players.values().any(|p| p.connected);
        (self.status, self.created_at, any_connected)
    }
}

/// A snapshot of room state for client consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomState {
    pub id: String,
    pub status: RoomStatus,
    pub game_type: String,
    pub max_players: usize,
    pub host_id: String,
    pub players: Vec<Player>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{GameEvent, SYSTEM_ACTOR};

    fn room_with_capacity(max_players: usize) -> (Room, Player) {
        let host = Player::new("Host");
        let room = Room::new("ABC234", "werewolf", host.clone(), max_players);
        (room, host)
    }

    #[test]
    fn test_new_room_starts_waiting_with_host() {
        let (room, host) = room_with_capacity(6);
        assert_eq!(room.status, RoomStatus::Waiting);
        assert_eq!(room.player_count(), 1);
        assert_eq!(room.host_id, host.id);
        assert!(room.game.is_none());
    }

    #[test]
    fn test_add_player_rejects_over_capacity() {
        let (mut room, _host) = room_with_capacity(2);

        room.add_player(Player::new("Bob")).unwrap();
        assert!(room.is_full());

        assert!(matches!(
            room.add_player(Player::new("Carol")),
            Err(RoomError::RoomFull)
        ));
    }

    #[test]
    fn test_add_player_rejects_duplicate_id() {
        let (mut room, _host) = room_with_capacity(5);

        let bob = Player::new("Bob");
        room.add_player(bob.clone()).unwrap();

        let mut dup = Player::new("Bob again");
        dup.id = bob.id.clone();
        assert!(matches!(
            room.add_player(dup),
            Err(RoomError::DuplicatePlayer)
        ));
    }

    #[test]
    fn test_remove_player_reassigns_host() {
        let (mut room, host) = room_with_capacity(4);
        let second = Player::new("Bob");
        room.add_player(second.clone()).unwrap();

        let empty = room.remove_player(&host.id).unwrap();
        assert!(!empty);
        assert_eq!(room.host_id, second.id);

        assert!(matches!(
            room.remove_player(&host.id),
            Err(RoomError::PlayerNotInRoom)
        ));

        assert!(room.remove_player(&second.id).unwrap());
    }

    #[test]
    fn test_player_by_token() {
        let (room, host) = room_with_capacity(4);
        assert_eq!(
            room.player_by_token(&host.session_token).map(|p| &p.id),
            Some(&host.id)
        );
        assert!(room.player_by_token("nope").is_none());
    }

    #[test]
    fn test_process_action_requires_playing_status() {
        let (mut room, host) = room_with_capacity(4);
        let action = Action::new("vote", serde_json::Value::Null);
        assert!(matches!(
            room.process_action(&host.id, &action),
            Err(RoomError::NoGameInProgress)
        ));
    }

    #[test]
    fn test_event_filtering_per_viewer() {
        let (mut room, host) = room_with_capacity(4);
        let second = Player::new("Bob");
        room.add_player(second.clone()).unwrap();

        room.append_event(
            GameEvent::new_public("announce", SYSTEM_ACTOR, &serde_json::json!({})).unwrap(),
        );
        room.append_event(
            GameEvent::new_private(
                "whisper",
                SYSTEM_ACTOR,
                &serde_json::json!({}),
                vec![host.id.clone()],
            )
            .unwrap(),
        );

        assert_eq!(room.events_for_player(&host.id).len(), 2);
        assert_eq!(room.events_for_player(&second.id).len(), 1);
        assert_eq!(room.public_events().len(), 1);
    }

    #[test]
    fn test_reset_game_requires_game() {
        let (mut room, _host) = room_with_capacity(4);
        assert!(matches!(
            room.reset_game(),
            Err(RoomError::NothingToReset)
        ));
    }

    #[test]
    fn test_state_snapshot_orders_players_by_join_time() {
        let (mut room, host) = room_with_capacity(4);
        let second = Player::new("Bob");
        room.add_player(second.clone()).unwrap();

        let state = room.state();
        assert_eq!(state.players.len(), 2);
        assert_eq!(state.players[0].id, host.id);
        assert_eq!(state.players[1].id, second.id);
    }
}
