//! Anonymous participants identified by session tokens.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// A participant in a room. No signup: identity is possession of the
/// session token, `id` is the stable handle shared with game logic.
///
/// All mutation happens under the owning room's exclusive lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    /// Reconnection credential. Never serialized to clients.
    #[serde(skip_serializing, default)]
    pub session_token: String,
    pub display_name: String,
    pub connected: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_seen_at: OffsetDateTime,
}

impl Player {
    /// Create a player with generated id and session token.
    pub fn new(display_name: &str) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            session_token: Uuid::new_v4().to_string(),
            display_name: display_name.to_string(),
            connected: true,
            joined_at: now,
            last_seen_at: now,
        }
    }

    /// Mark the player as active now.
    pub fn touch(&mut self) {
        self.last_seen_at = OffsetDateTime::now_utc();
    }

    /// Mark the player as disconnected.
    pub fn disconnect(&mut self) {
        self.connected = false;
        self.touch();
    }

    /// Mark the player as connected again.
    pub fn reconnect(&mut self) {
        self.connected = true;
        self.touch();
    }

    /// Whether the player has been inactive longer than `timeout`.
    pub fn is_stale(&self, timeout: Duration, now: OffsetDateTime) -> bool {
        now - self.last_seen_at > timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_player_has_distinct_id_and_token() {
        let p = Player::new("Alice");
        assert_ne!(p.id, p.session_token);
        assert!(p.connected);
    }

    #[test]
    fn test_session_token_never_serialized() {
        let p = Player::new("Alice");
        let json = serde_json::to_string(&p).unwrap();
        assert!(!json.contains("session_token"));
        assert!(!json.contains(&p.session_token));
    }

    #[test]
    fn test_disconnect_and_reconnect() {
        let mut p = Player::new("Alice");
        p.disconnect();
        assert!(!p.connected);
        p.reconnect();
        assert!(p.connected);
    }

    #[test]
    fn test_staleness() {
        let p = Player::new("Alice");
        let now = OffsetDateTime::now_utc();
        assert!(!p.is_stale(Duration::hours(1), now));
        assert!(p.is_stale(Duration::hours(1), now + Duration::hours(2)));
    }
}
