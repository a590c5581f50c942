//! Client-facing views and wire payloads for the werewolf game.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::config::Role;
use super::narration::NightScriptStep;

/// State visible to one specific player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub phase: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ends_at: Option<OffsetDateTime>,
    /// The card this player was dealt. Night swaps are never reflected
    /// here; nobody learns their card moved until the reveal.
    pub your_role: Option<Role>,
    pub has_acknowledged: bool,
    pub has_voted: bool,
    pub timer_active: bool,
}

/// State visible to everyone, including spectators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicView {
    pub phase: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ends_at: Option<OffsetDateTime>,
    pub player_count: usize,
    pub acknowledgement_count: usize,
    pub votes_submitted: usize,
    pub timer_active: bool,
}

// Event payloads.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignedPayload {
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAcknowledgedPayload {
    pub player_id: String,
    pub count: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WerewolfWakeupPayload {
    pub other_werewolves: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasonWakeupPayload {
    pub other_masons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NightScriptPayload {
    pub script: Vec<NightScriptStep>,
}

/// One face-down center card, revealed to a single viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CenterCardView {
    pub index: usize,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CenterCardViewedPayload {
    pub card: CenterCardView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeerPlayerResultPayload {
    pub target_id: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeerCenterResultPayload {
    pub cards: Vec<CenterCardView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobberResultPayload {
    pub target_id: String,
    pub new_role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TroublemakerResultPayload {
    pub first_target_id: String,
    pub second_target_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrunkResultPayload {
    pub center_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsomniacResultPayload {
    pub final_role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteCastPayload {
    pub voter_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotesRevealedPayload {
    /// voter id -> target id
    pub votes: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerToggledPayload {
    pub active: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ends_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerExtendedPayload {
    #[serde(with = "time::serde::rfc3339")]
    pub ends_at: OffsetDateTime,
    pub extended_by_secs: u64,
}

// Action payloads.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotePayload {
    pub target_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleTimerPayload {
    pub enable: bool,
    #[serde(default)]
    pub duration_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendTimerPayload {
    #[serde(default)]
    pub seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewCenterPayload {
    pub index: usize,
}

/// Seer payload: exactly one of `target_id` (look at a player) or
/// `center_indices` (look at two center cards).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeerViewPayload {
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub center_indices: Option<Vec<usize>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobberSwapPayload {
    pub target_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TroublemakerSwapPayload {
    pub first_target_id: String,
    pub second_target_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrunkSwapPayload {
    pub center_index: usize,
}
