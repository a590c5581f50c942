//! Client-facing views and wire payloads for the avalon game.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::roles::{Role, Team};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestCard {
    Success,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    Approve,
    Reject,
}

/// Outcome of a single completed quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestResult {
    pub quest_number: usize,
    pub team_size: usize,
    pub team_members: Vec<String>,
    /// Shuffled before counting so card order carries no information.
    pub cards: Vec<QuestCard>,
    pub fail_count: usize,
    pub success: bool,
    pub fails_required: usize,
}

/// State visible to one specific player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub phase: String,
    pub role: Option<Role>,
    pub team: Option<Team>,
    /// Player ids this player knows about, per the knowledge graph.
    pub knowledge: Vec<String>,
    pub has_acknowledged: bool,
    pub has_voted: bool,
    pub has_played_quest_card: bool,
    pub is_on_proposed_team: bool,
    pub is_current_leader: bool,
    pub can_propose_team: bool,
    pub can_vote: bool,
    pub can_play_quest_card: bool,
    pub can_assassinate: bool,
    pub quest_number: usize,
    pub rejection_count: u32,
    pub good_quest_wins: usize,
    pub evil_quest_wins: usize,
}

/// State visible to everyone, including spectators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicView {
    pub phase: String,
    pub player_count: usize,
    pub quest_number: usize,
    pub required_team_size: usize,
    pub current_leader_id: String,
    pub proposed_team: Vec<String>,
    pub votes_submitted: usize,
    pub total_votes: usize,
    pub cards_submitted: usize,
    pub total_cards_expected: usize,
    pub quest_results: Vec<QuestResult>,
    pub rejection_count: u32,
    pub acknowledgement_count: usize,
    pub good_quest_wins: usize,
    pub evil_quest_wins: usize,
}

// Event payloads.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignedPayload {
    pub role: Role,
    pub team: Team,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleKnowledgePayload {
    pub known_players: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAcknowledgedPayload {
    pub player_id: String,
    pub count: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderChangedPayload {
    pub leader_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamProposedPayload {
    pub leader_id: String,
    pub team_members: Vec<String>,
    pub quest_number: usize,
    pub team_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamVoteCastPayload {
    pub voter_id: String,
}

/// Private confirmation of the voter's own choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamVoteRecordedPayload {
    pub vote: Vote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamVoteResultPayload {
    pub approved: bool,
    /// voter id -> vote, revealed once the tally is complete.
    pub votes: HashMap<String, Vote>,
    pub approve_count: usize,
    pub reject_count: usize,
    pub rejection_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestCardPlayedPayload {
    /// Who played. Which card stays hidden.
    pub player_id: String,
}

/// Private confirmation of the submitted card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestCardRecordedPayload {
    pub card: QuestCard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestCompletedPayload {
    pub quest_number: usize,
    pub team_members: Vec<String>,
    pub cards: Vec<QuestCard>,
    pub fail_count: usize,
    pub success: bool,
    pub fails_required: usize,
    pub good_wins: usize,
    pub evil_wins: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssassinTargetPayload {
    pub target_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssassinResultPayload {
    pub target_id: String,
    pub target_role: Role,
    pub was_merlin: bool,
    pub evil_wins: bool,
}

/// Terminal event: hidden information is fully disclosed at game end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOverPayload {
    pub winning_team: Team,
    pub win_reason: String,
    pub roles: HashMap<String, Role>,
    pub teams: HashMap<String, Team>,
    pub quest_history: Vec<QuestResult>,
}

// Action payloads.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeTeamPayload {
    pub team_members: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteTeamPayload {
    pub vote: Vote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayQuestCardPayload {
    pub card: QuestCard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssassinatePayload {
    pub target_id: String,
}
