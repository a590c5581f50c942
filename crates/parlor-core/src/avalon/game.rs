//! The avalon state machine.
//!
//! Five quests, rotating leadership, public team votes, secret quest cards.
//! Good wins three quests to force the endgame; Evil wins three quests, five
//! consecutive rejections, or the assassination of Merlin.

use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::json;
use time::OffsetDateTime;

use crate::event::{
    GameEvent, PhaseChangedPayload, EVENT_GAME_FINISHED, EVENT_GAME_STARTED,
    EVENT_PHASE_CHANGED, SYSTEM_ACTOR,
};
use crate::game::{
    decode_payload, Action, Game, GameConfig, GameError, GamePhase, GameResults,
};
use crate::player::Player;

use super::config::{Config, GAME_TYPE};
use super::quests::{fails_required, team_size, MAX_REJECTIONS};
use super::roles::{has_role, role_knowledge, shuffle_roles, Role, Team};
use super::state::{
    AssassinResultPayload, AssassinTargetPayload, AssassinatePayload, GameOverPayload,
    LeaderChangedPayload, PlayQuestCardPayload, PlayerView, ProposeTeamPayload, PublicView,
    QuestCard, QuestCardPlayedPayload, QuestCardRecordedPayload, QuestCompletedPayload,
    QuestResult, RoleAcknowledgedPayload, RoleAssignedPayload, RoleKnowledgePayload,
    TeamProposedPayload, TeamVoteCastPayload, TeamVoteRecordedPayload, TeamVoteResultPayload,
    Vote, VoteTeamPayload,
};

pub const ACTION_ACKNOWLEDGE_ROLE: &str = "acknowledge_role";
pub const ACTION_PROPOSE_TEAM: &str = "propose_team";
pub const ACTION_VOTE_TEAM: &str = "vote_team";
pub const ACTION_PLAY_QUEST_CARD: &str = "play_quest_card";
pub const ACTION_ASSASSINATE: &str = "assassinate";

pub const EVENT_ROLE_ASSIGNED: &str = "role_assigned";
pub const EVENT_ROLE_KNOWLEDGE: &str = "role_knowledge";
pub const EVENT_ROLE_ACKNOWLEDGED: &str = "role_acknowledged";
pub const EVENT_LEADER_CHANGED: &str = "leader_changed";
pub const EVENT_TEAM_PROPOSED: &str = "team_proposed";
pub const EVENT_TEAM_VOTE_CAST: &str = "team_vote_cast";
pub const EVENT_TEAM_VOTE_RECORDED: &str = "team_vote_recorded";
pub const EVENT_TEAM_VOTE_RESULT: &str = "team_vote_result";
pub const EVENT_QUEST_CARD_PLAYED: &str = "quest_card_played";
pub const EVENT_QUEST_CARD_RECORDED: &str = "quest_card_recorded";
pub const EVENT_QUEST_COMPLETED: &str = "quest_completed";
pub const EVENT_ASSASSIN_TARGET: &str = "assassin_target";
pub const EVENT_ASSASSIN_RESULT: &str = "assassin_result";

pub const WIN_FIVE_REJECTIONS: &str = "five_consecutive_rejections";
pub const WIN_GOOD_THREE_QUESTS: &str = "good_won_three_quests";
pub const WIN_EVIL_THREE_QUESTS: &str = "evil_sabotaged_three_quests";
pub const WIN_ASSASSIN_FOUND_MERLIN: &str = "assassin_found_merlin";
pub const WIN_ASSASSIN_FAILED: &str = "assassin_failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    RoleReveal,
    TeamBuilding,
    TeamVoting,
    QuestExecution,
    Assassination,
    Finished,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::RoleReveal => "role_reveal",
            Phase::TeamBuilding => "team_building",
            Phase::TeamVoting => "team_voting",
            Phase::QuestExecution => "quest_execution",
            Phase::Assassination => "assassination",
            Phase::Finished => "finished",
        }
    }
}

/// The avalon game state machine.
pub struct AvalonGame {
    /// Player ids in join order; leadership rotates through this list.
    pub(super) player_ids: Vec<String>,
    pub(super) phase: Phase,

    pub(super) roles: HashMap<String, Role>,
    pub(super) teams: HashMap<String, Team>,
    pub(super) knowledge: HashMap<String, Vec<String>>,

    pub(super) quest_number: usize,
    pub(super) quest_results: Vec<QuestResult>,
    pub(super) leader_index: usize,
    pub(super) rejection_count: u32,

    pub(super) proposed_team: Vec<String>,
    pub(super) team_votes: HashMap<String, Vote>,
    pub(super) quest_cards: HashMap<String, QuestCard>,

    pub(super) assassin_target: Option<String>,
    pub(super) acknowledged: HashSet<String>,

    pub(super) winning_team: Option<Team>,
    pub(super) win_reason: Option<&'static str>,
}

impl AvalonGame {
    pub fn new() -> Self {
        Self {
            player_ids: Vec::new(),
            phase: Phase::Setup,
            roles: HashMap::new(),
            teams: HashMap::new(),
            knowledge: HashMap::new(),
            quest_number: 1,
            quest_results: Vec::new(),
            leader_index: 0,
            rejection_count: 0,
            proposed_team: Vec::new(),
            team_votes: HashMap::new(),
            quest_cards: HashMap::new(),
            assassin_target: None,
            acknowledged: HashSet::new(),
            winning_team: None,
            win_reason: None,
        }
    }

    pub(super) fn current_leader(&self) -> &str {
        &self.player_ids[self.leader_index]
    }

    fn rotate_leader(&mut self) {
        self.leader_index = (self.leader_index + 1) % self.player_ids.len();
    }

    fn is_on_proposed_team(&self, player_id: &str) -> bool {
        self.proposed_team.iter().any(|id| id == player_id)
    }

    pub(super) fn quest_wins(&self) -> (usize, usize) {
        let good = self.quest_results.iter().filter(|r| r.success).count();
        (good, self.quest_results.len() - good)
    }

    fn phase_changed_event(&self) -> Result<GameEvent, GameError> {
        Ok(GameEvent::new_public(
            EVENT_PHASE_CHANGED,
            SYSTEM_ACTOR,
            &PhaseChangedPayload {
                phase: self.phase_info(),
            },
        )?)
    }

    fn leader_changed_event(&self) -> Result<GameEvent, GameError> {
        Ok(GameEvent::new_public(
            EVENT_LEADER_CHANGED,
            SYSTEM_ACTOR,
            &LeaderChangedPayload {
                leader_id: self.current_leader().to_string(),
            },
        )?)
    }

    fn process_acknowledge(&mut self, player_id: &str) -> Result<Vec<GameEvent>, GameError> {
        self.acknowledged.insert(player_id.to_string());

        let mut events = vec![GameEvent::new_public(
            EVENT_ROLE_ACKNOWLEDGED,
            player_id,
            &RoleAcknowledgedPayload {
                player_id: player_id.to_string(),
                count: self.acknowledged.len(),
                total: self.player_ids.len(),
            },
        )?];

        if self.acknowledged.len() == self.player_ids.len() {
            self.phase = Phase::TeamBuilding;
            events.push(self.phase_changed_event()?);
        }

        Ok(events)
    }

    fn process_propose_team(
        &mut self,
        player_id: &str,
        action: &Action,
    ) -> Result<Vec<GameEvent>, GameError> {
        let payload: ProposeTeamPayload = decode_payload(ACTION_PROPOSE_TEAM, &action.payload)?;

        let required = team_size(self.player_ids.len(), self.quest_number);
        if payload.team_members.len() != required {
            return Err(GameError::TeamSize {
                expected: required,
                got: payload.team_members.len(),
            });
        }

        let mut seen = HashSet::new();
        for member in &payload.team_members {
            if !self.roles.contains_key(member) {
                return Err(GameError::UnknownTarget(member.clone()));
            }
            if !seen.insert(member.as_str()) {
                return Err(GameError::MalformedPayload {
                    action: ACTION_PROPOSE_TEAM,
                    reason: format!("duplicate team member: {member}"),
                });
            }
        }

        self.proposed_team = payload.team_members.clone();
        // Stale votes from a previous proposal never leak into this one.
        self.team_votes.clear();

        let mut events = vec![GameEvent::new_public(
            EVENT_TEAM_PROPOSED,
            player_id,
            &TeamProposedPayload {
                leader_id: player_id.to_string(),
                team_members: payload.team_members,
                quest_number: self.quest_number,
                team_size: required,
            },
        )?];

        self.phase = Phase::TeamVoting;
        events.push(self.phase_changed_event()?);

        Ok(events)
    }

    fn process_vote_team(
        &mut self,
        player_id: &str,
        action: &Action,
    ) -> Result<Vec<GameEvent>, GameError> {
        let payload: VoteTeamPayload = decode_payload(ACTION_VOTE_TEAM, &action.payload)?;

        self.team_votes.insert(player_id.to_string(), payload.vote);

        let mut events = vec![
            GameEvent::new_public(
                EVENT_TEAM_VOTE_CAST,
                player_id,
                &TeamVoteCastPayload {
                    voter_id: player_id.to_string(),
                },
            )?,
            GameEvent::new_private(
                EVENT_TEAM_VOTE_RECORDED,
                SYSTEM_ACTOR,
                &TeamVoteRecordedPayload { vote: payload.vote },
                vec![player_id.to_string()],
            )?,
        ];

        if self.team_votes.len() < self.player_ids.len() {
            return Ok(events);
        }

        // Full tally: votes become public.
        let approve_count = self
            .team_votes
            .values()
            .filter(|v| **v == Vote::Approve)
            .count();
        let reject_count = self.team_votes.len() - approve_count;
        let approved = approve_count > reject_count;

        if approved {
            self.rejection_count = 0;
        } else {
            self.rejection_count += 1;
        }

        events.push(GameEvent::new_public(
            EVENT_TEAM_VOTE_RESULT,
            SYSTEM_ACTOR,
            &TeamVoteResultPayload {
                approved,
                votes: self.team_votes.clone(),
                approve_count,
                reject_count,
                rejection_count: self.rejection_count,
            },
        )?);

        if approved {
            self.phase = Phase::QuestExecution;
            self.quest_cards.clear();
            events.push(self.phase_changed_event()?);
        } else if self.rejection_count >= MAX_REJECTIONS {
            // Evil grinds the table to a halt and wins outright.
            events.extend(self.finish(Team::Evil, WIN_FIVE_REJECTIONS)?);
        } else {
            self.rotate_leader();
            events.push(self.leader_changed_event()?);

            self.phase = Phase::TeamBuilding;
            events.push(self.phase_changed_event()?);
        }

        Ok(events)
    }

    fn process_play_quest_card(
        &mut self,
        player_id: &str,
        action: &Action,
    ) -> Result<Vec<GameEvent>, GameError> {
        let payload: PlayQuestCardPayload =
            decode_payload(ACTION_PLAY_QUEST_CARD, &action.payload)?;

        // Good players are constitutionally incapable of sabotage.
        if self.teams.get(player_id) == Some(&Team::Good) && payload.card == QuestCard::Fail {
            return Err(GameError::NotAllowed(
                "good team players can only play success cards",
            ));
        }

        self.quest_cards.insert(player_id.to_string(), payload.card);

        let mut events = vec![
            GameEvent::new_public(
                EVENT_QUEST_CARD_PLAYED,
                player_id,
                &QuestCardPlayedPayload {
                    player_id: player_id.to_string(),
                },
            )?,
            GameEvent::new_private(
                EVENT_QUEST_CARD_RECORDED,
                SYSTEM_ACTOR,
                &QuestCardRecordedPayload { card: payload.card },
                vec![player_id.to_string()],
            )?,
        ];

        if self.quest_cards.len() < self.proposed_team.len() {
            return Ok(events);
        }

        // Shuffle before counting so card order carries no information
        // about who played what.
        let mut cards: Vec<QuestCard> = self.quest_cards.values().copied().collect();
        cards.shuffle(&mut rand::thread_rng());

        let fail_count = cards.iter().filter(|c| **c == QuestCard::Fail).count();
        let required_fails = fails_required(self.player_ids.len(), self.quest_number);
        let success = fail_count < required_fails;

        self.quest_results.push(QuestResult {
            quest_number: self.quest_number,
            team_size: self.proposed_team.len(),
            team_members: self.proposed_team.clone(),
            cards: cards.clone(),
            fail_count,
            success,
            fails_required: required_fails,
        });

        let (good_wins, evil_wins) = self.quest_wins();

        events.push(GameEvent::new_public(
            EVENT_QUEST_COMPLETED,
            SYSTEM_ACTOR,
            &QuestCompletedPayload {
                quest_number: self.quest_number,
                team_members: self.proposed_team.clone(),
                cards,
                fail_count,
                success,
                fails_required: required_fails,
                good_wins,
                evil_wins,
            },
        )?);

        if good_wins >= 3 {
            if has_role(&self.roles, Role::Merlin) {
                // Evil gets one last shot at the win.
                self.phase = Phase::Assassination;
                events.push(self.phase_changed_event()?);
            } else {
                events.extend(self.finish(Team::Good, WIN_GOOD_THREE_QUESTS)?);
            }
        } else if evil_wins >= 3 {
            events.extend(self.finish(Team::Evil, WIN_EVIL_THREE_QUESTS)?);
        } else {
            self.quest_number += 1;
            self.rotate_leader();
            self.rejection_count = 0;

            events.push(self.leader_changed_event()?);
            self.phase = Phase::TeamBuilding;
            events.push(self.phase_changed_event()?);
        }

        Ok(events)
    }

    fn process_assassinate(
        &mut self,
        player_id: &str,
        action: &Action,
    ) -> Result<Vec<GameEvent>, GameError> {
        let payload: AssassinatePayload = decode_payload(ACTION_ASSASSINATE, &action.payload)?;

        if !self.roles.contains_key(&payload.target_id) {
            return Err(GameError::UnknownTarget(payload.target_id));
        }

        self.assassin_target = Some(payload.target_id.clone());

        let target_role = self.roles[&payload.target_id];
        let was_merlin = target_role == Role::Merlin;

        let mut events = vec![
            GameEvent::new_public(
                EVENT_ASSASSIN_TARGET,
                player_id,
                &AssassinTargetPayload {
                    target_id: payload.target_id.clone(),
                },
            )?,
            GameEvent::new_public(
                EVENT_ASSASSIN_RESULT,
                SYSTEM_ACTOR,
                &AssassinResultPayload {
                    target_id: payload.target_id,
                    target_role,
                    was_merlin,
                    evil_wins: was_merlin,
                },
            )?,
        ];

        if was_merlin {
            events.extend(self.finish(Team::Evil, WIN_ASSASSIN_FOUND_MERLIN)?);
        } else {
            events.extend(self.finish(Team::Good, WIN_ASSASSIN_FAILED)?);
        }

        Ok(events)
    }

    /// Terminal transition: record the outcome and disclose everything.
    fn finish(
        &mut self,
        winning_team: Team,
        win_reason: &'static str,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.phase = Phase::Finished;
        self.winning_team = Some(winning_team);
        self.win_reason = Some(win_reason);

        Ok(vec![
            GameEvent::new_public(
                EVENT_GAME_FINISHED,
                SYSTEM_ACTOR,
                &GameOverPayload {
                    winning_team,
                    win_reason: win_reason.to_string(),
                    roles: self.roles.clone(),
                    teams: self.teams.clone(),
                    quest_history: self.quest_results.clone(),
                },
            )?,
            self.phase_changed_event()?,
        ])
    }

    pub(super) fn phase_info(&self) -> GamePhase {
        let message = match self.phase {
            Phase::Setup => "Setting up game...".to_string(),
            Phase::RoleReveal => "Review your role".to_string(),
            Phase::TeamBuilding => {
                format!("Quest {}: Leader selects team", self.quest_number)
            }
            Phase::TeamVoting => "Vote to approve or reject the team".to_string(),
            Phase::QuestExecution => "Team members: play your quest cards".to_string(),
            Phase::Assassination => "The Assassin is choosing their target...".to_string(),
            Phase::Finished => "Game finished".to_string(),
        };

        GamePhase {
            name: self.phase.as_str().to_string(),
            ends_at: None,
            message,
        }
    }
}

impl Default for AvalonGame {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for AvalonGame {
    fn initialize(
        &mut self,
        config: &dyn GameConfig,
        players: &[Player],
    ) -> Result<Vec<GameEvent>, GameError> {
        let config = config
            .as_any()
            .downcast_ref::<Config>()
            .ok_or(GameError::ConfigMismatch)?;
        config.validate()?;

        if players.len() != config.roles.len() {
            return Err(GameError::Config(crate::game::ConfigError::Invalid(
                format!(
                    "player count {} does not match role count {}",
                    players.len(),
                    config.roles.len()
                ),
            )));
        }

        self.player_ids = players.iter().map(|p| p.id.clone()).collect();

        // Deal from a shuffled copy; the shuffle must resist prediction.
        let mut deck = config.roles.clone();
        shuffle_roles(&mut deck);

        for (player, role) in players.iter().zip(deck.iter()) {
            self.roles.insert(player.id.clone(), *role);
            self.teams.insert(player.id.clone(), role.team());
        }

        // Knowledge is computed once, at assignment time.
        for player_id in &self.player_ids {
            let knowledge = role_knowledge(self.roles[player_id], player_id, &self.roles);
            self.knowledge.insert(player_id.clone(), knowledge);
        }

        self.leader_index = rand::thread_rng().gen_range(0..self.player_ids.len());
        self.quest_number = 1;
        self.rejection_count = 0;

        let mut events = vec![GameEvent::new_public(
            EVENT_GAME_STARTED,
            SYSTEM_ACTOR,
            &json!({
                "game_type": GAME_TYPE,
                "player_count": self.player_ids.len(),
                "quest_number": self.quest_number,
                "leader_id": self.current_leader(),
            }),
        )?];

        for player_id in &self.player_ids {
            let role = self.roles[player_id];
            events.push(GameEvent::new_private(
                EVENT_ROLE_ASSIGNED,
                SYSTEM_ACTOR,
                &RoleAssignedPayload {
                    role,
                    team: role.team(),
                    description: role.description().to_string(),
                },
                vec![player_id.clone()],
            )?);

            events.push(GameEvent::new_private(
                EVENT_ROLE_KNOWLEDGE,
                SYSTEM_ACTOR,
                &RoleKnowledgePayload {
                    known_players: self.knowledge[player_id].clone(),
                },
                vec![player_id.clone()],
            )?);
        }

        events.push(self.leader_changed_event()?);

        self.phase = Phase::RoleReveal;
        events.push(self.phase_changed_event()?);

        Ok(events)
    }

    fn validate_action(&self, player_id: &str, action: &Action) -> Result<(), GameError> {
        if !self.roles.contains_key(player_id) {
            return Err(GameError::PlayerNotInGame);
        }

        match action.action_type.as_str() {
            ACTION_ACKNOWLEDGE_ROLE => {
                if self.phase != Phase::RoleReveal {
                    return Err(GameError::WrongPhase {
                        action: ACTION_ACKNOWLEDGE_ROLE,
                        phase: "role_reveal",
                    });
                }
                if self.acknowledged.contains(player_id) {
                    return Err(GameError::Duplicate("role acknowledgement"));
                }
                Ok(())
            }

            ACTION_PROPOSE_TEAM => {
                if self.phase != Phase::TeamBuilding {
                    return Err(GameError::WrongPhase {
                        action: ACTION_PROPOSE_TEAM,
                        phase: "team_building",
                    });
                }
                if player_id != self.current_leader() {
                    return Err(GameError::NotAllowed("only the leader can propose a team"));
                }
                Ok(())
            }

            ACTION_VOTE_TEAM => {
                if self.phase != Phase::TeamVoting {
                    return Err(GameError::WrongPhase {
                        action: ACTION_VOTE_TEAM,
                        phase: "team_voting",
                    });
                }
                // One vote each; no changing your mind here.
                if self.team_votes.contains_key(player_id) {
                    return Err(GameError::Duplicate("team vote"));
                }
                Ok(())
            }

            ACTION_PLAY_QUEST_CARD => {
                if self.phase != Phase::QuestExecution {
                    return Err(GameError::WrongPhase {
                        action: ACTION_PLAY_QUEST_CARD,
                        phase: "quest_execution",
                    });
                }
                if !self.is_on_proposed_team(player_id) {
                    return Err(GameError::NotAllowed(
                        "only team members can play quest cards",
                    ));
                }
                if self.quest_cards.contains_key(player_id) {
                    return Err(GameError::Duplicate("quest card"));
                }
                Ok(())
            }

            ACTION_ASSASSINATE => {
                if self.phase != Phase::Assassination {
                    return Err(GameError::WrongPhase {
                        action: ACTION_ASSASSINATE,
                        phase: "assassination",
                    });
                }
                if self.roles.get(player_id) != Some(&Role::Assassin) {
                    return Err(GameError::NotAllowed("only the assassin can choose a target"));
                }
                if self.assassin_target.is_some() {
                    return Err(GameError::Duplicate("assassination target"));
                }
                Ok(())
            }

            other => Err(GameError::UnknownAction(other.to_string())),
        }
    }

    fn process_action(
        &mut self,
        player_id: &str,
        action: &Action,
    ) -> Result<Vec<GameEvent>, GameError> {
        match action.action_type.as_str() {
            ACTION_ACKNOWLEDGE_ROLE => self.process_acknowledge(player_id),
            ACTION_PROPOSE_TEAM => self.process_propose_team(player_id, action),
            ACTION_VOTE_TEAM => self.process_vote_team(player_id, action),
            ACTION_PLAY_QUEST_CARD => self.process_play_quest_card(player_id, action),
            ACTION_ASSASSINATE => self.process_assassinate(player_id, action),
            other => Err(GameError::UnknownAction(other.to_string())),
        }
    }

    fn player_state(&self, player_id: &str) -> Result<serde_json::Value, GameError> {
        let (good_wins, evil_wins) = self.quest_wins();
        let is_leader = self.current_leader() == player_id;
        let has_voted = self.team_votes.contains_key(player_id);
        let has_played = self.quest_cards.contains_key(player_id);
        let on_team = self.is_on_proposed_team(player_id);

        let view = PlayerView {
            phase: self.phase.as_str().to_string(),
            role: self.roles.get(player_id).copied(),
            team: self.teams.get(player_id).copied(),
            knowledge: self.knowledge.get(player_id).cloned().unwrap_or_default(),
            has_acknowledged: self.acknowledged.contains(player_id),
            has_voted,
            has_played_quest_card: has_played,
            is_on_proposed_team: on_team,
            is_current_leader: is_leader,
            can_propose_team: is_leader && self.phase == Phase::TeamBuilding,
            can_vote: self.phase == Phase::TeamVoting && !has_voted,
            can_play_quest_card: self.phase == Phase::QuestExecution && on_team && !has_played,
            can_assassinate: self.phase == Phase::Assassination
                && self.roles.get(player_id) == Some(&Role::Assassin),
            quest_number: self.quest_number,
            rejection_count: self.rejection_count,
            good_quest_wins: good_wins,
            evil_quest_wins: evil_wins,
        };

        Ok(serde_json::to_value(view).map_err(crate::event::EventError::from)?)
    }

    fn public_state(&self) -> Result<serde_json::Value, GameError> {
        let (good_wins, evil_wins) = self.quest_wins();

        let view = PublicView {
            phase: self.phase.as_str().to_string(),
            player_count: self.player_ids.len(),
            quest_number: self.quest_number,
            required_team_size: team_size(self.player_ids.len(), self.quest_number),
            current_leader_id: self.current_leader().to_string(),
            proposed_team: self.proposed_team.clone(),
            votes_submitted: self.team_votes.len(),
            total_votes: self.player_ids.len(),
            cards_submitted: self.quest_cards.len(),
            total_cards_expected: self.proposed_team.len(),
            quest_results: self.quest_results.clone(),
            rejection_count: self.rejection_count,
            acknowledgement_count: self.acknowledged.len(),
            good_quest_wins: good_wins,
            evil_quest_wins: evil_wins,
        };

        Ok(serde_json::to_value(view).map_err(crate::event::EventError::from)?)
    }

    fn phase(&self) -> GamePhase {
        self.phase_info()
    }

    fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    fn results(&self) -> GameResults {
        let winners = match self.winning_team {
            Some(winning_team) => self
                .player_ids
                .iter()
                .filter(|id| self.teams.get(*id) == Some(&winning_team))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        GameResults {
            winners,
            win_reason: self.win_reason.unwrap_or_default().to_string(),
            final_state: json!({
                "winning_team": self.winning_team,
                "quest_history": self.quest_results,
                "roles": self.roles,
            }),
        }
    }

    fn check_phase_timeout(
        &mut self,
        _now: OffsetDateTime,
    ) -> Result<Vec<GameEvent>, GameError> {
        // Every avalon phase is player-driven; there are no deadlines.
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn test_players(ids: &[&str]) -> Vec<Player> {
        ids.iter()
            .map(|id| {
                let mut p = Player::new(id);
                p.id = id.to_string();
                p
            })
            .collect()
    }

    /// Initialize a game, then re-deal deterministically: the listed
    /// players get the listed roles and the first player leads.
    fn rigged_game(assignments: &[(&str, Role)]) -> AvalonGame {
        let players = test_players(
            &assignments.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
        );
        let config = Config {
            roles: assignments.iter().map(|(_, r)| *r).collect(),
        };

        let mut game = AvalonGame::new();
        game.initialize(&config, &players).unwrap();

        for (id, role) in assignments {
            game.roles.insert(id.to_string(), *role);
            game.teams.insert(id.to_string(), role.team());
        }
        for player_id in game.player_ids.clone() {
            let knowledge = role_knowledge(game.roles[&player_id], &player_id, &game.roles);
            game.knowledge.insert(player_id, knowledge);
        }
        game.leader_index = 0;
        game
    }

    /// Merlin leads, assassin and minion lurk.
    fn five_player_game() -> AvalonGame {
        rigged_game(&[
            ("p0", Role::Merlin),
            ("p1", Role::LoyalServant),
            ("p2", Role::LoyalServant),
            ("p3", Role::Assassin),
            ("p4", Role::Minion),
        ])
    }

    /// Validate-then-process, the way the room drives the engine.
    fn apply(
        game: &mut AvalonGame,
        player_id: &str,
        action_type: &str,
        payload: Value,
    ) -> Result<Vec<GameEvent>, GameError> {
        let action = Action::new(action_type, payload);
        game.validate_action(player_id, &action)?;
        game.process_action(player_id, &action)
    }

    fn acknowledge_all(game: &mut AvalonGame) {
        for id in game.player_ids.clone() {
            apply(game, &id, ACTION_ACKNOWLEDGE_ROLE, Value::Null).unwrap();
        }
    }

    fn propose(game: &mut AvalonGame, members: &[&str]) -> Vec<GameEvent> {
        let leader = game.current_leader().to_string();
        apply(
            game,
            &leader,
            ACTION_PROPOSE_TEAM,
            json!({ "team_members": members }),
        )
        .unwrap()
    }

    fn vote_all(game: &mut AvalonGame, vote: &str) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for id in game.player_ids.clone() {
            events.extend(
                apply(game, &id, ACTION_VOTE_TEAM, json!({ "vote": vote })).unwrap(),
            );
        }
        events
    }

    fn run_successful_quest(game: &mut AvalonGame) {
        let size = team_size(game.player_ids.len(), game.quest_number);
        let members: Vec<String> = game.player_ids[..size].to_vec();
        let member_refs: Vec<&str> = members.iter().map(String::as_str).collect();

        propose(game, &member_refs);
        vote_all(game, "approve");
        for member in &members {
            apply(
                game,
                member,
                ACTION_PLAY_QUEST_CARD,
                json!({"card": "success"}),
            )
            .unwrap();
        }
    }

    #[test]
    fn test_initialize_assigns_roles_and_private_knowledge() {
        let players = test_players(&["p0", "p1", "p2", "p3", "p4"]);
        let config = Config::standard(5).unwrap();

        let mut game = AvalonGame::new();
        let events = game.initialize(&config, &players).unwrap();

        assert_eq!(game.phase, Phase::RoleReveal);
        assert_eq!(game.roles.len(), 5);
        assert!(game.player_ids.contains(&game.current_leader().to_string()));

        let role_events: Vec<&GameEvent> = events
            .iter()
            .filter(|e| e.event_type == EVENT_ROLE_ASSIGNED)
            .collect();
        assert_eq!(role_events.len(), 5);
        for event in role_events {
            assert!(!event.visibility.public);
            assert_eq!(event.visibility.player_ids.len(), 1);
        }

        // The dealt multiset matches the configured one.
        let mut dealt: Vec<Role> = game.roles.values().copied().collect();
        let mut configured = config.roles.clone();
        dealt.sort_by_key(|r| format!("{r:?}"));
        configured.sort_by_key(|r| format!("{r:?}"));
        assert_eq!(dealt, configured);
    }

    #[test]
    fn test_initialize_rejects_player_role_count_mismatch() {
        let players = test_players(&["p0", "p1", "p2", "p3"]);
        let config = Config::standard(5).unwrap();

        let mut game = AvalonGame::new();
        assert!(game.initialize(&config, &players).is_err());
    }

    #[test]
    fn test_acknowledge_gate_then_team_building() {
        let mut game = five_player_game();

        apply(&mut game, "p0", ACTION_ACKNOWLEDGE_ROLE, Value::Null).unwrap();
        assert!(matches!(
            apply(&mut game, "p0", ACTION_ACKNOWLEDGE_ROLE, Value::Null),
            Err(GameError::Duplicate(_))
        ));
        assert_eq!(game.phase, Phase::RoleReveal);

        for id in ["p1", "p2", "p3", "p4"] {
            apply(&mut game, id, ACTION_ACKNOWLEDGE_ROLE, Value::Null).unwrap();
        }
        assert_eq!(game.phase, Phase::TeamBuilding);
        assert_eq!(game.acknowledged.len(), 5);
    }

    #[test]
    fn test_only_leader_proposes_an_exact_team() {
        let mut game = five_player_game();
        acknowledge_all(&mut game);

        assert!(matches!(
            apply(
                &mut game,
                "p1",
                ACTION_PROPOSE_TEAM,
                json!({"team_members": ["p0", "p1"]}),
            ),
            Err(GameError::NotAllowed(_))
        ));

        // Quest 1 with 5 players takes a team of exactly 2.
        assert!(matches!(
            apply(
                &mut game,
                "p0",
                ACTION_PROPOSE_TEAM,
                json!({"team_members": ["p0", "p1", "p2"]}),
            ),
            Err(GameError::TeamSize { expected: 2, got: 3 })
        ));

        assert!(apply(
            &mut game,
            "p0",
            ACTION_PROPOSE_TEAM,
            json!({"team_members": ["p0", "p0"]}),
        )
        .is_err());

        assert!(apply(
            &mut game,
            "p0",
            ACTION_PROPOSE_TEAM,
            json!({"team_members": ["p0", "nobody"]}),
        )
        .is_err());

        propose(&mut game, &["p0", "p1"]);
        assert_eq!(game.phase, Phase::TeamVoting);
        assert_eq!(game.proposed_team, vec!["p0", "p1"]);
    }

    #[test]
    fn test_rejection_rotates_leadership_and_counts() {
        let mut game = five_player_game();
        acknowledge_all(&mut game);

        propose(&mut game, &["p0", "p1"]);

        // A second vote from the same player is rejected.
        apply(&mut game, "p0", ACTION_VOTE_TEAM, json!({"vote": "reject"})).unwrap();
        assert!(matches!(
            apply(&mut game, "p0", ACTION_VOTE_TEAM, json!({"vote": "approve"})),
            Err(GameError::Duplicate(_))
        ));

        for id in ["p1", "p2", "p3", "p4"] {
            apply(&mut game, id, ACTION_VOTE_TEAM, json!({"vote": "reject"})).unwrap();
        }

        assert_eq!(game.rejection_count, 1);
        assert_eq!(game.current_leader(), "p1");
        assert_eq!(game.phase, Phase::TeamBuilding);
        assert_eq!(game.quest_number, 1);
    }

    #[test]
    fn test_five_consecutive_rejections_hand_evil_the_game() {
        let mut game = five_player_game();
        acknowledge_all(&mut game);

        for round in 0..5 {
            propose(&mut game, &["p0", "p1"]);
            let events = vote_all(&mut game, "reject");

            if round < 4 {
                assert_eq!(game.rejection_count, round + 1);
                assert_eq!(game.phase, Phase::TeamBuilding);
            } else {
                assert!(game.is_finished());
                assert!(events
                    .iter()
                    .any(|e| e.event_type == EVENT_GAME_FINISHED));
            }
        }

        let results = game.results();
        assert_eq!(results.win_reason, WIN_FIVE_REJECTIONS);
        assert_eq!(results.winners, vec!["p3", "p4"]);
    }

    #[test]
    fn test_approval_resets_rejection_counter() {
        let mut game = five_player_game();
        acknowledge_all(&mut game);

        propose(&mut game, &["p0", "p1"]);
        vote_all(&mut game, "reject");
        assert_eq!(game.rejection_count, 1);

        propose(&mut game, &["p0", "p1"]);
        vote_all(&mut game, "approve");
        assert_eq!(game.rejection_count, 0);
        assert_eq!(game.phase, Phase::QuestExecution);
    }

    #[test]
    fn test_successful_quest_advances_and_rotates_leader() {
        let mut game = five_player_game();
        acknowledge_all(&mut game);

        run_successful_quest(&mut game);

        assert_eq!(game.quest_results.len(), 1);
        let result = &game.quest_results[0];
        assert!(result.success);
        assert_eq!(result.fail_count, 0);
        assert_eq!(game.quest_number, 2);
        assert_eq!(game.current_leader(), "p1");
        assert_eq!(game.phase, Phase::TeamBuilding);
    }

    #[test]
    fn test_good_player_cannot_play_fail() {
        let mut game = five_player_game();
        acknowledge_all(&mut game);

        propose(&mut game, &["p1", "p3"]);
        vote_all(&mut game, "approve");

        assert!(matches!(
            apply(
                &mut game,
                "p1",
                ACTION_PLAY_QUEST_CARD,
                json!({"card": "fail"}),
            ),
            Err(GameError::NotAllowed(_))
        ));

        // The evil teammate may sabotage freely.
        apply(
            &mut game,
            "p3",
            ACTION_PLAY_QUEST_CARD,
            json!({"card": "fail"}),
        )
        .unwrap();
    }

    #[test]
    fn test_only_team_members_play_cards_once() {
        let mut game = five_player_game();
        acknowledge_all(&mut game);

        propose(&mut game, &["p0", "p1"]);
        vote_all(&mut game, "approve");

        assert!(matches!(
            apply(
                &mut game,
                "p2",
                ACTION_PLAY_QUEST_CARD,
                json!({"card": "success"}),
            ),
            Err(GameError::NotAllowed(_))
        ));

        apply(
            &mut game,
            "p0",
            ACTION_PLAY_QUEST_CARD,
            json!({"card": "success"}),
        )
        .unwrap();
        assert!(matches!(
            apply(
                &mut game,
                "p0",
                ACTION_PLAY_QUEST_CARD,
                json!({"card": "success"}),
            ),
            Err(GameError::Duplicate(_))
        ));
    }

    #[test]
    fn test_one_fail_sinks_a_small_quest() {
        let mut game = five_player_game();
        acknowledge_all(&mut game);

        propose(&mut game, &["p0", "p3"]);
        vote_all(&mut game, "approve");

        apply(
            &mut game,
            "p0",
            ACTION_PLAY_QUEST_CARD,
            json!({"card": "success"}),
        )
        .unwrap();
        apply(
            &mut game,
            "p3",
            ACTION_PLAY_QUEST_CARD,
            json!({"card": "fail"}),
        )
        .unwrap();

        let result = &game.quest_results[0];
        assert!(!result.success);
        assert_eq!(result.fail_count, 1);
        assert_eq!(result.fails_required, 1);
    }

    #[test]
    fn test_quest_four_survives_one_fail_with_seven_players() {
        let mut game = rigged_game(&[
            ("p0", Role::Merlin),
            ("p1", Role::LoyalServant),
            ("p2", Role::LoyalServant),
            ("p3", Role::LoyalServant),
            ("p4", Role::Assassin),
            ("p5", Role::Minion),
            ("p6", Role::Minion),
        ]);
        acknowledge_all(&mut game);
        game.quest_number = 4;

        // Quest 4 with 7 players: team of 4, two fails required.
        propose(&mut game, &["p0", "p1", "p2", "p4"]);
        vote_all(&mut game, "approve");

        for (member, card) in [
            ("p0", "success"),
            ("p1", "success"),
            ("p2", "success"),
            ("p4", "fail"),
        ] {
            apply(
                &mut game,
                member,
                ACTION_PLAY_QUEST_CARD,
                json!({ "card": card }),
            )
            .unwrap();
        }

        let result = &game.quest_results[0];
        assert_eq!(result.fails_required, 2);
        assert_eq!(result.fail_count, 1);
        assert!(result.success);
    }

    #[test]
    fn test_three_good_quests_trigger_assassination() {
        let mut game = five_player_game();
        acknowledge_all(&mut game);

        run_successful_quest(&mut game);
        run_successful_quest(&mut game);
        run_successful_quest(&mut game);

        assert_eq!(game.quest_wins(), (3, 0));
        assert_eq!(game.phase, Phase::Assassination);

        // Only the assassin gets to act.
        assert!(matches!(
            apply(&mut game, "p4", ACTION_ASSASSINATE, json!({"target_id": "p0"})),
            Err(GameError::NotAllowed(_))
        ));

        let events =
            apply(&mut game, "p3", ACTION_ASSASSINATE, json!({"target_id": "p0"})).unwrap();
        assert!(game.is_finished());

        let result = events
            .iter()
            .find(|e| e.event_type == EVENT_ASSASSIN_RESULT)
            .unwrap();
        assert_eq!(result.payload["was_merlin"], json!(true));

        let results = game.results();
        assert_eq!(results.win_reason, WIN_ASSASSIN_FOUND_MERLIN);
        assert_eq!(results.winners, vec!["p3", "p4"]);
    }

    #[test]
    fn test_missed_assassination_gives_good_the_win() {
        let mut game = five_player_game();
        acknowledge_all(&mut game);

        run_successful_quest(&mut game);
        run_successful_quest(&mut game);
        run_successful_quest(&mut game);

        apply(&mut game, "p3", ACTION_ASSASSINATE, json!({"target_id": "p1"})).unwrap();

        let results = game.results();
        assert_eq!(results.win_reason, WIN_ASSASSIN_FAILED);
        assert_eq!(results.winners, vec!["p0", "p1", "p2"]);
    }

    #[test]
    fn test_three_failed_quests_end_the_game_for_evil() {
        let mut game = five_player_game();
        acknowledge_all(&mut game);

        for _ in 0..3 {
            let size = team_size(5, game.quest_number);
            let mut members = vec!["p3".to_string()];
            members.extend(
                game.player_ids
                    .iter()
                    .filter(|id| *id != "p3")
                    .take(size - 1)
                    .cloned(),
            );
            let member_refs: Vec<&str> = members.iter().map(String::as_str).collect();

            propose(&mut game, &member_refs);
            vote_all(&mut game, "approve");

            for member in &members {
                let card = if member == "p3" { "fail" } else { "success" };
                apply(
                    &mut game,
                    member,
                    ACTION_PLAY_QUEST_CARD,
                    json!({ "card": card }),
                )
                .unwrap();
            }
        }

        assert!(game.is_finished());
        let results = game.results();
        assert_eq!(results.win_reason, WIN_EVIL_THREE_QUESTS);
        assert_eq!(results.winners, vec!["p3", "p4"]);
    }

    #[test]
    fn test_game_finished_event_discloses_everything() {
        let mut game = five_player_game();
        acknowledge_all(&mut game);

        let mut finish_events = Vec::new();
        for _ in 0..5 {
            propose(&mut game, &["p0", "p1"]);
            finish_events = vote_all(&mut game, "reject");
        }

        let finished = finish_events
            .iter()
            .find(|e| e.event_type == EVENT_GAME_FINISHED)
            .unwrap();
        assert!(finished.visibility.public);
        assert_eq!(finished.payload["roles"]["p0"], json!("merlin"));
        assert_eq!(finished.payload["teams"]["p4"], json!("evil"));
    }

    #[test]
    fn test_vote_outside_voting_phase_rejected() {
        let mut game = five_player_game();
        acknowledge_all(&mut game);

        assert!(matches!(
            apply(&mut game, "p0", ACTION_VOTE_TEAM, json!({"vote": "approve"})),
            Err(GameError::WrongPhase { .. })
        ));
    }

    #[test]
    fn test_unknown_action_and_outsider_rejected() {
        let game = five_player_game();

        assert!(matches!(
            game.validate_action("p0", &Action::new("roll_dice", Value::Null)),
            Err(GameError::UnknownAction(_))
        ));
        assert!(matches!(
            game.validate_action("ghost", &Action::new(ACTION_ACKNOWLEDGE_ROLE, Value::Null)),
            Err(GameError::PlayerNotInGame)
        ));
    }
}
