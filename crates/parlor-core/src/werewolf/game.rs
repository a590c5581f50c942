//! The werewolf state machine.
//!
//! One night of secret role swaps, one day of open discussion, one vote.
//! All hidden-information bookkeeping lives here: who was dealt what, where
//! the cards are now, and which role has already used its night action.

use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use serde_json::json;
use time::OffsetDateTime;

use crate::event::{
    GameEvent, GameFinishedPayload, GameStartedPayload, EVENT_GAME_FINISHED,
    EVENT_GAME_STARTED, EVENT_PHASE_CHANGED, SYSTEM_ACTOR,
};
use crate::game::{
    decode_payload, Action, Game, GameConfig, GameError, GamePhase, GameResults,
};
use crate::player::Player;

use super::config::{Config, Role, GAME_TYPE};
use super::state::{
    CenterCardView, CenterCardViewedPayload, DrunkResultPayload, DrunkSwapPayload,
    PlayerView, PublicView, RobberResultPayload, RobberSwapPayload, RoleAcknowledgedPayload,
    RoleAssignedPayload, SeerCenterResultPayload, SeerPlayerResultPayload, SeerViewPayload,
    TroublemakerResultPayload, TroublemakerSwapPayload, ViewCenterPayload, VoteCastPayload,
    VotePayload, VotesRevealedPayload,
};

pub const ACTION_ACKNOWLEDGE_ROLE: &str = "acknowledge_role";
pub const ACTION_ADVANCE_PHASE: &str = "advance_phase";
pub const ACTION_TOGGLE_TIMER: &str = "toggle_timer";
pub const ACTION_EXTEND_TIMER: &str = "extend_timer";
pub const ACTION_VOTE: &str = "vote";
pub const ACTION_VIEW_CENTER: &str = "view_center";
pub const ACTION_SEER_VIEW: &str = "seer_view";
pub const ACTION_ROBBER_SWAP: &str = "robber_swap";
pub const ACTION_TROUBLEMAKER_SWAP: &str = "troublemaker_swap";
pub const ACTION_DRUNK_SWAP: &str = "drunk_swap";

pub const EVENT_ROLE_ASSIGNED: &str = "role_assigned";
pub const EVENT_ROLE_ACKNOWLEDGED: &str = "role_acknowledged";
pub const EVENT_WEREWOLF_WAKEUP: &str = "werewolf_wakeup";
pub const EVENT_MASON_WAKEUP: &str = "mason_wakeup";
pub const EVENT_NIGHT_SCRIPT: &str = "night_script";
pub const EVENT_CENTER_CARD_VIEWED: &str = "center_card_viewed";
pub const EVENT_SEER_PLAYER_RESULT: &str = "seer_player_result";
pub const EVENT_SEER_CENTER_RESULT: &str = "seer_center_result";
pub const EVENT_ROBBER_RESULT: &str = "robber_result";
pub const EVENT_TROUBLEMAKER_RESULT: &str = "troublemaker_result";
pub const EVENT_DRUNK_RESULT: &str = "drunk_result";
pub const EVENT_INSOMNIAC_RESULT: &str = "insomniac_result";
pub const EVENT_VOTE_CAST: &str = "vote_cast";
pub const EVENT_VOTES_REVEALED: &str = "votes_revealed";
pub const EVENT_TIMER_TOGGLED: &str = "timer_toggled";
pub const EVENT_TIMER_EXTENDED: &str = "timer_extended";

/// Number of face-down center cards.
pub const CENTER_CARD_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    RoleReveal,
    Night,
    Day,
    Results,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::RoleReveal => "role_reveal",
            Phase::Night => "night",
            Phase::Day => "day",
            Phase::Results => "results",
        }
    }

    fn message(self) -> &'static str {
        match self {
            Phase::Setup => "Setting up game...",
            Phase::RoleReveal => "Look at your role card and acknowledge",
            Phase::Night => "Night phase - everyone close your eyes",
            Phase::Day => "Day phase - discuss and vote!",
            Phase::Results => "Game over",
        }
    }
}

/// The werewolf game state machine.
pub struct WerewolfGame {
    pub(super) config: Option<Config>,
    /// Player ids in join order.
    pub(super) player_ids: Vec<String>,
    pub(super) host_id: Option<String>,
    /// Where each card is right now. Night swaps mutate this immediately,
    /// so later-acting roles observe post-swap state.
    pub(super) role_assignments: HashMap<String, Role>,
    /// The card each player was dealt. Night gating and the dawn reveal
    /// for the insomniac key off this.
    pub(super) original_roles: HashMap<String, Role>,
    pub(super) center_cards: Vec<Role>,
    pub(super) acknowledged: HashSet<String>,
    /// Night actions are one-shot per role, not per player.
    pub(super) night_actions_done: HashSet<Role>,
    /// voter id -> target id. Re-votes overwrite.
    pub(super) votes: HashMap<String, String>,
    pub(super) phase: Phase,
    pub(super) ends_at: Option<OffsetDateTime>,
    pub(super) timer_active: bool,
}

impl WerewolfGame {
    pub fn new() -> Self {
        Self {
            config: None,
            player_ids: Vec::new(),
            host_id: None,
            role_assignments: HashMap::new(),
            original_roles: HashMap::new(),
            center_cards: Vec::with_capacity(CENTER_CARD_COUNT),
            acknowledged: HashSet::new(),
            night_actions_done: HashSet::new(),
            votes: HashMap::new(),
            phase: Phase::Setup,
            ends_at: None,
            timer_active: false,
        }
    }

    pub(super) fn players_with_role(&self, role: Role) -> Vec<String> {
        let mut players: Vec<String> = self
            .role_assignments
            .iter()
            .filter(|(_, r)| **r == role)
            .map(|(id, _)| id.clone())
            .collect();
        players.sort();
        players
    }

    fn dealt_role(&self, player_id: &str) -> Option<Role> {
        self.original_roles.get(player_id).copied()
    }

    /// Gate for night actions: night phase, acting player was dealt the
    /// role, and the role has not acted yet this game.
    fn check_night_action(
        &self,
        player_id: &str,
        role: Role,
        action: &'static str,
        wrong_role: &'static str,
    ) -> Result<(), GameError> {
        if self.phase != Phase::Night {
            return Err(GameError::WrongPhase {
                action,
                phase: "night",
            });
        }
        if self.dealt_role(player_id) != Some(role) {
            return Err(GameError::NotAllowed(wrong_role));
        }
        if self.night_actions_done.contains(&role) {
            return Err(GameError::Duplicate("night action"));
        }
        Ok(())
    }

    fn check_host(&self, player_id: &str, message: &'static str) -> Result<(), GameError> {
        if self.host_id.as_deref() != Some(player_id) {
            return Err(GameError::NotAllowed(message));
        }
        Ok(())
    }

    fn require_target(&self, target_id: &str) -> Result<(), GameError> {
        if self.role_assignments.contains_key(target_id) {
            Ok(())
        } else {
            Err(GameError::UnknownTarget(target_id.to_string()))
        }
    }

    fn require_center_index(
        &self,
        action: &'static str,
        index: usize,
    ) -> Result<(), GameError> {
        if index < self.center_cards.len() {
            Ok(())
        } else {
            Err(GameError::MalformedPayload {
                action,
                reason: format!("center card index {index} out of range"),
            })
        }
    }

    fn process_acknowledge(&mut self, player_id: &str) -> Result<Vec<GameEvent>, GameError> {
        self.acknowledged.insert(player_id.to_string());

        let mut events = vec![GameEvent::new_public(
            EVENT_ROLE_ACKNOWLEDGED,
            SYSTEM_ACTOR,
            &RoleAcknowledgedPayload {
                player_id: player_id.to_string(),
                count: self.acknowledged.len(),
                total: self.player_ids.len(),
            },
        )?];

        // All players have seen their card: night begins.
        if self.acknowledged.len() == self.player_ids.len() {
            events.extend(self.advance_to_night()?);
        }

        Ok(events)
    }

    fn process_view_center(&mut self, player_id: &str, action: &Action) -> Result<Vec<GameEvent>, GameError> {
        let payload: ViewCenterPayload = decode_payload(ACTION_VIEW_CENTER, &action.payload)?;
        self.require_center_index(ACTION_VIEW_CENTER, payload.index)?;

        self.night_actions_done.insert(Role::Werewolf);

        Ok(vec![GameEvent::new_private(
            EVENT_CENTER_CARD_VIEWED,
            player_id,
            &CenterCardViewedPayload {
                card: CenterCardView {
                    index: payload.index,
                    role: self.center_cards[payload.index],
                },
            },
            vec![player_id.to_string()],
        )?])
    }

    fn process_seer_view(&mut self, player_id: &str, action: &Action) -> Result<Vec<GameEvent>, GameError> {
        let payload: SeerViewPayload = decode_payload(ACTION_SEER_VIEW, &action.payload)?;

        let event = match (payload.target_id, payload.center_indices) {
            (Some(target_id), None) => {
                if target_id == player_id {
                    return Err(GameError::NotAllowed(
                        "the seer cannot inspect their own card",
                    ));
                }
                self.require_target(&target_id)?;

                GameEvent::new_private(
                    EVENT_SEER_PLAYER_RESULT,
                    player_id,
                    &SeerPlayerResultPayload {
                        role: self.role_assignments[&target_id],
                        target_id,
                    },
                    vec![player_id.to_string()],
                )?
            }
            (None, Some(indices)) => {
                if indices.len() != 2 || indices[0] == indices[1] {
                    return Err(GameError::MalformedPayload {
                        action: ACTION_SEER_VIEW,
                        reason: "expected two distinct center card indices".into(),
                    });
                }
                for &index in &indices {
                    self.require_center_index(ACTION_SEER_VIEW, index)?;
                }

                GameEvent::new_private(
                    EVENT_SEER_CENTER_RESULT,
                    player_id,
                    &SeerCenterResultPayload {
                        cards: indices
                            .iter()
                            .map(|&index| CenterCardView {
                                index,
                                role: self.center_cards[index],
                            })
                            .collect(),
                    },
                    vec![player_id.to_string()],
                )?
            }
            _ => {
                return Err(GameError::MalformedPayload {
                    action: ACTION_SEER_VIEW,
                    reason: "expected either a target player or two center card indices"
                        .into(),
                });
            }
        };

        self.night_actions_done.insert(Role::Seer);
        Ok(vec![event])
    }

    fn process_robber_swap(&mut self, player_id: &str, action: &Action) -> Result<Vec<GameEvent>, GameError> {
        let payload: RobberSwapPayload = decode_payload(ACTION_ROBBER_SWAP, &action.payload)?;
        if payload.target_id == player_id {
            return Err(GameError::NotAllowed("the robber must rob someone else"));
        }
        self.require_target(&payload.target_id)?;

        self.swap_player_cards(player_id, &payload.target_id);
        self.night_actions_done.insert(Role::Robber);

        Ok(vec![GameEvent::new_private(
            EVENT_ROBBER_RESULT,
            player_id,
            &RobberResultPayload {
                new_role: self.role_assignments[player_id],
                target_id: payload.target_id,
            },
            vec![player_id.to_string()],
        )?])
    }

    fn process_troublemaker_swap(
        &mut self,
        player_id: &str,
        action: &Action,
    ) -> Result<Vec<GameEvent>, GameError> {
        let payload: TroublemakerSwapPayload =
            decode_payload(ACTION_TROUBLEMAKER_SWAP, &action.payload)?;

        if payload.first_target_id == payload.second_target_id {
            return Err(GameError::MalformedPayload {
                action: ACTION_TROUBLEMAKER_SWAP,
                reason: "targets must be two different players".into(),
            });
        }
        if payload.first_target_id == player_id || payload.second_target_id == player_id {
            return Err(GameError::NotAllowed(
                "the troublemaker swaps two other players, not themselves",
            ));
        }
        self.require_target(&payload.first_target_id)?;
        self.require_target(&payload.second_target_id)?;

        self.swap_player_cards(&payload.first_target_id, &payload.second_target_id);
        self.night_actions_done.insert(Role::Troublemaker);

        Ok(vec![GameEvent::new_private(
            EVENT_TROUBLEMAKER_RESULT,
            player_id,
            &TroublemakerResultPayload {
                first_target_id: payload.first_target_id,
                second_target_id: payload.second_target_id,
            },
            vec![player_id.to_string()],
        )?])
    }

    fn process_drunk_swap(&mut self, player_id: &str, action: &Action) -> Result<Vec<GameEvent>, GameError> {
        let payload: DrunkSwapPayload = decode_payload(ACTION_DRUNK_SWAP, &action.payload)?;
        self.require_center_index(ACTION_DRUNK_SWAP, payload.center_index)?;

        let own = self.role_assignments[player_id];
        self.role_assignments
            .insert(player_id.to_string(), self.center_cards[payload.center_index]);
        self.center_cards[payload.center_index] = own;
        self.night_actions_done.insert(Role::Drunk);

        // The drunk does not see the new card.
        Ok(vec![GameEvent::new_private(
            EVENT_DRUNK_RESULT,
            player_id,
            &DrunkResultPayload {
                center_index: payload.center_index,
            },
            vec![player_id.to_string()],
        )?])
    }

    fn process_vote(&mut self, player_id: &str, action: &Action) -> Result<Vec<GameEvent>, GameError> {
        let payload: VotePayload = decode_payload(ACTION_VOTE, &action.payload)?;
        self.require_target(&payload.target_id)?;

        self.votes.insert(player_id.to_string(), payload.target_id);

        let mut events = vec![GameEvent::new_public(
            EVENT_VOTE_CAST,
            player_id,
            &VoteCastPayload {
                voter_id: player_id.to_string(),
            },
        )?];

        // Last vote in: reveal, resolve, finish.
        if self.votes.len() == self.player_ids.len() {
            events.push(GameEvent::new_public(
                EVENT_VOTES_REVEALED,
                SYSTEM_ACTOR,
                &VotesRevealedPayload {
                    votes: self.votes.clone(),
                },
            )?);

            self.phase = Phase::Results;
            self.timer_active = false;
            self.ends_at = None;

            let results = self.calculate_results();
            events.push(GameEvent::new_public(
                EVENT_GAME_FINISHED,
                SYSTEM_ACTOR,
                &GameFinishedPayload { results },
            )?);
        }

        Ok(events)
    }

    fn swap_player_cards(&mut self, a: &str, b: &str) {
        let role_a = self.role_assignments[a];
        let role_b = self.role_assignments[b];
        self.role_assignments.insert(a.to_string(), role_b);
        self.role_assignments.insert(b.to_string(), role_a);
    }

    /// Tally votes and decide the winners.
    ///
    /// The targets with the strictly-highest vote count are eliminated
    /// (ties eliminate several). Village wins if any eliminee holds a
    /// werewolf-team card; otherwise the werewolf team wins. A tanner among
    /// the eliminees wins alone and overrides both, checked last.
    pub(super) fn calculate_results(&self) -> GameResults {
        let mut vote_counts: HashMap<&str, usize> = HashMap::new();
        for target in self.votes.values() {
            *vote_counts.entry(target).or_default() += 1;
        }

        let max_votes = vote_counts.values().copied().max().unwrap_or(0);
        let mut eliminated: Vec<String> = vote_counts
            .iter()
            .filter(|(_, count)| **count == max_votes)
            .map(|(id, _)| (*id).to_string())
            .collect();
        eliminated.sort();

        let werewolf_died = eliminated.iter().any(|id| {
            self.role_assignments
                .get(id)
                .is_some_and(|r| r.is_werewolf_team())
        });

        let (mut winners, mut win_reason): (Vec<String>, &str) = if werewolf_died {
            (
                self.role_assignments
                    .iter()
                    .filter(|(_, r)| r.is_village_team())
                    .map(|(id, _)| id.clone())
                    .collect(),
                "village_eliminated_werewolf",
            )
        } else {
            (
                self.role_assignments
                    .iter()
                    .filter(|(_, r)| r.is_werewolf_team())
                    .map(|(id, _)| id.clone())
                    .collect(),
                "werewolf_team_survived",
            )
        };

        // Tanner win takes precedence over everything.
        if let Some(tanner) = eliminated
            .iter()
            .find(|id| self.role_assignments.get(*id) == Some(&Role::Tanner))
        {
            winners = vec![tanner.clone()];
            win_reason = "tanner_eliminated";
        }

        winners.sort();

        GameResults {
            winners,
            win_reason: win_reason.to_string(),
            final_state: json!({
                "votes": self.votes,
                "eliminated": eliminated,
                "roles": self.role_assignments,
                "center_cards": self.center_cards,
            }),
        }
    }
}

impl Default for WerewolfGame {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for WerewolfGame {
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

        // The deck must hold exactly three more cards than there are players.
        let expected = players.len() + CENTER_CARD_COUNT;
        if config.roles.len() != expected {
            return Err(GameError::Config(crate::game::ConfigError::Invalid(
                format!(
                    "role count ({}) must be player count + {} ({})",
                    config.roles.len(),
                    CENTER_CARD_COUNT,
                    expected
                ),
            )));
        }

        self.config = Some(config.clone());
        self.player_ids = players.iter().map(|p| p.id.clone()).collect();

        let mut deck = config.roles.clone();
        deck.shuffle(&mut rand::thread_rng());

        let mut events = vec![GameEvent::new_public(
            EVENT_GAME_STARTED,
            SYSTEM_ACTOR,
            &GameStartedPayload {
                game_type: GAME_TYPE.to_string(),
                config: serde_json::to_value(config)
                    .map_err(crate::event::EventError::from)?,
                player_ids: self.player_ids.clone(),
            },
        )?];

        // First N cards go to players, the rest stay face-down in the center.
        for (player, role) in players.iter().zip(deck.iter()) {
            self.role_assignments.insert(player.id.clone(), *role);
            self.original_roles.insert(player.id.clone(), *role);

            events.push(GameEvent::new_private(
                EVENT_ROLE_ASSIGNED,
                SYSTEM_ACTOR,
                &RoleAssignedPayload { role: *role },
                vec![player.id.clone()],
            )?);
        }
        self.center_cards = deck.split_off(players.len());

        self.phase = Phase::RoleReveal;
        events.push(GameEvent::new_public(
            EVENT_PHASE_CHANGED,
            SYSTEM_ACTOR,
            &crate::event::PhaseChangedPayload {
                phase: self.phase_info(),
            },
        )?);

        Ok(events)
    }

    fn validate_action(&self, player_id: &str, action: &Action) -> Result<(), GameError> {
        if !self.role_assignments.contains_key(player_id) {
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

            ACTION_ADVANCE_PHASE => {
                self.check_host(player_id, "only the host can advance the phase")?;
                if self.phase != Phase::Night {
                    return Err(GameError::WrongPhase {
                        action: ACTION_ADVANCE_PHASE,
                        phase: "night",
                    });
                }
                Ok(())
            }

            ACTION_TOGGLE_TIMER => {
                self.check_host(player_id, "only the host can control the timer")?;
                if self.phase != Phase::Day {
                    return Err(GameError::WrongPhase {
                        action: ACTION_TOGGLE_TIMER,
                        phase: "day",
                    });
                }
                Ok(())
            }

            ACTION_EXTEND_TIMER => {
                self.check_host(player_id, "only the host can control the timer")?;
                if self.phase != Phase::Day {
                    return Err(GameError::WrongPhase {
                        action: ACTION_EXTEND_TIMER,
                        phase: "day",
                    });
                }
                if !self.timer_active {
                    return Err(GameError::NotAllowed("timer is not active"));
                }
                Ok(())
            }

            ACTION_VOTE => {
                // Re-votes are allowed; the last vote counts.
                if self.phase != Phase::Day {
                    return Err(GameError::WrongPhase {
                        action: ACTION_VOTE,
                        phase: "day",
                    });
                }
                Ok(())
            }

            ACTION_VIEW_CENTER => {
                self.check_night_action(
                    player_id,
                    Role::Werewolf,
                    ACTION_VIEW_CENTER,
                    "only a werewolf may view a center card",
                )?;
                // A pack of werewolves sees each other instead.
                if self.players_with_role_dealt(Role::Werewolf) != 1 {
                    return Err(GameError::NotAllowed(
                        "the werewolf may only peek at the center when alone",
                    ));
                }
                Ok(())
            }

            ACTION_SEER_VIEW => self.check_night_action(
                player_id,
                Role::Seer,
                ACTION_SEER_VIEW,
                "only the seer may view cards",
            ),

            ACTION_ROBBER_SWAP => self.check_night_action(
                player_id,
                Role::Robber,
                ACTION_ROBBER_SWAP,
                "only the robber may swap with a player",
            ),

            ACTION_TROUBLEMAKER_SWAP => self.check_night_action(
                player_id,
                Role::Troublemaker,
                ACTION_TROUBLEMAKER_SWAP,
                "only the troublemaker may swap other players' cards",
            ),

            ACTION_DRUNK_SWAP => self.check_night_action(
                player_id,
                Role::Drunk,
                ACTION_DRUNK_SWAP,
                "only the drunk may swap with the center",
            ),

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
            ACTION_ADVANCE_PHASE => self.advance_to_day(),
            ACTION_TOGGLE_TIMER => self.process_toggle_timer(action),
            ACTION_EXTEND_TIMER => self.process_extend_timer(action),
            ACTION_VOTE => self.process_vote(player_id, action),
            ACTION_VIEW_CENTER => self.process_view_center(player_id, action),
            ACTION_SEER_VIEW => self.process_seer_view(player_id, action),
            ACTION_ROBBER_SWAP => self.process_robber_swap(player_id, action),
            ACTION_TROUBLEMAKER_SWAP => self.process_troublemaker_swap(player_id, action),
            ACTION_DRUNK_SWAP => self.process_drunk_swap(player_id, action),
            other => Err(GameError::UnknownAction(other.to_string())),
        }
    }

    fn player_state(&self, player_id: &str) -> Result<serde_json::Value, GameError> {
        let view = PlayerView {
            phase: self.phase.as_str().to_string(),
            ends_at: self.ends_at,
            your_role: self.dealt_role(player_id),
            has_acknowledged: self.acknowledged.contains(player_id),
            has_voted: self.votes.contains_key(player_id),
            timer_active: self.timer_active,
        };
        Ok(serde_json::to_value(view).map_err(crate::event::EventError::from)?)
    }

    fn public_state(&self) -> Result<serde_json::Value, GameError> {
        let view = PublicView {
            phase: self.phase.as_str().to_string(),
            ends_at: self.ends_at,
            player_count: self.player_ids.len(),
            acknowledgement_count: self.acknowledged.len(),
            votes_submitted: self.votes.len(),
            timer_active: self.timer_active,
        };
        Ok(serde_json::to_value(view).map_err(crate::event::EventError::from)?)
    }

    fn phase(&self) -> GamePhase {
        self.phase_info()
    }

    fn is_finished(&self) -> bool {
        self.phase == Phase::Results
    }

    fn results(&self) -> GameResults {
        self.calculate_results()
    }

    fn check_phase_timeout(
        &mut self,
        now: OffsetDateTime,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.process_timer_expiry(now)
    }

    fn set_host(&mut self, host_id: &str) {
        self.host_id = Some(host_id.to_string());
    }
}

impl WerewolfGame {
    pub(super) fn phase_info(&self) -> GamePhase {
        GamePhase {
            name: self.phase.as_str().to_string(),
            ends_at: self.ends_at,
            message: self.phase.message().to_string(),
        }
    }

    fn players_with_role_dealt(&self, role: Role) -> usize {
        self.original_roles.values().filter(|r| **r == role).count()
    }
}
