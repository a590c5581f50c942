//! Avalon game configuration and role-list validation.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::game::{ConfigError, GameConfig};

use super::quests::expected_team_sizes;
use super::roles::Role;

pub const GAME_TYPE: &str = "avalon";

/// Configuration for an Avalon game: one role per seat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub roles: Vec<Role>,
}

impl GameConfig for Config {
    fn game_type(&self) -> &'static str {
        GAME_TYPE
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let player_count = self.roles.len();

        let (expected_good, expected_evil) =
            expected_team_sizes(player_count).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "avalon requires 5-10 players, got {player_count}"
                ))
            })?;

        let good_count = self.roles.iter().filter(|r| r.is_good()).count();
        let evil_count = player_count - good_count;

        if good_count != expected_good || evil_count != expected_evil {
            return Err(ConfigError::Invalid(format!(
                "invalid team sizes for {player_count} players: expected {expected_good} good, {expected_evil} evil; got {good_count} good, {evil_count} evil"
            )));
        }

        // Merlin without an assassin would make three good quests an
        // instant, uncontested win.
        if self.roles.contains(&Role::Merlin) && !self.roles.contains(&Role::Assassin) {
            return Err(ConfigError::Invalid(
                "assassin is required when merlin is present".into(),
            ));
        }

        // Percival's whole job is finding Merlin.
        if self.roles.contains(&Role::Percival) && !self.roles.contains(&Role::Merlin) {
            return Err(ConfigError::Invalid(
                "merlin is required when percival is present".into(),
            ));
        }

        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Config {
    /// Standard setup: Merlin + Assassin, everyone else plain.
    pub fn standard(player_count: usize) -> Option<Self> {
        let (mut good, mut evil) = expected_team_sizes(player_count)?;

        let mut roles = vec![Role::Merlin, Role::Assassin];
        good -= 1;
        evil -= 1;

        roles.extend(std::iter::repeat(Role::LoyalServant).take(good));
        roles.extend(std::iter::repeat(Role::Minion).take(evil));

        Some(Self { roles })
    }

    /// Standard setup plus the Percival/Morgana pairing.
    pub fn with_percival(player_count: usize) -> Option<Self> {
        let (mut good, mut evil) = expected_team_sizes(player_count)?;

        let mut roles = vec![Role::Merlin, Role::Percival, Role::Assassin, Role::Morgana];
        good -= 2;
        evil -= 2;

        roles.extend(std::iter::repeat(Role::LoyalServant).take(good));
        roles.extend(std::iter::repeat(Role::Minion).take(evil));

        Some(Self { roles })
    }
}

/// Parse raw JSON into an avalon config. Matches the registry's
/// `ConfigParser` signature.
pub fn parse_config(data: &[u8]) -> Result<Box<dyn GameConfig>, ConfigError> {
    let config: Config = serde_json::from_slice(data)?;
    Ok(Box::new(config))
}
