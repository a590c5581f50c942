//! Werewolf roles and game configuration.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::game::{ConfigError, GameConfig};

pub const GAME_TYPE: &str = "werewolf";

const DEFAULT_NIGHT_SECS: u64 = 180;
const DEFAULT_DAY_SECS: u64 = 300;

/// A role card. The deck always holds three more cards than there are
/// players; the extras become face-down center cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Werewolf,
    Minion,
    Mason,
    Seer,
    Robber,
    Troublemaker,
    Drunk,
    Insomniac,
    Hunter,
    Tanner,
    Villager,
}

impl Role {
    /// Roles aligned with the werewolves.
    pub fn is_werewolf_team(self) -> bool {
        matches!(self, Role::Werewolf | Role::Minion)
    }

    /// Roles aligned with the village. The tanner is on neither side.
    pub fn is_village_team(self) -> bool {
        !self.is_werewolf_team() && self != Role::Tanner
    }
}

/// Configuration for a werewolf game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cards to deal: player count + 3.
    pub roles: Vec<Role>,
    #[serde(default = "default_night_secs")]
    pub night_duration_secs: u64,
    #[serde(default = "default_day_secs")]
    pub day_duration_secs: u64,
}

fn default_night_secs() -> u64 {
    DEFAULT_NIGHT_SECS
}

fn default_day_secs() -> u64 {
    DEFAULT_DAY_SECS
}

impl GameConfig for Config {
    fn game_type(&self) -> &'static str {
        GAME_TYPE
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.roles.is_empty() {
            return Err(ConfigError::Invalid("at least one role required".into()));
        }
        if !self.roles.contains(&Role::Werewolf) {
            return Err(ConfigError::Invalid(
                "at least one werewolf required".into(),
            ));
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Parse raw JSON into a werewolf config. Matches the registry's
/// `ConfigParser` signature.
pub fn parse_config(data: &[u8]) -> Result<Box<dyn GameConfig>, ConfigError> {
    let config: Config = serde_json::from_slice(data)?;
    Ok(Box::new(config))
}
