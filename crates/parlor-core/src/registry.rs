//! Maps game-type strings to constructors and config parsers.
//!
//! New games plug in here; nothing upstream of the registry needs to change
//! to support another variant.

use std::collections::HashMap;

use thiserror::Error;

use crate::avalon;
use crate::game::{ConfigError, Game, GameConfig};
use crate::werewolf;

/// Creates a fresh game instance.
pub type GameFactory = fn() -> Box<dyn Game>;

/// Parses raw JSON into a game-specific config.
pub type ConfigParser = fn(&[u8]) -> Result<Box<dyn GameConfig>, ConfigError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown game type: {0}")]
    UnknownGameType(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The set of available game types.
pub struct Registry {
    factories: HashMap<&'static str, GameFactory>,
    parsers: HashMap<&'static str, ConfigParser>,
}

impl Registry {
    /// An empty registry. Useful for tests; servers want
    /// [`Registry::with_builtin_games`].
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            parsers: HashMap::new(),
        }
    }

    /// A registry with every shipped game registered.
    pub fn with_builtin_games() -> Self {
        let mut registry = Self::new();
        registry.register(
            werewolf::GAME_TYPE,
            || Box::new(werewolf::WerewolfGame::new()),
            werewolf::parse_config,
        );
        registry.register(
            avalon::GAME_TYPE,
            || Box::new(avalon::AvalonGame::new()),
            avalon::parse_config,
        );
        registry
    }

    pub fn register(
        &mut self,
        game_type: &'static str,
        factory: GameFactory,
        parser: ConfigParser,
    ) {
        self.factories.insert(game_type, factory);
        self.parsers.insert(game_type, parser);
    }

    pub fn is_registered(&self, game_type: &str) -> bool {
        self.factories.contains_key(game_type)
    }

    pub fn create_game(&self, game_type: &str) -> Result<Box<dyn Game>, RegistryError> {
        let factory = self
            .factories
            .get(game_type)
            .ok_or_else(|| RegistryError::UnknownGameType(game_type.to_string()))?;
        Ok(factory())
    }

    pub fn parse_config(
        &self,
        game_type: &str,
        data: &[u8],
    ) -> Result<Box<dyn GameConfig>, RegistryError> {
        let parser = self
            .parsers
            .get(game_type)
            .ok_or_else(|| RegistryError::UnknownGameType(game_type.to_string()))?;
        Ok(parser(data)?)
    }

    /// Parse and validate a config without creating a game.
    pub fn validate_config(&self, game_type: &str, data: &[u8]) -> Result<(), RegistryError> {
        let config = self.parse_config(game_type, data)?;
        config.validate()?;
        Ok(())
    }

    /// All registered game types, sorted.
    pub fn list_games(&self) -> Vec<&'static str> {
        let mut games: Vec<&'static str> = self.factories.keys().copied().collect();
        games.sort_unstable();
        games
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtin_games()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_games_registered() {
        let registry = Registry::with_builtin_games();
        assert!(registry.is_registered("werewolf"));
        assert!(registry.is_registered("avalon"));
        assert_eq!(registry.list_games(), vec!["avalon", "werewolf"]);
    }

    #[test]
    fn test_unknown_game_type() {
        let registry = Registry::with_builtin_games();
        assert!(matches!(
            registry.create_game("bohnanza"),
            Err(RegistryError::UnknownGameType(_))
        ));
        assert!(matches!(
            registry.parse_config("bohnanza", b"{}"),
            Err(RegistryError::UnknownGameType(_))
        ));
    }

    #[test]
    fn test_create_game_dispatches_by_type() {
        let registry = Registry::with_builtin_games();
        let game = registry.create_game("werewolf").unwrap();
        assert_eq!(game.phase().name, "setup");
    }

    #[test]
    fn test_validate_config_dispatches_by_type() {
        let registry = Registry::with_builtin_games();

        registry
            .validate_config(
                "werewolf",
                br#"{"roles": ["werewolf", "seer", "villager"]}"#,
            )
            .unwrap();

        // Structurally sound but semantically invalid.
        assert!(registry
            .validate_config("werewolf", br#"{"roles": ["seer", "villager"]}"#)
            .is_err());

        // Not even JSON.
        assert!(registry.validate_config("avalon", b"not json").is_err());
    }
}
