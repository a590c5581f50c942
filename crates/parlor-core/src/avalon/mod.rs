//! Avalon-style quest game: covert teams, rotating leadership, public team
//! votes, secret quest cards, and a last-ditch assassination.

mod config;
mod game;
mod quests;
mod roles;
mod state;

pub use config::{parse_config, Config, GAME_TYPE};
pub use game::{
    AvalonGame, ACTION_ACKNOWLEDGE_ROLE, ACTION_ASSASSINATE, ACTION_PLAY_QUEST_CARD,
    ACTION_PROPOSE_TEAM, ACTION_VOTE_TEAM,
};
pub use quests::{expected_team_sizes, fails_required, team_size, MAX_REJECTIONS};
pub use roles::{role_knowledge, Role, Team};
pub use state::{PlayerView, PublicView, QuestCard, QuestResult, Vote};
