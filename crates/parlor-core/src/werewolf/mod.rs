//! One Night-style werewolf: hidden roles, a single night of secret card
//! movement, then one day vote that decides everything.

mod config;
mod game;
mod narration;
mod phases;
mod state;

pub use config::{parse_config, Config, Role, GAME_TYPE};
pub use game::{
    WerewolfGame, ACTION_ACKNOWLEDGE_ROLE, ACTION_ADVANCE_PHASE, ACTION_DRUNK_SWAP,
    ACTION_EXTEND_TIMER, ACTION_ROBBER_SWAP, ACTION_SEER_VIEW, ACTION_TOGGLE_TIMER,
    ACTION_TROUBLEMAKER_SWAP, ACTION_VIEW_CENTER, ACTION_VOTE, CENTER_CARD_COUNT,
};
pub use narration::{night_script, NightScriptStep};
pub use state::{PlayerView, PublicView};
