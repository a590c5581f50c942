//! The host's night narration script.

use serde::{Deserialize, Serialize};

use super::config::Role;

/// One step of the night narration, in wake order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightScriptStep {
    pub role: Role,
    pub order: u8,
    pub instruction: String,
}

/// Build the narration script for the roles actually in play (assigned
/// cards plus center cards). Roles without a night step are skipped.
pub fn night_script(roles_in_play: &[Role]) -> Vec<NightScriptStep> {
    const WAKE_ORDER: &[(Role, u8, &str)] = &[
        (
            Role::Werewolf,
            1,
            "Werewolves, wake up and look for other Werewolves. If you are the only Werewolf, you may view one center card.",
        ),
        (
            Role::Minion,
            2,
            "Minion, wake up. Werewolves, raise your hand so the Minion can see you. Werewolves, put your hands down. Minion, close your eyes.",
        ),
        (Role::Mason, 3, "Masons, wake up and look for other Masons."),
        (
            Role::Seer,
            4,
            "Seer, wake up. You may look at another player's card or two of the center cards.",
        ),
        (
            Role::Robber,
            5,
            "Robber, wake up. You may exchange your card with another player's card, and then view your new card.",
        ),
        (
            Role::Troublemaker,
            6,
            "Troublemaker, wake up. You may exchange cards between two other players without looking at those cards.",
        ),
        (
            Role::Drunk,
            7,
            "Drunk, wake up and exchange your card with a card from the center without looking at your new card.",
        ),
        (
            Role::Insomniac,
            8,
            "Insomniac, wake up and look at your card to see if it has changed.",
        ),
    ];

    WAKE_ORDER
        .iter()
        .filter(|(role, _, _)| roles_in_play.contains(role))
        .map(|(role, order, instruction)| NightScriptStep {
            role: *role,
            order: *order,
            instruction: (*instruction).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_only_includes_roles_in_play() {
        let script = night_script(&[
            Role::Werewolf,
            Role::Seer,
            Role::Villager,
            Role::Tanner,
        ]);

        let roles: Vec<Role> = script.iter().map(|s| s.role).collect();
        assert_eq!(roles, vec![Role::Werewolf, Role::Seer]);
    }

    #[test]
    fn test_script_is_in_wake_order() {
        let script = night_script(&[
            Role::Insomniac,
            Role::Drunk,
            Role::Werewolf,
            Role::Mason,
            Role::Robber,
        ]);

        let orders: Vec<u8> = script.iter().map(|s| s.order).collect();
        let mut sorted = orders.clone();
        sorted.sort_unstable();
        assert_eq!(orders, sorted);
    }

    #[test]
    fn test_duplicate_roles_appear_once() {
        let script = night_script(&[Role::Werewolf, Role::Werewolf, Role::Mason, Role::Mason]);
        assert_eq!(script.len(), 2);
    }
}
