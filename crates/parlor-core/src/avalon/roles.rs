//! Avalon roles, teams, and the covert knowledge graph.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Merlin,
    Percival,
    LoyalServant,
    Assassin,
    Morgana,
    Mordred,
    Oberon,
    Minion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Good,
    Evil,
}

impl Role {
    pub fn is_good(self) -> bool {
        matches!(self, Role::Merlin | Role::Percival | Role::LoyalServant)
    }

    pub fn is_evil(self) -> bool {
        !self.is_good()
    }

    pub fn team(self) -> Team {
        if self.is_good() {
            Team::Good
        } else {
            Team::Evil
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Role::Merlin => {
                "Knows the forces of Evil (except Mordred). Help Good win without revealing yourself!"
            }
            Role::Percival => {
                "You see two powerful wizards. One is Merlin, one is Morgana. Protect Merlin!"
            }
            Role::LoyalServant => {
                "You have no special information. Trust your instincts and your allies!"
            }
            Role::Assassin => {
                "You know your Evil allies. If Good wins 3 quests, you can steal victory by identifying Merlin!"
            }
            Role::Morgana => "You appear as Merlin to Percival. Confuse the Good team!",
            Role::Mordred => "Merlin cannot see you. Use this advantage wisely!",
            Role::Oberon => {
                "You are alone. You do not know other Evil players, and they do not know you."
            }
            Role::Minion => "You know your Evil allies. Work together to sabotage the quests!",
        }
    }
}

/// The player ids a role learns at assignment time:
/// - Merlin sees all Evil except Mordred.
/// - Percival sees Merlin and Morgana without knowing which is which.
/// - Evil see each other, except nobody sees Oberon and Oberon sees nobody.
/// - Everyone else sees nothing.
///
/// The result is sorted so it never depends on map iteration order.
pub fn role_knowledge(
    role: Role,
    player_id: &str,
    roles: &HashMap<String, Role>,
) -> Vec<String> {
    let mut knowledge: Vec<String> = match role {
        Role::Merlin => roles
            .iter()
            .filter(|(pid, r)| {
                pid.as_str() != player_id && r.is_evil() && **r != Role::Mordred
            })
            .map(|(pid, _)| pid.clone())
            .collect(),

        Role::Percival => roles
            .iter()
            .filter(|(pid, r)| {
                pid.as_str() != player_id && matches!(r, Role::Merlin | Role::Morgana)
            })
            .map(|(pid, _)| pid.clone())
            .collect(),

        Role::Assassin | Role::Morgana | Role::Mordred | Role::Minion => roles
            .iter()
            .filter(|(pid, r)| {
                pid.as_str() != player_id && r.is_evil() && **r != Role::Oberon
            })
            .map(|(pid, _)| pid.clone())
            .collect(),

        Role::Oberon | Role::LoyalServant => Vec::new(),
    };

    knowledge.sort();
    knowledge
}

/// Shuffle the role deck before dealing.
///
/// `thread_rng` is a CSPRNG reseeded from the OS; assignment must resist
/// prediction, fairness here is an adversarial property.
pub(super) fn shuffle_roles(roles: &mut [Role]) {
    roles.shuffle(&mut rand::thread_rng());
}

pub(super) fn has_role(roles: &HashMap<String, Role>, role: Role) -> bool {
    roles.values().any(|r| *r == role)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role_map(entries: &[(&str, Role)]) -> HashMap<String, Role> {
        entries
            .iter()
            .map(|(id, role)| (id.to_string(), *role))
            .collect()
    }

    #[test]
    fn test_merlin_sees_evil_except_mordred() {
        let roles = role_map(&[
            ("merlin", Role::Merlin),
            ("assassin", Role::Assassin),
            ("mordred", Role::Mordred),
            ("oberon", Role::Oberon),
            ("servant", Role::LoyalServant),
        ]);

        let knowledge = role_knowledge(Role::Merlin, "merlin", &roles);
        assert_eq!(knowledge, vec!["assassin", "oberon"]);
    }

    #[test]
    fn test_percival_sees_merlin_and_morgana() {
        let roles = role_map(&[
            ("percival", Role::Percival),
            ("merlin", Role::Merlin),
            ("morgana", Role::Morgana),
            ("servant", Role::LoyalServant),
            ("assassin", Role::Assassin),
        ]);

        let knowledge = role_knowledge(Role::Percival, "percival", &roles);
        assert_eq!(knowledge, vec!["merlin", "morgana"]);
    }

    #[test]
    fn test_evil_see_each_other_except_oberon() {
        let roles = role_map(&[
            ("assassin", Role::Assassin),
            ("morgana", Role::Morgana),
            ("oberon", Role::Oberon),
            ("merlin", Role::Merlin),
            ("servant", Role::LoyalServant),
        ]);

        let knowledge = role_knowledge(Role::Assassin, "assassin", &roles);
        assert_eq!(knowledge, vec!["morgana"]);

        let oberon_knowledge = role_knowledge(Role::Oberon, "oberon", &roles);
        assert!(oberon_knowledge.is_empty());
    }

    #[test]
    fn test_servant_sees_nothing() {
        let roles = role_map(&[
            ("servant", Role::LoyalServant),
            ("assassin", Role::Assassin),
            ("merlin", Role::Merlin),
        ]);

        assert!(role_knowledge(Role::LoyalServant, "servant", &roles).is_empty());
    }

    #[test]
    fn test_shuffle_preserves_multiset() {
        let original = vec![
            Role::Merlin,
            Role::Assassin,
            Role::LoyalServant,
            Role::LoyalServant,
            Role::Minion,
        ];
        let mut shuffled = original.clone();
        shuffle_roles(&mut shuffled);

        let mut a = original;
        let mut b = shuffled;
        a.sort_by_key(|r| format!("{r:?}"));
        b.sort_by_key(|r| format!("{r:?}"));
        assert_eq!(a, b);
    }
}
