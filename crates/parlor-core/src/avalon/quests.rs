//! Fixed quest tables keyed by player count.

/// Quest numbers run 1 through 5; the first side to win three quests ends
/// the game.
pub const QUEST_COUNT: usize = 5;

/// Consecutive team rejections that hand Evil the game.
pub const MAX_REJECTIONS: u32 = 5;

/// Required team size for a quest. Out-of-range player counts fall back to
/// the 5-player table; quest numbers outside 1..=5 return 0.
pub fn team_size(player_count: usize, quest_number: usize) -> usize {
    let sizes: [usize; QUEST_COUNT] = match player_count {
        6 => [2, 3, 4, 3, 4],
        7 => [2, 3, 3, 4, 4],
        8..=10 => [3, 4, 4, 5, 5],
        _ => [2, 3, 2, 3, 3],
    };

    if (1..=QUEST_COUNT).contains(&quest_number) {
        sizes[quest_number - 1]
    } else {
        0
    }
}

/// Fail cards needed to sink a quest. Quest 4 takes two fails once the
/// table is 7 players or more.
pub fn fails_required(player_count: usize, quest_number: usize) -> usize {
    if quest_number == 4 && player_count >= 7 {
        2
    } else {
        1
    }
}

/// The good/evil split for a player count, or None outside 5..=10.
pub fn expected_team_sizes(player_count: usize) -> Option<(usize, usize)> {
    match player_count {
        5 | 6 => Some((player_count - 2, 2)),
        7 | 8 | 9 => Some((player_count - 3, 3)),
        10 => Some((6, 4)),
        _ => None,
    }
}
