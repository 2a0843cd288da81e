use crate::domain::model::{Category, GameId, Ranking, ScoreEntry};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Eurovision points for positions 1 through 10.
pub const POINTS_TABLE: [u32; 10] = [12, 10, 8, 7, 6, 5, 4, 3, 2, 1];

/// Points for a 1-based rank position; 0 outside `1..=10`.
pub fn points(position: usize) -> u32 {
    match position {
        1..=10 => POINTS_TABLE[position - 1],
        _ => 0,
    }
}

/// Higher total first, then higher game id.
pub fn leaderboard_order(a_points: u32, a_id: GameId, b_points: u32, b_id: GameId) -> Ordering {
    b_points.cmp(&a_points).then_with(|| b_id.cmp(&a_id))
}

/// Sums every voter's points per game in `category`.
///
/// The result does not depend on the order rankings are supplied in: totals are
/// plain sums and the sort is total.
pub fn aggregate<'a, I>(category: Category, rankings: I) -> Vec<ScoreEntry>
where
    I: IntoIterator<Item = &'a Ranking>,
{
    let mut totals: HashMap<GameId, ScoreEntry> = HashMap::new();

    for ranking in rankings {
        for (index, game_id) in ranking.category(category).iter().enumerate() {
            let entry = totals.entry(*game_id).or_insert(ScoreEntry {
                game_id: *game_id,
                total_points: 0,
                voters: 0,
            });
            entry.total_points += points(index + 1);
            entry.voters += 1;
        }
    }

    let mut scores: Vec<ScoreEntry> = totals.into_values().collect();
    scores.sort_by(|a, b| leaderboard_order(a.total_points, a.game_id, b.total_points, b.game_id));
    scores
}

/// Points one voter hands out in a category, best first. Unscored tail
/// positions are omitted.
pub fn awarded_by(ranking: &Ranking, category: Category) -> Vec<(GameId, u32)> {
    ranking
        .category(category)
        .iter()
        .enumerate()
        .map(|(index, game_id)| (*game_id, points(index + 1)))
        .take_while(|(_, pts)| *pts > 0)
        .collect()
}
