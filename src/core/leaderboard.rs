use crate::core::scoring::{aggregate, awarded_by, leaderboard_order};
use crate::domain::model::{
    Category, GameId, LeaderboardEntry, Nomination, NominationFilter, Ranking, ScoreEntry,
};
use crate::domain::ports::{NominationStore, RankingStore};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub categories: BTreeMap<Category, Vec<LeaderboardEntry>>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    category: &'a str,
    rank: usize,
    game_id: GameId,
    name: &'a str,
    year: Option<i32>,
    total_points: u32,
    voters: u32,
    nominators: String,
}

impl Leaderboard {
    /// Every nominated game appears, scored or not. Games that were ranked but
    /// are no longer nominated keep their points without display fields.
    pub fn compute(nominations: &[Nomination], rankings: &[Ranking]) -> Self {
        let mut categories = BTreeMap::new();

        for category in Category::ALL {
            let mut scores: HashMap<GameId, ScoreEntry> = aggregate(category, rankings)
                .into_iter()
                .map(|s| (s.game_id, s))
                .collect();

            let mut entries: Vec<LeaderboardEntry> = Vec::new();
            let mut index: HashMap<GameId, usize> = HashMap::new();

            for nomination in nominations.iter().filter(|n| n.category == category) {
                if let Some(&pos) = index.get(&nomination.game_id) {
                    entries[pos].nominators.push(nomination.nominator().to_string());
                    continue;
                }
                let score = scores.remove(&nomination.game_id);
                index.insert(nomination.game_id, entries.len());
                entries.push(LeaderboardEntry {
                    rank: 0,
                    game_id: nomination.game_id,
                    name: Some(nomination.game_name.clone()),
                    year: nomination.game_year,
                    image: nomination.game_image.clone(),
                    nominators: vec![nomination.nominator().to_string()],
                    total_points: score.map_or(0, |s| s.total_points),
                    voters: score.map_or(0, |s| s.voters),
                });
            }

            entries.extend(scores.into_values().map(|s| LeaderboardEntry {
                rank: 0,
                game_id: s.game_id,
                name: None,
                year: None,
                image: None,
                nominators: Vec::new(),
                total_points: s.total_points,
                voters: s.voters,
            }));

            entries.sort_by(|a, b| {
                leaderboard_order(a.total_points, a.game_id, b.total_points, b.game_id)
            });
            for (i, entry) in entries.iter_mut().enumerate() {
                entry.rank = i + 1;
            }

            categories.insert(category, entries);
        }

        Self {
            categories,
            generated_at: Utc::now(),
        }
    }

    pub fn category(&self, category: Category) -> &[LeaderboardEntry] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Games `nominator` put forward, per category, in leaderboard order. Drives
    /// the presenter highlight.
    pub fn nominated_by(&self, nominator: &str) -> BTreeMap<Category, Vec<GameId>> {
        self.categories
            .iter()
            .map(|(c, entries)| {
                let games = entries
                    .iter()
                    .filter(|e| e.is_nominated_by(nominator))
                    .map(|e| e.game_id)
                    .collect();
                (*c, games)
            })
            .collect()
    }

    pub fn winners(&self, category: Category, n: usize) -> &[LeaderboardEntry] {
        let entries = self.category(category);
        &entries[..n.min(entries.len())]
    }

    /// Same ordering and timestamp, truncated to the top `n` of each category.
    pub fn top(&self, n: usize) -> Self {
        Self {
            categories: self
                .categories
                .iter()
                .map(|(c, entries)| (*c, entries.iter().take(n).cloned().collect()))
                .collect(),
            generated_at: self.generated_at,
        }
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        for (category, entries) in &self.categories {
            for entry in entries {
                csv.serialize(CsvRow {
                    category: category.key(),
                    rank: entry.rank,
                    game_id: entry.game_id,
                    name: entry.name.as_deref().unwrap_or(""),
                    year: entry.year,
                    total_points: entry.total_points,
                    voters: entry.voters,
                    nominators: entry.nominators.join(";"),
                })?;
            }
        }
        csv.flush()?;
        Ok(())
    }
}

/// Points a single voter awarded, per category.
pub fn voter_breakdown(
    rankings: &[Ranking],
    voter: &str,
) -> Option<BTreeMap<Category, Vec<(GameId, u32)>>> {
    let ranking = rankings
        .iter()
        .find(|r| r.email == voter || r.user_id == voter)?;
    Some(
        Category::ALL
            .into_iter()
            .map(|c| (c, awarded_by(ranking, c)))
            .collect(),
    )
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub sequence: u64,
    pub leaderboard: Arc<Leaderboard>,
    pub rankings: Arc<Vec<Ranking>>,
}

struct PollerState<B> {
    backend: B,
    issued: AtomicU64,
    applied: Mutex<u64>,
    tx: watch::Sender<Option<Snapshot>>,
}

/// Periodically rebuilds the leaderboard from fresh nominations and rankings.
///
/// Refreshes may overlap. Each one takes a sequence number when it starts and
/// is published only if nothing newer has been published already.
pub struct LeaderboardPoller<B> {
    state: Arc<PollerState<B>>,
}

impl<B> Clone for LeaderboardPoller<B> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<B> LeaderboardPoller<B>
where
    B: NominationStore + RankingStore + 'static,
{
    pub fn new(backend: B) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            state: Arc::new(PollerState {
                backend,
                issued: AtomicU64::new(0),
                applied: Mutex::new(0),
                tx,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Snapshot>> {
        self.state.tx.subscribe()
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.state.tx.borrow().clone()
    }

    /// Fetches and publishes one leaderboard. `Ok(false)` means a newer
    /// refresh finished first and this result was dropped.
    pub async fn refresh(&self) -> Result<bool> {
        let state = &self.state;
        let sequence = state.issued.fetch_add(1, Ordering::SeqCst) + 1;

        let filter = NominationFilter::all();
        let (nominations, rankings) = tokio::try_join!(
            state.backend.list_nominations(&filter),
            state.backend.list_rankings(),
        )?;
        let leaderboard = Leaderboard::compute(&nominations, &rankings);

        let mut applied = state
            .applied
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if sequence < *applied {
            tracing::debug!(
                "Discarding leaderboard refresh #{} (already showing #{})",
                sequence,
                *applied
            );
            return Ok(false);
        }
        *applied = sequence;
        tracing::debug!(
            "Published leaderboard #{} from {} rankings",
            sequence,
            rankings.len()
        );
        state.tx.send_replace(Some(Snapshot {
            sequence,
            leaderboard: Arc::new(leaderboard),
            rankings: Arc::new(rankings),
        }));
        Ok(true)
    }

    /// Refreshes every `interval` until `shutdown` turns true or its sender is
    /// dropped. Refreshes still in flight at that point run to completion.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let poller = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = poller.refresh().await {
                            tracing::warn!("Leaderboard refresh failed: {}", e.user_friendly_message());
                        }
                    });
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("Leaderboard polling stopped");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nomination(user: &str, category: Category, game_id: GameId, name: &str) -> Nomination {
        Nomination {
            id: game_id as i64,
            user_id: user.to_string(),
            email: Some(user.to_string()),
            category,
            game_id,
            game_name: name.to_string(),
            game_year: Some(2019),
            game_image: None,
            created_at: None,
        }
    }

    fn ranking(user: &str, category: Category, games: &[GameId]) -> Ranking {
        let mut entries = BTreeMap::new();
        entries.insert(category, games.to_vec());
        Ranking {
            user_id: user.to_string(),
            email: user.to_string(),
            entries,
            updated_at: None,
        }
    }

    #[test]
    fn test_compute_includes_unranked_and_orphaned_games() {
        let nominations = vec![
            nomination("a@x.com", Category::PartyGame, 1, "Codenames"),
            nomination("b@x.com", Category::PartyGame, 2, "Just One"),
            nomination("c@x.com", Category::PartyGame, 2, "Just One"),
            nomination("d@x.com", Category::PartyGame, 5, "Skull"),
        ];
        let rankings = vec![ranking("a@x.com", Category::PartyGame, &[2, 9])];

        let board = Leaderboard::compute(&nominations, &rankings);
        let party = board.category(Category::PartyGame);

        let order: Vec<(GameId, u32)> = party.iter().map(|e| (e.game_id, e.total_points)).collect();
        assert_eq!(order, vec![(2, 12), (9, 10), (5, 0), (1, 0)]);
        assert_eq!(party[0].nominators, vec!["b@x.com", "c@x.com"]);
        assert_eq!(party[0].rank, 1);
        assert!(party[1].name.is_none());
        assert!(board.category(Category::HeavyWeight).is_empty());
    }

    #[test]
    fn test_winners_and_top() {
        let nominations: Vec<Nomination> = (1..=5)
            .map(|i| nomination(&format!("u{}@x.com", i), Category::MidWeight, i, "G"))
            .collect();
        let rankings = vec![ranking("v@x.com", Category::MidWeight, &[3, 1, 4, 5, 2])];
        let board = Leaderboard::compute(&nominations, &rankings);

        let winners: Vec<GameId> = board
            .winners(Category::MidWeight, 3)
            .iter()
            .map(|e| e.game_id)
            .collect();
        assert_eq!(winners, vec![3, 1, 4]);
        assert_eq!(board.winners(Category::PartyGame, 3).len(), 0);
        assert_eq!(board.top(2).category(Category::MidWeight).len(), 2);
    }

    #[test]
    fn test_csv_export() {
        let nominations = vec![nomination("a@x.com", Category::HeavyWeight, 42, "Brass")];
        let rankings = vec![ranking("b@x.com", Category::HeavyWeight, &[42])];
        let board = Leaderboard::compute(&nominations, &rankings);

        let mut out = Vec::new();
        board.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "category,rank,game_id,name,year,total_points,voters,nominators"
        );
        assert_eq!(lines.next().unwrap(), "heavyWeight,1,42,Brass,2019,12,1,a@x.com");
    }

    #[test]
    fn test_nominated_by_highlights_shared_nominations() {
        let nominations = vec![
            nomination("a@x.com", Category::PartyGame, 1, "Codenames"),
            nomination("b@x.com", Category::PartyGame, 2, "Just One"),
            nomination("a@x.com", Category::MidWeight, 3, "Azul"),
            nomination("c@x.com", Category::PartyGame, 2, "Just One"),
        ];
        let rankings = vec![ranking("b@x.com", Category::PartyGame, &[1])];
        let board = Leaderboard::compute(&nominations, &rankings);

        let by_a = board.nominated_by("a@x.com");
        assert_eq!(by_a[&Category::PartyGame], vec![1]);
        assert_eq!(by_a[&Category::MidWeight], vec![3]);
        assert!(by_a[&Category::HeavyWeight].is_empty());

        // c only co-nominated game 2; votes cast by b do not count
        assert_eq!(board.nominated_by("c@x.com")[&Category::PartyGame], vec![2]);
        assert!(board.nominated_by("b@x.com")[&Category::MidWeight].is_empty());
        assert!(!board.category(Category::PartyGame)[0].is_nominated_by("b@x.com"));
    }

    #[test]
    fn test_voter_breakdown() {
        let rankings = vec![
            ranking("a@x.com", Category::PartyGame, &[4, 3]),
            ranking("b@x.com", Category::PartyGame, &[3]),
        ];
        let breakdown = voter_breakdown(&rankings, "a@x.com").unwrap();
        assert_eq!(breakdown[&Category::PartyGame], vec![(4, 12), (3, 10)]);
        assert!(breakdown[&Category::MidWeight].is_empty());
        assert!(voter_breakdown(&rankings, "nobody@x.com").is_none());
    }
}
