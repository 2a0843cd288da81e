//! JSON records exactly as the backend sends them, and the checks that turn
//! them into domain records.

use crate::domain::model::{
    BoardGame, Category, GameId, Nomination, NominationDraft, Ranking,
};
use crate::utils::error::{Result, VoteError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardGameRecord {
    pub id: Option<GameId>,
    pub name: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub square200: Option<String>,
}

impl TryFrom<BoardGameRecord> for BoardGame {
    type Error = VoteError;

    fn try_from(record: BoardGameRecord) -> Result<Self> {
        let id = record
            .id
            .filter(|id| *id > 0)
            .ok_or_else(|| VoteError::malformed("boardgame", "missing or zero id"))?;
        let name = record
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| VoteError::malformed("boardgame", format!("game {} has no name", id)))?;

        Ok(BoardGame {
            id,
            name,
            year: record.year.filter(|y| *y != 0),
            image: record.square200.filter(|s| !s.is_empty()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NominationRecord {
    pub id: Option<i64>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub category: Option<String>,
    pub game_id: Option<GameId>,
    pub game_name: Option<String>,
    #[serde(default)]
    pub game_year: Option<i32>,
    #[serde(default)]
    pub game_image: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<NominationRecord> for Nomination {
    type Error = VoteError;

    fn try_from(record: NominationRecord) -> Result<Self> {
        let id = record
            .id
            .ok_or_else(|| VoteError::malformed("nomination", "missing id"))?;
        let user_id = record
            .user_id
            .filter(|u| !u.is_empty())
            .ok_or_else(|| VoteError::malformed("nomination", format!("nomination {} has no user_id", id)))?;
        let category = record
            .category
            .as_deref()
            .ok_or_else(|| VoteError::malformed("nomination", format!("nomination {} has no category", id)))?
            .parse::<Category>()
            .map_err(|e| VoteError::malformed("nomination", e.to_string()))?;
        let game_id = record
            .game_id
            .filter(|g| *g > 0)
            .ok_or_else(|| VoteError::malformed("nomination", format!("nomination {} has no game_id", id)))?;

        Ok(Nomination {
            id,
            user_id,
            email: record.email.filter(|e| !e.is_empty()),
            category,
            game_id,
            game_name: record.game_name.unwrap_or_default(),
            game_year: record.game_year.filter(|y| *y != 0),
            game_image: record.game_image.filter(|s| !s.is_empty()),
            created_at: record.created_at,
        })
    }
}

/// Upsert body; conflict key is `(user_id, category)`.
#[derive(Debug, Clone, Serialize)]
pub struct NominationUpsert<'a> {
    pub user_id: &'a str,
    pub email: &'a str,
    pub category: &'static str,
    pub game_id: GameId,
    pub game_name: &'a str,
    pub game_year: i32,
    pub game_image: &'a str,
}

impl<'a> From<&'a NominationDraft> for NominationUpsert<'a> {
    fn from(draft: &'a NominationDraft) -> Self {
        Self {
            user_id: &draft.user_id,
            email: &draft.email,
            category: draft.category.key(),
            game_id: draft.game.id,
            game_name: &draft.game.name,
            game_year: draft.game.year.unwrap_or(0),
            game_image: draft.game.image.as_deref().unwrap_or(""),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingRecord {
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub ranking: BTreeMap<String, Vec<GameId>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<RankingRecord> for Ranking {
    type Error = VoteError;

    fn try_from(record: RankingRecord) -> Result<Self> {
        let user_id = record
            .user_id
            .filter(|u| !u.is_empty())
            .ok_or_else(|| VoteError::malformed("ranking", "missing user_id"))?;

        let mut entries = BTreeMap::new();
        for (key, games) in record.ranking {
            let category: Category = key
                .parse()
                .map_err(|e: VoteError| VoteError::malformed("ranking", e.to_string()))?;

            let mut seen = HashSet::with_capacity(games.len());
            if let Some(dup) = games.iter().find(|g| !seen.insert(**g)) {
                return Err(VoteError::malformed(
                    "ranking",
                    format!("{} lists game {} twice in {}", user_id, dup, category.key()),
                ));
            }
            entries.insert(category, games);
        }

        Ok(Ranking {
            email: record.email.unwrap_or_else(|| user_id.clone()),
            user_id,
            entries,
            updated_at: record.updated_at,
        })
    }
}

impl From<&Ranking> for RankingRecord {
    fn from(ranking: &Ranking) -> Self {
        Self {
            user_id: Some(ranking.user_id.clone()),
            email: Some(ranking.email.clone()),
            ranking: ranking
                .entries
                .iter()
                .map(|(c, games)| (c.key().to_string(), games.clone()))
                .collect(),
            updated_at: ranking.updated_at,
        }
    }
}

/// Maps every record, failing on the first malformed one.
pub fn map_all<R, T>(records: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = VoteError>,
{
    records.into_iter().map(T::try_from).collect()
}
