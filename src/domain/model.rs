use crate::utils::error::{Result, VoteError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// BoardGameGeek id; rankings and scores are keyed on it.
pub type GameId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "partyGame")]
    PartyGame,
    #[serde(rename = "midWeight")]
    MidWeight,
    #[serde(rename = "heavyWeight")]
    HeavyWeight,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::PartyGame, Category::MidWeight, Category::HeavyWeight];

    /// Key used on the wire and in persisted rankings.
    pub fn key(self) -> &'static str {
        match self {
            Category::PartyGame => "partyGame",
            Category::MidWeight => "midWeight",
            Category::HeavyWeight => "heavyWeight",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Category::PartyGame => "Party Game",
            Category::MidWeight => "Mid Weight",
            Category::HeavyWeight => "Heavy Weight",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Category {
    type Err = VoteError;

    /// Accepts the wire key and the title in any case, with spaces, dashes or
    /// underscores between words ("partyGame", "party game", "party-game").
    fn from_str(s: &str) -> Result<Self> {
        let folded: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();

        match folded.as_str() {
            "partygame" => Ok(Category::PartyGame),
            "midweight" => Ok(Category::MidWeight),
            "heavyweight" => Ok(Category::HeavyWeight),
            _ => Err(VoteError::validation(format!(
                "unknown category '{}', expected one of: {}",
                s,
                Category::ALL.map(Category::key).join(", ")
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub user_id: String,
}

impl Identity {
    /// The original client used the email address as the user id.
    pub fn from_email(email: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            user_id: email.clone(),
            email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardGame {
    pub id: GameId,
    pub name: String,
    pub year: Option<i32>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nomination {
    pub id: i64,
    pub user_id: String,
    pub email: Option<String>,
    pub category: Category,
    pub game_id: GameId,
    pub game_name: String,
    pub game_year: Option<i32>,
    pub game_image: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Nomination {
    /// Email when known, user id otherwise.
    pub fn nominator(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.user_id)
    }
}

/// Payload of an upsert, before the backend has assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NominationDraft {
    pub user_id: String,
    pub email: String,
    pub category: Category,
    pub game: BoardGame,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NominationFilter {
    pub user_id: Option<String>,
    pub category: Option<Category>,
}

impl NominationFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            category: None,
        }
    }
}

/// One voter's ordered preferences; position 1 is index 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    pub user_id: String,
    pub email: String,
    pub entries: BTreeMap<Category, Vec<GameId>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Ranking {
    pub fn empty(user: &Identity) -> Self {
        Self {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            entries: BTreeMap::new(),
            updated_at: None,
        }
    }

    pub fn category(&self, category: Category) -> &[GameId] {
        self.entries.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Search window over the board game catalog, zero based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub index: usize,
    pub size: usize,
}

impl Page {
    pub fn new(index: usize, size: usize) -> Self {
        Self { index, size }
    }

    /// Inclusive bounds, the backend's `range=[start,end]` convention.
    pub fn bounds(&self) -> Result<(usize, usize)> {
        self.index
            .checked_mul(self.size)
            .and_then(|start| Some((start, start.checked_add(self.size.saturating_sub(1))?)))
            .ok_or_else(|| VoteError::validation(format!("page {} is out of range", self.index)))
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { index: 0, size: 10 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreEntry {
    pub game_id: GameId,
    pub total_points: u32,
    pub voters: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub game_id: GameId,
    pub name: Option<String>,
    pub year: Option<i32>,
    pub image: Option<String>,
    pub nominators: Vec<String>,
    pub total_points: u32,
    pub voters: u32,
}

impl LeaderboardEntry {
    pub fn is_nominated_by(&self, email: &str) -> bool {
        self.nominators.iter().any(|n| n == email)
    }
}
