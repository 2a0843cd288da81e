pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::http::RestBackend;
pub use adapters::storage::{FileSessionStorage, MemorySessionStorage};
pub use config::VoteConfig;
pub use crate::core::{
    leaderboard::{Leaderboard, LeaderboardPoller},
    ranking::RankingEditor,
    registry::{NominationList, NominationRegistry},
    session::SessionStore,
};
pub use domain::model::{BoardGame, Category, GameId, Identity, Nomination, Ranking};
pub use utils::error::{Result, VoteError};
