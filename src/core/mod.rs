pub mod leaderboard;
pub mod ranking;
pub mod registry;
pub mod scoring;
pub mod session;

pub use crate::domain::model::{Category, GameId, Identity, Nomination, Ranking};
pub use crate::domain::ports::{BoardGameCatalog, NominationStore, RankingStore, SessionStorage};
pub use crate::utils::error::Result;
