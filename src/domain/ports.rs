use crate::domain::model::{
    BoardGame, Category, GameId, Nomination, NominationDraft, NominationFilter, Page, Ranking,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Raw persistence for the session store: one opaque blob.
pub trait SessionStorage: Send + Sync {
    fn read(&self) -> impl std::future::Future<Output = Result<Option<Vec<u8>>>> + Send;
    fn write(&self, data: &[u8]) -> impl std::future::Future<Output = Result<()>> + Send;
    fn remove(&self) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait BoardGameCatalog: Send + Sync {
    async fn search_boardgames(&self, name: &str, page: Page) -> Result<Vec<BoardGame>>;
    async fn fetch_boardgame(&self, id: GameId) -> Result<BoardGame>;
}

#[async_trait]
pub trait NominationStore: Send + Sync {
    async fn list_nominations(&self, filter: &NominationFilter) -> Result<Vec<Nomination>>;
    /// Insert or replace on `(user_id, category)`.
    async fn upsert_nomination(&self, draft: &NominationDraft) -> Result<Nomination>;
    /// `Ok(false)` when there was nothing to delete.
    async fn delete_nomination(&self, user_id: &str, category: Category) -> Result<bool>;
}

#[async_trait]
pub trait RankingStore: Send + Sync {
    async fn fetch_ranking(&self, user_id: &str) -> Result<Option<Ranking>>;
    async fn list_rankings(&self) -> Result<Vec<Ranking>>;
    /// Stores every category of the ranking in one request.
    async fn save_ranking(&self, ranking: &Ranking) -> Result<()>;
}
