use crate::adapters::wire::{
    map_all, BoardGameRecord, NominationRecord, NominationUpsert, RankingRecord,
};
use crate::domain::model::{
    BoardGame, Category, GameId, Nomination, NominationDraft, NominationFilter, Page, Ranking,
};
use crate::domain::ports::{BoardGameCatalog, NominationStore, RankingStore};
use crate::utils::error::{Result, VoteError};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use url::Url;

const BOARDGAMES: &str = "rest/boardgames";
const NOMINATIONS: &str = "rest/eurovision_nominations";
const VOTES: &str = "rest/eurovision_votes";

/// reqwest client for the competition backend. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base: Url,
}

impl RestBackend {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(endpoint).map_err(|e| VoteError::InvalidConfigValueError {
            field: "backend.endpoint".to_string(),
            value: endpoint.to_string(),
            reason: format!("Invalid URL format: {}", e),
        })?;
        // `join` replaces the last segment unless the path ends with a slash
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base.join(path).map_err(|e| VoteError::ConfigError {
            message: format!("cannot build URL for {}: {}", path, e),
        })
    }

    /// Turns a non-2xx response into `BackendStatus`, preferring the body's
    /// `message` field.
    async fn check(response: Response, resource: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or_else(|| format!("API Error: {}", status.as_u16()));

        tracing::debug!("{} request failed with {}: {}", resource, status, message);
        Err(VoteError::BackendStatus {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response, resource: &str) -> Result<T> {
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| VoteError::malformed(resource, e.to_string()))
    }
}

#[async_trait]
impl BoardGameCatalog for RestBackend {
    async fn search_boardgames(&self, name: &str, page: Page) -> Result<Vec<BoardGame>> {
        let (start, end) = page.bounds()?;
        let mut url = self.url(BOARDGAMES)?;
        url.query_pairs_mut()
            .append_pair("filter", &serde_json::json!({ "name@simplelike": name }).to_string())
            .append_pair("range", &format!("[{},{}]", start, end));

        tracing::debug!("Searching board games: {}", url);
        let response = Self::check(self.client.get(url).send().await?, "boardgame").await?;
        let records: Vec<BoardGameRecord> = Self::decode(response, "boardgame").await?;
        map_all(records)
    }

    async fn fetch_boardgame(&self, id: GameId) -> Result<BoardGame> {
        let url = self.url(&format!("{}/{}", BOARDGAMES, id))?;
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(VoteError::NotFound {
                resource: format!("Board game {}", id),
            });
        }
        let response = Self::check(response, "boardgame").await?;
        let record: BoardGameRecord = Self::decode(response, "boardgame").await?;
        BoardGame::try_from(record)
    }
}

#[async_trait]
impl NominationStore for RestBackend {
    async fn list_nominations(&self, filter: &NominationFilter) -> Result<Vec<Nomination>> {
        let mut url = self.url(NOMINATIONS)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(user_id) = &filter.user_id {
                query.append_pair("user_id", user_id);
            }
            if let Some(category) = filter.category {
                query.append_pair("category", category.key());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        tracing::debug!("Listing nominations: {}", url);
        let response = Self::check(self.client.get(url).send().await?, "nomination").await?;
        let records: Vec<NominationRecord> = Self::decode(response, "nomination").await?;
        map_all(records)
    }

    async fn upsert_nomination(&self, draft: &NominationDraft) -> Result<Nomination> {
        let url = self.url(NOMINATIONS)?;
        let body = NominationUpsert::from(draft);

        let response = self.client.put(url).json(&body).send().await?;
        let response = Self::check(response, "nomination").await?;
        let record: NominationRecord = Self::decode(response, "nomination").await?;
        Nomination::try_from(record)
    }

    async fn delete_nomination(&self, user_id: &str, category: Category) -> Result<bool> {
        let mut url = self.url(NOMINATIONS)?;
        url.query_pairs_mut()
            .append_pair("user_id", user_id)
            .append_pair("category", category.key());

        let response = self.client.delete(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::check(response, "nomination").await?;
        Ok(true)
    }
}

#[async_trait]
impl RankingStore for RestBackend {
    async fn fetch_ranking(&self, user_id: &str) -> Result<Option<Ranking>> {
        let mut url = self.url(VOTES)?;
        url.query_pairs_mut().append_pair("user_id", user_id);

        let response = Self::check(self.client.get(url).send().await?, "ranking").await?;
        let records: Vec<RankingRecord> = Self::decode(response, "ranking").await?;
        let rankings: Vec<Ranking> = map_all(records)?;
        Ok(rankings.into_iter().find(|r| r.user_id == user_id))
    }

    async fn list_rankings(&self) -> Result<Vec<Ranking>> {
        let url = self.url(VOTES)?;
        let response = Self::check(self.client.get(url).send().await?, "ranking").await?;
        let records: Vec<RankingRecord> = Self::decode(response, "ranking").await?;
        map_all(records)
    }

    async fn save_ranking(&self, ranking: &Ranking) -> Result<()> {
        let url = self.url(VOTES)?;
        let body = RankingRecord::from(ranking);

        tracing::debug!("Saving ranking for {}", ranking.user_id);
        let response = self.client.post(url).json(&body).send().await?;
        Self::check(response, "ranking").await?;
        Ok(())
    }
}
