use async_trait::async_trait;
use boardgame_vote::domain::model::{NominationDraft, NominationFilter};
use boardgame_vote::domain::ports::{NominationStore, RankingStore};
use boardgame_vote::{
    Category, GameId, LeaderboardPoller, Nomination, Ranking, RestBackend, Result, VoteError,
};
use httpmock::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[tokio::test]
async fn test_refresh_computes_leaderboard_from_backend() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/eurovision_nominations");
            then.status(200).json_body(json!([
                {"id": 1, "user_id": "n1@x.com", "email": "n1@x.com", "category": "partyGame", "game_id": 100, "game_name": "A"},
                {"id": 2, "user_id": "n2@x.com", "email": "n2@x.com", "category": "partyGame", "game_id": 200, "game_name": "B"},
                {"id": 3, "user_id": "n3@x.com", "email": "n3@x.com", "category": "partyGame", "game_id": 300, "game_name": "C"}
            ]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/eurovision_votes");
            then.status(200).json_body(json!([
                {"user_id": "v1@x.com", "email": "v1@x.com", "ranking": {"partyGame": [100, 200, 300]}},
                {"user_id": "v2@x.com", "email": "v2@x.com", "ranking": {"partyGame": [200, 100, 300]}}
            ]));
        })
        .await;

    let backend = RestBackend::new(&server.base_url(), Duration::from_secs(5)).unwrap();
    let poller = LeaderboardPoller::new(backend);

    assert!(poller.refresh().await.unwrap());
    let snapshot = poller.latest().unwrap();
    let party = snapshot.leaderboard.category(Category::PartyGame);

    let order: Vec<(GameId, u32)> = party.iter().map(|e| (e.game_id, e.total_points)).collect();
    assert_eq!(order, vec![(200, 22), (100, 22), (300, 16)]);
    assert_eq!(party[0].name.as_deref(), Some("B"));
    assert_eq!(party[0].nominators, vec!["n2@x.com"]);
    assert_eq!(snapshot.rankings.len(), 2);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_snapshot() {
    let server = MockServer::start_async().await;
    let mut nominations = server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/eurovision_nominations");
            then.status(200).json_body(json!([]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/eurovision_votes");
            then.status(200).json_body(json!([]));
        })
        .await;

    let backend = RestBackend::new(&server.base_url(), Duration::from_secs(5)).unwrap();
    let poller = LeaderboardPoller::new(backend);
    poller.refresh().await.unwrap();
    let first = poller.latest().unwrap().sequence;

    nominations.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/eurovision_nominations");
            then.status(500);
        })
        .await;

    assert!(poller.refresh().await.is_err());
    assert_eq!(poller.latest().unwrap().sequence, first);
}

/// Backend whose first rankings fetch is slow, so an older refresh finishes
/// after a newer one.
#[derive(Clone, Default)]
struct SlowFirstBackend {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl NominationStore for SlowFirstBackend {
    async fn list_nominations(&self, _filter: &NominationFilter) -> Result<Vec<Nomination>> {
        Ok(Vec::new())
    }

    async fn upsert_nomination(&self, _draft: &NominationDraft) -> Result<Nomination> {
        Err(VoteError::validation("read only"))
    }

    async fn delete_nomination(&self, _user_id: &str, _category: Category) -> Result<bool> {
        Ok(false)
    }
}

#[async_trait]
impl RankingStore for SlowFirstBackend {
    async fn fetch_ranking(&self, _user_id: &str) -> Result<Option<Ranking>> {
        Ok(None)
    }

    async fn list_rankings(&self) -> Result<Vec<Ranking>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        let mut entries = BTreeMap::new();
        entries.insert(Category::MidWeight, vec![call as GameId + 1]);
        Ok(vec![Ranking {
            user_id: "v@x.com".to_string(),
            email: "v@x.com".to_string(),
            entries,
            updated_at: None,
        }])
    }

    async fn save_ranking(&self, _ranking: &Ranking) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_stale_refresh_is_discarded() {
    let poller = LeaderboardPoller::new(SlowFirstBackend::default());

    let slow = {
        let poller = poller.clone();
        tokio::spawn(async move { poller.refresh().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(poller.refresh().await.unwrap());
    assert!(!slow.await.unwrap().unwrap());

    let snapshot = poller.latest().unwrap();
    assert_eq!(snapshot.sequence, 2);
    // the second fetch ranked game 2
    assert_eq!(
        snapshot.leaderboard.category(Category::MidWeight)[0].game_id,
        2
    );
}

#[tokio::test]
async fn test_run_polls_until_shutdown() {
    let backend = SlowFirstBackend::default();
    backend.calls.store(1, Ordering::SeqCst);
    let poller = LeaderboardPoller::new(backend.clone());
    let mut updates = poller.subscribe();

    let (stop_tx, stop_rx) = watch::channel(false);
    let runner = {
        let poller = poller.clone();
        tokio::spawn(async move { poller.run(Duration::from_millis(20), stop_rx).await })
    };

    updates.changed().await.unwrap();
    updates.changed().await.unwrap();
    stop_tx.send(true).unwrap();
    runner.await.unwrap();

    // let a refresh spawned by the last tick finish
    tokio::time::sleep(Duration::from_millis(50)).await;
    let calls_after_stop = backend.calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.calls.load(Ordering::SeqCst), calls_after_stop);
    assert!(poller.latest().unwrap().sequence >= 2);
}
