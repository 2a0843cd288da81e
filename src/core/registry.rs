use crate::domain::model::{
    BoardGame, Category, GameId, Identity, Nomination, NominationDraft, NominationFilter, Page,
};
use crate::domain::ports::{BoardGameCatalog, NominationStore};
use crate::utils::error::{Result, VoteError};
use crate::utils::validation::validate_non_empty_string;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Snapshot of nominations that can be iterated any number of times.
#[derive(Debug, Clone)]
pub struct NominationList {
    items: Arc<Vec<Nomination>>,
    category: Option<Category>,
}

impl NominationList {
    pub fn new(items: Vec<Nomination>, category: Option<Category>) -> Self {
        Self {
            items: Arc::new(items),
            category,
        }
    }

    fn shared(items: Arc<Vec<Nomination>>, category: Option<Category>) -> Self {
        Self { items, category }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Nomination> + '_ {
        let category = self.category;
        self.items
            .iter()
            .filter(move |n| category.map_or(true, |c| n.category == c))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Distinct games in `category` nominated by someone other than `user_id`,
    /// in arrival order.
    pub fn game_ids_excluding(&self, user_id: &str, category: Category) -> Vec<GameId> {
        let mut seen = HashSet::new();
        self.iter()
            .filter(|n| n.category == category && n.user_id != user_id)
            .map(|n| n.game_id)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    pub fn find_game(&self, game_id: GameId) -> Option<&Nomination> {
        self.iter().find(|n| n.game_id == game_id)
    }
}

impl<'a> IntoIterator for &'a NominationList {
    type Item = &'a Nomination;
    type IntoIter = Box<dyn Iterator<Item = &'a Nomination> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Keeps each user's single nomination per category.
pub struct NominationRegistry<B> {
    backend: B,
    cache: RwLock<Option<Arc<Vec<Nomination>>>>,
    generation: AtomicU64,
    page_size: usize,
}

impl<B: NominationStore + BoardGameCatalog> NominationRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self::with_page_size(backend, Page::default().size)
    }

    pub fn with_page_size(backend: B, page_size: usize) -> Self {
        Self {
            backend,
            cache: RwLock::new(None),
            generation: AtomicU64::new(0),
            page_size: page_size.max(1),
        }
    }

    /// Bumped on every nominate, remove or invalidate. A listing fetched at an
    /// older generation is returned but never cached.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn search(&self, name: &str, page: usize) -> Result<Vec<BoardGame>> {
        validate_non_empty_string("search term", name)?;
        let page = Page::new(page, self.page_size);
        page.bounds()?;
        self.backend.search_boardgames(name.trim(), page).await
    }

    pub async fn lookup(&self, game_id: GameId) -> Result<BoardGame> {
        if game_id == 0 {
            return Err(VoteError::validation("game id must be a positive number"));
        }
        self.backend.fetch_boardgame(game_id).await
    }

    /// Replaces any earlier nomination by `user` in `category`.
    pub async fn nominate(
        &self,
        user: &Identity,
        category: Category,
        game: BoardGame,
    ) -> Result<Nomination> {
        validate_non_empty_string("user id", &user.user_id)?;
        validate_non_empty_string("email", &user.email)?;
        validate_non_empty_string("game name", &game.name)?;
        if game.id == 0 {
            return Err(VoteError::validation("game id must be a positive number"));
        }

        let draft = NominationDraft {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            category,
            game,
        };

        let stored = self.backend.upsert_nomination(&draft).await?;
        if stored.user_id != draft.user_id || stored.category != category {
            return Err(VoteError::malformed(
                "nomination",
                format!(
                    "upsert for ({}, {}) returned ({}, {})",
                    draft.user_id,
                    category.key(),
                    stored.user_id,
                    stored.category.key()
                ),
            ));
        }

        self.invalidate().await;
        tracing::info!(
            "{} nominated '{}' ({}) for {}",
            user.email,
            stored.game_name,
            stored.game_id,
            category
        );
        Ok(stored)
    }

    /// Parses the category from user input before nominating.
    pub async fn nominate_by_name(
        &self,
        user: &Identity,
        category: &str,
        game: BoardGame,
    ) -> Result<Nomination> {
        let category: Category = category.parse()?;
        self.nominate(user, category, game).await
    }

    /// Removing a nomination that does not exist is a no-op; the return value
    /// tells whether anything was deleted.
    pub async fn remove(&self, user: &Identity, category: Category) -> Result<bool> {
        validate_non_empty_string("user id", &user.user_id)?;

        let removed = self
            .backend
            .delete_nomination(&user.user_id, category)
            .await?;
        self.invalidate().await;

        if removed {
            tracing::info!("{} removed their {} nomination", user.email, category);
        } else {
            tracing::debug!("{} had no {} nomination to remove", user.email, category);
        }
        Ok(removed)
    }

    pub async fn list_all(&self, category: Option<Category>) -> Result<NominationList> {
        if let Some(items) = self.cache.read().await.as_ref() {
            return Ok(NominationList::shared(Arc::clone(items), category));
        }

        let generation = self.generation();
        let items = Arc::new(self.backend.list_nominations(&NominationFilter::all()).await?);
        tracing::debug!("Fetched {} nominations", items.len());

        // a nominate/remove that landed while we were fetching wins
        let mut cache = self.cache.write().await;
        if self.generation() == generation {
            *cache = Some(Arc::clone(&items));
        }
        drop(cache);
        Ok(NominationList::shared(items, category))
    }

    /// Always goes to the backend; the cache only serves the full listing.
    pub async fn mine(&self, user: &Identity) -> Result<BTreeMap<Category, Nomination>> {
        let filter = NominationFilter::by_user(user.user_id.clone());
        let nominations = self.backend.list_nominations(&filter).await?;

        Ok(nominations
            .into_iter()
            .filter(|n| n.user_id == user.user_id)
            .map(|n| (n.category, n))
            .collect())
    }

    /// Other users' nominations in `category`, one per game, in arrival order.
    pub async fn candidates(&self, user: &Identity, category: Category) -> Result<NominationList> {
        let all = self.list_all(Some(category)).await?;
        let mut seen = HashSet::new();
        let pool: Vec<Nomination> = all
            .iter()
            .filter(|n| n.user_id != user.user_id && seen.insert(n.game_id))
            .cloned()
            .collect();
        Ok(NominationList::new(pool, Some(category)))
    }

    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        *cache = None;
    }
}
