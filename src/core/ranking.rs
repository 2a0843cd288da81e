use crate::core::registry::NominationList;
use crate::domain::model::{Category, GameId, Identity, Ranking};
use crate::domain::ports::RankingStore;
use crate::utils::error::{Result, VoteError};
use std::collections::HashSet;

/// Moves `list[from]` to `to`, shifting everything in between by one.
pub fn move_element<T>(list: &mut Vec<T>, from: usize, to: usize) -> Result<()> {
    let len = list.len();
    for index in [from, to] {
        if index >= len {
            return Err(VoteError::IndexError { index, len });
        }
    }
    if from != to {
        let item = list.remove(from);
        list.insert(to, item);
    }
    Ok(())
}

/// Restores a saved order against the current candidate pool.
///
/// Saved games no longer in the pool are dropped, the rest keep their relative
/// order, and pool games the voter has not ranked yet follow in arrival order.
pub fn reconcile(saved: &[GameId], pool: &[GameId]) -> Vec<GameId> {
    let available: HashSet<GameId> = pool.iter().copied().collect();
    let mut seen = HashSet::with_capacity(pool.len());

    let mut order: Vec<GameId> = saved
        .iter()
        .copied()
        .filter(|id| available.contains(id) && seen.insert(*id))
        .collect();

    order.extend(pool.iter().copied().filter(|id| seen.insert(*id)));
    order
}

/// One voter's in-memory ranking, persisted only on [`RankingEditor::save`].
pub struct RankingEditor<R: RankingStore> {
    store: R,
    saved: Option<Ranking>,
    draft: Option<Ranking>,
    dirty: bool,
}

impl<R: RankingStore> RankingEditor<R> {
    pub fn new(store: R) -> Self {
        Self {
            store,
            saved: None,
            draft: None,
            dirty: false,
        }
    }

    /// Loads `category` for `user`, reconciled against `pool`.
    ///
    /// The saved ranking is fetched once per user; a category already edited in
    /// this session keeps its draft order.
    pub async fn initialize(
        &mut self,
        user: &Identity,
        category: Category,
        pool: &NominationList,
    ) -> Result<&[GameId]> {
        let owned_by_user = self
            .draft
            .as_ref()
            .is_some_and(|draft| draft.user_id == user.user_id);

        if !owned_by_user {
            let saved = self.store.fetch_ranking(&user.user_id).await?;
            tracing::debug!(
                "Loaded saved ranking for {}: {}",
                user.user_id,
                if saved.is_some() { "found" } else { "none" }
            );
            self.draft = Some(saved.clone().unwrap_or_else(|| Ranking::empty(user)));
            self.saved = saved;
            self.dirty = false;
        }

        let candidates = pool.game_ids_excluding(&user.user_id, category);
        let draft = self.draft.get_or_insert_with(|| Ranking::empty(user));
        let previous = draft.category(category).to_vec();
        let reconciled = reconcile(&previous, &candidates);

        let dropped = previous.iter().filter(|id| !reconciled.contains(id)).count();
        if dropped > 0 {
            tracing::info!(
                "Dropped {} stale entries from {} ranking of {}",
                dropped,
                category.key(),
                user.user_id
            );
        }

        draft.entries.insert(category, reconciled);
        Ok(draft.category(category))
    }

    /// Zero-based positions, as delivered by a drag-and-drop list.
    pub fn reorder(&mut self, category: Category, from: usize, to: usize) -> Result<()> {
        let Some(list) = self
            .draft
            .as_mut()
            .and_then(|draft| draft.entries.get_mut(&category))
        else {
            return Err(VoteError::IndexError { index: from, len: 0 });
        };
        move_element(list, from, to)?;
        if from != to {
            self.dirty = true;
        }
        Ok(())
    }

    pub fn entries(&self, category: Category) -> &[GameId] {
        self.draft
            .as_ref()
            .map(|draft| draft.category(category))
            .unwrap_or(&[])
    }

    pub fn draft(&self) -> Option<&Ranking> {
        self.draft.as_ref()
    }

    pub fn saved(&self) -> Option<&Ranking> {
        self.saved.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Persists every category at once. On failure the draft is kept as is.
    pub async fn save(&mut self, user: &Identity) -> Result<()> {
        let draft = self
            .draft
            .as_ref()
            .ok_or_else(|| VoteError::validation("nothing to save, no ranking was loaded"))?;

        if draft.user_id != user.user_id {
            return Err(VoteError::validation(format!(
                "ranking belongs to {}, not {}",
                draft.user_id, user.user_id
            )));
        }

        let mut ranking = draft.clone();
        ranking.email = user.email.clone();
        ranking.updated_at = Some(chrono::Utc::now());

        self.store.save_ranking(&ranking).await?;
        tracing::info!(
            "Saved ranking for {} ({} categories)",
            user.user_id,
            ranking.entries.len()
        );

        self.draft = Some(ranking.clone());
        self.saved = Some(ranking);
        self.dirty = false;
        Ok(())
    }
}
