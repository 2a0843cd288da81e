use crate::domain::model::Identity;
use crate::domain::ports::SessionStorage;
use crate::utils::error::{Result, VoteError};
use crate::utils::validation::{validate_email, validate_non_empty_string};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Persisted shape; both fields null means logged out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct PersistedUser {
    email: Option<String>,
    user_id: Option<String>,
}

impl From<PersistedUser> for Option<Identity> {
    fn from(user: PersistedUser) -> Self {
        match (user.email, user.user_id) {
            (Some(email), Some(user_id)) if !email.is_empty() && !user_id.is_empty() => {
                Some(Identity { email, user_id })
            }
            _ => None,
        }
    }
}

/// The identity of whoever is using this client, at most one at a time.
///
/// Only `set` and `clear` change it, and both write through to storage first so
/// a reload reproduces the same state.
pub struct SessionStore<S: SessionStorage> {
    storage: S,
    current: RwLock<Option<Identity>>,
}

impl<S: SessionStorage> SessionStore<S> {
    pub async fn load(storage: S) -> Result<Self> {
        let current: Option<Identity> = match storage.read().await? {
            None => None,
            Some(raw) => match serde_json::from_slice::<PersistedUser>(&raw) {
                Ok(user) => user.into(),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable session data: {}", e);
                    None
                }
            },
        };

        if let Some(identity) = &current {
            tracing::debug!("Restored session for {}", identity.email);
        }

        Ok(Self {
            storage,
            current: RwLock::new(current),
        })
    }

    pub fn get(&self) -> Option<Identity> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn require(&self) -> Result<Identity> {
        self.get().ok_or(VoteError::NotAuthenticated)
    }

    pub fn is_logged_in(&self) -> bool {
        self.get().is_some()
    }

    pub async fn set(&self, identity: Identity) -> Result<()> {
        validate_email("email", &identity.email)?;
        validate_non_empty_string("user id", &identity.user_id)?;

        let persisted = PersistedUser {
            email: Some(identity.email.clone()),
            user_id: Some(identity.user_id.clone()),
        };
        self.storage.write(&serde_json::to_vec(&persisted)?).await?;

        tracing::info!("Logged in as {}", identity.email);
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(identity);
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.storage.remove().await?;
        let previous = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(identity) = previous {
            tracing::info!("Logged out {}", identity.email);
        }
        Ok(())
    }
}
