//! Cache key for resolved links
//!
//! A key identifies one (film, provider, episode) combination. Two requests
//! for the same combination always produce equal keys, so a second request
//! reuses whatever the first one resolved.

use serde::{Deserialize, Serialize};

use crate::models::{Episode, FilmId, ProviderId};

/// Identity of a resolved-links cache entry
///
/// Built only through [`CacheKey::create`]. Every component takes part in
/// equality and hashing, so changing any one of them yields a different key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    film_id: FilmId,
    provider_id: ProviderId,
    episode_id: Option<String>,
}

impl CacheKey {
    /// Derive the key for a film/provider pair and optional episode
    #[must_use]
    pub fn create(film_id: &FilmId, provider_id: &ProviderId, episode: Option<&Episode>) -> Self {
        Self {
            film_id: film_id.clone(),
            provider_id: provider_id.clone(),
            episode_id: episode.map(|e| e.id.clone()),
        }
    }

    #[must_use]
    pub const fn film_id(&self) -> &FilmId {
        &self.film_id
    }

    #[must_use]
    pub const fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }

    #[must_use]
    pub fn episode_id(&self) -> Option<&str> {
        self.episode_id.as_deref()
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.film_id,
            self.provider_id,
            self.episode_id.as_deref().unwrap_or("none")
        )
    }
}
