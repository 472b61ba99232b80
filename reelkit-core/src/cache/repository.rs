//! Resolved-links cache store
//!
//! Entries are replace-only: a stored `CachedLinks` is never mutated, a new
//! resolution for the same key replaces the whole entry. A separate
//! "current cache" pointer marks the entry that is actively playing.
//!
//! No eviction happens here. Callers must tolerate a miss at any time.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::watch;

use super::{CacheKey, CachedLinks};

/// The entry marked as actively playing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentCache {
    pub key: CacheKey,
    pub links: Arc<CachedLinks>,
}

/// Cache store collaborator
pub trait CachedLinksRepository: Send + Sync {
    fn get_cache(&self, key: &CacheKey) -> Option<Arc<CachedLinks>>;

    /// Insert or replace the entry for `key`
    fn store(&self, key: CacheKey, links: CachedLinks) -> Arc<CachedLinks>;

    /// Point "current cache" at `key`. Returns false (and leaves the pointer
    /// untouched) when no entry exists for `key`.
    fn set_current_cache(&self, key: &CacheKey) -> bool;

    /// Observe the current cache pointer (latest value is replayed)
    fn current_cache(&self) -> watch::Receiver<Option<CurrentCache>>;
}

/// Unbounded in-memory cache store
pub struct InMemoryCachedLinksRepository {
    entries: DashMap<CacheKey, Arc<CachedLinks>>,
    current: watch::Sender<Option<CurrentCache>>,
}

impl std::fmt::Debug for InMemoryCachedLinksRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCachedLinksRepository")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl InMemoryCachedLinksRepository {
    #[must_use]
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            entries: DashMap::new(),
            current,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for InMemoryCachedLinksRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl CachedLinksRepository for InMemoryCachedLinksRepository {
    fn get_cache(&self, key: &CacheKey) -> Option<Arc<CachedLinks>> {
        let hit = self.entries.get(key).map(|e| e.value().clone());
        tracing::trace!(key = %key, hit = hit.is_some(), "Links cache lookup");
        hit
    }

    fn store(&self, key: CacheKey, links: CachedLinks) -> Arc<CachedLinks> {
        let links = Arc::new(links);
        tracing::debug!(
            key = %key,
            streams = links.streams.len(),
            subtitles = links.subtitles.len(),
            "Storing resolved links"
        );
        self.entries.insert(key.clone(), links.clone());

        // A replaced entry that is currently playing must not leave a stale pointer
        self.current.send_if_modified(|current| match current {
            Some(c) if c.key == key => {
                c.links = links.clone();
                true
            }
            _ => false,
        });

        links
    }

    fn set_current_cache(&self, key: &CacheKey) -> bool {
        let Some(links) = self.get_cache(key) else {
            tracing::warn!(key = %key, "Cannot mark missing cache entry as current");
            return false;
        };

        self.current.send_replace(Some(CurrentCache {
            key: key.clone(),
            links,
        }));
        true
    }

    fn current_cache(&self) -> watch::Receiver<Option<CurrentCache>> {
        self.current.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FilmId, ProviderId, Stream};

    fn key(film: &str) -> CacheKey {
        CacheKey::create(&FilmId::new(film), &ProviderId::new("demo"), None)
    }

    fn links(url: &str) -> CachedLinks {
        CachedLinks {
            watch_id: "w".to_string(),
            provider_id: ProviderId::new("demo"),
            streams: vec![Stream::new(url, "720p")],
            subtitles: Vec::new(),
        }
    }

    #[test]
    fn test_get_after_store() {
        let repo = InMemoryCachedLinksRepository::new();
        assert!(repo.get_cache(&key("1")).is_none());

        repo.store(key("1"), links("a.m3u8"));
        let hit = repo.get_cache(&key("1")).unwrap();
        assert_eq!(hit.streams[0].url, "a.m3u8");
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_current_pointer_requires_entry() {
        let repo = InMemoryCachedLinksRepository::new();
        let rx = repo.current_cache();

        assert!(!repo.set_current_cache(&key("1")));
        assert!(rx.borrow().is_none());

        repo.store(key("1"), links("a.m3u8"));
        assert!(repo.set_current_cache(&key("1")));
        assert_eq!(rx.borrow().as_ref().map(|c| c.key.clone()), Some(key("1")));
    }

    #[test]
    fn test_replacing_current_entry_updates_pointer() {
        let repo = InMemoryCachedLinksRepository::new();
        repo.store(key("1"), links("a.m3u8"));
        repo.set_current_cache(&key("1"));

        repo.store(key("1"), links("b.m3u8"));
        let current = repo.current_cache().borrow().clone().unwrap();
        assert_eq!(current.links.streams[0].url, "b.m3u8");
    }
}
