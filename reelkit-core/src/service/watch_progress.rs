//! Watch progress persistence

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use tokio::sync::watch;

use crate::{
    models::{EpisodeProgress, Film, FilmId, FilmKind, WatchProgress},
    Error, Result,
};

/// Watch progress collaborator
#[async_trait]
pub trait WatchProgressRepository: Send + Sync {
    /// Latest record for a film: the movie record, or the most recently
    /// updated episode record of a TV show
    async fn get(
        &self,
        film_id: &FilmId,
        kind: FilmKind,
        owner_id: &str,
    ) -> Result<Option<WatchProgress>>;

    /// Record of a single episode
    async fn get_episode(
        &self,
        film_id: &FilmId,
        season: u32,
        episode: u32,
        owner_id: &str,
    ) -> Result<Option<WatchProgress>>;

    /// Observe the latest record of a film (latest value is replayed)
    fn subscribe(&self, film_id: &FilmId, owner_id: &str) -> watch::Receiver<Option<WatchProgress>>;

    /// Episode records of one season, ordered by episode number
    async fn get_season_progress(
        &self,
        film_id: &FilmId,
        season: u32,
        owner_id: &str,
    ) -> Result<Vec<EpisodeProgress>>;

    async fn insert(&self, progress: WatchProgress, film: &Film) -> Result<()>;
}

type OwnerFilm = (String, FilmId);

#[derive(Debug, Default)]
struct FilmRecords {
    movie: Option<WatchProgress>,
    episodes: BTreeMap<(u32, u32), WatchProgress>,
}

impl FilmRecords {
    fn latest(&self) -> Option<WatchProgress> {
        if let Some(movie) = &self.movie {
            return Some(movie.clone());
        }
        self.episodes
            .values()
            .max_by_key(|p| match p {
                WatchProgress::Episode(e) => e.updated_at,
                WatchProgress::Movie(m) => m.updated_at,
            })
            .cloned()
    }
}

/// In-memory watch progress store
#[derive(Default)]
pub struct InMemoryWatchProgressRepository {
    records: DashMap<OwnerFilm, FilmRecords>,
    watchers: DashMap<OwnerFilm, watch::Sender<Option<WatchProgress>>>,
    films: DashMap<FilmId, Film>,
}

impl std::fmt::Debug for InMemoryWatchProgressRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryWatchProgressRepository")
            .field("films", &self.films.len())
            .finish()
    }
}

impl InMemoryWatchProgressRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Film stored alongside its progress
    #[must_use]
    pub fn film(&self, film_id: &FilmId) -> Option<Film> {
        self.films.get(film_id).map(|f| f.value().clone())
    }

    fn key(film_id: &FilmId, owner_id: &str) -> OwnerFilm {
        (owner_id.to_string(), film_id.clone())
    }

    fn watcher(&self, key: OwnerFilm) -> watch::Sender<Option<WatchProgress>> {
        self.watchers
            .entry(key)
            .or_insert_with(|| watch::channel(None).0)
            .value()
            .clone()
    }
}

#[async_trait]
impl WatchProgressRepository for InMemoryWatchProgressRepository {
    async fn get(
        &self,
        film_id: &FilmId,
        kind: FilmKind,
        owner_id: &str,
    ) -> Result<Option<WatchProgress>> {
        Ok(self
            .records
            .get(&Self::key(film_id, owner_id))
            .and_then(|r| r.latest())
            .filter(|p| p.kind() == kind))
    }

    async fn get_episode(
        &self,
        film_id: &FilmId,
        season: u32,
        episode: u32,
        owner_id: &str,
    ) -> Result<Option<WatchProgress>> {
        Ok(self
            .records
            .get(&Self::key(film_id, owner_id))
            .and_then(|r| r.episodes.get(&(season, episode)).cloned()))
    }

    fn subscribe(&self, film_id: &FilmId, owner_id: &str) -> watch::Receiver<Option<WatchProgress>> {
        self.watcher(Self::key(film_id, owner_id)).subscribe()
    }

    async fn get_season_progress(
        &self,
        film_id: &FilmId,
        season: u32,
        owner_id: &str,
    ) -> Result<Vec<EpisodeProgress>> {
        Ok(self
            .records
            .get(&Self::key(film_id, owner_id))
            .map(|r| {
                r.episodes
                    .range((season, 0)..=(season, u32::MAX))
                    .filter_map(|(_, p)| match p {
                        WatchProgress::Episode(e) => Some(e.clone()),
                        WatchProgress::Movie(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, progress: WatchProgress, film: &Film) -> Result<()> {
        if progress.film_id() != film.id() {
            return Err(Error::InvalidInput(format!(
                "progress for film {} cannot be stored under film {}",
                progress.film_id(),
                film.id()
            )));
        }
        if progress.kind() != film.kind() {
            return Err(Error::InvalidInput(format!(
                "{} progress cannot be stored for a {}",
                progress.kind(),
                film.kind()
            )));
        }

        let key = Self::key(film.id(), progress.owner_id());
        self.films.insert(film.id().clone(), film.clone());

        let latest = {
            let mut records = self.records.entry(key.clone()).or_default();
            match progress.episode_numbers() {
                Some(numbers) => {
                    records.episodes.insert(numbers, progress);
                }
                None => records.movie = Some(progress),
            }
            records.latest()
        };

        tracing::debug!(
            film_id = %key.1,
            owner_id = %key.0,
            "Watch progress saved"
        );
        self.watcher(key).send_replace(latest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Episode;
    use crate::test_helpers::{movie_fixture, tv_show_fixture};

    #[tokio::test]
    async fn test_movie_round_trip_and_subscribe() {
        let repo = InMemoryWatchProgressRepository::new();
        let film = movie_fixture("1", "Movie", "demo");
        let rx = repo.subscribe(film.id(), "owner");

        let mut progress = WatchProgress::new_movie(film.id().clone(), "owner");
        progress.update(30_000, 100_000, 0.95);
        repo.insert(progress.clone(), &film).await.unwrap();

        let stored = repo.get(film.id(), FilmKind::Movie, "owner").await.unwrap();
        assert_eq!(stored, Some(progress.clone()));
        assert_eq!(rx.borrow().clone(), Some(progress));
        assert!(repo.film(film.id()).is_some());

        // Other owners see nothing
        assert!(repo.get(film.id(), FilmKind::Movie, "other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_season_progress_is_scoped_to_season() {
        let repo = InMemoryWatchProgressRepository::new();
        let show = tv_show_fixture("10", "Show", "demo", 2, 3);

        for (season, number) in [(1, 2), (1, 1), (2, 1)] {
            let episode = Episode::synthetic(show.id(), season, number);
            let progress = WatchProgress::new_episode(show.id().clone(), "owner", &episode);
            repo.insert(progress, &show).await.unwrap();
        }

        let season_one = repo.get_season_progress(show.id(), 1, "owner").await.unwrap();
        let numbers: Vec<_> = season_one.iter().map(|p| p.episode_number).collect();
        assert_eq!(numbers, vec![1, 2]);

        let single = repo.get_episode(show.id(), 2, 1, "owner").await.unwrap();
        assert!(single.is_some());
    }

    #[tokio::test]
    async fn test_insert_rejects_mismatched_variant() {
        let repo = InMemoryWatchProgressRepository::new();
        let show = tv_show_fixture("10", "Show", "demo", 1, 1);
        let progress = WatchProgress::new_movie(show.id().clone(), "owner");

        let err = repo.insert(progress, &show).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
