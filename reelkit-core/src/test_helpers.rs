//! Test helpers and fixtures for reelkit-core tests
//!
//! Fixtures for films plus scripted collaborators (provider, resolver,
//! episode lookup, watch progress store) that record what they were asked.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::watch;

use crate::{
    cache::CachedLinks,
    models::{
        Catalog, Episode, EpisodeProgress, Film, FilmId, FilmKind, FilmMetadata, FilmSummary,
        FilterGroup, MediaLink, Movie, Season, SearchQuery, SearchResponse, Stream, TvShow,
        WatchProgress,
    },
    provider::{LinkCallback, ProviderApi, ProviderError},
    service::{
        episode::EpisodeLookup,
        media_links::{LinkRequest, LinkResolution, MediaLinksResolver},
        watch_progress::{InMemoryWatchProgressRepository, WatchProgressRepository},
    },
    Result,
};

fn metadata(id: &str, title: &str, provider_id: &str) -> FilmMetadata {
    FilmMetadata {
        id: id.into(),
        provider_id: provider_id.into(),
        title: title.to_string(),
        year: Some(2024),
        imdb_id: None,
        tmdb_id: None,
        overview: None,
        poster_url: None,
    }
}

/// Create a test movie
pub fn movie_fixture(id: &str, title: &str, provider_id: &str) -> Film {
    Film::Movie(Movie {
        metadata: metadata(id, title, provider_id),
        runtime: Some(120),
    })
}

/// Create a test TV show with synthetic episodes
pub fn tv_show_fixture(
    id: &str,
    title: &str,
    provider_id: &str,
    seasons: u32,
    episodes_per_season: u32,
) -> Film {
    let film_id = FilmId::new(id);
    Film::TvShow(TvShow {
        metadata: metadata(id, title, provider_id),
        total_seasons: seasons,
        seasons: (1..=seasons)
            .map(|number| Season {
                number,
                episodes: (1..=episodes_per_season)
                    .map(|episode| Episode::synthetic(&film_id, number, episode))
                    .collect(),
            })
            .collect(),
    })
}

/// Resolved links with a single stream
pub fn links_fixture(watch_id: &str, provider_id: &str, url: &str, label: &str) -> CachedLinks {
    let mut links = CachedLinks::new(watch_id, provider_id.into());
    links.streams.push(Stream::new(url, label));
    links
}

/// Shared, ordered record of collaborator calls
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Scriptable provider
pub struct MockProvider {
    pub test_film: Option<Film>,
    pub test_film_error: Option<ProviderError>,
    pub catalogs: Vec<Catalog>,
    pub filters: Vec<FilterGroup>,
    pub catalog_items: Option<SearchResponse>,
    pub search_error: Option<ProviderError>,
    pub links_error: Option<ProviderError>,
    pub streams: Vec<Stream>,
    pub links_calls: AtomicUsize,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            test_film: Some(movie_fixture("1", "Mock Movie", "demo")),
            test_film_error: None,
            catalogs: vec![Catalog {
                name: "Trending".to_string(),
                url: "mock://trending".to_string(),
                can_paginate: false,
            }],
            filters: Vec::new(),
            catalog_items: None,
            search_error: None,
            links_error: None,
            streams: vec![Stream::new("a.m3u8", "720p")],
            links_calls: AtomicUsize::new(0),
        }
    }
}

impl MockProvider {
    pub fn links_calls(&self) -> usize {
        self.links_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderApi for MockProvider {
    async fn test_film(&self) -> std::result::Result<Option<Film>, ProviderError> {
        match &self.test_film_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.test_film.clone()),
        }
    }

    async fn catalogs(&self) -> std::result::Result<Vec<Catalog>, ProviderError> {
        Ok(self.catalogs.clone())
    }

    async fn filters(&self) -> std::result::Result<Vec<FilterGroup>, ProviderError> {
        Ok(self.filters.clone())
    }

    async fn get_catalog_items(
        &self,
        _catalog: &Catalog,
        page: u32,
    ) -> std::result::Result<SearchResponse, ProviderError> {
        self.catalog_items
            .clone()
            .map(|items| SearchResponse { page, ..items })
            .ok_or_else(|| ProviderError::NotImplemented("getCatalogItems".to_string()))
    }

    async fn search(
        &self,
        _query: &SearchQuery,
    ) -> std::result::Result<SearchResponse, ProviderError> {
        if let Some(e) = &self.search_error {
            return Err(e.clone());
        }
        Ok(SearchResponse {
            page: 1,
            results: self.test_film.iter().map(Film::summary).collect(),
            has_next_page: false,
            total_pages: 1,
        })
    }

    async fn get_film_details(
        &self,
        film: &FilmSummary,
    ) -> std::result::Result<Film, ProviderError> {
        self.test_film
            .clone()
            .filter(|f| f.id() == &film.id)
            .ok_or(ProviderError::NotFound)
    }

    async fn get_links(
        &self,
        _watch_id: &str,
        _film: &Film,
        _episode: Option<&Episode>,
        on_link_found: LinkCallback<'_>,
    ) -> std::result::Result<(), ProviderError> {
        self.links_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = &self.links_error {
            return Err(e.clone());
        }
        for stream in &self.streams {
            on_link_found(MediaLink::Stream(stream.clone()));
        }
        Ok(())
    }
}

/// Resolver replaying a fixed sequence of states
pub struct ScriptedResolver {
    states: Mutex<Vec<LinkResolution>>,
    requests: Mutex<Vec<(String, Option<String>)>>,
    log: EventLog,
}

impl ScriptedResolver {
    pub fn new(states: Vec<LinkResolution>, log: EventLog) -> Self {
        Self {
            states: Mutex::new(states),
            requests: Mutex::new(Vec::new()),
            log,
        }
    }

    pub fn succeeding(links: CachedLinks, log: EventLog) -> Self {
        Self::new(
            vec![
                LinkResolution::Loading("Fetching links".to_string()),
                LinkResolution::Success(links),
            ],
            log,
        )
    }

    pub fn failing(cause: &str, log: EventLog) -> Self {
        Self::new(
            vec![
                LinkResolution::Loading("Fetching links".to_string()),
                LinkResolution::Error(cause.to_string()),
            ],
            log,
        )
    }

    pub fn set_states(&self, states: Vec<LinkResolution>) {
        *self.states.lock() = states;
    }

    /// (provider id, episode id) of every request, in order
    pub fn requests(&self) -> Vec<(String, Option<String>)> {
        self.requests.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

impl MediaLinksResolver for ScriptedResolver {
    fn resolve(&self, request: LinkRequest) -> BoxStream<'static, LinkResolution> {
        let provider_id = request.provider_id().to_string();
        self.log.push(format!("resolve:{provider_id}"));
        self.requests
            .lock()
            .push((provider_id, request.episode().map(|e| e.id.clone())));
        stream::iter(self.states.lock().clone()).boxed()
    }
}

/// Episode lookup backed by an explicit table
#[derive(Debug, Default)]
pub struct TableEpisodeLookup {
    pub episodes: HashMap<(u32, u32), Episode>,
}

impl TableEpisodeLookup {
    pub fn with(episodes: impl IntoIterator<Item = Episode>) -> Self {
        Self {
            episodes: episodes
                .into_iter()
                .map(|e| ((e.season, e.number), e))
                .collect(),
        }
    }
}

#[async_trait]
impl EpisodeLookup for TableEpisodeLookup {
    async fn get_episode(&self, _show: &TvShow, season: u32, episode: u32) -> Option<Episode> {
        self.episodes.get(&(season, episode)).cloned()
    }
}

/// Watch progress store that logs every write
#[derive(Default)]
pub struct RecordingWatchProgressRepository {
    pub inner: InMemoryWatchProgressRepository,
    pub writes: Mutex<Vec<WatchProgress>>,
    pub log: EventLog,
}

impl RecordingWatchProgressRepository {
    pub fn with_log(log: EventLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn writes(&self) -> Vec<WatchProgress> {
        self.writes.lock().clone()
    }
}

#[async_trait]
impl WatchProgressRepository for RecordingWatchProgressRepository {
    async fn get(
        &self,
        film_id: &FilmId,
        kind: FilmKind,
        owner_id: &str,
    ) -> Result<Option<WatchProgress>> {
        self.inner.get(film_id, kind, owner_id).await
    }

    async fn get_episode(
        &self,
        film_id: &FilmId,
        season: u32,
        episode: u32,
        owner_id: &str,
    ) -> Result<Option<WatchProgress>> {
        self.inner
            .get_episode(film_id, season, episode, owner_id)
            .await
    }

    fn subscribe(&self, film_id: &FilmId, owner_id: &str) -> watch::Receiver<Option<WatchProgress>> {
        self.inner.subscribe(film_id, owner_id)
    }

    async fn get_season_progress(
        &self,
        film_id: &FilmId,
        season: u32,
        owner_id: &str,
    ) -> Result<Vec<EpisodeProgress>> {
        self.inner
            .get_season_progress(film_id, season, owner_id)
            .await
    }

    async fn insert(&self, progress: WatchProgress, film: &Film) -> Result<()> {
        self.log.push(format!("persist:{}", progress.progress()));
        self.writes.lock().push(progress.clone());
        self.inner.insert(progress, film).await
    }
}

/// Async test wrapper with timeout
///
/// Use this to prevent tests from hanging indefinitely.
pub async fn with_timeout<F>(duration: std::time::Duration, future: F) -> F::Output
where
    F: std::future::Future,
{
    tokio::select! {
        result = future => result,
        () = tokio::time::sleep(duration) => {
            panic!("Test timed out after {duration:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tv_show_fixture_shape() {
        let Film::TvShow(show) = tv_show_fixture("10", "Show", "demo", 2, 4) else {
            panic!("expected tv show");
        };
        assert_eq!(show.total_seasons, 2);
        assert_eq!(show.seasons[1].episodes.len(), 4);
        assert_eq!(show.seasons[1].episodes[0].id, "10-s2e1");
    }

    #[tokio::test]
    async fn test_scripted_resolver_records_requests() {
        let log = EventLog::default();
        let resolver = ScriptedResolver::failing("boom", log.clone());
        let film = Arc::new(movie_fixture("1", "Movie", "demo"));
        let request = LinkRequest::new(film, None, "demo".into()).unwrap();

        let states: Vec<_> = resolver.resolve(request).collect().await;
        assert_eq!(states.len(), 2);
        assert_eq!(resolver.calls(), 1);
        assert_eq!(log.events(), vec!["resolve:demo".to_string()]);
    }
}
