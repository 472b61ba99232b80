//! Static catalog `ProviderApi`
//!
//! Serves films, catalogs and links declared in configuration

use super::{
    LinkCallback, ProviderApi, ProviderError, StaticFilmConfig, StaticProviderConfig,
};
use crate::models::{
    Catalog, Episode, Film, FilmSummary, FilterGroup, MediaLink, SearchQuery, SearchResponse,
};
use async_trait::async_trait;

const PAGE_SIZE: usize = 20;

/// Static catalog `ProviderApi`
pub struct StaticCatalogProvider {
    config: StaticProviderConfig,
}

impl StaticCatalogProvider {
    #[must_use]
    pub const fn new(config: StaticProviderConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &StaticProviderConfig {
        &self.config
    }

    fn catalog_url(&self, name: &str) -> String {
        format!("static://{}/{}", self.config.id, name)
    }

    fn find_film(&self, id: &str) -> Option<&StaticFilmConfig> {
        self.config.films.iter().find(|f| f.film.id().as_str() == id)
    }

    fn matches(film: &Film, query: &SearchQuery) -> bool {
        let metadata = film.metadata();

        if let Some(id) = &query.id {
            if metadata.id.as_str() == id {
                return true;
            }
        }
        if let (Some(wanted), Some(imdb)) = (&query.imdb_id, &metadata.imdb_id) {
            if wanted.eq_ignore_ascii_case(imdb) {
                return true;
            }
        }
        if let (Some(wanted), Some(tmdb)) = (query.tmdb_id, metadata.tmdb_id) {
            if wanted == tmdb {
                return true;
            }
        }

        let title = query.title.trim();
        !title.is_empty()
            && metadata
                .title
                .to_lowercase()
                .contains(&title.to_lowercase())
    }

    fn page_of(items: Vec<FilmSummary>, page: u32) -> SearchResponse {
        let page = page.max(1);
        let total_pages = items.len().div_ceil(PAGE_SIZE);
        let start = (page as usize - 1) * PAGE_SIZE;
        let results: Vec<_> = items.into_iter().skip(start).take(PAGE_SIZE).collect();

        SearchResponse {
            page,
            results,
            has_next_page: (page as usize) < total_pages,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
        }
    }

    /// Replace `{season}`/`{episode}` placeholders
    fn expand(url: &str, episode: Option<&Episode>) -> String {
        match episode {
            Some(e) => url
                .replace("{season}", &e.season.to_string())
                .replace("{episode}", &e.number.to_string()),
            None => url.to_string(),
        }
    }
}

#[async_trait]
impl ProviderApi for StaticCatalogProvider {
    async fn test_film(&self) -> Result<Option<Film>, ProviderError> {
        let entry = match &self.config.test_film_id {
            Some(id) => self.find_film(id.as_str()),
            None => self.config.films.first(),
        };
        Ok(entry.map(|e| e.film.clone()))
    }

    async fn catalogs(&self) -> Result<Vec<Catalog>, ProviderError> {
        Ok(self
            .config
            .catalogs
            .iter()
            .map(|c| Catalog {
                name: c.name.clone(),
                url: self.catalog_url(&c.name),
                can_paginate: c.film_ids.len() > PAGE_SIZE,
            })
            .collect())
    }

    async fn filters(&self) -> Result<Vec<FilterGroup>, ProviderError> {
        Ok(self
            .config
            .filters
            .iter()
            .map(|f| FilterGroup {
                name: f.name.clone(),
                options: f.options.clone(),
            })
            .collect())
    }

    async fn get_catalog_items(
        &self,
        catalog: &Catalog,
        page: u32,
    ) -> Result<SearchResponse, ProviderError> {
        let entry = self
            .config
            .catalogs
            .iter()
            .find(|c| self.catalog_url(&c.name) == catalog.url)
            .ok_or(ProviderError::NotFound)?;

        let items = entry
            .film_ids
            .iter()
            .filter_map(|id| self.find_film(id.as_str()))
            .map(|f| f.film.summary())
            .collect();

        Ok(Self::page_of(items, page))
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, ProviderError> {
        let items = self
            .config
            .films
            .iter()
            .filter(|f| Self::matches(&f.film, query))
            .map(|f| f.film.summary())
            .collect();

        Ok(Self::page_of(items, query.page))
    }

    async fn get_film_details(&self, film: &FilmSummary) -> Result<Film, ProviderError> {
        self.find_film(film.id.as_str())
            .map(|f| f.film.clone())
            .ok_or(ProviderError::NotFound)
    }

    async fn get_links(
        &self,
        watch_id: &str,
        _film: &Film,
        episode: Option<&Episode>,
        on_link_found: LinkCallback<'_>,
    ) -> Result<(), ProviderError> {
        let entry = self.find_film(watch_id).ok_or(ProviderError::NotFound)?;
        if entry.film.is_tv_show() && episode.is_none() {
            return Err(ProviderError::MissingField("episode".to_string()));
        }

        for stream in &entry.streams {
            let mut stream = stream.clone();
            stream.url = Self::expand(&stream.url, episode);
            on_link_found(MediaLink::Stream(stream));
        }
        for subtitle in &entry.subtitles {
            let mut subtitle = subtitle.clone();
            subtitle.url = Self::expand(&subtitle.url, episode);
            on_link_found(MediaLink::Subtitle(subtitle));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Stream, Subtitle};
    use crate::provider::{collect_links, StaticCatalogConfig};
    use crate::test_helpers::{movie_fixture, tv_show_fixture};

    fn provider() -> StaticCatalogProvider {
        let mut movie = movie_fixture("1", "Test Movie", "demo");
        if let Film::Movie(m) = &mut movie {
            m.metadata.imdb_id = Some("tt0000001".to_string());
            m.metadata.tmdb_id = Some(101);
        }

        StaticCatalogProvider::new(StaticProviderConfig {
            id: "demo".into(),
            name: "Demo".to_string(),
            version: "1.0.0".to_string(),
            description: None,
            test_film_id: None,
            catalogs: vec![StaticCatalogConfig {
                name: "Trending".to_string(),
                film_ids: vec!["1".into(), "2".into(), "missing".into()],
            }],
            filters: Vec::new(),
            films: vec![
                StaticFilmConfig {
                    film: movie,
                    streams: vec![Stream::new("https://cdn.example.com/a.m3u8", "720p")],
                    subtitles: vec![Subtitle::new("https://cdn.example.com/en.vtt", "English")],
                },
                StaticFilmConfig {
                    film: tv_show_fixture("2", "Test Show", "demo", 1, 3),
                    streams: vec![Stream::new(
                        "https://cdn.example.com/show/s{season}e{episode}.m3u8",
                        "1080p",
                    )],
                    subtitles: Vec::new(),
                },
            ],
        })
    }

    #[tokio::test]
    async fn test_search_by_each_identifier() {
        let provider = provider();

        let by_title = SearchQuery { title: "test mov".to_string(), ..Default::default() };
        let by_imdb = SearchQuery { imdb_id: Some("TT0000001".to_string()), ..Default::default() };
        let by_tmdb = SearchQuery { tmdb_id: Some(101), ..Default::default() };
        let by_id = SearchQuery { id: Some("2".to_string()), ..Default::default() };

        for query in [by_title, by_imdb, by_tmdb] {
            let response = provider.search(&query).await.unwrap();
            assert_eq!(response.results.len(), 1, "query {query:?}");
            assert_eq!(response.results[0].id.as_str(), "1");
        }

        let response = provider.search(&by_id).await.unwrap();
        assert_eq!(response.results[0].title, "Test Show");

        let empty = provider.search(&SearchQuery::default()).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_items_skip_unknown_films() {
        let provider = provider();
        let catalogs = provider.catalogs().await.unwrap();
        assert_eq!(catalogs.len(), 1);

        let items = provider.get_catalog_items(&catalogs[0], 1).await.unwrap();
        assert_eq!(items.results.len(), 2);
        assert!(!items.has_next_page);
    }

    #[tokio::test]
    async fn test_episode_links_expand_placeholders() {
        let provider = provider();
        let film = provider.get_film_details(&tv_show_fixture("2", "Test Show", "demo", 1, 3).summary())
            .await
            .unwrap();
        let episode = Episode::synthetic(film.id(), 1, 2);

        let bundle = collect_links(&provider, "2", &film, Some(&episode)).await.unwrap();
        assert_eq!(bundle.streams.len(), 1);
        assert_eq!(bundle.streams[0].url, "https://cdn.example.com/show/s1e2.m3u8");

        let missing_episode = collect_links(&provider, "2", &film, None).await;
        assert!(matches!(missing_episode, Err(ProviderError::MissingField(_))));
    }

    #[tokio::test]
    async fn test_test_film_defaults_to_first_entry() {
        let provider = provider();
        let film = provider.test_film().await.unwrap().unwrap();
        assert_eq!(film.title(), "Test Movie");
    }
}
