//! Provider test case catalogue
//!
//! Stage 1 checks the provider's properties, stage 2 calls its methods with
//! the provider's own test film.

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::{
    models::{Episode, Film, SearchQuery, SearchResponse, TestCaseOutput},
    provider::{collect_links, ProviderApi, ProviderError},
};

use super::runner::run_test_case;

/// Logs produced by a passing assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestLogs {
    pub short_log: String,
    pub full_log: String,
}

impl TestLogs {
    /// Short summary plus the pretty-printed JSON of `value`
    pub fn json<T: Serialize>(short_log: impl Into<String>, value: &T) -> Result<Self, AssertionError> {
        let full_log = serde_json::to_string_pretty(value).map_err(|e| AssertionError::Failed {
            short_log: format!("Result is not serializable: {e}"),
            full_log: None,
        })?;
        Ok(Self {
            short_log: short_log.into(),
            full_log,
        })
    }
}

/// Why an assertion did not pass
#[derive(Debug, Clone, Error)]
pub enum AssertionError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("{short_log}")]
    Failed {
        short_log: String,
        /// Replaces the error's debug output as the full log
        full_log: Option<String>,
    },
}

impl AssertionError {
    pub fn failed(short_log: impl Into<String>) -> Self {
        Self::Failed {
            short_log: short_log.into(),
            full_log: None,
        }
    }

    #[must_use]
    pub const fn is_not_implemented(&self) -> bool {
        matches!(self, Self::Provider(e) if e.is_not_implemented())
    }
}

pub type TestFuture = BoxFuture<'static, Result<TestLogs, AssertionError>>;
pub type TestFn = fn(Arc<dyn ProviderApi>) -> TestFuture;

/// A named assertion against a provider
#[derive(Clone, Copy)]
pub struct ProviderTestCase {
    pub name: &'static str,
    /// A non-successful outcome skips the rest of the stage
    pub stop_test_on_failure: bool,
    pub test: TestFn,
}

impl std::fmt::Debug for ProviderTestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTestCase")
            .field("name", &self.name)
            .field("stop_test_on_failure", &self.stop_test_on_failure)
            .finish_non_exhaustive()
    }
}

impl ProviderTestCase {
    pub const fn new(name: &'static str, test: TestFn) -> Self {
        Self {
            name,
            stop_test_on_failure: false,
            test,
        }
    }

    pub const fn stop_on_failure(mut self) -> Self {
        self.stop_test_on_failure = true;
        self
    }

    pub async fn run(&self, api: Arc<dyn ProviderApi>) -> TestCaseOutput {
        run_test_case(self.name, (self.test)(api)).await
    }
}

/// Property checks
pub const STAGE_ONE: &[ProviderTestCase] = &[
    ProviderTestCase::new("Test film", test_film).stop_on_failure(),
    ProviderTestCase::new("Catalogs", catalogs),
    ProviderTestCase::new("Filters", filters),
];

/// Method checks
pub const STAGE_TWO: &[ProviderTestCase] = &[
    ProviderTestCase::new("getCatalogItems", get_catalog_items),
    ProviderTestCase::new("search (title)", search_by_title),
    ProviderTestCase::new("search (id)", search_by_id),
    ProviderTestCase::new("search (imdbId)", search_by_imdb_id),
    ProviderTestCase::new("search (tmdbId)", search_by_tmdb_id),
    ProviderTestCase::new("getFilmDetails", get_film_details),
    ProviderTestCase::new("getLinks", get_links),
];

async fn required_test_film(api: &dyn ProviderApi) -> Result<Film, AssertionError> {
    api.test_film()
        .await?
        .ok_or_else(|| AssertionError::failed("Test film is missing"))
}

fn test_film(api: Arc<dyn ProviderApi>) -> TestFuture {
    async move {
        let film = required_test_film(api.as_ref()).await?;
        TestLogs::json(format!("{} ({})", film.title(), film.kind()), &film)
    }
    .boxed()
}

fn catalogs(api: Arc<dyn ProviderApi>) -> TestFuture {
    async move {
        let catalogs = api.catalogs().await?;
        TestLogs::json(format!("{} catalogs", catalogs.len()), &catalogs)
    }
    .boxed()
}

fn filters(api: Arc<dyn ProviderApi>) -> TestFuture {
    async move {
        let filters = api.filters().await?;
        TestLogs::json(format!("{} filter groups", filters.len()), &filters)
    }
    .boxed()
}

fn get_catalog_items(api: Arc<dyn ProviderApi>) -> TestFuture {
    async move {
        let catalogs = api.catalogs().await?;
        let catalog = catalogs
            .first()
            .ok_or_else(|| AssertionError::failed("Provider has no catalogs"))?;

        let items = api.get_catalog_items(catalog, 1).await?;
        if items.is_empty() {
            return Err(AssertionError::failed(format!(
                "Catalog \"{}\" returned no items",
                catalog.name
            )));
        }
        TestLogs::json(
            format!("{} items in \"{}\"", items.results.len(), catalog.name),
            &items,
        )
    }
    .boxed()
}

async fn assert_search(
    api: &dyn ProviderApi,
    query: SearchQuery,
    label: &str,
) -> Result<TestLogs, AssertionError> {
    let response: SearchResponse = api.search(&query).await?;
    if response.is_empty() {
        return Err(AssertionError::Failed {
            short_log: format!("Search by {label} returned no results"),
            full_log: serde_json::to_string_pretty(&query).ok(),
        });
    }
    TestLogs::json(format!("{} results", response.results.len()), &response)
}

fn search_by_title(api: Arc<dyn ProviderApi>) -> TestFuture {
    async move {
        let film = required_test_film(api.as_ref()).await?;
        let query = SearchQuery {
            title: film.title().to_string(),
            ..SearchQuery::default()
        };
        assert_search(api.as_ref(), query, "title").await
    }
    .boxed()
}

fn search_by_id(api: Arc<dyn ProviderApi>) -> TestFuture {
    async move {
        let film = required_test_film(api.as_ref()).await?;
        let query = SearchQuery {
            id: Some(film.id().to_string()),
            ..SearchQuery::default()
        };
        assert_search(api.as_ref(), query, "id").await
    }
    .boxed()
}

// A test film without the identifier cannot exercise this search path
fn search_by_imdb_id(api: Arc<dyn ProviderApi>) -> TestFuture {
    async move {
        let film = required_test_film(api.as_ref()).await?;
        let imdb_id = film
            .metadata()
            .imdb_id
            .clone()
            .ok_or_else(|| ProviderError::NotImplemented("search (imdbId)".to_string()))?;
        let query = SearchQuery {
            imdb_id: Some(imdb_id),
            ..SearchQuery::default()
        };
        assert_search(api.as_ref(), query, "IMDb id").await
    }
    .boxed()
}

fn search_by_tmdb_id(api: Arc<dyn ProviderApi>) -> TestFuture {
    async move {
        let film = required_test_film(api.as_ref()).await?;
        let tmdb_id = film
            .metadata()
            .tmdb_id
            .ok_or_else(|| ProviderError::NotImplemented("search (tmdbId)".to_string()))?;
        let query = SearchQuery {
            tmdb_id: Some(tmdb_id),
            ..SearchQuery::default()
        };
        assert_search(api.as_ref(), query, "TMDB id").await
    }
    .boxed()
}

fn get_film_details(api: Arc<dyn ProviderApi>) -> TestFuture {
    async move {
        let film = required_test_film(api.as_ref()).await?;
        let details = api.get_film_details(&film.summary()).await?;
        if details.id() != film.id() {
            return Err(AssertionError::failed(format!(
                "Details returned film {} instead of {}",
                details.id(),
                film.id()
            )));
        }
        TestLogs::json(details.title().to_string(), &details)
    }
    .boxed()
}

fn get_links(api: Arc<dyn ProviderApi>) -> TestFuture {
    async move {
        let film = required_test_film(api.as_ref()).await?;
        let episode = match &film {
            Film::Movie(_) => None,
            Film::TvShow(show) => Some(
                show.episode(1, 1)
                    .cloned()
                    .unwrap_or_else(|| Episode::synthetic(film.id(), 1, 1)),
            ),
        };

        let bundle =
            collect_links(api.as_ref(), film.id().as_str(), &film, episode.as_ref()).await?;
        if bundle.is_empty() {
            return Err(AssertionError::failed("No links found"));
        }
        TestLogs::json(
            format!(
                "{} streams, {} subtitles",
                bundle.streams.len(),
                bundle.subtitles.len()
            ),
            &bundle,
        )
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TestStatus;
    use crate::test_helpers::{tv_show_fixture, MockProvider};

    fn names(cases: &[ProviderTestCase]) -> Vec<&'static str> {
        cases.iter().map(|c| c.name).collect()
    }

    #[test]
    fn test_catalogue_order() {
        assert_eq!(names(STAGE_ONE), vec!["Test film", "Catalogs", "Filters"]);
        assert!(STAGE_ONE[0].stop_test_on_failure);
        assert!(STAGE_TWO.iter().all(|c| !c.stop_test_on_failure));
        assert_eq!(STAGE_TWO.last().map(|c| c.name), Some("getLinks"));
    }

    #[tokio::test]
    async fn test_test_film_logs_json() {
        let api: Arc<dyn ProviderApi> = Arc::new(MockProvider::default());
        let output = STAGE_ONE[0].run(api).await;
        assert_eq!(output.status, TestStatus::Success);
        assert_eq!(output.short_log.as_deref(), Some("Mock Movie (movie)"));
        assert!(output.full_log.unwrap().contains("\"title\": \"Mock Movie\""));
    }

    #[tokio::test]
    async fn test_missing_identifier_is_not_implemented() {
        let api: Arc<dyn ProviderApi> = Arc::new(MockProvider::default());
        let output = ProviderTestCase::new("search (imdbId)", search_by_imdb_id)
            .run(api)
            .await;
        assert_eq!(output.status, TestStatus::NotImplemented);
    }

    #[tokio::test]
    async fn test_get_links_uses_first_episode_for_tv_shows() {
        let provider = MockProvider {
            test_film: Some(tv_show_fixture("10", "Show", "demo", 1, 2)),
            ..MockProvider::default()
        };
        let api: Arc<dyn ProviderApi> = Arc::new(provider);
        let output = ProviderTestCase::new("getLinks", get_links).run(api).await;
        assert_eq!(output.status, TestStatus::Success);
        assert_eq!(output.short_log.as_deref(), Some("1 streams, 0 subtitles"));
    }

    #[tokio::test]
    async fn test_empty_links_fail() {
        let provider = MockProvider {
            streams: Vec::new(),
            ..MockProvider::default()
        };
        let api: Arc<dyn ProviderApi> = Arc::new(provider);
        let output = ProviderTestCase::new("getLinks", get_links).run(api).await;
        assert_eq!(output.status, TestStatus::Failure);
        assert_eq!(output.short_log.as_deref(), Some("No links found"));
    }
}
