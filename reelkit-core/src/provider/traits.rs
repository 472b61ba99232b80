// Provider API Traits
//
// Core interfaces every content provider implements

use super::ProviderError;
use crate::models::{
    Catalog, Episode, Film, FilmSummary, FilterGroup, MediaLink, SearchQuery, SearchResponse,
    Stream, Subtitle,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Callback invoked for every link a provider finds while resolving
pub type LinkCallback<'a> = &'a (dyn Fn(MediaLink) + Send + Sync);

/// Provider API
///
/// Only `test_film()`, `search()` and `get_film_details()` are mandatory.
/// Capabilities a provider does not support should return
/// `ProviderError::NotImplemented` so the test runner can tell
/// "unsupported" apart from "broken".
#[async_trait]
pub trait ProviderApi: Send + Sync {
    // ========== Properties ==========

    /// Film guaranteed to exist on this provider, used by the test runner
    async fn test_film(&self) -> Result<Option<Film>, ProviderError>;

    /// Catalog rows shown on the home screen
    async fn catalogs(&self) -> Result<Vec<Catalog>, ProviderError> {
        Ok(Vec::new())
    }

    /// Search filter definitions
    async fn filters(&self) -> Result<Vec<FilterGroup>, ProviderError> {
        Ok(Vec::new())
    }

    // ========== Methods ==========

    async fn get_catalog_items(
        &self,
        _catalog: &Catalog,
        _page: u32,
    ) -> Result<SearchResponse, ProviderError> {
        Err(ProviderError::NotImplemented("getCatalogItems".to_string()))
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, ProviderError>;

    async fn get_film_details(&self, film: &FilmSummary) -> Result<Film, ProviderError>;

    /// Resolve playable links for a film
    ///
    /// `watch_id` is the provider's own identifier for the film. For TV shows
    /// `episode` is always set. Every found link is reported through
    /// `on_link_found` as soon as it is known.
    async fn get_links(
        &self,
        _watch_id: &str,
        _film: &Film,
        _episode: Option<&Episode>,
        _on_link_found: LinkCallback<'_>,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::NotImplemented("getLinks".to_string()))
    }

    /// Web view based link resolution, for providers that scrape through a browser
    fn web_view(&self) -> Option<&dyn ProviderWebViewApi> {
        None
    }
}

/// Providers that resolve links through an embedded web view
#[async_trait]
pub trait ProviderWebViewApi: Send + Sync {
    async fn get_web_view(&self) -> Result<Box<dyn LinkWebView>, ProviderError>;
}

/// A web view instance able to resolve links
#[async_trait]
pub trait LinkWebView: Send + Sync {
    async fn get_links(
        &self,
        watch_id: &str,
        film: &Film,
        episode: Option<&Episode>,
        on_link_found: LinkCallback<'_>,
    ) -> Result<(), ProviderError>;

    /// Release the web view once resolution finished
    async fn destroy(&self) {}
}

/// Links collected from one `get_links` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkBundle {
    pub streams: Vec<Stream>,
    pub subtitles: Vec<Subtitle>,
}

impl LinkBundle {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty() && self.subtitles.is_empty()
    }

    fn push(&mut self, link: MediaLink) {
        match link {
            MediaLink::Stream(s) => self.streams.push(s),
            MediaLink::Subtitle(s) => self.subtitles.push(s),
        }
    }
}

/// Run `get_links` (or the web view variant) and collect every reported link
pub async fn collect_links(
    api: &dyn ProviderApi,
    watch_id: &str,
    film: &Film,
    episode: Option<&Episode>,
) -> Result<LinkBundle, ProviderError> {
    let bundle = Mutex::new(LinkBundle::default());
    let on_link_found = |link: MediaLink| bundle.lock().push(link);

    if let Some(web_view_api) = api.web_view() {
        let web_view = web_view_api.get_web_view().await?;
        let result = web_view
            .get_links(watch_id, film, episode, &on_link_found)
            .await;
        web_view.destroy().await;
        result?;
    } else {
        api.get_links(watch_id, film, episode, &on_link_found)
            .await?;
    }

    Ok(bundle.into_inner())
}
