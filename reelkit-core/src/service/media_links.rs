//! Link resolution use case
//!
//! Turns a (film, episode, provider) request into a stream of progressive
//! states ending in `Success(CachedLinks)` or `Error(cause)`.

use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use crate::{
    cache::CachedLinks,
    config::ResolverConfig,
    models::{Episode, Film, FilmKind, ProviderId, SearchQuery},
    provider::{collect_links, ProviderApi, ProviderApiRegistry, ProviderError},
    Error, Result,
};

/// Validated resolution request
///
/// Movies never carry an episode; TV shows always do.
#[derive(Debug, Clone)]
pub struct LinkRequest {
    film: Arc<Film>,
    episode: Option<Episode>,
    provider_id: ProviderId,
}

impl LinkRequest {
    /// Build a request, rejecting a TV show without an episode
    pub fn new(film: Arc<Film>, episode: Option<Episode>, provider_id: ProviderId) -> Result<Self> {
        let episode = match film.as_ref() {
            Film::Movie(_) => None,
            Film::TvShow(show) => Some(episode.ok_or_else(|| {
                Error::IllegalState(format!(
                    "TV show \"{}\" ({}) requires an episode to resolve links",
                    show.metadata.title, show.metadata.id
                ))
            })?),
        };

        Ok(Self {
            film,
            episode,
            provider_id,
        })
    }

    #[must_use]
    pub fn film(&self) -> &Film {
        &self.film
    }

    #[must_use]
    pub const fn episode(&self) -> Option<&Episode> {
        self.episode.as_ref()
    }

    #[must_use]
    pub const fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }
}

/// Progressive resolution state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkResolution {
    Loading(String),
    Success(CachedLinks),
    Error(String),
}

/// Link resolution collaborator
pub trait MediaLinksResolver: Send + Sync {
    fn resolve(&self, request: LinkRequest) -> BoxStream<'static, LinkResolution>;
}

/// Resolves links through the provider registered for the request
#[derive(Debug, Clone)]
pub struct ProviderLinksResolver {
    registry: Arc<ProviderApiRegistry>,
    timeout: Duration,
}

impl ProviderLinksResolver {
    #[must_use]
    pub fn new(registry: Arc<ProviderApiRegistry>, config: &ResolverConfig) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    async fn fetch(
        registry: Arc<ProviderApiRegistry>,
        timeout: Duration,
        request: LinkRequest,
    ) -> LinkResolution {
        let provider_id = request.provider_id();
        let Some(api) = registry.get(provider_id) else {
            tracing::warn!(provider_id = %provider_id, "Provider not loaded");
            return LinkResolution::Error(
                ProviderError::NotLoaded(provider_id.to_string()).to_string(),
            );
        };

        let result = tokio::time::timeout(timeout, async {
            let watch_id = find_watch_id(api.as_ref(), request.film(), provider_id).await?;
            let bundle =
                collect_links(api.as_ref(), &watch_id, request.film(), request.episode()).await?;
            Ok::<_, ProviderError>((watch_id, bundle))
        })
        .await
        .unwrap_or_else(|_| Err(ProviderError::Timeout(timeout.as_secs())));

        match result {
            Ok((watch_id, bundle)) if !bundle.streams.is_empty() => {
                tracing::info!(
                    provider_id = %provider_id,
                    film_id = %request.film().id(),
                    streams = bundle.streams.len(),
                    subtitles = bundle.subtitles.len(),
                    "Links resolved"
                );
                LinkResolution::Success(CachedLinks {
                    watch_id,
                    provider_id: provider_id.clone(),
                    streams: bundle.streams,
                    subtitles: bundle.subtitles,
                })
            }
            Ok(_) => {
                tracing::warn!(provider_id = %provider_id, "Provider returned no streams");
                LinkResolution::Error(format!("No streams found on {provider_id}"))
            }
            Err(e) => {
                tracing::warn!(provider_id = %provider_id, error = %e, "Link resolution failed");
                LinkResolution::Error(e.to_string())
            }
        }
    }
}

impl MediaLinksResolver for ProviderLinksResolver {
    fn resolve(&self, request: LinkRequest) -> BoxStream<'static, LinkResolution> {
        let registry = self.registry.clone();
        let timeout = self.timeout;
        let loading =
            LinkResolution::Loading(format!("Fetching links from {}", request.provider_id()));

        stream::once(async move { loading })
            .chain(stream::once(Self::fetch(registry, timeout, request)))
            .boxed()
    }
}

/// Find the provider's own identifier for `film`
///
/// Films fetched from the same provider already carry it; otherwise the
/// provider is searched and the first hit matching by TMDB id or title wins.
pub async fn find_watch_id(
    api: &dyn ProviderApi,
    film: &Film,
    provider_id: &ProviderId,
) -> std::result::Result<String, ProviderError> {
    if film.provider_id() == provider_id {
        return Ok(film.id().to_string());
    }

    let metadata = film.metadata();
    let query = SearchQuery {
        title: metadata.title.clone(),
        id: None,
        imdb_id: metadata.imdb_id.clone(),
        tmdb_id: metadata.tmdb_id,
        page: 1,
    };

    let response = api.search(&query).await?;
    let kind: FilmKind = film.kind();
    response
        .results
        .into_iter()
        .find(|item| {
            item.kind == kind
                && (matches!((item.tmdb_id, metadata.tmdb_id), (Some(a), Some(b)) if a == b)
                    || item.title.eq_ignore_ascii_case(&metadata.title))
        })
        .map(|item| item.id.to_string())
        .ok_or(ProviderError::NotFound)
}
