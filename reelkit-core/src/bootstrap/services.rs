//! Service initialization and dependency injection

use std::sync::Arc;

use tracing::info;

use crate::{
    cache::{CachedLinksRepository, InMemoryCachedLinksRepository},
    models::{Episode, Film, ProviderId},
    provider::{ProviderApiRegistry, StaticCatalogProvider},
    service::{
        AppPlayer, EpisodeLookup, InMemoryWatchProgressRepository, MediaLinksResolver,
        PlayerSession, ProviderLinksResolver, ProviderTestJob, SeasonEpisodeLookup, SessionDeps,
        WatchProgressRepository,
    },
    Config,
};

/// Container for all initialized services
#[derive(Clone)]
pub struct Services {
    /// Loaded provider APIs
    pub registry: Arc<ProviderApiRegistry>,
    /// Resolved links, shared by every session
    pub links_cache: Arc<dyn CachedLinksRepository>,
    pub watch_progress: Arc<dyn WatchProgressRepository>,
    pub episodes: Arc<dyn EpisodeLookup>,
    pub resolver: Arc<dyn MediaLinksResolver>,
    /// Provider test batch job
    pub test_job: Arc<ProviderTestJob>,
    config: Arc<Config>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("registry", &self.registry)
            .field("test_job", &self.test_job)
            .finish_non_exhaustive()
    }
}

impl Services {
    /// Open a player session on `player`
    #[must_use]
    pub fn session(
        &self,
        film: Film,
        provider_id: ProviderId,
        episode: Option<Episode>,
        player: Arc<dyn AppPlayer>,
    ) -> PlayerSession {
        let deps = SessionDeps {
            resolver: self.resolver.clone(),
            cache: self.links_cache.clone(),
            watch_progress: self.watch_progress.clone(),
            episodes: self.episodes.clone(),
            player,
        };
        PlayerSession::new(film, provider_id, episode, deps, &self.config.player)
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Initialize all core services
pub fn init_services(config: &Config) -> Result<Services, anyhow::Error> {
    info!("Initializing services...");

    let registry = Arc::new(ProviderApiRegistry::new());
    for provider in &config.providers {
        let metadata = provider.metadata();
        info!(
            provider_id = %metadata.id,
            films = provider.films.len(),
            catalogs = provider.catalogs.len(),
            "Registering static provider"
        );
        registry.register(metadata, Arc::new(StaticCatalogProvider::new(provider.clone())));
    }
    info!("Provider registry initialized with {} providers", registry.len());

    let resolver = Arc::new(ProviderLinksResolver::new(registry.clone(), &config.resolver));
    info!(
        "Link resolver initialized (timeout: {}s)",
        config.resolver.timeout_seconds
    );

    let test_job = Arc::new(ProviderTestJob::new(registry.clone(), &config.provider_test));
    info!(
        "Provider test job initialized (case delay: {}ms)",
        config.provider_test.case_delay_ms
    );

    Ok(Services {
        registry,
        links_cache: Arc::new(InMemoryCachedLinksRepository::new()),
        watch_progress: Arc::new(InMemoryWatchProgressRepository::new()),
        episodes: Arc::new(SeasonEpisodeLookup),
        resolver,
        test_job,
        config: Arc::new(config.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoadLinksState, Stream};
    use crate::provider::{StaticFilmConfig, StaticProviderConfig};
    use crate::service::HeadlessPlayer;
    use crate::test_helpers::{movie_fixture, with_timeout};

    fn config() -> Config {
        Config {
            providers: vec![StaticProviderConfig {
                id: "demo".into(),
                name: "Demo".to_string(),
                version: "1.0.0".to_string(),
                description: None,
                test_film_id: None,
                catalogs: Vec::new(),
                filters: Vec::new(),
                films: vec![StaticFilmConfig {
                    film: movie_fixture("1", "Test Movie", "demo"),
                    streams: vec![Stream::new("a.m3u8", "720p")],
                    subtitles: Vec::new(),
                }],
            }],
            ..Config::default()
        }
    }

    #[test]
    fn test_providers_registered_from_config() {
        let services = init_services(&config()).unwrap();
        assert_eq!(services.registry.len(), 1);
        assert!(services.registry.get(&"demo".into()).is_some());
    }

    #[tokio::test]
    async fn test_session_plays_configured_movie() {
        let services = init_services(&config()).unwrap();
        let player = Arc::new(HeadlessPlayer::new());
        let session = services.session(
            movie_fixture("1", "Test Movie", "demo"),
            "demo".into(),
            None,
            player.clone(),
        );

        let mut state = session.ui_state();
        let _load = session.start().unwrap();
        with_timeout(
            std::time::Duration::from_secs(5),
            state.wait_for(|s| s.load_links_state == LoadLinksState::Success),
        )
        .await
        .unwrap();

        let item = player.current_item().unwrap();
        assert_eq!(item.servers, vec![Stream::new("a.m3u8", "720p")]);
    }
}
