//! Player session controller
//!
//! Owns the mapping from (film, episode, provider) to resolved links for one
//! playback session. Every player mutation (`switch_media_source`, `prepare`)
//! and both cache mutations (`store`, `set_current_cache`) go through here.
//!
//! Episode-change resolutions are serialised: selecting a new episode cancels
//! the in-flight resolution before the next one starts.

use futures::StreamExt;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    cache::{CacheKey, CachedLinksRepository},
    config::PlayerConfig,
    models::{
        Episode, EpisodeProgress, Film, FilmKind, LoadLinksState, PlayerUiState, ProviderId,
        WatchProgress,
    },
    Error, Result,
};

use super::{
    episode::{next_episode, EpisodeLookup},
    media_links::{LinkRequest, LinkResolution, MediaLinksResolver},
    player::{AppPlayer, PrepareRequest},
    watch_progress::WatchProgressRepository,
};

/// Collaborators of a player session
#[derive(Clone)]
pub struct SessionDeps {
    pub resolver: Arc<dyn MediaLinksResolver>,
    pub cache: Arc<dyn CachedLinksRepository>,
    pub watch_progress: Arc<dyn WatchProgressRepository>,
    pub episodes: Arc<dyn EpisodeLookup>,
    pub player: Arc<dyn AppPlayer>,
}

struct SessionInner {
    film: Arc<Film>,
    owner_id: String,
    completion_ratio: f64,
    deps: SessionDeps,

    ui_state: watch::Sender<PlayerUiState>,
    selected_episode: watch::Sender<Option<Episode>>,
    next_episode: watch::Sender<Option<Episode>>,

    /// Record last read for the playing film or episode
    progress: Mutex<Option<WatchProgress>>,
    load_token: Mutex<Option<CancellationToken>>,
    in_flight: Arc<AtomicUsize>,
    player_lock: tokio::sync::Mutex<()>,
    shutdown: CancellationToken,
}

/// Player session for a single film
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct PlayerSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for PlayerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerSession")
            .field("film_id", self.inner.film.id())
            .field("ui_state", &*self.inner.ui_state.borrow())
            .finish_non_exhaustive()
    }
}

/// Decrements the in-flight counter when a resolution ends
struct LoadGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PlayerSession {
    /// Create a session. Nothing is resolved until [`PlayerSession::start`].
    #[must_use]
    pub fn new(
        film: Film,
        provider_id: ProviderId,
        initial_episode: Option<Episode>,
        deps: SessionDeps,
        config: &PlayerConfig,
    ) -> Self {
        let selected_season = initial_episode.as_ref().map(|e| e.season);
        let (ui_state, _) = watch::channel(PlayerUiState::new(provider_id, selected_season));
        let (selected_episode, _) = watch::channel(initial_episode);
        let (next_episode, _) = watch::channel(None);

        Self {
            inner: Arc::new(SessionInner {
                film: Arc::new(film),
                owner_id: config.owner_id.clone(),
                completion_ratio: config.completion_ratio,
                deps,
                ui_state,
                selected_episode,
                next_episode,
                progress: Mutex::new(None),
                load_token: Mutex::new(None),
                in_flight: Arc::new(AtomicUsize::new(0)),
                player_lock: tokio::sync::Mutex::new(()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Start resolving
    ///
    /// TV shows get a watcher that resolves every newly selected episode.
    /// Movies are resolved once at their saved resume position.
    pub fn start(&self) -> Result<JoinHandle<()>> {
        match self.inner.film.as_ref() {
            Film::TvShow(show) => {
                if self.inner.selected_episode.borrow().is_none() {
                    return Err(Error::IllegalState(format!(
                        "TV show \"{}\" ({}) cannot start without an episode",
                        show.metadata.title, show.metadata.id
                    )));
                }
                let session = self.clone();
                Ok(tokio::spawn(async move { session.watch_episodes().await }))
            }
            Film::Movie(_) => {
                let (token, guard) = self.begin_load();
                let session = self.clone();
                Ok(tokio::spawn(async move {
                    session.load_movie(token, guard).await;
                }))
            }
        }
    }

    #[must_use]
    pub fn film(&self) -> &Film {
        &self.inner.film
    }

    /// Observe the player screen state (latest value is replayed)
    #[must_use]
    pub fn ui_state(&self) -> watch::Receiver<PlayerUiState> {
        self.inner.ui_state.subscribe()
    }

    #[must_use]
    pub fn current_ui_state(&self) -> PlayerUiState {
        self.inner.ui_state.borrow().clone()
    }

    #[must_use]
    pub fn selected_episode(&self) -> Option<Episode> {
        self.inner.selected_episode.borrow().clone()
    }

    /// Episode queued for prefetch, known after the current one resolved
    #[must_use]
    pub fn next_episode(&self) -> Option<Episode> {
        self.inner.next_episode.borrow().clone()
    }

    /// Observe the next episode. Every derivation notifies, even when it
    /// finds nothing.
    #[must_use]
    pub fn next_episode_updates(&self) -> watch::Receiver<Option<Episode>> {
        self.inner.next_episode.subscribe()
    }

    /// Whether a user-visible resolution is running
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Resolve links and hand them to the player
    ///
    /// Returns `Ok(true)` when the player has the media item ready and
    /// `Ok(false)` when resolution failed or produced nothing playable.
    /// A TV show without an episode is a caller bug and returns
    /// `Err(Error::IllegalState)`.
    ///
    /// In quiet mode the UI state is never touched, the current cache pointer
    /// stays where it is and the item is queued without taking over playback.
    pub async fn load_links(
        &self,
        provider_id: &ProviderId,
        start_position_ms: i64,
        episode: Option<&Episode>,
        play_immediately: bool,
        quiet: bool,
    ) -> Result<bool> {
        let inner = &self.inner;
        let request = LinkRequest::new(inner.film.clone(), episode.cloned(), provider_id.clone())?;
        let key = CacheKey::create(inner.film.id(), provider_id, request.episode());

        // Switching would take over playback, so prefetches never do it
        if !quiet {
            let _player = inner.player_lock.lock().await;
            if inner.deps.player.switch_media_source(&key, start_position_ms).await {
                debug!(key = %key, "Media item already loaded");
                inner.deps.cache.set_current_cache(&key);
                self.publish_success(provider_id);
                return Ok(true);
            }
        }

        let links = if let Some(links) = inner.deps.cache.get_cache(&key) {
            debug!(key = %key, "Link cache hit");
            links
        } else {
            if !quiet {
                self.set_load_state(LoadLinksState::Loading);
            }

            let mut states = inner.deps.resolver.resolve(request);
            let mut resolved = None;
            while let Some(state) = states.next().await {
                match state {
                    LinkResolution::Loading(message) => {
                        debug!(key = %key, message = %message, "Resolving links");
                    }
                    LinkResolution::Success(links) => {
                        resolved = Some(inner.deps.cache.store(key.clone(), links));
                        break;
                    }
                    LinkResolution::Error(cause) => {
                        if quiet {
                            debug!(key = %key, cause = %cause, "Quiet resolution failed");
                        } else {
                            warn!(key = %key, cause = %cause, "Link resolution failed");
                            self.set_load_state(LoadLinksState::Error(cause));
                        }
                        return Ok(false);
                    }
                }
            }

            let Some(links) = resolved else {
                if !quiet {
                    self.set_load_state(LoadLinksState::Error(
                        "Link resolution ended without a result".to_string(),
                    ));
                }
                return Ok(false);
            };
            links
        };

        if !links.has_streams() {
            if !quiet {
                self.set_load_state(LoadLinksState::Error(format!(
                    "No streams available on {provider_id}"
                )));
            }
            return Ok(false);
        }

        if !quiet {
            inner.deps.cache.set_current_cache(&key);
        }

        let prepare = PrepareRequest {
            key: key.clone(),
            servers: links.unique_streams(),
            subtitles: links.unique_subtitles(),
            start_position_ms,
            play_immediately,
        };

        let prepared = {
            let _player = inner.player_lock.lock().await;
            inner.deps.player.prepare(prepare).await
        };
        if let Err(e) = prepared {
            warn!(key = %key, error = %e, "Player failed to prepare media item");
            if !quiet {
                self.set_load_state(LoadLinksState::Error(e.to_string()));
            }
            return Ok(false);
        }

        info!(key = %key, quiet, "Media item prepared");
        if !quiet {
            self.publish_success(provider_id);
        }
        Ok(true)
    }

    /// Switch to another provider at the current playback position
    ///
    /// Ignored while a resolution is in flight. Returns whether the player
    /// was prepared.
    pub async fn on_provider_change(&self, provider_id: ProviderId) -> Result<bool> {
        let Some((token, _guard)) = self.try_begin_load() else {
            debug!(provider_id = %provider_id, "Provider change ignored, resolution in flight");
            return Ok(false);
        };

        if let Err(e) = self.persist_watch_progress().await {
            warn!(error = %e, "Failed to persist watch progress before provider change");
        }

        let position = self.inner.deps.player.current_position();
        let episode = self.selected_episode();
        Self::run_cancellable(
            token,
            self.load_links(&provider_id, position, episode.as_ref(), true, false),
        )
        .await
    }

    /// Prefetch the links of the next episode without disturbing playback
    pub async fn on_queue_next_episode(&self) -> Result<()> {
        if let Err(e) = self.persist_watch_progress().await {
            warn!(error = %e, "Failed to persist watch progress before queueing");
        }

        let Some(next) = self.next_episode() else {
            debug!("No next episode to queue");
            return Ok(());
        };

        let position = self.read_watch_progress(Some(&next)).await?.resume_position();
        let provider_id = self.current_ui_state().selected_provider;

        match self
            .load_links(&provider_id, position, Some(&next), false, true)
            .await
        {
            Ok(prepared) => {
                debug!(episode_id = %next.id, prepared, "Next episode queued");
                Ok(())
            }
            Err(e) if e.is_contract_violation() => Err(e),
            Err(e) => {
                debug!(episode_id = %next.id, error = %e, "Next episode prefetch failed");
                Ok(())
            }
        }
    }

    /// Abandon the in-flight resolution
    pub fn on_cancel_load_links(&self) {
        if let Some(token) = self.inner.load_token.lock().take() {
            token.cancel();
        }
        self.set_load_state(LoadLinksState::Idle);
    }

    /// Select another episode. The episode watcher resolves it.
    pub fn on_episode_change(&self, episode: Episode) {
        self.inner.selected_episode.send_if_modified(|current| {
            if current.as_ref() == Some(&episode) {
                false
            } else {
                *current = Some(episode);
                true
            }
        });
    }

    /// Select a season and return its persisted episode progress
    pub async fn on_season_change(&self, season: u32) -> Result<Vec<EpisodeProgress>> {
        self.inner
            .ui_state
            .send_if_modified(|state| state.selected_season.replace(season) != Some(season));

        self.inner
            .deps
            .watch_progress
            .get_season_progress(self.inner.film.id(), season, &self.inner.owner_id)
            .await
    }

    /// Move on to the prefetched next episode, if there is one
    pub async fn advance_to_next_episode(&self) -> Result<bool> {
        let Some(next) = self.next_episode() else {
            return Ok(false);
        };

        if let Err(e) = self.persist_watch_progress().await {
            warn!(error = %e, "Failed to persist watch progress before advancing");
        }
        self.on_episode_change(next);
        Ok(true)
    }

    /// Write the live player position into the record last read
    ///
    /// The record keeps its variant: a movie record stays a movie record and
    /// an episode record stays keyed to its episode.
    pub async fn persist_watch_progress(&self) -> Result<()> {
        let inner = &self.inner;
        let position = inner.deps.player.current_position();
        let duration = inner.deps.player.duration();

        let fallback = self.default_progress(self.selected_episode().as_ref())?;
        let (progress, became_completed) = {
            let mut slot = inner.progress.lock();
            let record = slot.get_or_insert(fallback);
            let was_completed = record.is_completed();
            record.update(position, duration, inner.completion_ratio);
            (record.clone(), !was_completed && record.is_completed())
        };

        inner
            .deps
            .watch_progress
            .insert(progress.clone(), &inner.film)
            .await?;
        debug!(
            film_id = %inner.film.id(),
            progress = progress.progress(),
            duration = progress.duration(),
            "Watch progress persisted"
        );

        if became_completed && self.next_episode().is_none() {
            if let Some((season, number)) = progress.episode_numbers() {
                if let Some(current) = self
                    .selected_episode()
                    .filter(|e| e.season == season && e.number == number)
                {
                    self.refresh_next_episode(&current).await;
                }
            }
        }
        Ok(())
    }

    /// Persist progress and stop the episode watcher
    pub async fn close(&self) -> Result<()> {
        let persisted = self.persist_watch_progress().await;
        if let Some(token) = self.inner.load_token.lock().take() {
            token.cancel();
        }
        self.inner.shutdown.cancel();
        persisted
    }

    async fn watch_episodes(self) {
        let mut episodes = self.inner.selected_episode.subscribe();
        loop {
            let episode = episodes.borrow_and_update().clone();
            if let Some(episode) = episode {
                let (token, guard) = self.begin_load();
                let session = self.clone();
                tokio::spawn(async move {
                    session.load_episode(episode, token, guard).await;
                });
            }

            tokio::select! {
                () = self.inner.shutdown.cancelled() => break,
                changed = episodes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        debug!(film_id = %self.inner.film.id(), "Episode watcher stopped");
    }

    async fn load_episode(&self, episode: Episode, token: CancellationToken, _guard: LoadGuard) {
        self.inner
            .next_episode
            .send_if_modified(|next| next.take().is_some());
        self.inner
            .ui_state
            .send_if_modified(|state| state.selected_season.replace(episode.season) != Some(episode.season));

        let result = Self::run_cancellable(token, async {
            let progress = self.read_watch_progress(Some(&episode)).await?;
            let position = progress.resume_position();
            *self.inner.progress.lock() = Some(progress);

            let provider_id = self.current_ui_state().selected_provider;
            let loaded = self
                .load_links(&provider_id, position, Some(&episode), true, false)
                .await?;
            // A newer selection cancels the token, and the lookup with it
            if loaded {
                self.refresh_next_episode(&episode).await;
            }
            Ok(loaded)
        })
        .await;

        if let Err(e) = result {
            error!(episode_id = %episode.id, error = %e, "Episode resolution failed");
        }
    }

    async fn load_movie(&self, token: CancellationToken, _guard: LoadGuard) {
        let result = Self::run_cancellable(token, async {
            let progress = self.read_watch_progress(None).await?;
            let position = progress.resume_position();
            *self.inner.progress.lock() = Some(progress);

            let provider_id = self.current_ui_state().selected_provider;
            self.load_links(&provider_id, position, None, true, false)
                .await
        })
        .await;

        if let Err(e) = result {
            error!(film_id = %self.inner.film.id(), error = %e, "Movie resolution failed");
        }
    }

    async fn refresh_next_episode(&self, current: &Episode) {
        let Film::TvShow(show) = self.inner.film.as_ref() else {
            return;
        };
        let next = next_episode(self.inner.deps.episodes.as_ref(), show, current).await;
        if !self.selected_episode().is_some_and(|selected| selected.id == current.id) {
            debug!(episode_id = %current.id, "Selection moved on, next episode discarded");
            return;
        }
        debug!(
            episode_id = %current.id,
            next = ?next.as_ref().map(|e| &e.id),
            "Next episode derived"
        );
        self.inner.next_episode.send_replace(next);
    }

    /// Persisted record for the film or episode, or a fresh default
    async fn read_watch_progress(&self, episode: Option<&Episode>) -> Result<WatchProgress> {
        let inner = &self.inner;
        let film_id = inner.film.id();

        let stored = match (inner.film.kind(), episode) {
            (FilmKind::Movie, _) => {
                inner
                    .deps
                    .watch_progress
                    .get(film_id, FilmKind::Movie, &inner.owner_id)
                    .await
            }
            (FilmKind::TvShow, Some(episode)) => {
                inner
                    .deps
                    .watch_progress
                    .get_episode(film_id, episode.season, episode.number, &inner.owner_id)
                    .await
            }
            (FilmKind::TvShow, None) => Ok(None),
        };

        match stored {
            Ok(Some(progress)) => Ok(progress),
            Ok(None) => self.default_progress(episode),
            Err(e) => {
                warn!(film_id = %film_id, error = %e, "Failed to read watch progress");
                self.default_progress(episode)
            }
        }
    }

    fn default_progress(&self, episode: Option<&Episode>) -> Result<WatchProgress> {
        let inner = &self.inner;
        match (inner.film.as_ref(), episode) {
            (Film::Movie(_), _) => Ok(WatchProgress::new_movie(
                inner.film.id().clone(),
                inner.owner_id.clone(),
            )),
            (Film::TvShow(_), Some(episode)) => Ok(WatchProgress::new_episode(
                inner.film.id().clone(),
                inner.owner_id.clone(),
                episode,
            )),
            (Film::TvShow(show), None) => Err(Error::IllegalState(format!(
                "TV show \"{}\" has no selected episode to track progress for",
                show.metadata.title
            ))),
        }
    }

    fn set_load_state(&self, state: LoadLinksState) {
        self.inner.ui_state.send_if_modified(|ui| {
            if ui.load_links_state == state {
                false
            } else {
                ui.load_links_state = state;
                true
            }
        });
    }

    fn publish_success(&self, provider_id: &ProviderId) {
        self.inner.ui_state.send_modify(|ui| {
            ui.selected_provider = provider_id.clone();
            ui.load_links_state = LoadLinksState::Success;
        });
    }

    /// Start a resolution that supersedes the in-flight one
    fn begin_load(&self) -> (CancellationToken, LoadGuard) {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        (self.replace_token(), self.guard())
    }

    /// Start a resolution only when none is in flight
    fn try_begin_load(&self) -> Option<(CancellationToken, LoadGuard)> {
        self.inner
            .in_flight
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        Some((self.replace_token(), self.guard()))
    }

    fn replace_token(&self) -> CancellationToken {
        let token = self.inner.shutdown.child_token();
        if let Some(previous) = self.inner.load_token.lock().replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    fn guard(&self) -> LoadGuard {
        LoadGuard {
            in_flight: self.inner.in_flight.clone(),
        }
    }

    async fn run_cancellable<F>(token: CancellationToken, work: F) -> Result<bool>
    where
        F: Future<Output = Result<bool>>,
    {
        tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!("Link loading cancelled");
                Ok(false)
            }
            result = work => result,
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
