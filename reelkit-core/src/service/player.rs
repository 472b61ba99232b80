//! Player collaborator
//!
//! The playback engine itself is external. `HeadlessPlayer` keeps the
//! bookkeeping a real engine would (loaded media items, current item,
//! position) without decoding anything.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;

use crate::{
    cache::CacheKey,
    models::{Stream, Subtitle},
    Result,
};

/// Everything needed to load one media item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrepareRequest {
    pub key: CacheKey,
    pub servers: Vec<Stream>,
    pub subtitles: Vec<Subtitle>,
    pub start_position_ms: i64,
    pub play_immediately: bool,
}

/// Player collaborator
///
/// Only the session controller calls the mutating methods.
#[async_trait]
pub trait AppPlayer: Send + Sync {
    /// Make an already loaded media item for `key` current and seek it to
    /// `start_position_ms`. Returns false when no such item is loaded.
    async fn switch_media_source(&self, key: &CacheKey, start_position_ms: i64) -> bool;

    /// Load (or replace) the media item for `request.key`
    async fn prepare(&self, request: PrepareRequest) -> Result<()>;

    async fn add_subtitle(&self, subtitle: Subtitle);

    /// Live playback position in milliseconds
    fn current_position(&self) -> i64;

    /// Duration of the current item in milliseconds, 0 when unknown
    fn duration(&self) -> i64;
}

/// A media item loaded into the headless player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaItem {
    pub key: CacheKey,
    pub servers: Vec<Stream>,
    pub subtitles: Vec<Subtitle>,
    pub selected_server: usize,
    /// Position the item was last prepared or switched to
    pub start_position_ms: i64,
}

#[derive(Debug, Default)]
struct HeadlessState {
    items: Vec<MediaItem>,
    current: Option<usize>,
    position: i64,
    duration: i64,
    playing: bool,
}

/// Player without an output device
#[derive(Debug, Default)]
pub struct HeadlessPlayer {
    state: Mutex<HeadlessState>,
}

impl HeadlessPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seek(&self, position_ms: i64) {
        self.state.lock().position = position_ms.max(0);
    }

    pub fn set_duration(&self, duration_ms: i64) {
        self.state.lock().duration = duration_ms.max(0);
    }

    pub fn play(&self) {
        self.state.lock().playing = true;
    }

    pub fn pause(&self) {
        self.state.lock().playing = false;
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    #[must_use]
    pub fn current_item(&self) -> Option<MediaItem> {
        let state = self.state.lock();
        state.current.and_then(|i| state.items.get(i).cloned())
    }

    #[must_use]
    pub fn items(&self) -> Vec<MediaItem> {
        self.state.lock().items.clone()
    }
}

#[async_trait]
impl AppPlayer for HeadlessPlayer {
    async fn switch_media_source(&self, key: &CacheKey, start_position_ms: i64) -> bool {
        let mut state = self.state.lock();
        let Some(index) = state.items.iter().position(|item| &item.key == key) else {
            return false;
        };

        let position = start_position_ms.max(0);
        state.items[index].start_position_ms = position;
        state.current = Some(index);
        state.position = position;
        tracing::debug!(
            key = %key,
            start_position_ms = position,
            "Switched to loaded media item"
        );
        true
    }

    async fn prepare(&self, request: PrepareRequest) -> Result<()> {
        let mut state = self.state.lock();
        let item = MediaItem {
            key: request.key.clone(),
            servers: request.servers,
            subtitles: request.subtitles,
            selected_server: 0,
            start_position_ms: request.start_position_ms.max(0),
        };

        let index = match state.items.iter().position(|i| i.key == request.key) {
            Some(index) => {
                state.items[index] = item;
                index
            }
            None => {
                state.items.push(item);
                state.items.len() - 1
            }
        };

        if request.play_immediately || state.current.is_none() {
            state.current = Some(index);
            state.position = request.start_position_ms.max(0);
            state.playing = request.play_immediately;
        }

        tracing::debug!(
            key = %request.key,
            start_position_ms = request.start_position_ms,
            play_immediately = request.play_immediately,
            "Media item prepared"
        );
        Ok(())
    }

    async fn add_subtitle(&self, subtitle: Subtitle) {
        let mut state = self.state.lock();
        if let Some(index) = state.current {
            state.items[index].subtitles.push(subtitle);
        }
    }

    fn current_position(&self) -> i64 {
        self.state.lock().position
    }

    fn duration(&self) -> i64 {
        self.state.lock().duration
    }
}
