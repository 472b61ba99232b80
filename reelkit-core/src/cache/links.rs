use serde::{Deserialize, Serialize};

use crate::models::{dedup_by_label, ProviderId, Stream, Subtitle};

/// Links resolved for one cache key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedLinks {
    /// Provider-specific identifier of the film
    pub watch_id: String,
    pub provider_id: ProviderId,
    pub streams: Vec<Stream>,
    pub subtitles: Vec<Subtitle>,
}

impl CachedLinks {
    pub fn new(watch_id: impl Into<String>, provider_id: ProviderId) -> Self {
        Self {
            watch_id: watch_id.into(),
            provider_id,
            streams: Vec::new(),
            subtitles: Vec::new(),
        }
    }

    /// Streams with one entry per display label, first occurrence wins
    #[must_use]
    pub fn unique_streams(&self) -> Vec<Stream> {
        dedup_by_label(&self.streams, |s| s.label.as_str())
    }

    /// Subtitles with one entry per display label, first occurrence wins
    #[must_use]
    pub fn unique_subtitles(&self) -> Vec<Subtitle> {
        dedup_by_label(&self.subtitles, |s| s.label.as_str())
    }

    #[must_use]
    pub fn has_streams(&self) -> bool {
        !self.streams.is_empty()
    }
}
