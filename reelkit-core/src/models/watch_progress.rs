use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::film::{Episode, FilmKind};
use super::id::FilmId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    #[default]
    Watching,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieProgress {
    pub film_id: FilmId,
    pub owner_id: String,
    pub progress: i64, // playback position in milliseconds
    pub duration: i64, // total duration in milliseconds
    pub status: WatchStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeProgress {
    pub film_id: FilmId,
    pub owner_id: String,
    pub season_number: u32,
    pub episode_number: u32,
    pub progress: i64,
    pub duration: i64,
    pub status: WatchStatus,
    pub updated_at: DateTime<Utc>,
}

/// Persisted playback position for a movie or a single episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WatchProgress {
    Movie(MovieProgress),
    Episode(EpisodeProgress),
}

impl WatchProgress {
    /// Default record for a movie: watching, position 0
    #[must_use]
    pub fn new_movie(film_id: FilmId, owner_id: impl Into<String>) -> Self {
        Self::Movie(MovieProgress {
            film_id,
            owner_id: owner_id.into(),
            progress: 0,
            duration: 0,
            status: WatchStatus::Watching,
            updated_at: Utc::now(),
        })
    }

    /// Default record for an episode: watching, position 0, keyed to the episode numbers
    #[must_use]
    pub fn new_episode(film_id: FilmId, owner_id: impl Into<String>, episode: &Episode) -> Self {
        Self::Episode(EpisodeProgress {
            film_id,
            owner_id: owner_id.into(),
            season_number: episode.season,
            episode_number: episode.number,
            progress: 0,
            duration: 0,
            status: WatchStatus::Watching,
            updated_at: Utc::now(),
        })
    }

    #[must_use]
    pub const fn film_id(&self) -> &FilmId {
        match self {
            Self::Movie(p) => &p.film_id,
            Self::Episode(p) => &p.film_id,
        }
    }

    #[must_use]
    pub fn owner_id(&self) -> &str {
        match self {
            Self::Movie(p) => &p.owner_id,
            Self::Episode(p) => &p.owner_id,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> FilmKind {
        match self {
            Self::Movie(_) => FilmKind::Movie,
            Self::Episode(_) => FilmKind::TvShow,
        }
    }

    #[must_use]
    pub const fn progress(&self) -> i64 {
        match self {
            Self::Movie(p) => p.progress,
            Self::Episode(p) => p.progress,
        }
    }

    #[must_use]
    pub const fn duration(&self) -> i64 {
        match self {
            Self::Movie(p) => p.duration,
            Self::Episode(p) => p.duration,
        }
    }

    #[must_use]
    pub const fn status(&self) -> WatchStatus {
        match self {
            Self::Movie(p) => p.status,
            Self::Episode(p) => p.status,
        }
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self.status(), WatchStatus::Completed)
    }

    /// `(season, episode)` for episode records
    #[must_use]
    pub const fn episode_numbers(&self) -> Option<(u32, u32)> {
        match self {
            Self::Movie(_) => None,
            Self::Episode(p) => Some((p.season_number, p.episode_number)),
        }
    }

    /// Position playback should resume from; finished records restart at 0.
    #[must_use]
    pub const fn resume_position(&self) -> i64 {
        if self.is_completed() {
            0
        } else {
            self.progress()
        }
    }

    /// Apply the player's live position/duration.
    ///
    /// The record becomes `Completed` once `position >= duration * completion_ratio`.
    /// The movie/episode variant never changes.
    pub fn update(&mut self, position: i64, duration: i64, completion_ratio: f64) {
        let position = position.max(0);
        let duration = duration.max(0);
        #[allow(clippy::cast_precision_loss)]
        let finished = duration > 0 && position as f64 >= duration as f64 * completion_ratio;
        let status = if finished {
            WatchStatus::Completed
        } else {
            WatchStatus::Watching
        };

        let now = Utc::now();
        match self {
            Self::Movie(p) => {
                p.progress = position;
                p.duration = duration;
                p.status = status;
                p.updated_at = now;
            }
            Self::Episode(p) => {
                p.progress = position;
                p.duration = duration;
                p.status = status;
                p.updated_at = now;
            }
        }
    }
}
