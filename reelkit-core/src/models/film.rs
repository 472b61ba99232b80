//! Film, episode and catalog models shared by providers and the player session

use serde::{Deserialize, Serialize};

use super::id::{FilmId, ProviderId};

/// Film kind, used when looking up watch progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilmKind {
    Movie,
    TvShow,
}

impl std::fmt::Display for FilmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::TvShow => write!(f, "tv_show"),
        }
    }
}

/// Fields common to every film regardless of kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmMetadata {
    pub id: FilmId,
    /// Provider the film details were fetched from
    pub provider_id: ProviderId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(flatten)]
    pub metadata: FilmMetadata,
    /// Runtime in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TvShow {
    #[serde(flatten)]
    pub metadata: FilmMetadata,
    pub total_seasons: u32,
    /// Seasons whose episode lists are already known
    #[serde(default)]
    pub seasons: Vec<Season>,
}

impl TvShow {
    /// Find a loaded episode by season and episode number
    #[must_use]
    pub fn episode(&self, season: u32, number: u32) -> Option<&Episode> {
        self.seasons
            .iter()
            .find(|s| s.number == season)
            .and_then(|s| s.episodes.iter().find(|e| e.number == number))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub number: u32,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub season: u32,
    pub number: u32,
    /// Runtime in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>,
}

impl Episode {
    /// Synthetic episode used when a real episode list is unavailable
    #[must_use]
    pub fn synthetic(film_id: &FilmId, season: u32, number: u32) -> Self {
        Self {
            id: format!("{film_id}-s{season}e{number}"),
            title: format!("Episode {number}"),
            season,
            number,
            runtime: None,
        }
    }
}

/// Full film details, either a movie or a TV show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Film {
    Movie(Movie),
    TvShow(TvShow),
}

impl Film {
    #[must_use]
    pub const fn metadata(&self) -> &FilmMetadata {
        match self {
            Self::Movie(m) => &m.metadata,
            Self::TvShow(t) => &t.metadata,
        }
    }

    #[must_use]
    pub const fn id(&self) -> &FilmId {
        &self.metadata().id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.metadata().title
    }

    #[must_use]
    pub const fn provider_id(&self) -> &ProviderId {
        &self.metadata().provider_id
    }

    #[must_use]
    pub const fn kind(&self) -> FilmKind {
        match self {
            Self::Movie(_) => FilmKind::Movie,
            Self::TvShow(_) => FilmKind::TvShow,
        }
    }

    #[must_use]
    pub const fn is_tv_show(&self) -> bool {
        matches!(self, Self::TvShow(_))
    }

    /// Lightweight search item describing this film
    #[must_use]
    pub fn summary(&self) -> FilmSummary {
        let metadata = self.metadata();
        FilmSummary {
            id: metadata.id.clone(),
            provider_id: metadata.provider_id.clone(),
            title: metadata.title.clone(),
            kind: self.kind(),
            year: metadata.year,
            imdb_id: metadata.imdb_id.clone(),
            tmdb_id: metadata.tmdb_id,
            poster_url: metadata.poster_url.clone(),
        }
    }
}

/// Search/catalog item returned by providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmSummary {
    pub id: FilmId,
    pub provider_id: ProviderId,
    pub title: String,
    pub kind: FilmKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
}

/// Paged search or catalog response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub page: u32,
    pub results: Vec<FilmSummary>,
    pub has_next_page: bool,
    #[serde(default)]
    pub total_pages: u32,
}

impl SearchResponse {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Search query accepted by `ProviderApi::search`
///
/// Providers pick whichever identifiers they understand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<u64>,
    #[serde(default = "default_page")]
    pub page: u32,
}

const fn default_page() -> u32 {
    1
}

/// Provider catalog row (e.g., "Trending", "New releases")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub can_paginate: bool,
}

/// A named group of search filter options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub name: String,
    pub options: Vec<String>,
}
