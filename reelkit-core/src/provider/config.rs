// Provider Configuration Types
//
// Static providers are declared in the main config file

use crate::models::{Film, FilmId, ProviderId, ProviderMetadata, Stream, Subtitle};
use serde::{Deserialize, Serialize};

/// Static catalog provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticProviderConfig {
    /// Provider ID (e.g., "demo")
    pub id: ProviderId,

    /// Display name
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Film used by the test runner (defaults to the first film)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_film_id: Option<FilmId>,

    #[serde(default)]
    pub catalogs: Vec<StaticCatalogConfig>,

    /// Search filter groups (name -> options)
    #[serde(default)]
    pub filters: Vec<StaticFilterConfig>,

    #[serde(default)]
    pub films: Vec<StaticFilmConfig>,
}

impl StaticProviderConfig {
    #[must_use]
    pub fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            id: self.id.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
            description: self.description.clone(),
            authors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticCatalogConfig {
    pub name: String,
    /// Films listed in this catalog, in display order
    #[serde(default)]
    pub film_ids: Vec<FilmId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticFilterConfig {
    pub name: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// A film served by a static provider together with its links
///
/// For TV shows the `{season}` and `{episode}` placeholders in stream and
/// subtitle URLs are replaced with the requested episode numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticFilmConfig {
    pub film: Film,
    #[serde(default)]
    pub streams: Vec<Stream>,
    #[serde(default)]
    pub subtitles: Vec<Subtitle>,
}
