//! Playable stream and subtitle descriptors

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Playable media URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub url: String,
    /// Display label (e.g., "1080p", "Server 2")
    pub label: String,
    /// HTTP headers required for playback
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_headers: BTreeMap<String, String>,
}

impl Stream {
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: label.into(),
            custom_headers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.insert(name.into(), value.into());
        self
    }
}

/// Where a subtitle track came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleSource {
    #[default]
    Online,
    Local,
    Embedded,
}

/// Caption track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtitle {
    pub url: String,
    pub label: String,
    #[serde(default)]
    pub source: SubtitleSource,
}

impl Subtitle {
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: label.into(),
            source: SubtitleSource::Online,
        }
    }
}

/// A link reported by a provider while resolving
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaLink {
    Stream(Stream),
    Subtitle(Subtitle),
}

impl MediaLink {
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Stream(s) => &s.label,
            Self::Subtitle(s) => &s.label,
        }
    }
}

/// Keep the first item for each distinct label, preserving order.
pub fn dedup_by_label<T, F>(items: &[T], label: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> &str,
{
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(label(item).to_string()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_prefers_first_occurrence() {
        let streams = vec![
            Stream::new("a.m3u8", "720p"),
            Stream::new("b.m3u8", "1080p"),
            Stream::new("c.m3u8", "720p"),
        ];

        let cleaned = dedup_by_label(&streams, |s| s.label.as_str());
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[0].url, "a.m3u8");
        assert_eq!(cleaned[1].url, "b.m3u8");
    }

    #[test]
    fn test_media_link_serialization_is_tagged() {
        let link = MediaLink::Subtitle(Subtitle::new("en.vtt", "English"));
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["type"], "subtitle");
        assert_eq!(json["source"], "online");
    }
}
