//! Episode lookup

use async_trait::async_trait;

use crate::models::{Episode, TvShow};

/// Episode lookup collaborator
#[async_trait]
pub trait EpisodeLookup: Send + Sync {
    /// Find an episode by season and episode number, `None` when it does not exist
    async fn get_episode(&self, show: &TvShow, season: u32, episode: u32) -> Option<Episode>;
}

/// Looks episodes up in the seasons already loaded on the `TvShow`
#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonEpisodeLookup;

#[async_trait]
impl EpisodeLookup for SeasonEpisodeLookup {
    async fn get_episode(&self, show: &TvShow, season: u32, episode: u32) -> Option<Episode> {
        show.episode(season, episode).cloned()
    }
}

/// Episode following `current`
///
/// Tries the next number in the same season, then the first episode of the
/// next season when the show has one.
pub async fn next_episode(
    lookup: &dyn EpisodeLookup,
    show: &TvShow,
    current: &Episode,
) -> Option<Episode> {
    if let Some(number) = current.number.checked_add(1) {
        if let Some(next) = lookup.get_episode(show, current.season, number).await {
            return Some(next);
        }
    }

    match current.season.checked_add(1) {
        Some(season) if current.season < show.total_seasons => {
            lookup.get_episode(show, season, 1).await
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Film, FilmId};
    use crate::test_helpers::tv_show_fixture;

    fn show(seasons: u32, episodes: u32) -> TvShow {
        match tv_show_fixture("10", "Show", "demo", seasons, episodes) {
            Film::TvShow(show) => show,
            Film::Movie(_) => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_next_in_same_season() {
        let show = show(2, 3);
        let current = show.episode(1, 1).cloned().unwrap();

        let next = next_episode(&SeasonEpisodeLookup, &show, &current).await.unwrap();
        assert_eq!((next.season, next.number), (1, 2));
    }

    #[tokio::test]
    async fn test_rolls_over_to_next_season() {
        let show = show(2, 3);
        let current = show.episode(1, 3).cloned().unwrap();

        let next = next_episode(&SeasonEpisodeLookup, &show, &current).await.unwrap();
        assert_eq!((next.season, next.number), (2, 1));
    }

    #[tokio::test]
    async fn test_last_episode_has_no_next() {
        let show = show(2, 3);
        let current = show.episode(2, 3).cloned().unwrap();

        assert!(next_episode(&SeasonEpisodeLookup, &show, &current).await.is_none());
    }

    #[tokio::test]
    async fn test_highest_episode_number_does_not_overflow() {
        let last_number = Episode::synthetic(&FilmId::new("10"), 1, u32::MAX);

        let next = next_episode(&SeasonEpisodeLookup, &show(2, 3), &last_number)
            .await
            .unwrap();
        assert_eq!((next.season, next.number), (2, 1));

        let single_season = show(1, 3);
        assert!(next_episode(&SeasonEpisodeLookup, &single_season, &last_number)
            .await
            .is_none());
    }
}
