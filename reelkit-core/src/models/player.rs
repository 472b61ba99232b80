use serde::{Deserialize, Serialize};

use super::id::ProviderId;

/// Link loading state shown by the player screen
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "cause", rename_all = "snake_case")]
pub enum LoadLinksState {
    #[default]
    Idle,
    Loading,
    Success,
    Error(String),
}

impl LoadLinksState {
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Player screen state owned by the session controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerUiState {
    pub selected_provider: ProviderId,
    pub selected_season: Option<u32>,
    pub load_links_state: LoadLinksState,
}

impl PlayerUiState {
    #[must_use]
    pub const fn new(selected_provider: ProviderId, selected_season: Option<u32>) -> Self {
        Self {
            selected_provider,
            selected_season,
            load_links_state: LoadLinksState::Idle,
        }
    }
}
