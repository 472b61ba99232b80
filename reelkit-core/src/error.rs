use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A caller broke an API contract (e.g., TV show resolution without an episode)
    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Player error: {0}")]
    Player(String),
}

impl Error {
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(self, Self::IllegalState(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
