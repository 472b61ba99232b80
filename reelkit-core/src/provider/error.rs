// Provider Error Types

/// Provider-specific errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// The provider deliberately does not support this capability
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Resource not found")]
    NotFound,

    #[error("Provider API error: {0}")]
    ApiError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Provider not loaded: {0}")]
    NotLoaded(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),
}

impl ProviderError {
    #[must_use]
    pub const fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented(_))
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
