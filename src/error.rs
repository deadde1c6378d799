use thiserror::Error;

/// Failure of one call to the wiki API. Every variant is scoped to the unit of
/// work that issued the call; none of them is fatal to a run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("wiki API error [{code}]: {info}")]
    Remote { code: String, info: String },
}

impl ApiError {
    /// Short reason code used in rejection reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Transport(_) => "fetch_error",
            ApiError::Malformed(_) | ApiError::Remote { .. } => "malformed_response",
        }
    }
}

/// Invalid extraction or profile configuration, caught before any fetch.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("duplicate field name '{0}'")]
    DuplicateField(String),
    #[error("invalid pattern for field '{field}': {reason}")]
    InvalidPattern { field: String, reason: String },
    #[error("variant bound must be at least 1")]
    ZeroVariantBound,
}
