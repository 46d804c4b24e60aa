use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("schedule entry not found: {id}")]
    EntryNotFound { id: String },

    #[error("invalid fire policy: {reason}")]
    InvalidPolicy { reason: String },

    #[error("schedule store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_policy(reason: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            reason: reason.into(),
        }
    }
}
