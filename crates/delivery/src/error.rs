use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("dead letter entry not found: {id}")]
    EntryNotFound { id: String },

    /// The entry exists but is not in the state the operation requires
    /// (e.g. retrying an already-discarded entry).
    #[error("dead letter entry {id} is {status}, expected {expected}")]
    InvalidState {
        id: String,
        status: String,
        expected: String,
    },
}

impl Error {
    #[must_use]
    pub fn entry_not_found(id: impl Into<String>) -> Self {
        Self::EntryNotFound { id: id.into() }
    }
}
