use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// After evaluating all rules, no destination channel/target was
    /// resolvable. Fatal for the message; never retried.
    #[error("no channel resolved for message {message_id}")]
    NoChannelResolved { message_id: String },

    /// A rule predicate was declared with an invalid content pattern.
    #[error("invalid content pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl Error {
    #[must_use]
    pub fn no_channel_resolved(message_id: impl Into<String>) -> Self {
        Self::NoChannelResolved {
            message_id: message_id.into(),
        }
    }
}
