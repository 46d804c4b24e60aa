use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A channel name that no [`crate::ChannelType`] variant matches.
    #[error("unknown channel: {value}")]
    UnknownChannel { value: String },
}

impl Error {
    #[must_use]
    pub fn unknown_channel(value: impl Into<String>) -> Self {
        Self::UnknownChannel {
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
