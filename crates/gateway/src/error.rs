use {omnigate_common::ChannelType, thiserror::Error};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Routing(#[from] omnigate_routing::Error),

    #[error(transparent)]
    Delivery(#[from] omnigate_delivery::Error),

    #[error("no adapter registered for channel {channel}")]
    AdapterMissing { channel: ChannelType },
}
