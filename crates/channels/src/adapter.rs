use std::collections::HashMap;

use {
    async_trait::async_trait,
    omnigate_common::{ChannelType, ErrorKind},
};

use crate::Result;

/// Structured outcome of one adapter send call.
#[derive(Debug, Clone)]
pub struct AdapterResponse {
    pub success: bool,
    pub error_kind: Option<ErrorKind>,
    /// Raw platform status for diagnostics (e.g. an HTTP status line).
    pub raw_status: Option<String>,
}

impl AdapterResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error_kind: None,
            raw_status: None,
        }
    }

    pub fn failure(kind: ErrorKind) -> Self {
        Self {
            success: false,
            error_kind: Some(kind),
            raw_status: None,
        }
    }

    #[must_use]
    pub fn with_raw_status(mut self, status: impl Into<String>) -> Self {
        self.raw_status = Some(status.into());
        self
    }
}

/// One outbound capability per messaging platform. Implemented externally,
/// selected by the router's resolved channel value.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Which channel this adapter serves.
    fn channel(&self) -> ChannelType;

    /// Perform one outbound call. Failures must come back as a structured
    /// response or a typed [`crate::Error`] — never an uncontrolled panic
    /// across this boundary.
    async fn send(
        &self,
        target: &str,
        content: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<AdapterResponse>;
}
