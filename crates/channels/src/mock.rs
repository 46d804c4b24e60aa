//! Scriptable adapter test double, shared by delivery and gateway tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use {
    async_trait::async_trait,
    omnigate_common::{ChannelType, ErrorKind},
};

use crate::{
    Result,
    adapter::{AdapterResponse, ChannelAdapter},
};

/// One recorded send call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSend {
    pub target: String,
    pub content: String,
}

/// Adapter that plays back a scripted sequence of responses and records
/// every call. Once the script is exhausted it keeps returning the final
/// fallback response.
pub struct MockAdapter {
    channel: ChannelType,
    script: Mutex<VecDeque<Result<AdapterResponse>>>,
    fallback: AdapterResponse,
    calls: Mutex<Vec<RecordedSend>>,
}

impl MockAdapter {
    pub fn new(channel: ChannelType, fallback: AdapterResponse) -> Self {
        Self {
            channel,
            script: Mutex::new(VecDeque::new()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Adapter that succeeds on every call.
    pub fn always_ok(channel: ChannelType) -> Self {
        Self::new(channel, AdapterResponse::ok())
    }

    /// Adapter that fails every call with the given kind.
    pub fn always_failing(channel: ChannelType, kind: ErrorKind) -> Self {
        Self::new(channel, AdapterResponse::failure(kind))
    }

    /// Adapter that fails `failures` times with `kind`, then succeeds.
    pub fn failing_then_ok(channel: ChannelType, kind: ErrorKind, failures: usize) -> Self {
        let mock = Self::always_ok(channel);
        for _ in 0..failures {
            mock.push_response(Ok(AdapterResponse::failure(kind)));
        }
        mock
    }

    /// Append one scripted response (consumed before the fallback applies).
    pub fn push_response(&self, response: Result<AdapterResponse>) {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        script.push_back(response);
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<RecordedSend> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl ChannelAdapter for MockAdapter {
    fn channel(&self) -> ChannelType {
        self.channel
    }

    async fn send(
        &self,
        target: &str,
        content: &str,
        _metadata: &HashMap<String, String>,
    ) -> Result<AdapterResponse> {
        {
            let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
            calls.push(RecordedSend {
                target: target.to_string(),
                content: content.to_string(),
            });
        }
        let scripted = {
            let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
            script.pop_front()
        };
        match scripted {
            Some(response) => response,
            None => Ok(self.fallback.clone()),
        }
    }
}
