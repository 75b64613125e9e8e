//! Cached query client.
//!
//! Every request passes through the content-addressed cache: the message
//! list is fingerprinted, a readable entry short-circuits the service call,
//! and a miss sends the request, decodes the structured result, and persists
//! it. The cached value is the decoded result, not the raw transport
//! response.

use std::sync::Arc;

use anyhow::Result;

use crate::cache::{CacheStore, Fingerprint};

use super::decode::decode;
use super::{ChatMessage, ChatService};

/// A chat service composed with the query cache and response decoder
pub struct QueryClient {
    service: Arc<dyn ChatService>,
    cache: CacheStore,
}

impl QueryClient {
    pub fn new(service: Arc<dyn ChatService>, cache: CacheStore) -> Self {
        Self { service, cache }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Fingerprint for a message list, exposed for inspection
    pub fn fingerprint(messages: &[ChatMessage]) -> Fingerprint {
        Fingerprint::of_request(
            messages
                .iter()
                .map(|m| (m.role.as_str(), m.content.as_str())),
        )
    }

    /// Send a request through the cache, returning the decoded structured
    /// value. Service and decode failures propagate; nothing is retried.
    pub async fn query(&self, messages: &[ChatMessage]) -> Result<serde_json::Value> {
        let fingerprint = Self::fingerprint(messages);

        self.cache
            .get_or_compute(&fingerprint, || async {
                let raw = self.service.send(messages).await?;
                Ok(decode(&raw)?)
            })
            .await
    }
}
