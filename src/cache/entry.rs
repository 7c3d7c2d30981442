use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::key::ResourceKey;
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Loading,
    Ready,
    Error,
}

/// Snapshot of one cached collection.
///
/// While `status` is `Loading`, `value` may still hold the previous result;
/// that stale value is what views keep showing until the refetch lands.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: ResourceKey,
    pub value: Option<Arc<Value>>,
    pub status: Status,
    pub error: Option<Arc<ClientError>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub(crate) fn loading(key: ResourceKey) -> Self {
        Self {
            key,
            value: None,
            status: Status::Loading,
            error: None,
            updated_at: None,
        }
    }

    /// Loading, but with an older value still available.
    pub fn is_stale(&self) -> bool {
        self.status == Status::Loading && self.value.is_some()
    }

    /// Decode the cached value, if any.
    pub fn data<T: DeserializeOwned>(&self) -> ClientResult<Option<T>> {
        match &self.value {
            Some(value) => Ok(Some(T::deserialize(value.as_ref())?)),
            None => Ok(None),
        }
    }
}

/// A view's handle on one cache entry.
///
/// Dropping it does not cancel anything; the fetch it may have started still
/// lands in the cache for the next reader.
pub struct Subscription {
    receiver: watch::Receiver<CacheEntry>,
}

impl Subscription {
    pub(crate) fn new(receiver: watch::Receiver<CacheEntry>) -> Self {
        Self { receiver }
    }

    pub fn current(&self) -> CacheEntry {
        self.receiver.borrow().clone()
    }

    /// Wait for the next update. `None` once the cache itself is gone.
    pub async fn changed(&mut self) -> Option<CacheEntry> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Wait until the entry is no longer loading.
    pub async fn settled(&mut self) -> CacheEntry {
        let settled = self
            .receiver
            .wait_for(|entry| entry.status != Status::Loading)
            .await
            .map(|entry| entry.clone());
        settled.unwrap_or_else(|_| self.receiver.borrow().clone())
    }

    /// Current entry followed by every later update.
    pub fn into_stream(self) -> WatchStream<CacheEntry> {
        WatchStream::new(self.receiver)
    }
}
