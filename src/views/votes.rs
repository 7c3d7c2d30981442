use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};

use crate::cache::{RemoteCache, ResourceKey};
use crate::error::ClientResult;
use crate::http::{send_json, Transport};
use crate::models::PostId;
use crate::paths;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Up,
    Down,
}

impl Vote {
    fn path(self, id: &PostId) -> String {
        match self {
            Vote::Up => paths::upvote(id),
            Vote::Down => paths::downvote(id),
        }
    }
}

/// Fire-and-invalidate voting.
///
/// Failures are logged and otherwise dropped, unlike every other mutation,
/// which reports a notice. The displayed count only moves once the refreshed
/// post list arrives.
#[derive(Clone)]
pub struct VoteActions {
    transport: Arc<dyn Transport>,
    cache: RemoteCache,
}

impl VoteActions {
    pub fn new(transport: Arc<dyn Transport>, cache: RemoteCache) -> Self {
        Self { transport, cache }
    }

    /// Send the vote and refresh the post list on success.
    pub async fn cast(&self, id: &PostId, vote: Vote) -> ClientResult<()> {
        let _: Value = send_json(self.transport.as_ref(), Method::POST, &vote.path(id), &json!({})).await?;
        self.cache.invalidate(&ResourceKey::posts());
        Ok(())
    }

    pub async fn upvote(&self, id: &PostId) {
        self.fire(id, Vote::Up).await;
    }

    pub async fn downvote(&self, id: &PostId) {
        self.fire(id, Vote::Down).await;
    }

    async fn fire(&self, id: &PostId, vote: Vote) {
        if let Err(e) = self.cast(id, vote).await {
            tracing::warn!(post = %id, ?vote, "Vote failed: {}", e);
        }
    }
}
