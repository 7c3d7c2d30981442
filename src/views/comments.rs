use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;

use super::{report, Notice};
use crate::cache::{RemoteCache, ResourceKey, Subscription};
use crate::error::{ClientError, ClientResult};
use crate::http::{send_json, Transport};
use crate::models::{CommentId, CommentInput, PostId};
use crate::paths;

/// Comment form and list for a single post.
///
/// Only this post's comment-list key is ever invalidated from here.
pub struct CommentEditor {
    transport: Arc<dyn Transport>,
    cache: RemoteCache,
    post_id: PostId,
    key: ResourceKey,
    body: String,
    notice: Option<Notice>,
}

impl CommentEditor {
    pub fn new(transport: Arc<dyn Transport>, cache: RemoteCache, post_id: PostId) -> Self {
        let key = ResourceKey::comments(&post_id);
        Self {
            transport,
            cache,
            post_id,
            key,
            body: String::new(),
            notice: None,
        }
    }

    pub fn post_id(&self) -> &PostId {
        &self.post_id
    }

    pub fn comments(&self) -> Subscription {
        self.cache.subscribe(&self.key)
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub async fn submit(&mut self) -> ClientResult<()> {
        let result = self.add().await;
        report(&mut self.notice, result)
    }

    async fn add(&mut self) -> ClientResult<&'static str> {
        if self.body.trim().is_empty() {
            return Err(ClientError::Validation("Comment body is required".into()));
        }

        tracing::info!(post = %self.post_id, "Adding comment");
        let input = CommentInput {
            body: self.body.clone(),
        };
        let _: Value = send_json(
            self.transport.as_ref(),
            Method::POST,
            &paths::post_comments(&self.post_id),
            &input,
        )
        .await?;

        self.cache.invalidate(&self.key);
        self.body.clear();
        Ok("Comment added successfully!")
    }

    pub async fn delete_comment(&mut self, id: &CommentId) -> ClientResult<()> {
        let result = self.remove(id).await;
        report(&mut self.notice, result)
    }

    async fn remove(&self, id: &CommentId) -> ClientResult<&'static str> {
        tracing::info!(post = %self.post_id, comment = %id, "Deleting comment");
        self.transport
            .send(Method::DELETE, &paths::comment(id), None)
            .await?;
        self.cache.invalidate(&self.key);
        Ok("Comment deleted successfully!")
    }
}
