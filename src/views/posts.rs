use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;

use super::votes::VoteActions;
use super::{report, Notice};
use crate::cache::{RemoteCache, ResourceKey, Subscription};
use crate::error::{ClientError, ClientResult};
use crate::http::{send_json, Transport};
use crate::models::{Post, PostId, PostInput};
use crate::paths;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit(PostId),
}

/// Unsaved post form contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub body: String,
    editing: Option<PostId>,
}

impl Draft {
    pub fn editing_target(&self) -> Option<&PostId> {
        self.editing.as_ref()
    }

    pub fn mode(&self) -> EditorMode {
        match &self.editing {
            Some(id) => EditorMode::Edit(id.clone()),
            None => EditorMode::Create,
        }
    }

    fn is_complete(&self) -> bool {
        !self.title.trim().is_empty() && !self.body.trim().is_empty()
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Post list view-model: create/edit form, delete and votes.
pub struct PostEditor {
    transport: Arc<dyn Transport>,
    cache: RemoteCache,
    votes: VoteActions,
    draft: Draft,
    notice: Option<Notice>,
}

impl PostEditor {
    pub fn new(transport: Arc<dyn Transport>, cache: RemoteCache) -> Self {
        let votes = VoteActions::new(Arc::clone(&transport), cache.clone());
        Self {
            transport,
            cache,
            votes,
            draft: Draft::default(),
            notice: None,
        }
    }

    /// The shared post list.
    pub fn posts(&self) -> Subscription {
        self.cache.subscribe(&ResourceKey::posts())
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.draft.body = body.into();
    }

    /// Load `post` into the form; the next submit updates it.
    pub fn start_edit(&mut self, post: &Post) {
        self.draft.title = post.title.clone();
        self.draft.body = post.body.clone();
        self.draft.editing = Some(post.id.clone());
    }

    /// Drop the draft and go back to creating.
    pub fn cancel_edit(&mut self) {
        self.draft.clear();
    }

    /// Create or update, depending on the editing target.
    ///
    /// On failure the draft is left as it was so the user can retry.
    pub async fn submit(&mut self) -> ClientResult<()> {
        let result = self.save().await;
        report(&mut self.notice, result)
    }

    async fn save(&mut self) -> ClientResult<&'static str> {
        if !self.draft.is_complete() {
            return Err(ClientError::Validation("Title and body are required".into()));
        }

        let input = PostInput {
            title: self.draft.title.clone(),
            body: self.draft.body.clone(),
        };
        let message = match self.draft.mode() {
            EditorMode::Edit(id) => {
                tracing::info!(post = %id, "Updating post");
                let _: Value =
                    send_json(self.transport.as_ref(), Method::PUT, &paths::post(&id), &input).await?;
                "Post updated successfully!"
            }
            EditorMode::Create => {
                tracing::info!("Creating post");
                let _: Value =
                    send_json(self.transport.as_ref(), Method::POST, paths::POSTS, &input).await?;
                "Post added successfully!"
            }
        };

        self.cache.invalidate(&ResourceKey::posts());
        self.draft.clear();
        Ok(message)
    }

    pub async fn delete_post(&mut self, id: &PostId) -> ClientResult<()> {
        let result = self.remove(id).await;
        report(&mut self.notice, result)
    }

    async fn remove(&self, id: &PostId) -> ClientResult<&'static str> {
        tracing::info!(post = %id, "Deleting post");
        self.transport
            .send(Method::DELETE, &paths::post(id), None)
            .await?;
        self.cache.invalidate(&ResourceKey::posts());
        Ok("Post deleted successfully!")
    }

    /// Vote failures are logged only; no notice is set.
    pub async fn upvote(&self, id: &PostId) {
        self.votes.upvote(id).await;
    }

    pub async fn downvote(&self, id: &PostId) {
        self.votes.downvote(id).await;
    }
}
