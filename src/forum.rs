use std::sync::Arc;

use crate::cache::RemoteCache;
use crate::config::Config;
use crate::error::ClientResult;
use crate::http::{ApiClient, Transport};
use crate::models::PostId;
use crate::session::{CredentialStore, FileCredentialStore, Session};
use crate::views::{AuthForm, CommentEditor, PostEditor};

/// Which top-level view applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Auth,
    Posts,
}

/// Application shell: owns the session and hands out view-models that share
/// one transport and one cache.
pub struct Forum {
    transport: Arc<dyn Transport>,
    cache: RemoteCache,
    session: Session,
}

impl Forum {
    /// Wire the file-backed credential store and the HTTP adapter from config.
    pub fn open(config: &Config) -> ClientResult<Self> {
        let store: Arc<dyn CredentialStore> =
            Arc::new(FileCredentialStore::new(config.token_path()));
        let api = ApiClient::new(
            &config.api.base_url,
            config.request_timeout(),
            Arc::clone(&store),
        )?;
        tracing::debug!("Using API at {}", api.base_url());
        Self::with_parts(Arc::new(api), store)
    }

    pub fn with_parts(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
    ) -> ClientResult<Self> {
        let session = Session::restore(store)?;
        let cache = RemoteCache::new(Arc::clone(&transport));
        Ok(Self {
            transport,
            cache,
            session,
        })
    }

    pub fn screen(&self) -> Screen {
        if self.session.is_authenticated() {
            Screen::Posts
        } else {
            Screen::Auth
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn cache(&self) -> &RemoteCache {
        &self.cache
    }

    pub fn auth_form(&self) -> AuthForm {
        AuthForm::new(Arc::clone(&self.transport))
    }

    /// Submit `form` against this forum's session.
    pub async fn submit_auth(&mut self, form: &mut AuthForm) -> ClientResult<()> {
        form.submit(&mut self.session).await
    }

    pub fn post_editor(&self) -> PostEditor {
        PostEditor::new(Arc::clone(&self.transport), self.cache.clone())
    }

    pub fn comment_editor(&self, post_id: PostId) -> CommentEditor {
        CommentEditor::new(Arc::clone(&self.transport), self.cache.clone(), post_id)
    }

    pub fn sign_out(&mut self) -> ClientResult<()> {
        self.session.sign_out()
    }
}
