mod store;

use std::sync::Arc;

use crate::error::ClientResult;
use crate::models::Token;

pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    SignedOut,
    SignedIn,
}

/// Authentication flag backed by the credential store.
///
/// The stored token is trusted on presence: it is never checked against the
/// server here, so an expired token only shows up as a 401 on the next request.
pub struct Session {
    store: Arc<dyn CredentialStore>,
    state: SessionState,
}

impl Session {
    /// Derive the initial state from whatever credential is already stored.
    pub fn restore(store: Arc<dyn CredentialStore>) -> ClientResult<Self> {
        let state = if store.load()?.is_some() {
            tracing::info!("Restored stored credential");
            SessionState::SignedIn
        } else {
            SessionState::SignedOut
        };
        Ok(Self { store, state })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::SignedIn
    }

    pub fn complete_login(&mut self, token: Token) -> ClientResult<()> {
        self.sign_in(token)?;
        tracing::info!("Logged in");
        Ok(())
    }

    pub fn complete_registration(&mut self, token: Token) -> ClientResult<()> {
        self.sign_in(token)?;
        tracing::info!("Registered and logged in");
        Ok(())
    }

    /// Forget the credential locally. The server is not told.
    pub fn sign_out(&mut self) -> ClientResult<()> {
        self.store.clear()?;
        self.state = SessionState::SignedOut;
        tracing::info!("Signed out");
        Ok(())
    }

    fn sign_in(&mut self, token: Token) -> ClientResult<()> {
        self.store.save(&token)?;
        self.state = SessionState::SignedIn;
        Ok(())
    }
}
