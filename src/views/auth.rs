use std::sync::Arc;

use reqwest::Method;

use super::{report, Notice};
use crate::error::{ClientError, ClientResult};
use crate::http::{send_json, Transport};
use crate::models::{AuthResponse, Credentials};
use crate::paths;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

impl AuthMode {
    fn path(self) -> &'static str {
        match self {
            AuthMode::Login => paths::LOGIN,
            AuthMode::Register => paths::REGISTER,
        }
    }
}

/// Login / registration form.
pub struct AuthForm {
    transport: Arc<dyn Transport>,
    pub username: String,
    pub password: String,
    mode: AuthMode,
    notice: Option<Notice>,
}

impl AuthForm {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            username: String::new(),
            password: String::new(),
            mode: AuthMode::default(),
            notice: None,
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        };
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Exchange the credentials for a token and sign `session` in.
    ///
    /// The session is untouched when anything fails.
    pub async fn submit(&mut self, session: &mut Session) -> ClientResult<()> {
        let result = self.authenticate(session).await;
        report(&mut self.notice, result)
    }

    async fn authenticate(&self, session: &mut Session) -> ClientResult<&'static str> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(ClientError::Validation(
                "Username and password are required".into(),
            ));
        }

        let credentials = Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        };
        let response: AuthResponse = send_json(
            self.transport.as_ref(),
            Method::POST,
            self.mode.path(),
            &credentials,
        )
        .await?;

        match self.mode {
            AuthMode::Login => {
                session.complete_login(response.token)?;
                Ok("Login successful!")
            }
            AuthMode::Register => {
                session.complete_registration(response.token)?;
                Ok("Registration successful!")
            }
        }
    }
}
