// View-models: local draft state plus the mutations it feeds
// Every mutation failure except a vote becomes a `Notice`; the view-model stays
// usable afterwards

pub mod auth;
pub mod comments;
pub mod posts;
pub mod votes;

use crate::error::{ClientError, ErrorKind};

pub use auth::{AuthForm, AuthMode};
pub use comments::CommentEditor;
pub use posts::{Draft, EditorMode, PostEditor};
pub use votes::{Vote, VoteActions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Message a view shows after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    pub fn error(err: &ClientError) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: err.user_message(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

/// Record the outcome of an action as a notice and hand the result back.
pub(crate) fn report(notice: &mut Option<Notice>, result: Result<&str, ClientError>) -> Result<(), ClientError> {
    match result {
        Ok(message) => {
            *notice = Some(Notice::success(message));
            Ok(())
        }
        Err(err) => {
            match err.kind() {
                ErrorKind::Validation => tracing::debug!("{}", err),
                ErrorKind::Authorization | ErrorKind::NotFound => tracing::warn!("{}", err),
                ErrorKind::Network => tracing::error!("{}", err),
            }
            *notice = Some(Notice::error(&err));
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Log output produced while reporting `err`.
    fn log_for(err: ClientError) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let _ = report(&mut None, Err(err));
        });
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn report_success_sets_success_notice() {
        let mut notice = None;
        report(&mut notice, Ok("Post added successfully!")).unwrap();
        assert_eq!(notice, Some(Notice::success("Post added successfully!")));
    }

    #[test]
    fn report_error_sets_error_notice_and_returns_err() {
        let mut notice = None;
        let result = report(&mut notice, Err(ClientError::NotFound("Post not found".into())));
        assert!(result.is_err());
        let notice = notice.unwrap();
        assert!(notice.is_error());
        assert_eq!(notice.text, "Error: Post not found");
    }

    #[test]
    fn validation_failures_log_at_debug() {
        let log = log_for(ClientError::Validation("Title and body are required".into()));
        assert!(log.contains("DEBUG"), "{}", log);
        assert!(!log.contains("ERROR"), "{}", log);
    }

    #[test]
    fn server_failures_log_at_error() {
        let log = log_for(ClientError::from_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            String::new(),
        ));
        assert!(log.contains("ERROR"), "{}", log);
    }

    #[test]
    fn rejected_credentials_log_at_warn() {
        let log = log_for(ClientError::Unauthorized("Token expired".into()));
        assert!(log.contains("WARN"), "{}", log);
        assert!(!log.contains("ERROR"), "{}", log);
    }
}
