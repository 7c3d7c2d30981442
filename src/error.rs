use reqwest::StatusCode;

/// Broad classification of a failure, used to decide how it is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Blocked client-side before any request was sent.
    Validation,
    /// Missing, expired or rejected credential.
    Authorization,
    /// Target resource missing or already modified.
    NotFound,
    /// Request never completed, or the server failed.
    Network,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Server returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid base URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Credential storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl ClientError {
    /// Map a non-2xx response onto the error taxonomy.
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::CONFLICT => ClientError::Conflict(message),
            _ => ClientError::Status { status, message },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Validation(_) => ErrorKind::Validation,
            ClientError::Unauthorized(_) => ErrorKind::Authorization,
            ClientError::NotFound(_) | ClientError::Conflict(_) => ErrorKind::NotFound,
            ClientError::Status { .. }
            | ClientError::Network(_)
            | ClientError::Url(_)
            | ClientError::Json(_)
            | ClientError::Storage(_) => ErrorKind::Network,
        }
    }

    /// The server-supplied (or validation) message, if there is one.
    fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Validation(msg)
            | ClientError::Unauthorized(msg)
            | ClientError::NotFound(msg)
            | ClientError::Conflict(msg)
            | ClientError::Status { message: msg, .. } => Some(msg.as_str()),
            _ => None,
        }
    }

    /// Text shown to the user when a mutation fails.
    pub fn user_message(&self) -> String {
        match self.detail() {
            Some(msg) if !msg.is_empty() => format!("Error: {}", msg),
            _ => "Error: Server error".to_string(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_statuses_classify_as_authorization() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = ClientError::from_status(status, "no".into());
            assert_eq!(err.kind(), ErrorKind::Authorization);
        }
    }

    #[test]
    fn not_found_and_conflict_share_a_kind() {
        let missing = ClientError::from_status(StatusCode::NOT_FOUND, "gone".into());
        let conflict = ClientError::from_status(StatusCode::CONFLICT, "stale".into());
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert_eq!(conflict.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn server_errors_classify_as_network() {
        let err = ClientError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom".into());
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(matches!(err, ClientError::Status { .. }));
    }

    #[test]
    fn user_message_prefers_server_message() {
        let err = ClientError::from_status(StatusCode::BAD_REQUEST, "Title taken".into());
        assert_eq!(err.user_message(), "Error: Title taken");
    }

    #[test]
    fn user_message_falls_back_without_server_message() {
        let err = ClientError::Storage(std::io::Error::other("disk"));
        assert_eq!(err.user_message(), "Error: Server error");

        let empty = ClientError::from_status(StatusCode::BAD_GATEWAY, String::new());
        assert_eq!(empty.user_message(), "Error: Server error");
    }

    #[test]
    fn validation_is_its_own_kind() {
        let err = ClientError::Validation("Title and body are required".into());
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.user_message(), "Error: Title and body are required");
    }
}
