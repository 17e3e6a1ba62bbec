use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

/// Everything that can go wrong between a screen controller and the entry store.
///
/// Errors are cloneable so a controller can keep the last one as screen state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("no credential available for the entry store")]
    AuthMissing,
    #[error("network error: {0}")]
    Transport(String),
    #[error("entry store returned {status}: {message}")]
    Server {
        status: u16,
        code: Option<ErrorCode>,
        message: String,
    },
    #[error("unexpected response from entry store: {0}")]
    Decode(String),
    #[error("{0}")]
    Validation(String),
    #[error("controller was disposed before the request finished")]
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Auth,
    Network,
    Validation,
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn server(status: u16, body: Option<ApiError>, fallback: impl Into<String>) -> Self {
        match body {
            Some(body) => Self::Server {
                status,
                code: Some(body.code),
                message: body.message,
            },
            None => Self::Server {
                status,
                code: None,
                message: fallback.into(),
            },
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AuthMissing => ErrorCategory::Auth,
            Self::Server { status, code, .. }
                if *status == 401
                    || *status == 403
                    || matches!(code, Some(ErrorCode::Unauthorized | ErrorCode::Forbidden)) =>
            {
                ErrorCategory::Auth
            }
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Transport(_) | Self::Server { .. } | Self::Decode(_) | Self::Disposed => {
                ErrorCategory::Network
            }
        }
    }

    /// Banner text shown on the screen that owns the failing call.
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthMissing => "You're signed out. Sign in again to sync your entries.".into(),
            Self::Validation(message) => message.clone(),
            Self::Server { status, .. } if *status == 401 || *status == 403 => {
                "Your session has expired. Sign in again to sync your entries.".into()
            }
            Self::Server { status, .. } if *status >= 500 => {
                "The server had a problem. Please try again in a moment.".into()
            }
            Self::Server { message, .. } => format!("Request failed: {message}"),
            Self::Transport(_) => {
                "Couldn't reach the server. Check your connection and try again.".into()
            }
            Self::Decode(_) => "The server sent something unexpected. Please try again.".into(),
            Self::Disposed => "The request was cancelled.".into(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::server(status.as_u16(), None, err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_the_three_way_taxonomy() {
        assert_eq!(ClientError::AuthMissing.category(), ErrorCategory::Auth);
        assert_eq!(
            ClientError::validation("write at least one statement").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            ClientError::Transport("connection refused".into()).category(),
            ErrorCategory::Network
        );
        assert_eq!(
            ClientError::server(500, None, "boom").category(),
            ErrorCategory::Network
        );
        assert_eq!(
            ClientError::server(401, None, "expired").category(),
            ErrorCategory::Auth
        );
    }

    #[test]
    fn server_body_message_is_preferred() {
        let err = ClientError::server(
            404,
            Some(ApiError::new(ErrorCode::NotFound, "entry 3 not found")),
            "404 Not Found",
        );
        assert_eq!(err.user_message(), "Request failed: entry 3 not found");
        assert_eq!(
            ClientError::validation("Pick a skill first.").user_message(),
            "Pick a skill first."
        );
    }
}
