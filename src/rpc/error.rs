//! Client-visible error taxonomy and the normalizer that maps every failure
//! into it.

use axum::http::StatusCode;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{Span, error};

use crate::session::StoreError;

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";
pub const UNAUTHENTICATED_MESSAGE: &str = "You must be logged in to access this resource";
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Kinds surfaced to clients as the `code` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    BadRequest,
    InvalidCredentials,
    Unauthenticated,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Internal => "INTERNAL",
        }
    }

    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw failure produced while handling a call.
///
/// `Client` errors already belong to the taxonomy and pass through the
/// normalizer untouched; everything else becomes [`ErrorKind::Internal`].
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("{message}")]
    Client { kind: ErrorKind, message: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RpcError {
    pub fn client(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Client {
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::client(ErrorKind::BadRequest, message)
    }

    /// Same kind and message whichever factor failed, to avoid account enumeration.
    #[must_use]
    pub fn invalid_credentials() -> Self {
        Self::client(ErrorKind::InvalidCredentials, INVALID_CREDENTIALS_MESSAGE)
    }

    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::client(ErrorKind::Unauthenticated, UNAUTHENTICATED_MESSAGE)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::client(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::client(ErrorKind::Conflict, message)
    }

    /// Kind the client will see once this error is normalized.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Client { kind, .. } => *kind,
            Self::Store(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Error shape returned to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClientError {
    pub code: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ErrorData>,
}

/// Single translation boundary between raw failures and [`ClientError`].
#[derive(Clone, Copy, Debug)]
pub struct ErrorNormalizer {
    production: bool,
}

impl ErrorNormalizer {
    /// Outside production, internal errors carry their debug chain in `data.stack`.
    #[must_use]
    pub fn new(production: bool) -> Self {
        Self { production }
    }

    #[must_use]
    pub fn normalize(&self, error: RpcError, logger: &Span) -> ClientError {
        let error = match error {
            RpcError::Client { kind, message } => {
                return ClientError {
                    code: kind,
                    message,
                    data: None,
                };
            }
            other => other,
        };

        logger.in_scope(|| match &error {
            RpcError::Store(source) => error!(error = ?source, "session store unavailable"),
            other => error!(error = ?other, "unhandled rpc failure"),
        });

        ClientError {
            code: ErrorKind::Internal,
            message: INTERNAL_MESSAGE.to_string(),
            data: (!self.production).then(|| ErrorData {
                stack: Some(format!("{error:?}")),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn client_errors_pass_through_unchanged() {
        let normalizer = ErrorNormalizer::new(false);
        let normalized = normalizer.normalize(RpcError::conflict("Email already exists"), &Span::none());
        assert_eq!(
            normalized,
            ClientError {
                code: ErrorKind::Conflict,
                message: "Email already exists".to_string(),
                data: None,
            }
        );
    }

    #[test]
    fn unknown_errors_become_internal_without_detail_in_production() {
        let normalizer = ErrorNormalizer::new(true);
        let normalized = normalizer.normalize(
            RpcError::Internal(anyhow!("connection refused at 10.0.0.7")),
            &Span::none(),
        );
        assert_eq!(normalized.code, ErrorKind::Internal);
        assert_eq!(normalized.message, INTERNAL_MESSAGE);
        assert!(normalized.data.is_none());
    }

    #[test]
    fn internal_errors_carry_stack_in_development() {
        let normalizer = ErrorNormalizer::new(false);
        let normalized = normalizer.normalize(
            RpcError::Internal(anyhow!("connection refused")),
            &Span::none(),
        );
        assert_eq!(normalized.message, INTERNAL_MESSAGE);
        let stack = normalized.data.and_then(|data| data.stack);
        assert!(stack.is_some_and(|stack| stack.contains("connection refused")));
    }

    #[test]
    fn store_failures_are_internal_for_clients() {
        let error = RpcError::from(StoreError::Timeout(Duration::from_secs(2)));
        assert_eq!(error.kind(), ErrorKind::Internal);

        let normalized = ErrorNormalizer::new(true).normalize(error, &Span::none());
        assert_eq!(normalized.code, ErrorKind::Internal);
        assert_eq!(normalized.message, INTERNAL_MESSAGE);
    }

    #[test]
    fn invalid_credentials_message_is_fixed() {
        let error = RpcError::invalid_credentials();
        assert_eq!(error.kind(), ErrorKind::InvalidCredentials);
        assert_eq!(error.to_string(), INVALID_CREDENTIALS_MESSAGE);
    }

    #[test]
    fn client_error_serializes_to_wire_shape() {
        let error = ClientError {
            code: ErrorKind::Unauthenticated,
            message: UNAUTHENTICATED_MESSAGE.to_string(),
            data: None,
        };
        assert_eq!(
            serde_json::to_value(&error).ok(),
            Some(json!({"code": "UNAUTHENTICATED", "message": UNAUTHENTICATED_MESSAGE}))
        );

        let error = ClientError {
            code: ErrorKind::Internal,
            message: INTERNAL_MESSAGE.to_string(),
            data: Some(ErrorData {
                stack: Some("trace".to_string()),
            }),
        };
        assert_eq!(
            serde_json::to_value(&error).ok(),
            Some(json!({"code": "INTERNAL", "message": INTERNAL_MESSAGE, "data": {"stack": "trace"}}))
        );
    }

    #[test]
    fn status_codes_follow_kind() {
        assert_eq!(ErrorKind::BadRequest.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorKind::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorKind::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(ErrorKind::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
