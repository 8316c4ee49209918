use growweek_shared::ApiErrorBody;
use serde::{Deserialize, Serialize};

use crate::task::TaskId;

pub const WEEK_LOCKED_CODE: &str = "WEEK_LOCKED";
pub const MALFORMED_RESPONSE_CODE: &str = "MALFORMED_RESPONSE";

/// Failure details shared by local policy rejections and server rejections,
/// so callers can render both the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiFailure {
    pub status: Option<u16>,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiFailure {
    pub fn new(status: Option<u16>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn from_body(status: Option<u16>, body: ApiErrorBody) -> Self {
        Self {
            status,
            code: body.code,
            message: body.message,
            details: body.details,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({status}): {}", self.code, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    PolicyViolation,
    NotFound,
    AuthorizationTerminal,
    ServerRejected,
    TransportFailure,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoardError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("not allowed: {0}")]
    PolicyViolation(ApiFailure),

    #[error("task {0} is not on the board")]
    NotFound(TaskId),

    #[error("session expired; sign in again")]
    AuthorizationTerminal,

    #[error("server rejected the request: {0}")]
    ServerRejected(ApiFailure),

    #[error("network request failed: {0}")]
    Transport(String),
}

impl BoardError {
    pub fn week_locked(week_id: Option<i64>) -> Self {
        let failure = ApiFailure::new(
            None,
            WEEK_LOCKED_CODE,
            "tasks in a reviewed week cannot be changed",
        );
        let failure = match week_id {
            Some(id) => failure.with_details(serde_json::json!({ "weekId": id })),
            None => failure,
        };
        Self::PolicyViolation(failure)
    }

    pub fn malformed(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::ServerRejected(ApiFailure::new(status, MALFORMED_RESPONSE_CODE, message))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::PolicyViolation(_) => ErrorKind::PolicyViolation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AuthorizationTerminal => ErrorKind::AuthorizationTerminal,
            Self::ServerRejected(_) => ErrorKind::ServerRejected,
            Self::Transport(_) => ErrorKind::TransportFailure,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Policy and server rejections carry the same failure payload.
    pub fn failure(&self) -> Option<&ApiFailure> {
        match self {
            Self::PolicyViolation(failure) | Self::ServerRejected(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::PolicyViolation(failure) | Self::ServerRejected(failure)
                if !failure.message.trim().is_empty() =>
            {
                failure.message.clone()
            }
            other => other.to_string(),
        }
    }
}
