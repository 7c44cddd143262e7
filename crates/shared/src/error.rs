use serde::{Deserialize, Serialize};

use crate::protocol::STATUS_OK;

/// Status vocabulary answered by the remote source when a call does not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    Validation,
    UnknownOperation,
    Internal,
}

impl ErrorCode {
    pub fn as_status(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION",
            Self::UnknownOperation => "UNKNOWN_OPERATION",
            Self::Internal => "INTERNAL",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Anything other than the success sentinel counts as failure.
pub fn is_success(status: &str) -> bool {
    status == STATUS_OK
}
