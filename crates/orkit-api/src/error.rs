use orkit_solver::ProblemError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not Found: {0}")]
    UnknownEndpoint(String),
    #[error("Malformed request: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("{message}")]
    Invalid { field: String, message: String },
}

/// JSON error body: `{"detail": ..., "field": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ApiError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::UnknownEndpoint(_) => 404,
            ApiError::Malformed(_) | ApiError::Invalid { .. } => 422,
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            ApiError::Invalid { field, .. } => Some(field),
            _ => None,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            detail: self.to_string(),
            field: self.field().map(str::to_string),
        }
    }
}

impl From<ProblemError> for ApiError {
    fn from(err: ProblemError) -> Self {
        ApiError::invalid(err.field(), err.to_string())
    }
}
