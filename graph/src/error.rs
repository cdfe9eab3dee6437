use crate::provider::ProviderError;
use repurpose_core::error::{ErrorCode, RepurposeError};
use repurpose_core::progress::Cancelled;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("disease not found: {0}")]
    NotFound(String),
    #[error("primary data source unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("graph build cancelled")]
    Cancelled,
}

impl From<ProviderError> for GraphError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(name) => GraphError::NotFound(name),
            ProviderError::Unavailable(reason) => GraphError::ProviderUnavailable(reason),
        }
    }
}

impl From<Cancelled> for GraphError {
    fn from(_: Cancelled) -> Self {
        GraphError::Cancelled
    }
}

impl RepurposeError for GraphError {
    fn error_code(&self) -> ErrorCode {
        match self {
            GraphError::NotFound(_) => ErrorCode::NotFound,
            GraphError::ProviderUnavailable(_) => ErrorCode::ProviderUnavailable,
            GraphError::InvalidRecord(_) => ErrorCode::Internal,
            GraphError::Cancelled => ErrorCode::Cancelled,
        }
    }
}
