use crate::dsl::RequestValidationError;
use graph::GraphError;
use repurpose_core::config::ConfigValidationError;
use repurpose_core::error::{ErrorCode, RepurposeError};
use repurpose_core::progress::Cancelled;
use safety::RuleSetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid query: {0}")]
    InvalidQuery(#[from] RequestValidationError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("analysis cancelled: progress consumer disconnected")]
    Cancelled,
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigValidationError),
    #[error("contraindication rules: {0}")]
    Rules(#[from] RuleSetError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<Cancelled> for AnalysisError {
    fn from(_: Cancelled) -> Self {
        AnalysisError::Cancelled
    }
}

impl RepurposeError for AnalysisError {
    fn error_code(&self) -> ErrorCode {
        match self {
            AnalysisError::InvalidQuery(_) => ErrorCode::InvalidQuery,
            AnalysisError::Graph(err) => err.error_code(),
            AnalysisError::Cancelled => ErrorCode::Cancelled,
            AnalysisError::Config(_) | AnalysisError::Rules(_) | AnalysisError::Internal(_) => {
                ErrorCode::Internal
            }
        }
    }
}

impl AnalysisError {
    pub fn is_cancelled(&self) -> bool {
        self.error_code() == ErrorCode::Cancelled
    }
}
