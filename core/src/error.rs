use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidQuery,
    NotFound,
    PartialData,
    ProviderUnavailable,
    Cancelled,
    Internal,
}

impl ErrorCode {
    /// Only unresolvable disease identity and total provider failure end a
    /// request; everything else degrades.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ErrorCode::PartialData)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::InvalidQuery => "INVALID_QUERY",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::PartialData => "PARTIAL_DATA",
            ErrorCode::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::Internal => "INTERNAL",
        };
        write!(f, "{}", s)
    }
}

pub trait RepurposeError: std::error::Error {
    fn error_code(&self) -> ErrorCode;
}

/// A secondary signal source that could not be consulted. Processing
/// continues with whatever data was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialData {
    pub source: String,
    pub reason: String,
}

impl PartialData {
    pub fn new(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        ErrorCode::PartialData
    }
}

impl std::fmt::Display for PartialData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} unavailable: {}", self.source, self.reason)
    }
}
