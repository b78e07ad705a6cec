use serde::{Deserialize, Serialize};
use crate::error::{ErrorKind, ScoreError};

/// Failure detail reported for one batch item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ScoreError> for ErrorDetail {
    fn from(err: &ScoreError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of a single batch item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem<T> {
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl<T> BatchItem<T> {
    pub fn from_result(index: usize, outcome: Result<T, ScoreError>) -> Self {
        match outcome {
            Ok(result) => Self {
                index,
                success: true,
                result: Some(result),
                error: None,
            },
            Err(err) => Self {
                index,
                success: false,
                result: None,
                error: Some(ErrorDetail::from(&err)),
            },
        }
    }
}

/// Response for batch endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse<T> {
    pub results: Vec<BatchItem<T>>,
    pub succeeded: usize,
    pub failed: usize,
}

impl<T> BatchResponse<T> {
    pub fn new(results: Vec<BatchItem<T>>) -> Self {
        let succeeded = results.iter().filter(|item| item.success).count();
        let failed = results.len() - succeeded;
        Self {
            results,
            succeeded,
            failed,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub indexed_properties: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl From<&ScoreError> for ErrorResponse {
    fn from(err: &ScoreError) -> Self {
        Self {
            error: err.kind().as_str().to_string(),
            message: err.to_string(),
            status_code: err.status_code(),
        }
    }
}

/// Cache sweep response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResponse {
    pub removed: u64,
}
