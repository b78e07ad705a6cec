use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy shared by the scoring service and its batch surface.
///
/// A disqualified match is not an error: it is a successful
/// `MatchScoreResult` with `qualified = false` and a reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    /// Malformed input, rejected before any engine runs. Never retried.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Computation failed: {0}")]
    Computation(String),

    /// Cache store failure. The service recomputes instead of surfacing this.
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Computation,
    CacheUnavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Computation => "computation",
            ErrorKind::CacheUnavailable => "cache_unavailable",
        }
    }
}

impl ScoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScoreError::Validation(_) => ErrorKind::Validation,
            ScoreError::NotFound(_) => ErrorKind::NotFound,
            ScoreError::Computation(_) => ErrorKind::Computation,
            ScoreError::CacheUnavailable(_) => ErrorKind::CacheUnavailable,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ScoreError::Validation(_) => 400,
            ScoreError::NotFound(_) => 404,
            ScoreError::Computation(_) => 500,
            ScoreError::CacheUnavailable(_) => 503,
        }
    }
}

impl From<validator::ValidationErrors> for ScoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ScoreError::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ScoreError::Validation("x".into()).status_code(), 400);
        assert_eq!(ScoreError::NotFound("x".into()).status_code(), 404);
        assert_eq!(ScoreError::Computation("x".into()).status_code(), 500);
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
    }
}
