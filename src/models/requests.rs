use crate::error::ScoreError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request for a neighborhood score around a point
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NeighborhoodScoreRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,
    #[validate(range(exclusive_min = 0.0, max = 100.0))]
    #[serde(default = "default_radius_miles", alias = "radius")]
    pub radius_miles: f64,
}

fn default_radius_miles() -> f64 {
    5.0
}

/// One batch item as received
///
/// An item that does not deserialize is kept as raw JSON so it fails on its
/// own instead of rejecting the whole body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchEntry<T> {
    Parsed(T),
    Malformed(serde_json::Value),
}

impl<T> From<T> for BatchEntry<T> {
    fn from(request: T) -> Self {
        BatchEntry::Parsed(request)
    }
}

/// An item accepted by the batch operations
pub trait BatchInput<T> {
    fn request(&self) -> Result<&T, ScoreError>;
}

impl BatchInput<NeighborhoodScoreRequest> for NeighborhoodScoreRequest {
    fn request(&self) -> Result<&NeighborhoodScoreRequest, ScoreError> {
        Ok(self)
    }
}

impl BatchInput<MatchScoreRequest> for MatchScoreRequest {
    fn request(&self) -> Result<&MatchScoreRequest, ScoreError> {
        Ok(self)
    }
}

impl<T: DeserializeOwned> BatchInput<T> for BatchEntry<T> {
    fn request(&self) -> Result<&T, ScoreError> {
        match self {
            BatchEntry::Parsed(request) => Ok(request),
            BatchEntry::Malformed(raw) => {
                // Re-run the typed decode for a useful message
                let reason = match serde_json::from_value::<T>(raw.clone()) {
                    Err(e) => e.to_string(),
                    Ok(_) => "unrecognized item".to_string(),
                };
                Err(ScoreError::Validation(format!("Malformed batch item: {}", reason)))
            }
        }
    }
}

/// Batch of neighborhood score requests; items are validated one by one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchNeighborhoodRequest {
    pub locations: Vec<BatchEntry<NeighborhoodScoreRequest>>,
}

/// Request for a property/opportunity match score
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MatchScoreRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "property_id")]
    pub property_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "opportunity_id")]
    pub opportunity_id: String,
}

/// Batch of match score requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMatchRequest {
    pub pairs: Vec<BatchEntry<MatchScoreRequest>>,
}
