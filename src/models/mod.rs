// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BoundingBox, BrokerExperience, BuildingClass, CategoryScores, DelineatedArea, DesiredFeatures,
    FactorScore, GeoPoint, GovernmentPropertyRecord, Grade, LocationRequirement, MandatoryFeatures,
    MatchCategory, MatchScoreResult, MatchWeights, NeighborhoodFactor, NeighborhoodMetrics,
    NeighborhoodScoreResult, NeighborhoodWeights, OpportunityRequirement, Ownership,
    PropertyListing, SpaceRequirement,
};
pub use requests::{
    BatchEntry, BatchInput, BatchMatchRequest, BatchNeighborhoodRequest, MatchScoreRequest,
    NeighborhoodScoreRequest,
};
pub use responses::{BatchItem, BatchResponse, ErrorDetail, ErrorResponse, HealthResponse, SweepResponse};
