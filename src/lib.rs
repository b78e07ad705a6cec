//! FedLease Score - neighborhood and match scoring for federal lease opportunities
//!
//! This library provides the two scoring engines behind the service: a
//! spatial-density neighborhood score around a point, and a
//! property-to-solicitation match score with an early-termination
//! disqualification pipeline. Both share a TTL score cache.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{
    distance::{calculate_bounding_box, haversine_distance},
    GradeThresholds, MatchConstraintPipeline, MatchScoreEngine, Matcher, NeighborhoodScoreEngine,
    SpatialIndex,
};
pub use error::ScoreError;
pub use models::{
    GovernmentPropertyRecord, Grade, MatchScoreResult, NeighborhoodScoreResult,
    OpportunityRequirement, PropertyListing,
};
pub use services::{ScoreCache, ScoringService};
