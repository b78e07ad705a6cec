// Core algorithm exports
pub mod constraints;
pub mod distance;
pub mod grading;
pub mod matcher;
pub mod neighborhood;
pub mod percentile;
pub mod scoring;
pub mod spatial;

pub use constraints::{CheckOutcome, ConstraintCheck, MatchConstraintPipeline, PipelineOutcome};
pub use distance::{calculate_bounding_box, haversine_distance, is_within_bounding_box};
pub use grading::GradeThresholds;
pub use matcher::Matcher;
pub use neighborhood::{NeighborhoodScoreEngine, NeighborhoodTuning};
pub use percentile::{HistogramDistribution, ReferenceDistribution};
pub use scoring::{CompetitiveThresholds, MatchScoreEngine};
pub use spatial::{SharedSpatialIndex, SpatialIndex};
