use crate::core::constraints::MatchConstraintPipeline;
use crate::core::scoring::MatchScoreEngine;
use crate::models::{BrokerExperience, MatchScoreResult, OpportunityRequirement, PropertyListing};

/// Match orchestrator - runs the disqualification pipeline, then the scorer
///
/// # Stages
/// 1. Ordered hard-stop checks (stop at first failure)
/// 2. Five-category weighted scoring, only for qualified pairs
pub struct Matcher {
    pipeline: MatchConstraintPipeline,
    engine: MatchScoreEngine,
}

impl Matcher {
    pub fn new(pipeline: MatchConstraintPipeline, engine: MatchScoreEngine) -> Self {
        Self { pipeline, engine }
    }

    pub fn with_defaults() -> Self {
        Self::new(MatchConstraintPipeline::standard(), MatchScoreEngine::default())
    }

    pub fn pipeline(&self) -> &MatchConstraintPipeline {
        &self.pipeline
    }

    /// Evaluate one listing against one requirement
    ///
    /// A disqualified pair scores 0 with exactly one disqualifier and never
    /// reaches the scorer.
    pub fn evaluate(
        &self,
        listing: &PropertyListing,
        requirement: &OpportunityRequirement,
        experience: Option<&BrokerExperience>,
    ) -> MatchScoreResult {
        let outcome = self.pipeline.evaluate(listing, requirement);

        match outcome.disqualifier {
            Some(reason) => MatchScoreResult::disqualified(
                &listing.id,
                &requirement.id,
                reason,
                outcome.checks_evaluated,
            ),
            None => self
                .engine
                .score(listing, requirement, experience, outcome.checks_evaluated),
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}
