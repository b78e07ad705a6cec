use crate::core::distance::haversine_distance;
use crate::core::grading::GradeThresholds;
use crate::models::{
    BrokerExperience, CategoryScores, DelineatedArea, MatchCategory,
    MatchScoreResult, MatchWeights, OpportunityRequirement, PropertyListing,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Thresholds for the competitive flag and strength/weakness labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitiveThresholds {
    pub min_overall: f64,
    /// No single category may fall below this for a pair to be competitive
    pub category_floor: f64,
    pub strength: f64,
    pub weakness: f64,
}

impl Default for CompetitiveThresholds {
    fn default() -> Self {
        Self {
            min_overall: 75.0,
            category_floor: 50.0,
            strength: 80.0,
            weakness: 60.0,
        }
    }
}

/// Days of slack between availability and occupancy that earn full timeline credit
const TIMELINE_BUFFER_DAYS: f64 = 60.0;
/// Timeline score when either date is unknown
const TIMELINE_UNKNOWN_SCORE: f64 = 75.0;
/// Experience score for a broker with no profile
const EXPERIENCE_BASELINE: f64 = 30.0;

/// Five-category match score for pairs that passed the constraint pipeline
///
/// Scoring formula:
/// overall = (
///     location * 0.30 +
///     space * 0.25 +
///     building * 0.20 +
///     timeline * 0.15 +
///     experience * 0.10
/// )
#[derive(Debug, Clone, Default)]
pub struct MatchScoreEngine {
    weights: MatchWeights,
    thresholds: GradeThresholds,
    competitive: CompetitiveThresholds,
}

impl MatchScoreEngine {
    pub fn new(weights: MatchWeights, thresholds: GradeThresholds, competitive: CompetitiveThresholds) -> Self {
        Self {
            weights,
            thresholds,
            competitive,
        }
    }

    pub fn weights(&self) -> &MatchWeights {
        &self.weights
    }

    /// Score a qualified pair. Missing upstream data falls back to defaults.
    pub fn score(
        &self,
        listing: &PropertyListing,
        requirement: &OpportunityRequirement,
        experience: Option<&BrokerExperience>,
        checks_evaluated: Vec<String>,
    ) -> MatchScoreResult {
        let categories = CategoryScores {
            location: round_score(calculate_location_score(listing, requirement)),
            space: round_score(calculate_space_score(listing, requirement)),
            building: round_score(calculate_building_score(listing, requirement)),
            timeline: round_score(calculate_timeline_score(listing, requirement)),
            experience: round_score(calculate_experience_score(experience, requirement.agency.as_deref())),
        };

        let weighted: f64 = categories
            .entries()
            .iter()
            .map(|(category, score)| score * self.weights.weight(*category))
            .sum();
        let overall_score = weighted.round().clamp(0.0, 100.0);
        let grade = self.thresholds.grade_for(overall_score);

        let competitive = overall_score >= self.competitive.min_overall
            && categories
                .entries()
                .iter()
                .all(|(_, score)| *score >= self.competitive.category_floor);

        let mut strengths = Vec::new();
        let mut weaknesses = Vec::new();
        let mut recommendations = Vec::new();
        for (category, score) in categories.entries() {
            if score >= self.competitive.strength {
                strengths.push(strength_label(category, score));
            } else if score < self.competitive.weakness {
                tracing::trace!("Weak {} category for {}: {}", category.label(), listing.id, score);
                weaknesses.push(weakness_label(category, score));
                recommendations.push(recommendation_for(category).to_string());
            }
        }

        tracing::debug!(
            "Scored pair ({}, {}): {} ({}), competitive={}",
            listing.id,
            requirement.id,
            overall_score,
            grade,
            competitive
        );

        MatchScoreResult {
            property_id: listing.id.clone(),
            opportunity_id: requirement.id.clone(),
            overall_score,
            grade,
            qualified: true,
            competitive,
            category_scores: categories,
            disqualifiers: vec![],
            strengths,
            weaknesses,
            recommendations,
            checks_evaluated,
            computed_at: Utc::now(),
        }
    }
}

#[inline]
fn round_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0).round()
}

fn strength_label(category: MatchCategory, score: f64) -> String {
    let text = match category {
        MatchCategory::Location => "Strong location fit within the delineated area",
        MatchCategory::Space => "Available space closely matches the target size",
        MatchCategory::Building => "Building meets most desired features",
        MatchCategory::Timeline => "Space is available well ahead of occupancy",
        MatchCategory::Experience => "Broker has substantial federal leasing experience",
    };
    format!("{} ({:.0})", text, score)
}

fn weakness_label(category: MatchCategory, score: f64) -> String {
    let text = match category {
        MatchCategory::Location => "Location is at the edge of the acceptable area",
        MatchCategory::Space => "Available space is far from the target size",
        MatchCategory::Building => "Building lacks several desired features",
        MatchCategory::Timeline => "Little slack between availability and occupancy",
        MatchCategory::Experience => "Limited federal transaction history",
    };
    format!("{} ({:.0})", text, score)
}

fn recommendation_for(category: MatchCategory) -> &'static str {
    match category {
        MatchCategory::Location => {
            "Highlight transit access and proximity to the agency's existing offices"
        }
        MatchCategory::Space => {
            "Consider offering a configuration closer to the target square footage"
        }
        MatchCategory::Building => {
            "Document planned upgrades such as LEED, Energy Star, backup power or fiber"
        }
        MatchCategory::Timeline => {
            "Commit to an accelerated build-out schedule to widen the delivery margin"
        }
        MatchCategory::Experience => {
            "Partner with a broker or team that has prior federal lease awards"
        }
    }
}

/// Location score (0-100) beyond the binary eligibility check
///
/// Within a radius delineation the score falls from 100 at the center to 50
/// at the edge; without one, city and state matches decide.
pub(crate) fn calculate_location_score(listing: &PropertyListing, requirement: &OpportunityRequirement) -> f64 {
    let location = &requirement.location;

    if let Some(DelineatedArea::Radius { center, radius_miles }) = &location.delineated_area {
        if *radius_miles > 0.0 {
            let point = listing.location();
            let distance = haversine_distance(
                center.latitude,
                center.longitude,
                point.latitude,
                point.longitude,
            );
            return 100.0 - 50.0 * (distance / radius_miles).min(1.0);
        }
    }

    let city_match = match (location.city.as_deref(), listing.city.as_deref()) {
        (Some(required), Some(actual)) => required.trim().eq_ignore_ascii_case(actual.trim()),
        _ => false,
    };

    if city_match {
        90.0
    } else if location.state.is_some() || location.delineated_area.is_some() {
        75.0
    } else {
        70.0
    }
}

/// Space score (0-100): triangular, 100 at target and 50 at the bounds
pub(crate) fn calculate_space_score(listing: &PropertyListing, requirement: &OpportunityRequirement) -> f64 {
    let space = &requirement.space;
    let Some(target) = space.target() else {
        return 100.0;
    };

    // A divisible listing offers only what the requirement can take
    let offered = match space.max_sf {
        Some(max) if listing.divisible && listing.available_sf > max => max,
        _ => listing.available_sf,
    };

    if offered <= target {
        let lower = space.min_sf.unwrap_or(0.0).min(target);
        let span = target - lower;
        if span <= 0.0 {
            return 100.0;
        }
        let position = ((offered - lower) / span).clamp(0.0, 1.0);
        50.0 + 50.0 * position
    } else {
        let upper = space.max_sf.unwrap_or(target * 2.0).max(target);
        let span = upper - target;
        if span <= 0.0 {
            return 100.0;
        }
        let position = ((upper - offered) / span).clamp(0.0, 1.0);
        50.0 + 50.0 * position
    }
}

/// Building score (0-100): fraction of desired features matched
pub(crate) fn calculate_building_score(listing: &PropertyListing, requirement: &OpportunityRequirement) -> f64 {
    let desired = &requirement.desired_features;
    let mut matched = 0.0;
    let mut total = 0.0;

    // Class preference: the first listed class is the preferred one
    total += 1.0;
    matched += match (requirement.building_classes.first(), listing.building_class) {
        (None, _) => 1.0,
        (Some(preferred), Some(actual)) if *preferred == actual => 1.0,
        (Some(_), Some(actual)) if requirement.building_classes.contains(&actual) => 0.5,
        _ => 0.0,
    };

    let flags = [
        (desired.leed, listing.leed_certified),
        (desired.energy_star, listing.energy_star),
        (desired.backup_power, listing.backup_power),
        (desired.fiber, listing.fiber_connectivity),
    ];
    for (wanted, present) in flags {
        if wanted {
            total += 1.0;
            if present {
                matched += 1.0;
            }
        }
    }

    if let Some(min_ratio) = desired.min_parking_ratio {
        total += 1.0;
        matched += match listing.parking_ratio {
            Some(ratio) if ratio >= min_ratio => 1.0,
            Some(ratio) if min_ratio > 0.0 => (ratio / min_ratio).clamp(0.0, 1.0) * 0.5,
            _ => 0.0,
        };
    }

    100.0 * matched / total
}

/// Timeline score (0-100)
///
/// Full credit when space is available at least 60 days before occupancy,
/// degrading linearly to 60 as the margin shrinks to zero.
pub(crate) fn calculate_timeline_score(listing: &PropertyListing, requirement: &OpportunityRequirement) -> f64 {
    let (Some(available), Some(occupancy)) = (listing.available_date, requirement.occupancy_date) else {
        return TIMELINE_UNKNOWN_SCORE;
    };

    let margin_days = (occupancy - available).num_days() as f64;
    if margin_days >= TIMELINE_BUFFER_DAYS {
        100.0
    } else {
        60.0 + 40.0 * (margin_days.max(0.0) / TIMELINE_BUFFER_DAYS)
    }
}

/// Experience score (0-100) from prior federal transactions
///
/// Missing profiles fall back to a low non-zero baseline.
pub(crate) fn calculate_experience_score(experience: Option<&BrokerExperience>, agency: Option<&str>) -> f64 {
    let Some(experience) = experience else {
        return EXPERIENCE_BASELINE;
    };

    let transactions = experience.federal_transactions.max(experience.gsa_transactions) as f64;
    let volume = 1.0 - (-transactions / 5.0).exp();
    let mut score = EXPERIENCE_BASELINE + 70.0 * volume;

    if let Some(agency) = agency {
        let served = experience
            .agencies_served
            .iter()
            .any(|served| served.trim().eq_ignore_ascii_case(agency.trim()));
        if served {
            score += 10.0;
        }
    }

    score.min(100.0)
}
