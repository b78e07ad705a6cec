//! Ordered early-termination disqualification pipeline.
//!
//! Checks run in list order and evaluation stops at the first failure; a
//! disqualified pair never reaches later checks or the scorer. The order is
//! data so it can be tuned from configuration.

use crate::core::distance::{calculate_bounding_box, haversine_distance, is_within_bounding_box};
use crate::error::ScoreError;
use crate::models::{DelineatedArea, OpportunityRequirement, PropertyListing};
use geo::{Coord, Intersects, LineString, Point, Polygon};

/// Result of a single binary check
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Pass,
    Fail(String),
}

/// A named hard-stop check over a listing/requirement pair
pub trait ConstraintCheck: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, listing: &PropertyListing, requirement: &OpportunityRequirement) -> CheckOutcome;
}

/// First failure, if any, and which checks ran to find it
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub disqualifier: Option<String>,
    pub failed_check: Option<String>,
    pub checks_evaluated: Vec<String>,
}

impl PipelineOutcome {
    pub fn qualified(&self) -> bool {
        self.disqualifier.is_none()
    }
}

pub const GEOGRAPHIC: &str = "geographic";
pub const SPACE: &str = "space";
pub const BUILDING_CLASS: &str = "building_class";
pub const TIMELINE: &str = "timeline";
pub const MANDATORY_FEATURES: &str = "mandatory_features";

/// Default order: most frequent disqualifiers first
pub const DEFAULT_CHECK_ORDER: [&str; 5] = [GEOGRAPHIC, SPACE, BUILDING_CLASS, TIMELINE, MANDATORY_FEATURES];

fn same_text(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// State and delineated-area eligibility
pub struct GeographicEligibility;

impl ConstraintCheck for GeographicEligibility {
    fn name(&self) -> &str {
        GEOGRAPHIC
    }

    fn evaluate(&self, listing: &PropertyListing, requirement: &OpportunityRequirement) -> CheckOutcome {
        let location = &requirement.location;

        if let (Some(required), Some(actual)) = (location.state.as_deref(), listing.state.as_deref()) {
            if !same_text(required, actual) {
                return CheckOutcome::Fail(format!(
                    "Outside required state: listing is in {}, requirement is limited to {}",
                    actual.trim(),
                    required.trim()
                ));
            }
        }

        match &location.delineated_area {
            Some(DelineatedArea::Radius { center, radius_miles }) => {
                let point = listing.location();
                let bbox = calculate_bounding_box(center.latitude, center.longitude, *radius_miles);
                if !is_within_bounding_box(point.latitude, point.longitude, &bbox) {
                    return CheckOutcome::Fail(format!(
                        "Outside delineated area: more than {:.1} miles from center",
                        radius_miles
                    ));
                }

                let distance = haversine_distance(
                    center.latitude,
                    center.longitude,
                    point.latitude,
                    point.longitude,
                );
                if distance > *radius_miles {
                    return CheckOutcome::Fail(format!(
                        "Outside delineated area: {:.1} miles from center, limit is {:.1} miles",
                        distance, radius_miles
                    ));
                }
            }
            Some(DelineatedArea::Polygon { vertices }) if vertices.len() >= 3 => {
                let ring: Vec<Coord<f64>> = vertices
                    .iter()
                    .map(|v| Coord { x: v.longitude, y: v.latitude })
                    .collect();
                let polygon = Polygon::new(LineString::from(ring), vec![]);
                let location = listing.location();
                let point = Point::new(location.longitude, location.latitude);
                if !polygon.intersects(&point) {
                    return CheckOutcome::Fail("Outside delineated area boundary".to_string());
                }
            }
            Some(DelineatedArea::Polygon { vertices }) => {
                tracing::debug!(
                    "Ignoring degenerate delineated area with {} vertices for {}",
                    vertices.len(),
                    requirement.id
                );
            }
            None => {}
        }

        CheckOutcome::Pass
    }
}

/// Available space within [min, max], honoring divisibility
pub struct SpaceBounds;

impl ConstraintCheck for SpaceBounds {
    fn name(&self) -> &str {
        SPACE
    }

    fn evaluate(&self, listing: &PropertyListing, requirement: &OpportunityRequirement) -> CheckOutcome {
        let available = listing.available_sf;
        let space = &requirement.space;

        if let Some(min) = space.min_sf {
            if available < min {
                return CheckOutcome::Fail(format!(
                    "Insufficient space: {:.0} SF available, {:.0} SF minimum required",
                    available, min
                ));
            }
        }

        if let Some(max) = space.max_sf {
            if available > max {
                // A divisible listing can carve out a block no larger than max
                let smallest_block = listing.min_divisible_sf.unwrap_or(0.0);
                if !listing.divisible || smallest_block > max {
                    return CheckOutcome::Fail(format!(
                        "Excess space: {:.0} SF available exceeds the {:.0} SF maximum and cannot be divided",
                        available, max
                    ));
                }
            }
        }

        CheckOutcome::Pass
    }
}

/// Listing class must be one of the allowed classes
pub struct BuildingClassMembership;

impl ConstraintCheck for BuildingClassMembership {
    fn name(&self) -> &str {
        BUILDING_CLASS
    }

    fn evaluate(&self, listing: &PropertyListing, requirement: &OpportunityRequirement) -> CheckOutcome {
        if requirement.building_classes.is_empty() {
            return CheckOutcome::Pass;
        }

        let allowed = requirement
            .building_classes
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        match listing.building_class {
            Some(class) if requirement.building_classes.contains(&class) => CheckOutcome::Pass,
            Some(class) => CheckOutcome::Fail(format!(
                "Building class {} not accepted (allowed: {})",
                class, allowed
            )),
            None => CheckOutcome::Fail(format!(
                "Building class unknown (allowed: {})",
                allowed
            )),
        }
    }
}

/// Space must be available by the occupancy date
pub struct TimelineFeasibility;

impl ConstraintCheck for TimelineFeasibility {
    fn name(&self) -> &str {
        TIMELINE
    }

    fn evaluate(&self, listing: &PropertyListing, requirement: &OpportunityRequirement) -> CheckOutcome {
        match (listing.available_date, requirement.occupancy_date) {
            (Some(available), Some(occupancy)) if available > occupancy => CheckOutcome::Fail(format!(
                "Space available {} is after the required occupancy date {}",
                available, occupancy
            )),
            _ => CheckOutcome::Pass,
        }
    }
}

/// ADA, SCIF and clearance, each only when mandatory
pub struct MandatoryFeatureCheck;

impl ConstraintCheck for MandatoryFeatureCheck {
    fn name(&self) -> &str {
        MANDATORY_FEATURES
    }

    fn evaluate(&self, listing: &PropertyListing, requirement: &OpportunityRequirement) -> CheckOutcome {
        let mandatory = &requirement.mandatory_features;

        if mandatory.ada && !listing.ada_compliant {
            return CheckOutcome::Fail("ADA compliance is mandatory".to_string());
        }
        if mandatory.scif && !listing.scif_capable {
            return CheckOutcome::Fail("SCIF-capable space is mandatory".to_string());
        }
        if mandatory.security_clearance && !listing.security_clearance_capable {
            return CheckOutcome::Fail("Facility security clearance is mandatory".to_string());
        }

        CheckOutcome::Pass
    }
}

/// Build a standard check from its configuration name
pub fn check_by_name(name: &str) -> Option<Box<dyn ConstraintCheck>> {
    match name.trim() {
        GEOGRAPHIC => Some(Box::new(GeographicEligibility)),
        SPACE => Some(Box::new(SpaceBounds)),
        BUILDING_CLASS => Some(Box::new(BuildingClassMembership)),
        TIMELINE => Some(Box::new(TimelineFeasibility)),
        MANDATORY_FEATURES => Some(Box::new(MandatoryFeatureCheck)),
        _ => None,
    }
}

pub struct MatchConstraintPipeline {
    checks: Vec<Box<dyn ConstraintCheck>>,
}

impl MatchConstraintPipeline {
    pub fn new(checks: Vec<Box<dyn ConstraintCheck>>) -> Self {
        Self { checks }
    }

    pub fn standard() -> Self {
        Self::new(
            DEFAULT_CHECK_ORDER
                .iter()
                .filter_map(|name| check_by_name(name))
                .collect(),
        )
    }

    /// Build from an ordered list of check names
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, ScoreError> {
        let mut checks: Vec<Box<dyn ConstraintCheck>> = Vec::with_capacity(names.len());
        for name in names {
            let check = check_by_name(name.as_ref()).ok_or_else(|| {
                ScoreError::Validation(format!("unknown constraint check '{}'", name.as_ref()))
            })?;
            if checks.iter().any(|c| c.name() == check.name()) {
                return Err(ScoreError::Validation(format!(
                    "constraint check '{}' listed twice",
                    check.name()
                )));
            }
            checks.push(check);
        }
        Ok(Self::new(checks))
    }

    pub fn check_names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Run checks in order, stopping at the first failure
    pub fn evaluate(&self, listing: &PropertyListing, requirement: &OpportunityRequirement) -> PipelineOutcome {
        let mut checks_evaluated = Vec::with_capacity(self.checks.len());

        for check in &self.checks {
            checks_evaluated.push(check.name().to_string());
            if let CheckOutcome::Fail(reason) = check.evaluate(listing, requirement) {
                tracing::debug!(
                    "Pair ({}, {}) disqualified at '{}': {}",
                    listing.id,
                    requirement.id,
                    check.name(),
                    reason
                );
                return PipelineOutcome {
                    disqualifier: Some(reason),
                    failed_check: Some(check.name().to_string()),
                    checks_evaluated,
                };
            }
        }

        PipelineOutcome {
            disqualifier: None,
            failed_check: None,
            checks_evaluated,
        }
    }
}

impl Default for MatchConstraintPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BuildingClass, GeoPoint, LocationRequirement, SpaceRequirement};
    use chrono::NaiveDate;

    fn create_listing() -> PropertyListing {
        PropertyListing {
            id: "prop-1".to_string(),
            latitude: 38.9072,
            longitude: -77.0369,
            state: Some("DC".to_string()),
            city: Some("Washington".to_string()),
            available_sf: 75_000.0,
            total_sf: 120_000.0,
            building_class: Some(BuildingClass::A),
            ada_compliant: true,
            leed_certified: true,
            energy_star: false,
            parking_ratio: Some(2.0),
            backup_power: true,
            fiber_connectivity: true,
            scif_capable: false,
            security_clearance_capable: false,
            divisible: false,
            min_divisible_sf: None,
            available_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            broker_id: None,
        }
    }

    fn create_requirement() -> OpportunityRequirement {
        OpportunityRequirement {
            id: "opp-1".to_string(),
            agency: Some("GSA".to_string()),
            location: LocationRequirement {
                state: Some("dc".to_string()),
                city: Some("Washington".to_string()),
                delineated_area: Some(DelineatedArea::Radius {
                    center: GeoPoint::new(38.9, -77.03),
                    radius_miles: 10.0,
                }),
            },
            space: SpaceRequirement {
                min_sf: Some(70_000.0),
                max_sf: Some(80_000.0),
                target_sf: None,
            },
            building_classes: vec![BuildingClass::A, BuildingClass::B],
            occupancy_date: NaiveDate::from_ymd_opt(2026, 9, 1),
            term_months: Some(120),
            desired_features: Default::default(),
            mandatory_features: Default::default(),
        }
    }

    #[test]
    fn test_full_pass_runs_every_check() {
        let pipeline = MatchConstraintPipeline::standard();
        let outcome = pipeline.evaluate(&create_listing(), &create_requirement());

        assert!(outcome.qualified());
        assert_eq!(outcome.checks_evaluated, DEFAULT_CHECK_ORDER.to_vec());
    }

    #[test]
    fn test_state_mismatch_stops_at_first_check() {
        let mut listing = create_listing();
        listing.state = Some("VA".to_string());
        listing.available_sf = 10.0;

        let outcome = MatchConstraintPipeline::standard().evaluate(&listing, &create_requirement());

        assert_eq!(outcome.failed_check.as_deref(), Some(GEOGRAPHIC));
        assert_eq!(outcome.checks_evaluated, vec![GEOGRAPHIC]);
    }

    #[test]
    fn test_radius_delineation_prefilter_and_exact_distance() {
        let requirement = create_requirement();

        // Baltimore is far outside the 10-mile box
        let mut far = create_listing();
        far.latitude = 39.2904;
        far.longitude = -76.6122;
        let outcome = GeographicEligibility.evaluate(&far, &requirement);
        assert!(matches!(outcome, CheckOutcome::Fail(reason) if reason.contains("more than 10.0 miles")));

        // Inside the box near its corner, but beyond the radius
        let mut corner = create_listing();
        corner.latitude = 38.9 + 9.0 / 69.0;
        corner.longitude = -77.03 + 9.0 / (69.0 * 38.9f64.to_radians().cos());
        let outcome = GeographicEligibility.evaluate(&corner, &requirement);
        assert!(matches!(outcome, CheckOutcome::Fail(reason) if reason.contains("miles from center, limit is 10.0")));

        assert_eq!(GeographicEligibility.evaluate(&create_listing(), &requirement), CheckOutcome::Pass);
    }

    #[test]
    fn test_polygon_delineation() {
        let mut requirement = create_requirement();
        requirement.location.delineated_area = Some(DelineatedArea::Polygon {
            vertices: vec![
                GeoPoint::new(38.8, -77.1),
                GeoPoint::new(38.8, -76.9),
                GeoPoint::new(39.0, -76.9),
                GeoPoint::new(39.0, -77.1),
            ],
        });

        let inside = GeographicEligibility.evaluate(&create_listing(), &requirement);
        assert_eq!(inside, CheckOutcome::Pass);

        let mut outside = create_listing();
        outside.latitude = 39.5;
        assert!(matches!(GeographicEligibility.evaluate(&outside, &requirement), CheckOutcome::Fail(_)));
    }

    #[test]
    fn test_divisible_listing_above_max_passes() {
        let mut listing = create_listing();
        listing.available_sf = 150_000.0;
        assert!(matches!(SpaceBounds.evaluate(&listing, &create_requirement()), CheckOutcome::Fail(_)));

        listing.divisible = true;
        listing.min_divisible_sf = Some(20_000.0);
        assert_eq!(SpaceBounds.evaluate(&listing, &create_requirement()), CheckOutcome::Pass);

        listing.min_divisible_sf = Some(90_000.0);
        assert!(matches!(SpaceBounds.evaluate(&listing, &create_requirement()), CheckOutcome::Fail(_)));
    }

    #[test]
    fn test_building_class_and_timeline() {
        let mut listing = create_listing();
        listing.building_class = Some(BuildingClass::C);
        assert!(matches!(
            BuildingClassMembership.evaluate(&listing, &create_requirement()),
            CheckOutcome::Fail(_)
        ));

        listing.available_date = NaiveDate::from_ymd_opt(2027, 1, 1);
        assert!(matches!(
            TimelineFeasibility.evaluate(&listing, &create_requirement()),
            CheckOutcome::Fail(_)
        ));
    }

    #[test]
    fn test_mandatory_features_only_when_mandatory() {
        let mut listing = create_listing();
        listing.ada_compliant = false;
        let mut requirement = create_requirement();
        assert_eq!(MandatoryFeatureCheck.evaluate(&listing, &requirement), CheckOutcome::Pass);

        requirement.mandatory_features.ada = true;
        assert_eq!(
            MandatoryFeatureCheck.evaluate(&listing, &requirement),
            CheckOutcome::Fail("ADA compliance is mandatory".to_string())
        );
    }

    #[test]
    fn test_from_names_rejects_unknown_and_duplicates() {
        assert!(MatchConstraintPipeline::from_names(&["space", "geographic"]).is_ok());
        assert!(MatchConstraintPipeline::from_names(&["space", "parking"]).is_err());
        assert!(MatchConstraintPipeline::from_names(&["space", "space"]).is_err());

        let reordered = MatchConstraintPipeline::from_names(&["timeline", "space"]).unwrap();
        assert_eq!(reordered.check_names(), vec!["timeline", "space"]);
    }
}
