// Unit tests for FedLease Score

mod common;

use common::{as_of, dc_records, listing, requirement, DC_LAT, DC_LNG};
use fedlease_score::core::constraints::{check_by_name, DEFAULT_CHECK_ORDER};
use fedlease_score::core::{
    distance::{calculate_bounding_box, haversine_distance, is_within_bounding_box},
    CheckOutcome, ConstraintCheck, GradeThresholds, MatchConstraintPipeline, MatchScoreEngine,
    Matcher, SpatialIndex,
};
use fedlease_score::models::{
    DelineatedArea, GeoPoint, Grade, MatchCategory, OpportunityRequirement, PropertyListing,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_haversine_distance_zero() {
    let distance = haversine_distance(DC_LAT, DC_LNG, DC_LAT, DC_LNG);
    assert!(distance < 0.01);
}

#[test]
fn test_haversine_distance_dc_to_baltimore() {
    // Washington to Baltimore is roughly 35 miles
    let distance = haversine_distance(DC_LAT, DC_LNG, 39.2904, -76.6122);
    assert!(distance > 30.0 && distance < 40.0, "Expected ~35 miles, got {}", distance);
}

#[test]
fn test_bounding_box_creation() {
    let bbox = calculate_bounding_box(DC_LAT, DC_LNG, 5.0);

    assert!(bbox.min_lat < DC_LAT);
    assert!(bbox.max_lat > DC_LAT);
    assert!(bbox.min_lon < DC_LNG);
    assert!(bbox.max_lon > DC_LNG);

    // 69 miles per degree of latitude
    let lat_span = bbox.max_lat - bbox.min_lat;
    assert!((lat_span - 10.0 / 69.0).abs() < 1e-9);

    // Longitude degrees shrink with latitude, so the box is wider in degrees
    let lon_span = bbox.max_lon - bbox.min_lon;
    assert!(lon_span > lat_span);
}

#[test]
fn test_point_within_bbox() {
    let bbox = calculate_bounding_box(DC_LAT, DC_LNG, 5.0);

    assert!(is_within_bounding_box(DC_LAT, DC_LNG, &bbox));
    assert!(is_within_bounding_box(38.95, -77.0, &bbox));
    assert!(!is_within_bounding_box(39.2904, -76.6122, &bbox));
    assert!(!is_within_bounding_box(bbox.max_lat + 0.01, DC_LNG, &bbox));
}

#[test]
fn test_grade_thresholds_favor_higher_grade_on_ties() {
    let grades = GradeThresholds::default();

    assert_eq!(grades.grade_for(100.0), Grade::APlus);
    assert_eq!(grades.grade_for(95.0), Grade::APlus);
    assert_eq!(grades.grade_for(94.0), Grade::A);
    assert_eq!(grades.grade_for(85.0), Grade::A);
    assert_eq!(grades.grade_for(70.0), Grade::B);
    assert_eq!(grades.grade_for(55.0), Grade::C);
    assert_eq!(grades.grade_for(40.0), Grade::D);
    assert_eq!(grades.grade_for(39.0), Grade::F);
    assert_eq!(grades.grade_for(0.0), Grade::F);
}

#[test]
fn test_spatial_index_radius_query() {
    let index = SpatialIndex::build(dc_records());
    assert_eq!(index.len(), 40);

    // All fixtures lie within 2.5 miles of the center
    assert_eq!(index.query_radius(DC_LAT, DC_LNG, 5.0).len(), 40);

    // Only the innermost ring is within 0.75 miles
    let inner = index.query_radius(DC_LAT, DC_LNG, 0.75);
    assert_eq!(inner.len(), 8);
    for record in &inner {
        assert!(haversine_distance(DC_LAT, DC_LNG, record.latitude, record.longitude) <= 0.75);
    }

    // Nothing near Baltimore
    assert!(index.query_radius(39.2904, -76.6122, 5.0).is_empty());
}

#[test]
fn test_spatial_index_sorted_by_distance() {
    let index = SpatialIndex::build(dc_records());
    let hits = index.query_radius(DC_LAT, DC_LNG, 5.0);

    let distances: Vec<f64> = hits
        .iter()
        .map(|r| haversine_distance(DC_LAT, DC_LNG, r.latitude, r.longitude))
        .collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));
}

/// Wraps a check and counts how often it runs
struct Counting {
    inner: Box<dyn ConstraintCheck>,
    calls: Arc<AtomicUsize>,
}

impl ConstraintCheck for Counting {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn evaluate(&self, listing: &PropertyListing, requirement: &OpportunityRequirement) -> CheckOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.evaluate(listing, requirement)
    }
}

fn instrumented_pipeline() -> (MatchConstraintPipeline, Vec<Arc<AtomicUsize>>) {
    let mut counters = Vec::new();
    let checks: Vec<Box<dyn ConstraintCheck>> = DEFAULT_CHECK_ORDER
        .iter()
        .map(|name| {
            let calls = Arc::new(AtomicUsize::new(0));
            counters.push(Arc::clone(&calls));
            Box::new(Counting {
                inner: check_by_name(name).unwrap(),
                calls,
            }) as Box<dyn ConstraintCheck>
        })
        .collect();

    (MatchConstraintPipeline::new(checks), counters)
}

#[test]
fn test_geographic_failure_stops_pipeline() {
    let (pipeline, counters) = instrumented_pipeline();
    let matcher = Matcher::new(pipeline, MatchScoreEngine::default());

    let mut outside = listing("prop-va", 75_000.0);
    outside.state = Some("VA".to_string());

    let result = matcher.evaluate(&outside, &requirement("opp-1", 70_000.0, 80_000.0), None);

    assert!(!result.qualified);
    assert_eq!(result.overall_score, 0.0);
    assert_eq!(result.grade, Grade::F);
    assert_eq!(result.disqualifiers.len(), 1);
    assert_eq!(result.checks_evaluated, vec!["geographic"]);

    let calls: Vec<usize> = counters.iter().map(|c| c.load(Ordering::SeqCst)).collect();
    assert_eq!(calls, vec![1, 0, 0, 0, 0]);
}

#[test]
fn test_qualified_pair_runs_every_check_once() {
    let (pipeline, counters) = instrumented_pipeline();
    let matcher = Matcher::new(pipeline, MatchScoreEngine::default());

    let result = matcher.evaluate(
        &listing("prop-1", 75_000.0),
        &requirement("opp-1", 70_000.0, 80_000.0),
        None,
    );

    assert!(result.qualified);
    assert!(counters.iter().all(|c| c.load(Ordering::SeqCst) == 1));
}

#[test]
fn test_delineated_radius_outside_disqualifies() {
    let mut req = requirement("opp-radius", 70_000.0, 80_000.0);
    req.location.delineated_area = Some(DelineatedArea::Radius {
        center: GeoPoint::new(39.2904, -76.6122),
        radius_miles: 10.0,
    });

    let result = Matcher::with_defaults().evaluate(&listing("prop-1", 75_000.0), &req, None);

    assert!(!result.qualified);
    assert!(result.disqualifiers[0].contains("delineated area"));
}

#[test]
fn test_custom_check_order_changes_first_failure() {
    // Fails both geography and space; the configured order decides which is reported
    let mut small_va = listing("prop-va", 10_000.0);
    small_va.state = Some("VA".to_string());
    let req = requirement("opp-1", 70_000.0, 80_000.0);

    let space_first = MatchConstraintPipeline::from_names(&["space", "geographic"]).unwrap();
    let outcome = space_first.evaluate(&small_va, &req);
    assert_eq!(outcome.failed_check.as_deref(), Some("space"));
    assert_eq!(outcome.checks_evaluated, vec!["space"]);

    let standard = MatchConstraintPipeline::standard();
    let outcome = standard.evaluate(&small_va, &req);
    assert_eq!(outcome.failed_check.as_deref(), Some("geographic"));
}

#[test]
fn test_unknown_check_name_rejected() {
    assert!(MatchConstraintPipeline::from_names(&["geographic", "zoning"]).is_err());
    assert!(MatchConstraintPipeline::from_names(&["space", "space"]).is_err());
}

#[test]
fn test_space_score_monotonic_toward_target() {
    let engine = MatchScoreEngine::default();
    let req = requirement("opp-1", 70_000.0, 80_000.0);

    let mut previous = 0.0;
    for available in (70_000..=75_000).step_by(1_000) {
        let result = engine.score(&listing("prop", available as f64), &req, None, vec![]);
        let space = result.category_scores.get(MatchCategory::Space);
        assert!(space >= previous, "space score fell from {} to {} at {}", previous, space, available);
        previous = space;
    }
    assert_eq!(previous, 100.0);
}

#[test]
fn test_recommendations_for_weak_categories() {
    let engine = MatchScoreEngine::default();
    let mut late = listing("prop-late", 75_000.0);
    late.building_class = Some(fedlease_score::models::BuildingClass::C);

    let mut req = requirement("opp-1", 70_000.0, 80_000.0);
    req.building_classes = vec![];
    req.desired_features.leed = true;
    req.desired_features.energy_star = true;
    req.desired_features.fiber = true;
    late.leed_certified = false;

    let result = engine.score(&late, &req, None, vec![]);

    // Building: class ok (no list), none of three desired features => 25
    assert_eq!(result.category_scores.building, 25.0);
    assert!(!result.weaknesses.is_empty());
    assert_eq!(result.weaknesses.len(), result.recommendations.len());
    assert!(!result.competitive);
}

#[test]
fn test_as_of_fixture_is_stable() {
    assert_eq!(as_of().to_string(), "2026-01-01");
}
