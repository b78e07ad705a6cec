use crate::core::grading::GradeThresholds;
use crate::core::percentile::{HistogramDistribution, ReferenceDistribution};
use crate::core::spatial::SpatialIndex;
use crate::models::{
    FactorScore, GovernmentPropertyRecord, NeighborhoodFactor, NeighborhoodMetrics,
    NeighborhoodScoreResult, NeighborhoodWeights,
};
use chrono::{Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::f64::consts::PI;
use std::sync::Arc;

/// Curve constants for the factor normalizations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighborhoodTuning {
    /// Properties per square mile at which density reaches ~63%
    pub density_scale: f64,
    /// Property count at which the count term reaches ~63%
    pub count_scale: f64,
    /// Leased count at which the activity term reaches ~63%
    pub leased_scale: f64,
    /// Sum of expiry urgency weights at which the factor reaches ~63%
    pub expiring_scale: f64,
    /// Forward window for expiring leases
    pub expiring_window_months: u32,
    pub demand_rsf_unit: f64,
    pub demand_rsf_ceiling: f64,
    /// Distinct agencies at which growth reaches ~63%
    pub agency_scale: f64,
}

impl Default for NeighborhoodTuning {
    fn default() -> Self {
        Self {
            density_scale: 0.25,
            count_scale: 10.0,
            leased_scale: 15.0,
            expiring_scale: 3.0,
            expiring_window_months: 24,
            demand_rsf_unit: 10_000.0,
            demand_rsf_ceiling: 1_000_000.0,
            agency_scale: 5.0,
        }
    }
}

/// Saturating curve mapping [0, ∞) onto [0, 1)
#[inline]
fn saturate(value: f64, scale: f64) -> f64 {
    if value <= 0.0 || scale <= 0.0 {
        return 0.0;
    }
    1.0 - (-value / scale).exp()
}

/// Six-factor neighborhood score over the records found in a radius
pub struct NeighborhoodScoreEngine {
    weights: NeighborhoodWeights,
    thresholds: GradeThresholds,
    tuning: NeighborhoodTuning,
    distribution: Arc<dyn ReferenceDistribution>,
}

struct FactorInputs {
    metrics: NeighborhoodMetrics,
    leased_rsf: f64,
    expiring_rsf: f64,
    urgency_sum: f64,
    agencies: usize,
}

impl NeighborhoodScoreEngine {
    pub fn new(
        weights: NeighborhoodWeights,
        thresholds: GradeThresholds,
        tuning: NeighborhoodTuning,
        distribution: Arc<dyn ReferenceDistribution>,
    ) -> Self {
        Self {
            weights,
            thresholds,
            tuning,
            distribution,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            NeighborhoodWeights::default(),
            GradeThresholds::default(),
            NeighborhoodTuning::default(),
            Arc::new(HistogramDistribution::new()),
        )
    }

    pub fn weights(&self) -> &NeighborhoodWeights {
        &self.weights
    }

    pub fn distribution(&self) -> &Arc<dyn ReferenceDistribution> {
        &self.distribution
    }

    /// Query the index and score the result
    pub fn score_location(
        &self,
        index: &SpatialIndex,
        lat: f64,
        lng: f64,
        radius_miles: f64,
        as_of: NaiveDate,
    ) -> NeighborhoodScoreResult {
        let records = index.query_radius(lat, lng, radius_miles);
        self.score(lat, lng, radius_miles, &records, as_of)
    }

    /// Score a set of records already known to lie inside the radius
    ///
    /// Never fails: an empty set produces all-zero metrics and an F.
    /// The computed score is recorded into the reference distribution after
    /// its percentile is taken, so a location is ranked against prior scores.
    pub fn score(
        &self,
        lat: f64,
        lng: f64,
        radius_miles: f64,
        records: &[&GovernmentPropertyRecord],
        as_of: NaiveDate,
    ) -> NeighborhoodScoreResult {
        let inputs = self.collect_inputs(records, as_of);
        let factors = self.factor_scores(&inputs, radius_miles);

        let weighted: f64 = factors.iter().map(|f| f.contribution).sum();
        let score = weighted.round().clamp(0.0, 100.0);
        let grade = self.thresholds.grade_for(score);
        let percentile = self.distribution.percentile_of(score);
        self.distribution.record_score(score);

        tracing::debug!(
            "Neighborhood ({:.4}, {:.4}, {}mi): {} properties, score {} ({})",
            lat,
            lng,
            radius_miles,
            inputs.metrics.total_properties,
            score,
            grade
        );

        NeighborhoodScoreResult {
            latitude: lat,
            longitude: lng,
            radius_miles,
            score,
            grade,
            percentile,
            metrics: inputs.metrics,
            factors,
            weights_version: self.weights.version.clone(),
            computed_at: Utc::now(),
        }
    }

    fn collect_inputs(&self, records: &[&GovernmentPropertyRecord], as_of: NaiveDate) -> FactorInputs {
        let window_end = as_of
            .checked_add_months(Months::new(self.tuning.expiring_window_months))
            .unwrap_or(NaiveDate::MAX);
        let window_days = (window_end - as_of).num_days().max(1) as f64;

        let mut metrics = NeighborhoodMetrics::default();
        let mut leased_rsf = 0.0;
        let mut expiring_rsf = 0.0;
        let mut urgency_sum = 0.0;
        let mut agencies = HashSet::new();

        for record in records {
            let rsf = record.rsf.max(0.0);
            metrics.total_properties += 1;
            metrics.total_rsf += rsf;

            if let Some(agency) = record.agency.as_deref() {
                let agency = agency.trim();
                if !agency.is_empty() {
                    agencies.insert(agency.to_ascii_uppercase());
                }
            }

            if !record.is_leased() {
                metrics.owned_properties += 1;
                continue;
            }

            metrics.leased_properties += 1;
            leased_rsf += rsf;

            let Some(expiration) = record.lease_expiration else {
                continue;
            };
            if expiration > window_end {
                continue;
            }

            // Holdover leases (already past expiration) are the most urgent
            let days_left = (expiration - as_of).num_days().max(0) as f64;
            urgency_sum += 0.25 + 0.75 * (1.0 - days_left / window_days);
            expiring_rsf += rsf;
            metrics.expiring_leases_count += 1;
        }

        FactorInputs {
            metrics,
            leased_rsf,
            expiring_rsf,
            urgency_sum,
            agencies: agencies.len(),
        }
    }

    fn factor_scores(&self, inputs: &FactorInputs, radius_miles: f64) -> Vec<FactorScore> {
        let tuning = &self.tuning;
        let metrics = &inputs.metrics;
        let total = metrics.total_properties as f64;
        let leased = metrics.leased_properties as f64;

        let area = PI * radius_miles * radius_miles;
        let density = if area > 0.0 { total / area } else { 0.0 };
        let density_score =
            100.0 * (saturate(density, tuning.density_scale) * saturate(total, tuning.count_scale)).sqrt();

        let leased_share = if total > 0.0 { leased / total } else { 0.0 };
        let activity_score = 60.0 * leased_share + 40.0 * saturate(leased, tuning.leased_scale);

        let expiring_score = 100.0 * saturate(inputs.urgency_sum, tuning.expiring_scale);

        let demand_score = if inputs.leased_rsf > 0.0 && tuning.demand_rsf_unit > 0.0 {
            let numerator = (1.0 + inputs.leased_rsf / tuning.demand_rsf_unit).ln();
            let denominator = (1.0 + tuning.demand_rsf_ceiling / tuning.demand_rsf_unit).ln();
            100.0 * numerator / denominator
        } else {
            0.0
        };

        let expiring_share = if inputs.leased_rsf > 0.0 {
            (inputs.expiring_rsf / inputs.leased_rsf).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let vacancy_score = 100.0 * expiring_share.sqrt();

        let growth_score = 100.0 * saturate(inputs.agencies as f64, tuning.agency_scale);

        [
            (NeighborhoodFactor::Density, density, density_score),
            (NeighborhoodFactor::LeaseActivity, leased_share, activity_score),
            (NeighborhoodFactor::ExpiringLeases, inputs.urgency_sum, expiring_score),
            (NeighborhoodFactor::Demand, inputs.leased_rsf, demand_score),
            (NeighborhoodFactor::Vacancy, expiring_share, vacancy_score),
            (NeighborhoodFactor::Growth, inputs.agencies as f64, growth_score),
        ]
        .into_iter()
        .map(|(factor, raw_value, score)| {
            let score = score.clamp(0.0, 100.0);
            let weight = self.weights.weight(factor);
            FactorScore {
                factor,
                raw_value,
                score: (score * 10.0).round() / 10.0,
                weight,
                contribution: score * weight,
            }
        })
        .collect()
    }
}

impl Default for NeighborhoodScoreEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}
