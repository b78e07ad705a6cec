//! Reference distributions for percentile ranking of neighborhood scores.

use std::sync::RwLock;

/// Percentile reported when no history exists
pub const DEFAULT_PERCENTILE: f64 = 50.0;

/// A distribution of previously computed scores.
///
/// Implementations may be in-memory, database-backed or sketch-based; the
/// engine only records and ranks.
pub trait ReferenceDistribution: Send + Sync {
    fn record_score(&self, score: f64);

    /// Percentile rank of `score` in [0, 100]
    fn percentile_of(&self, score: f64) -> f64;

    fn sample_count(&self) -> u64;
}

/// Histogram over integer score buckets 0..=100.
///
/// Rank is the share of samples strictly below the bucket plus half of the
/// samples in it (mid-rank), which keeps identical scores at the same
/// percentile.
#[derive(Debug)]
pub struct HistogramDistribution {
    buckets: RwLock<[u64; 101]>,
}

impl HistogramDistribution {
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new([0; 101]),
        }
    }

    pub fn from_scores<I: IntoIterator<Item = f64>>(scores: I) -> Self {
        let dist = Self::new();
        for score in scores {
            dist.record_score(score);
        }
        dist
    }

    /// Swap in a freshly loaded history
    pub fn reset_from<I: IntoIterator<Item = f64>>(&self, scores: I) {
        let mut fresh = [0u64; 101];
        for score in scores {
            if let Some(bucket) = bucket_for(score) {
                fresh[bucket] += 1;
            }
        }
        let mut buckets = self.buckets.write().unwrap_or_else(|p| p.into_inner());
        *buckets = fresh;
    }
}

impl Default for HistogramDistribution {
    fn default() -> Self {
        Self::new()
    }
}

fn bucket_for(score: f64) -> Option<usize> {
    if !score.is_finite() {
        return None;
    }
    Some(score.round().clamp(0.0, 100.0) as usize)
}

impl ReferenceDistribution for HistogramDistribution {
    fn record_score(&self, score: f64) {
        if let Some(bucket) = bucket_for(score) {
            let mut buckets = self.buckets.write().unwrap_or_else(|p| p.into_inner());
            buckets[bucket] += 1;
        }
    }

    fn percentile_of(&self, score: f64) -> f64 {
        let Some(bucket) = bucket_for(score) else {
            return DEFAULT_PERCENTILE;
        };
        let buckets = self.buckets.read().unwrap_or_else(|p| p.into_inner());
        let total: u64 = buckets.iter().sum();
        if total == 0 {
            return DEFAULT_PERCENTILE;
        }

        let below: u64 = buckets[..bucket].iter().sum();
        let equal = buckets[bucket];
        let rank = (below as f64 + equal as f64 / 2.0) / total as f64 * 100.0;

        (rank * 10.0).round() / 10.0
    }

    fn sample_count(&self) -> u64 {
        let buckets = self.buckets.read().unwrap_or_else(|p| p.into_inner());
        buckets.iter().sum()
    }
}
