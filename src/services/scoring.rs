use crate::core::{Matcher, NeighborhoodScoreEngine, SharedSpatialIndex, SpatialIndex};
use crate::error::ScoreError;
use crate::models::{
    BatchInput, BatchItem, GovernmentPropertyRecord, MatchScoreRequest, MatchScoreResult,
    NeighborhoodScoreRequest, NeighborhoodScoreResult,
};
use crate::services::cache::{CacheKey, CacheStats, ScoreCache};
use crate::services::store::RecordStore;
use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

/// Largest batch accepted by the batch operations
pub const DEFAULT_MAX_BATCH_SIZE: usize = 50;

/// Upper bound for a neighborhood query radius, in miles
pub const MAX_RADIUS_MILES: f64 = 100.0;

/// Entry point for both score types
///
/// Runs the cache-aside flow: look the key up, compute on a miss, store the
/// result for the cache TTL and return it. Cache failures are absorbed by
/// [`ScoreCache`]; the caller only ever sees validation, lookup and
/// computation errors.
pub struct ScoringService {
    index: Arc<SharedSpatialIndex>,
    neighborhood: NeighborhoodScoreEngine,
    matcher: Matcher,
    cache: ScoreCache,
    store: Arc<dyn RecordStore>,
    max_batch_size: usize,
}

/// Reject coordinates and radii outside the supported ranges
pub fn validate_location(lat: f64, lng: f64, radius_miles: f64) -> Result<(), ScoreError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ScoreError::Validation(format!("latitude {} is outside [-90, 90]", lat)));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(ScoreError::Validation(format!("longitude {} is outside [-180, 180]", lng)));
    }
    if !radius_miles.is_finite() || radius_miles <= 0.0 || radius_miles > MAX_RADIUS_MILES {
        return Err(ScoreError::Validation(format!(
            "radius {} must be in (0, {}] miles",
            radius_miles, MAX_RADIUS_MILES
        )));
    }
    Ok(())
}

fn validate_id(field: &str, id: &str) -> Result<(), ScoreError> {
    if id.trim().is_empty() {
        return Err(ScoreError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

impl ScoringService {
    pub fn new(
        index: Arc<SharedSpatialIndex>,
        neighborhood: NeighborhoodScoreEngine,
        matcher: Matcher,
        cache: ScoreCache,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            index,
            neighborhood,
            matcher,
            cache,
            store,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn neighborhood_engine(&self) -> &NeighborhoodScoreEngine {
        &self.neighborhood
    }

    pub fn indexed_properties(&self) -> usize {
        self.index.snapshot().len()
    }

    /// Rebuild the spatial index from a fresh reference set
    pub fn replace_index(&self, records: Vec<GovernmentPropertyRecord>) {
        let count = records.len();
        self.index.replace(SpatialIndex::build(records));
        tracing::info!("Spatial index rebuilt with {} government properties", count);
    }

    /// Neighborhood score around a point, served from cache when fresh
    pub async fn score_neighborhood(
        &self,
        lat: f64,
        lng: f64,
        radius_miles: f64,
    ) -> Result<NeighborhoodScoreResult, ScoreError> {
        validate_location(lat, lng, radius_miles)?;

        let key = CacheKey::neighborhood(lat, lng, radius_miles);
        if let Some(cached) = self.cache.get::<NeighborhoodScoreResult>(&key).await {
            tracing::debug!("Serving {} from cache (hits: {})", key, cached.hit_count);
            return Ok(cached.value);
        }

        // Score the rounded key so every request sharing an entry sees the same center
        let (lat, lng, radius_miles) = key.coordinates().unwrap_or((lat, lng, radius_miles));
        let index = self.index.snapshot();
        let as_of = Utc::now().date_naive();
        let result = self
            .neighborhood
            .score_location(&index, lat, lng, radius_miles, as_of);

        if !result.score.is_finite() || !result.percentile.is_finite() {
            tracing::error!("Neighborhood score for {} is not finite", key);
            return Err(ScoreError::Computation(format!(
                "non-finite neighborhood score at ({}, {})",
                lat, lng
            )));
        }

        tracing::debug!(
            "Computed {}: score {} ({}) from {} properties",
            key,
            result.score,
            result.grade,
            result.metrics.total_properties
        );

        self.cache.put(&key, &result).await;
        Ok(result)
    }

    /// Match score for a property/opportunity pair, served from cache when fresh
    pub async fn score_match(
        &self,
        property_id: &str,
        opportunity_id: &str,
    ) -> Result<MatchScoreResult, ScoreError> {
        validate_id("propertyId", property_id)?;
        validate_id("opportunityId", opportunity_id)?;

        let key = CacheKey::pair(property_id, opportunity_id);
        if let Some(cached) = self.cache.get::<MatchScoreResult>(&key).await {
            tracing::debug!("Serving {} from cache (hits: {})", key, cached.hit_count);
            return Ok(cached.value);
        }

        let listing = self.store.listing(property_id).await?;
        let requirement = self.store.opportunity(opportunity_id).await?;

        // Broker history only refines the experience category
        let experience = match listing.broker_id.as_deref() {
            Some(broker_id) => match self.store.broker_experience(broker_id).await {
                Ok(experience) => experience,
                Err(e) => {
                    tracing::warn!("Broker lookup failed for {}, using baseline: {}", broker_id, e);
                    None
                }
            },
            None => None,
        };

        let result = self.matcher.evaluate(&listing, &requirement, experience.as_ref());

        if !result.overall_score.is_finite() {
            tracing::error!("Match score for {} is not finite", key);
            return Err(ScoreError::Computation(format!(
                "non-finite match score for {} / {}",
                property_id, opportunity_id
            )));
        }

        if result.qualified {
            tracing::debug!("Computed {}: {} ({})", key, result.overall_score, result.grade);
        } else {
            tracing::debug!("Computed {}: disqualified: {:?}", key, result.disqualifiers);
        }

        self.cache.put(&key, &result).await;
        Ok(result)
    }

    fn check_batch_size(&self, len: usize) -> Result<(), ScoreError> {
        if len > self.max_batch_size {
            return Err(ScoreError::Validation(format!(
                "batch of {} exceeds the limit of {} items",
                len, self.max_batch_size
            )));
        }
        Ok(())
    }

    /// Score each location independently; one bad item never fails the batch
    pub async fn score_neighborhood_batch<I: BatchInput<NeighborhoodScoreRequest>>(
        &self,
        locations: &[I],
    ) -> Result<Vec<BatchItem<NeighborhoodScoreResult>>, ScoreError> {
        self.check_batch_size(locations.len())?;

        let mut items = Vec::with_capacity(locations.len());
        for (index, entry) in locations.iter().enumerate() {
            let outcome = match entry.request() {
                Ok(location) => match location.validate() {
                    Ok(()) => {
                        self.score_neighborhood(location.latitude, location.longitude, location.radius_miles)
                            .await
                    }
                    Err(errors) => Err(ScoreError::from(errors)),
                },
                Err(e) => Err(e),
            };
            items.push(BatchItem::from_result(index, outcome));
        }

        let failed = items.iter().filter(|item| !item.success).count();
        tracing::info!("Neighborhood batch: {} scored, {} failed", items.len() - failed, failed);
        Ok(items)
    }

    /// Score each pair independently; one bad item never fails the batch
    pub async fn score_match_batch<I: BatchInput<MatchScoreRequest>>(
        &self,
        pairs: &[I],
    ) -> Result<Vec<BatchItem<MatchScoreResult>>, ScoreError> {
        self.check_batch_size(pairs.len())?;

        let mut items = Vec::with_capacity(pairs.len());
        for (index, entry) in pairs.iter().enumerate() {
            let outcome = match entry.request() {
                Ok(pair) => match pair.validate() {
                    Ok(()) => self.score_match(&pair.property_id, &pair.opportunity_id).await,
                    Err(errors) => Err(ScoreError::from(errors)),
                },
                Err(e) => Err(e),
            };
            items.push(BatchItem::from_result(index, outcome));
        }

        let failed = items.iter().filter(|item| !item.success).count();
        tracing::info!("Match batch: {} scored, {} failed", items.len() - failed, failed);
        Ok(items)
    }

    /// Delete expired cache entries
    pub async fn sweep_cache(&self) -> Result<u64, ScoreError> {
        self.cache.sweep().await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
